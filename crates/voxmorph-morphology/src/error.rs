use voxmorph_volume::VolumeError;

/// Errors that can occur during morphological operations.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MorphologyError {
    /// The radius is negative or not finite.
    #[error("Radius must be finite and non-negative, got {0}")]
    InvalidRadius(f32),

    /// The voxel spacing contains a non-positive or non-finite factor.
    #[error("Voxel spacing must be positive and finite, got ({0}, {1}, {2})")]
    InvalidSpacing(f32, f32, f32),

    /// Error when constructing or accessing a volume.
    #[error(transparent)]
    Volume(#[from] VolumeError),
}
