/// An error type for the volume module.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum VolumeError {
    /// Error when a volume dimension is zero.
    #[error("Volume dimensions must be non-zero, got {0}x{1}x{2}")]
    InvalidDimension(usize, usize, usize),

    /// Error when the data length does not match the volume size.
    #[error("Data length ({0}) does not match the volume size ({1})")]
    InvalidLength(usize, usize),

    /// Error when a voxel index is out of bounds.
    #[error("Voxel index ({0}, {1}, {2}) is out of bounds for volume {3}x{4}x{5}")]
    IndexOutOfBounds(usize, usize, usize, usize, usize, usize),
}
