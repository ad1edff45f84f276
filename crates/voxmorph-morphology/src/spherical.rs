use rayon::prelude::*;

use voxmorph_volume::{Volume, VoxelSpacing};

use crate::distance_transform::{diagonal_sq, squared_distance_field, BorderMode};
use crate::error::MorphologyError;

fn validate(radius: f32, spacing: VoxelSpacing) -> Result<(), MorphologyError> {
    if !radius.is_finite() || radius < 0.0 {
        return Err(MorphologyError::InvalidRadius(radius));
    }
    if !spacing.is_valid() {
        return Err(MorphologyError::InvalidSpacing(
            spacing.x, spacing.y, spacing.z,
        ));
    }
    Ok(())
}

/// Radius clamped to the volume diagonal.
///
/// Every real distance inside the volume is below the diagonal while the
/// no-source sentinel stays well above it, so clamping keeps comparisons
/// against very large radii safe without changing which voxels they reach.
fn effective_radius(src: &Volume<bool>, radius: f32, spacing: VoxelSpacing) -> f32 {
    f64::from(radius).min(diagonal_sq(src.size(), spacing).sqrt()) as f32
}

/// Dilate a binary volume with a Euclidean ball of the given radius.
///
/// An output voxel is true iff it lies within `radius` of some true voxel of
/// the input, with the boundary included (`distance <= radius`). Radius 0 is
/// the identity. Runs in time linear in the voxel count for any radius.
///
/// # Arguments
///
/// * `src` - The binary input volume; read-only.
/// * `radius` - The ball radius in physical units; must be finite and >= 0.
/// * `spacing` - The physical voxel size per axis.
///
/// # Errors
///
/// Returns an error if the radius or spacing is invalid.
///
/// # Examples
///
/// ```
/// use voxmorph_volume::{Volume, VolumeSize, VoxelSpacing};
/// use voxmorph_morphology::spherical::spherical_dilate;
///
/// let mut src = Volume::from_size_val(VolumeSize { x: 5, y: 5, z: 5 }, false).unwrap();
/// src.set(2, 2, 2, true).unwrap();
///
/// let out = spherical_dilate(&src, 1.0, VoxelSpacing::default()).unwrap();
/// assert_eq!(out.as_slice().iter().filter(|&&v| v).count(), 7);
/// ```
pub fn spherical_dilate(
    src: &Volume<bool>,
    radius: f32,
    spacing: VoxelSpacing,
) -> Result<Volume<bool>, MorphologyError> {
    validate(radius, spacing)?;

    let field = squared_distance_field(src, spacing, BorderMode::Void, true);
    let r = effective_radius(src, radius, spacing);

    let data: Vec<bool> = field
        .par_iter()
        .map(|&d2| f64::from(d2).sqrt() as f32 <= r)
        .collect();

    Ok(Volume::new(src.size(), data)?)
}

/// Erode a binary volume with a Euclidean ball of the given radius.
///
/// An output voxel is true iff its distance to the nearest false voxel is
/// strictly greater than `radius` (the complement of dilating the
/// complement). The exterior of the volume counts as false, so a sufficiently
/// large radius empties any volume, including an all-true one. Radius 0 is
/// the identity.
///
/// # Arguments
///
/// * `src` - The binary input volume; read-only.
/// * `radius` - The ball radius in physical units; must be finite and >= 0.
/// * `spacing` - The physical voxel size per axis.
///
/// # Errors
///
/// Returns an error if the radius or spacing is invalid.
pub fn spherical_erode(
    src: &Volume<bool>,
    radius: f32,
    spacing: VoxelSpacing,
) -> Result<Volume<bool>, MorphologyError> {
    validate(radius, spacing)?;

    let field = squared_distance_field(src, spacing, BorderMode::Source, false);
    let r = effective_radius(src, radius, spacing);

    let data: Vec<bool> = field
        .par_iter()
        .map(|&d2| f64::from(d2).sqrt() as f32 > r)
        .collect();

    Ok(Volume::new(src.size(), data)?)
}

/// Morphological opening: erosion followed by dilation with the same ball.
///
/// Removes features thinner than the ball while preserving the rest.
///
/// # Errors
///
/// Returns an error if the radius or spacing is invalid.
pub fn spherical_open(
    src: &Volume<bool>,
    radius: f32,
    spacing: VoxelSpacing,
) -> Result<Volume<bool>, MorphologyError> {
    let eroded = spherical_erode(src, radius, spacing)?;
    spherical_dilate(&eroded, radius, spacing)
}

/// Morphological closing: dilation followed by erosion with the same ball.
///
/// Fills gaps narrower than the ball while preserving the rest.
///
/// # Errors
///
/// Returns an error if the radius or spacing is invalid.
pub fn spherical_close(
    src: &Volume<bool>,
    radius: f32,
    spacing: VoxelSpacing,
) -> Result<Volume<bool>, MorphologyError> {
    let dilated = spherical_dilate(src, radius, spacing)?;
    spherical_erode(&dilated, radius, spacing)
}
