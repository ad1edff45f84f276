use rayon::prelude::*;

use voxmorph_volume::{Volume, VolumeSize, VoxelSpacing};

use crate::error::MorphologyError;
use crate::parallel;

/// How the exterior of the volume participates in the distance transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderMode {
    /// Nothing exists outside the volume. Voxels with no source voxel in the
    /// volume get the sentinel distance.
    #[default]
    Void,

    /// The volume is surrounded by a one-voxel shell of source voxels.
    /// Erosion uses this mode so that regions touching the volume border
    /// erode from the outside in.
    Source,
}

/// Squared diagonal of the volume in physical units.
pub(crate) fn diagonal_sq(size: VolumeSize, spacing: VoxelSpacing) -> f64 {
    let dx = size.x as f64 * f64::from(spacing.x);
    let dy = size.y as f64 * f64::from(spacing.y);
    let dz = size.z as f64 * f64::from(spacing.z);
    dx * dx + dy * dy + dz * dz
}

/// Squared sentinel for "no source voxel exists".
///
/// A large finite value rather than an actual infinity, so that the parabola
/// intersection arithmetic inside the 1D passes stays well-defined. The
/// factor keeps the sentinel distance clear of the diagonal even after f32
/// rounding on large volumes.
fn sentinel_sq(size: VolumeSize, spacing: VoxelSpacing) -> f64 {
    4.0 * (diagonal_sq(size, spacing) + 1.0)
}

/// Per-task scratch for the 1D lower-envelope transform, reused across lines.
struct LineBuffers {
    /// site values (partial squared distances)
    f: Vec<f64>,
    /// site abscissae in physical units
    x: Vec<f64>,
    /// envelope: site index per parabola
    v: Vec<usize>,
    /// envelope: cell boundaries
    z: Vec<f64>,
}

impl LineBuffers {
    fn with_capacity(n: usize) -> Self {
        Self {
            f: Vec::with_capacity(n + 2),
            x: Vec::with_capacity(n + 2),
            v: vec![0; n + 2],
            z: vec![0.0; n + 3],
        }
    }
}

/// One 1D pass of the separable squared Euclidean distance transform
/// (Felzenszwalb & Huttenlocher lower envelope of parabolas), in place.
///
/// `step` is the physical voxel spacing along this axis; anisotropy is
/// applied by scaling the parabola abscissae here, never by rescaling
/// distances after the fact. With `border_source` two zero-valued virtual
/// parabolas are added at `-step` and `n * step`, which is exactly
/// equivalent to padding the axis with source voxels.
fn transform_line(values: &mut [f32], step: f64, border_source: bool, buf: &mut LineBuffers) {
    buf.f.clear();
    buf.x.clear();

    if border_source {
        buf.f.push(0.0);
        buf.x.push(-step);
    }
    for (i, &val) in values.iter().enumerate() {
        buf.f.push(f64::from(val));
        buf.x.push(i as f64 * step);
    }
    if border_source {
        buf.f.push(0.0);
        buf.x.push(values.len() as f64 * step);
    }

    let m = buf.f.len();
    if m == 1 {
        return;
    }

    let intersect = |q: usize, p: usize| -> f64 {
        ((buf.f[q] + buf.x[q] * buf.x[q]) - (buf.f[p] + buf.x[p] * buf.x[p]))
            / (2.0 * (buf.x[q] - buf.x[p]))
    };

    // build the lower envelope
    let mut k = 0usize;
    buf.v[0] = 0;
    buf.z[0] = f64::NEG_INFINITY;
    buf.z[1] = f64::INFINITY;
    for q in 1..m {
        let mut s = intersect(q, buf.v[k]);
        while s <= buf.z[k] {
            k -= 1;
            s = intersect(q, buf.v[k]);
        }
        k += 1;
        buf.v[k] = q;
        buf.z[k] = s;
        buf.z[k + 1] = f64::INFINITY;
    }

    // evaluate the envelope at the real voxel positions
    let mut k = 0usize;
    for (i, out) in values.iter_mut().enumerate() {
        let xi = i as f64 * step;
        while buf.z[k + 1] < xi {
            k += 1;
        }
        let dx = xi - buf.x[buf.v[k]];
        *out = (dx * dx + buf.f[buf.v[k]]) as f32;
    }
}

/// Exact squared Euclidean distances from every voxel to the nearest voxel
/// equal to `source_value`, as a flat buffer in x-fastest order.
///
/// Three strictly ordered axis passes; within each pass the 1D lines are
/// independent and processed in parallel.
pub(crate) fn squared_distance_field(
    src: &Volume<bool>,
    spacing: VoxelSpacing,
    border: BorderMode,
    source_value: bool,
) -> Vec<f32> {
    let size = src.size();
    let (sx, sy, sz) = (size.x, size.y, size.z);
    let sxy = sx * sy;
    let sentinel = sentinel_sq(size, spacing) as f32;
    let border_source = border == BorderMode::Source;

    let mut field: Vec<f32> = src
        .as_slice()
        .iter()
        .map(|&v| if v == source_value { 0.0 } else { sentinel })
        .collect();

    // x pass: lines are contiguous in memory
    field.par_chunks_exact_mut(sx).for_each_init(
        || LineBuffers::with_capacity(sx),
        |buf, line| transform_line(line, f64::from(spacing.x), border_source, buf),
    );

    // y pass: strided lines, each contained in one contiguous z-slab
    if sy > 1 || border_source {
        field.par_chunks_exact_mut(sxy).for_each_init(
            || (LineBuffers::with_capacity(sy), vec![0f32; sy]),
            |state, slab| {
                let (buf, line) = state;
                for x in 0..sx {
                    for (y, v) in line.iter_mut().enumerate() {
                        *v = slab[x + sx * y];
                    }
                    transform_line(line, f64::from(spacing.y), border_source, buf);
                    for (y, v) in line.iter().enumerate() {
                        slab[x + sx * y] = *v;
                    }
                }
            },
        );
    }

    // z pass: lines cross slab boundaries, so gather them into a line-major
    // scratch buffer, transform in place, then scatter back slab by slab
    if sz > 1 || border_source {
        let mut scratch = vec![0f32; field.len()];
        {
            let field_ref: &[f32] = &field;
            scratch.par_chunks_exact_mut(sz).enumerate().for_each_init(
                || LineBuffers::with_capacity(sz),
                |buf, (li, line)| {
                    for (k, v) in line.iter_mut().enumerate() {
                        *v = field_ref[li + k * sxy];
                    }
                    transform_line(line, f64::from(spacing.z), border_source, buf);
                },
            );
        }
        parallel::par_iter_slabs(&mut field, sxy, |z, slab| {
            for (li, v) in slab.iter_mut().enumerate() {
                *v = scratch[li * sz + z];
            }
        });
    }

    field
}

/// Compute the exact Euclidean distance transform of a binary volume.
///
/// For every voxel, the result holds the exact straight-line distance to the
/// nearest `true` voxel, computed with three separable lower-envelope passes
/// in time linear in the voxel count, independent of any radius. When no
/// `true` voxel exists the result holds a large finite sentinel greater than
/// the volume diagonal.
///
/// # Arguments
///
/// * `src` - The binary input volume.
/// * `spacing` - The physical voxel size per axis.
/// * `border` - Whether the exterior of the volume counts as source.
///
/// # Errors
///
/// Returns an error if the spacing is not positive and finite.
///
/// # Examples
///
/// ```
/// use voxmorph_volume::{Volume, VolumeSize, VoxelSpacing};
/// use voxmorph_morphology::distance_transform::{distance_transform_edt, BorderMode};
///
/// let mut src = Volume::from_size_val(VolumeSize { x: 3, y: 1, z: 1 }, false).unwrap();
/// src.set(0, 0, 0, true).unwrap();
///
/// let dist = distance_transform_edt(&src, VoxelSpacing::default(), BorderMode::Void).unwrap();
/// assert_eq!(dist.as_slice(), &[0.0, 1.0, 2.0]);
/// ```
pub fn distance_transform_edt(
    src: &Volume<bool>,
    spacing: VoxelSpacing,
    border: BorderMode,
) -> Result<Volume<f32>, MorphologyError> {
    if !spacing.is_valid() {
        return Err(MorphologyError::InvalidSpacing(
            spacing.x, spacing.y, spacing.z,
        ));
    }

    let mut field = squared_distance_field(src, spacing, border, true);
    field
        .par_iter_mut()
        .for_each(|d| *d = f64::from(*d).sqrt() as f32);

    Ok(Volume::new(src.size(), field)?)
}

// NOTE: only for testing, extremely slow
/// Brute-force Euclidean distance transform used as a reference in tests.
pub fn distance_transform_vanilla(src: &Volume<bool>, spacing: VoxelSpacing) -> Volume<f32> {
    let size = src.size();
    let sentinel = sentinel_sq(size, spacing);
    let mut out = Vec::with_capacity(size.numel());

    for z in 0..size.z {
        for y in 0..size.y {
            for x in 0..size.x {
                let mut min_sq = sentinel;
                for (i, &v) in src.as_slice().iter().enumerate() {
                    if !v {
                        continue;
                    }
                    let (sx, sxy) = (size.x, size.x * size.y);
                    let (ix, iy, iz) = (i % sx, (i / sx) % size.y, i / sxy);
                    let dx = (ix as f64 - x as f64) * f64::from(spacing.x);
                    let dy = (iy as f64 - y as f64) * f64::from(spacing.y);
                    let dz = (iz as f64 - z as f64) * f64::from(spacing.z);
                    let d = dx * dx + dy * dy + dz * dz;
                    if d < min_sq {
                        min_sq = d;
                    }
                }
                out.push(min_sq.sqrt() as f32);
            }
        }
    }

    Volume::new(size, out).expect("shape preserved")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> VoxelSpacing {
        VoxelSpacing::default()
    }

    #[test]
    fn full_source_is_zero() -> Result<(), MorphologyError> {
        let src = Volume::from_size_val(VolumeSize { x: 4, y: 3, z: 2 }, true)?;
        let dist = distance_transform_edt(&src, unit(), BorderMode::Void)?;
        assert!(dist.as_slice().iter().all(|&d| d == 0.0));
        Ok(())
    }

    #[test]
    fn empty_source_is_sentinel() -> Result<(), MorphologyError> {
        let size = VolumeSize { x: 5, y: 5, z: 5 };
        let src = Volume::from_size_val(size, false)?;
        let dist = distance_transform_edt(&src, unit(), BorderMode::Void)?;
        let diag = diagonal_sq(size, unit()).sqrt() as f32;
        assert!(dist.as_slice().iter().all(|&d| d > diag));
        Ok(())
    }

    #[test]
    fn single_point_exact_distances() -> Result<(), MorphologyError> {
        let size = VolumeSize { x: 7, y: 7, z: 7 };
        let mut src = Volume::from_size_val(size, false)?;
        src.set(3, 3, 3, true)?;

        let dist = distance_transform_edt(&src, unit(), BorderMode::Void)?;
        assert_eq!(dist.get(3, 3, 3), Some(&0.0));
        assert_eq!(dist.get(4, 3, 3), Some(&1.0));
        assert_eq!(dist.get(4, 4, 3), Some(&(2.0f64.sqrt() as f32)));
        assert_eq!(dist.get(4, 4, 4), Some(&(3.0f64.sqrt() as f32)));
        assert_eq!(dist.get(0, 3, 3), Some(&3.0));
        assert_eq!(dist.get(0, 0, 0), Some(&(27.0f64.sqrt() as f32)));
        Ok(())
    }

    #[test]
    fn matches_vanilla_on_pattern() -> Result<(), MorphologyError> {
        let size = VolumeSize { x: 6, y: 5, z: 4 };
        let mut src = Volume::from_size_val(size, false)?;
        // deterministic scattered sources
        for (i, v) in src.as_slice_mut().iter_mut().enumerate() {
            *v = i % 17 == 3;
        }

        let fast = distance_transform_edt(&src, unit(), BorderMode::Void)?;
        let slow = distance_transform_vanilla(&src, unit());
        assert_eq!(fast, slow);
        Ok(())
    }

    #[test]
    fn matches_vanilla_on_random_volumes() -> Result<(), MorphologyError> {
        use rand::{rngs::StdRng, Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..5 {
            let size = VolumeSize {
                x: rng.random_range(1..8),
                y: rng.random_range(1..8),
                z: rng.random_range(1..8),
            };
            let mut src = Volume::from_size_val(size, false)?;
            for v in src.as_slice_mut().iter_mut() {
                *v = rng.random_bool(0.2);
            }
            // keep at least one source so no voxel holds the sentinel
            src.set(0, 0, 0, true)?;

            let fast = distance_transform_edt(&src, unit(), BorderMode::Void)?;
            let slow = distance_transform_vanilla(&src, unit());
            assert_eq!(fast, slow, "size {size}");
        }
        Ok(())
    }

    #[test]
    fn matches_vanilla_anisotropic() -> Result<(), MorphologyError> {
        let size = VolumeSize { x: 5, y: 4, z: 3 };
        let spacing = VoxelSpacing {
            x: 2.0,
            y: 1.0,
            z: 0.5,
        };
        let mut src = Volume::from_size_val(size, false)?;
        for (i, v) in src.as_slice_mut().iter_mut().enumerate() {
            *v = i % 11 == 0;
        }

        let fast = distance_transform_edt(&src, spacing, BorderMode::Void)?;
        let slow = distance_transform_vanilla(&src, spacing);
        assert_eq!(fast, slow);
        Ok(())
    }

    #[test]
    fn anisotropic_scales_axes() -> Result<(), MorphologyError> {
        let size = VolumeSize { x: 3, y: 3, z: 3 };
        let spacing = VoxelSpacing {
            x: 2.0,
            y: 1.0,
            z: 3.0,
        };
        let mut src = Volume::from_size_val(size, false)?;
        src.set(0, 0, 0, true)?;

        let dist = distance_transform_edt(&src, spacing, BorderMode::Void)?;
        assert_eq!(dist.get(1, 0, 0), Some(&2.0));
        assert_eq!(dist.get(0, 1, 0), Some(&1.0));
        assert_eq!(dist.get(0, 0, 1), Some(&3.0));
        Ok(())
    }

    #[test]
    fn border_source_measures_to_exterior() -> Result<(), MorphologyError> {
        // no source voxel inside: every voxel measures to the virtual
        // shell outside the volume
        let size = VolumeSize { x: 3, y: 3, z: 3 };
        let src = Volume::from_size_val(size, false)?;
        let dist = distance_transform_edt(&src, unit(), BorderMode::Source)?;
        assert_eq!(dist.get(0, 0, 0), Some(&1.0));
        assert_eq!(dist.get(1, 1, 1), Some(&2.0));
        Ok(())
    }

    #[test]
    fn degenerate_shapes() -> Result<(), MorphologyError> {
        let one = Volume::new(VolumeSize { x: 1, y: 1, z: 1 }, vec![true])?;
        let dist = distance_transform_edt(&one, unit(), BorderMode::Void)?;
        assert_eq!(dist.as_slice(), &[0.0]);

        let mut flat = Volume::from_size_val(VolumeSize { x: 1, y: 4, z: 4 }, false)?;
        flat.set(0, 0, 0, true)?;
        let dist = distance_transform_edt(&flat, unit(), BorderMode::Void)?;
        assert_eq!(dist.get(0, 3, 0), Some(&3.0));
        assert_eq!(dist.get(0, 3, 3), Some(&(18.0f64.sqrt() as f32)));
        Ok(())
    }

    #[test]
    fn rejects_invalid_spacing() {
        let src = Volume::from_size_val(VolumeSize { x: 2, y: 2, z: 2 }, true).unwrap();
        let bad = VoxelSpacing {
            x: 0.0,
            y: 1.0,
            z: 1.0,
        };
        let res = distance_transform_edt(&src, bad, BorderMode::Void);
        assert_eq!(res.unwrap_err(), MorphologyError::InvalidSpacing(0.0, 1.0, 1.0));
    }
}
