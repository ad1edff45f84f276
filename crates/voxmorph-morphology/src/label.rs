use rayon::prelude::*;

use voxmorph_volume::{LabelValue, Volume};

use crate::error::MorphologyError;

/// Most frequent value of a sorted slice; ties go to the lowest value.
fn mode_lowest<L: LabelValue>(sorted: &[L]) -> L {
    let mut best = sorted[0];
    let mut best_count = 0usize;
    let mut run = sorted[0];
    let mut count = 0usize;

    for &label in sorted {
        if label == run {
            count += 1;
        } else {
            if count > best_count {
                best = run;
                best_count = count;
            }
            run = label;
            count = 1;
        }
    }
    if count > best_count {
        best = run;
    }

    best
}

/// Dilate a labeled volume by one step with a full 3x3x3 stencil.
///
/// Every voxel takes the most frequent non-zero label in its 26-neighborhood
/// (the voxel itself included); ties go to the lowest label value. A voxel
/// with no non-zero label anywhere in its neighborhood stays background.
/// With `background_only`, labeled voxels are copied through unchanged and
/// only background voxels grow a label.
///
/// # Arguments
///
/// * `src` - The labeled input volume; read-only.
/// * `background_only` - Whether existing labels are left untouched.
///
/// # Errors
///
/// Currently infallible; the `Result` matches the other operations.
///
/// # Examples
///
/// ```
/// use voxmorph_volume::{Volume, VolumeSize};
/// use voxmorph_morphology::label::dilate_labels;
///
/// let mut src = Volume::from_size_val(VolumeSize { x: 5, y: 5, z: 5 }, 0u8).unwrap();
/// src.set(2, 2, 2, 3).unwrap();
///
/// let out = dilate_labels(&src, true).unwrap();
/// assert_eq!(out.as_slice().iter().filter(|&&v| v == 3).count(), 27);
/// ```
pub fn dilate_labels<L: LabelValue>(
    src: &Volume<L>,
    background_only: bool,
) -> Result<Volume<L>, MorphologyError> {
    let size = src.size();
    let (sx, sy, sz) = (size.x, size.y, size.z);
    let sxy = sx * sy;
    let data = src.as_slice();

    let mut out = vec![L::zero(); data.len()];

    out.par_chunks_exact_mut(sxy).enumerate().for_each_init(
        || Vec::with_capacity(27),
        |neighbors: &mut Vec<L>, (z, slab)| {
            for y in 0..sy {
                for x in 0..sx {
                    let center = data[x + sx * (y + sy * z)];
                    if background_only && center != L::zero() {
                        slab[x + sx * y] = center;
                        continue;
                    }

                    neighbors.clear();
                    for dz in z.saturating_sub(1)..(z + 2).min(sz) {
                        for dy in y.saturating_sub(1)..(y + 2).min(sy) {
                            for dx in x.saturating_sub(1)..(x + 2).min(sx) {
                                let val = data[dx + sx * (dy + sy * dz)];
                                if val != L::zero() {
                                    neighbors.push(val);
                                }
                            }
                        }
                    }

                    if !neighbors.is_empty() {
                        neighbors.sort_unstable();
                        slab[x + sx * y] = mode_lowest(neighbors);
                    }
                }
            }
        },
    );

    Ok(Volume::new(size, out)?)
}

/// Erode a labeled volume by one step with a full 3x3x3 stencil.
///
/// A voxel keeps its label only when its entire 3x3x3 neighborhood lies
/// inside the volume and carries the same label; everything else becomes
/// background. Voxels on the volume border always erode.
///
/// # Errors
///
/// Currently infallible; the `Result` matches the other operations.
pub fn erode_labels<L: LabelValue>(src: &Volume<L>) -> Result<Volume<L>, MorphologyError> {
    let size = src.size();
    let (sx, sy, sz) = (size.x, size.y, size.z);
    let sxy = sx * sy;
    let data = src.as_slice();

    let mut out = vec![L::zero(); data.len()];

    out.par_chunks_exact_mut(sxy)
        .enumerate()
        .for_each(|(z, slab)| {
            if z == 0 || z + 1 == sz {
                return;
            }
            for y in 1..sy.saturating_sub(1) {
                'voxel: for x in 1..sx.saturating_sub(1) {
                    let center = data[x + sx * (y + sy * z)];
                    if center == L::zero() {
                        continue;
                    }

                    for dz in (z - 1)..=(z + 1) {
                        for dy in (y - 1)..=(y + 1) {
                            for dx in (x - 1)..=(x + 1) {
                                if data[dx + sx * (dy + sy * dz)] != center {
                                    continue 'voxel;
                                }
                            }
                        }
                    }
                    slab[x + sx * y] = center;
                }
            }
        });

    Ok(Volume::new(size, out)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxmorph_volume::VolumeSize;

    #[test]
    fn dilate_single_label_fills_neighborhood() -> Result<(), MorphologyError> {
        let mut src = Volume::from_size_val(VolumeSize { x: 5, y: 5, z: 5 }, 0u8)?;
        src.set(2, 2, 2, 3)?;

        let out = dilate_labels(&src, true)?;
        assert_eq!(out.as_slice().iter().filter(|&&v| v == 3).count(), 27);
        assert_eq!(out.get(2, 2, 2), Some(&3));
        assert_eq!(out.get(1, 1, 1), Some(&3));
        assert_eq!(out.get(2, 2, 4), Some(&0));
        Ok(())
    }

    #[test]
    fn dilate_tie_takes_lowest_label() -> Result<(), MorphologyError> {
        let src = Volume::new(VolumeSize { x: 3, y: 1, z: 1 }, vec![1u8, 0, 2])?;
        let out = dilate_labels(&src, true)?;
        assert_eq!(out.get(1, 0, 0), Some(&1));
        Ok(())
    }

    #[test]
    fn dilate_majority_wins() -> Result<(), MorphologyError> {
        let mut src = Volume::from_size_val(VolumeSize { x: 3, y: 3, z: 1 }, 0u8)?;
        src.set(0, 0, 0, 9)?;
        src.set(2, 0, 0, 4)?;
        src.set(2, 2, 0, 4)?;

        let out = dilate_labels(&src, true)?;
        assert_eq!(out.get(1, 1, 0), Some(&4));
        Ok(())
    }

    #[test]
    fn dilate_can_overwrite_foreground() -> Result<(), MorphologyError> {
        let src = Volume::new(VolumeSize { x: 3, y: 1, z: 1 }, vec![1u8, 1, 9])?;

        let preserved = dilate_labels(&src, true)?;
        assert_eq!(preserved.get(2, 0, 0), Some(&9));

        let rewritten = dilate_labels(&src, false)?;
        assert_eq!(rewritten.get(2, 0, 0), Some(&1));
        Ok(())
    }

    #[test]
    fn erode_keeps_pure_interior() -> Result<(), MorphologyError> {
        let mut src = Volume::from_size_val(VolumeSize { x: 5, y: 5, z: 5 }, 0u8)?;
        for z in 1..4 {
            for y in 1..4 {
                for x in 1..4 {
                    src.set(x, y, z, 4)?;
                }
            }
        }

        let out = erode_labels(&src)?;
        assert_eq!(out.as_slice().iter().filter(|&&v| v != 0).count(), 1);
        assert_eq!(out.get(2, 2, 2), Some(&4));
        Ok(())
    }

    #[test]
    fn erode_removes_border_voxels() -> Result<(), MorphologyError> {
        // in a uniform 3x3x3 volume only the center has a full neighborhood
        let src = Volume::from_size_val(VolumeSize { x: 3, y: 3, z: 3 }, 2u8)?;
        let out = erode_labels(&src)?;
        assert_eq!(out.as_slice().iter().filter(|&&v| v != 0).count(), 1);
        assert_eq!(out.get(1, 1, 1), Some(&2));
        Ok(())
    }

    #[test]
    fn erode_mixed_neighborhood() -> Result<(), MorphologyError> {
        let mut src = Volume::from_size_val(VolumeSize { x: 5, y: 5, z: 5 }, 4u8)?;
        src.set(1, 1, 1, 9)?;

        let out = erode_labels(&src)?;
        // the impurity breaks every 3x3x3 neighborhood containing it
        assert_eq!(out.get(2, 2, 2), Some(&0));
        assert_eq!(out.get(3, 3, 3), Some(&4));
        Ok(())
    }
}
