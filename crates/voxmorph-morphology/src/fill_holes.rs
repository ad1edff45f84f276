use std::collections::BTreeMap;

use voxmorph_volume::{LabelValue, Volume};

use crate::connectivity::{label_components, Components};
use crate::error::MorphologyError;

/// Ordered mapping from label value to the number of voxels filled into it.
///
/// Labels that received no fills are omitted.
pub type FillCount<L> = BTreeMap<L, u64>;

/// Fill label per component: the adjacent non-zero label with the most
/// contact faces, ties broken by the lowest label value. Border-touching
/// components and components with no labeled neighbor yield `None`.
fn fill_decisions<L: LabelValue>(comps: &Components<L>) -> Vec<Option<L>> {
    comps
        .components
        .iter()
        .map(|c| {
            if c.touches_border {
                return None;
            }
            let mut best: Option<(L, u64)> = None;
            for (&label, &faces) in &c.contacts {
                best = match best {
                    Some((bl, bf)) if faces < bf || (faces == bf && label > bl) => Some((bl, bf)),
                    _ => Some((label, faces)),
                };
            }
            best.map(|(label, _)| label)
        })
        .collect()
}

fn fill_in_place<L: LabelValue>(grid: &mut Volume<L>) -> (Components<L>, Vec<Option<L>>) {
    let comps = label_components(grid, |v| v == L::zero());
    let fills = fill_decisions(&comps);

    let filled = fills.iter().filter(|f| f.is_some()).count();
    log::debug!(
        "filling {filled} of {} background components",
        comps.components.len()
    );

    for (voxel, &id) in grid.as_slice_mut().iter_mut().zip(comps.map.iter()) {
        if id != 0 {
            if let Some(label) = fills[(id - 1) as usize] {
                *voxel = label;
            }
        }
    }

    (comps, fills)
}

/// Fill enclosed holes of a labeled volume in place.
///
/// Voxels with value 0 are unlabeled. Every 6-connected component of
/// unlabeled voxels that does not touch the volume border is an enclosed
/// hole and is rewritten to the label of its surroundings: the adjacent
/// non-zero label with the highest contact-face count, ties broken by the
/// lowest label value. Components touching the border are exterior
/// background and are never filled; a component with no labeled neighbor is
/// left as is.
///
/// # Errors
///
/// Currently infallible; the `Result` matches the other operations.
///
/// # Examples
///
/// ```
/// use voxmorph_volume::{Volume, VolumeSize};
/// use voxmorph_morphology::fill_holes::fill_holes;
///
/// let mut grid = Volume::from_size_val(VolumeSize { x: 3, y: 3, z: 3 }, 4u8).unwrap();
/// grid.set(1, 1, 1, 0).unwrap();
///
/// fill_holes(&mut grid).unwrap();
/// assert_eq!(grid.get(1, 1, 1), Some(&4));
/// ```
pub fn fill_holes<L: LabelValue>(grid: &mut Volume<L>) -> Result<(), MorphologyError> {
    let _ = fill_in_place(grid);
    Ok(())
}

/// Fill enclosed holes in place and report how many voxels each label
/// received.
///
/// Same behavior as [`fill_holes`], additionally accumulating a
/// [`FillCount`]. Use [`fill_holes`] when the counts are not needed.
///
/// # Errors
///
/// Currently infallible; the `Result` matches the other operations.
pub fn fill_holes_with_count<L: LabelValue>(
    grid: &mut Volume<L>,
) -> Result<FillCount<L>, MorphologyError> {
    let (comps, fills) = fill_in_place(grid);

    let mut count = FillCount::new();
    for (component, fill) in comps.components.iter().zip(fills.iter()) {
        if let Some(label) = fill {
            *count.entry(*label).or_insert(0) += component.voxels;
        }
    }

    Ok(count)
}
