use rayon::prelude::*;

/// Apply a function to each z-slab of a volume buffer in parallel.
///
/// The buffer is split into disjoint chunks of `slab_len` elements (one per
/// z index), so no two tasks ever write the same voxel.
///
/// # Arguments
///
/// * `data` - The volume buffer in x-fastest order.
/// * `slab_len` - The number of elements in one z-slab (`size.x * size.y`).
/// * `f` - The function applied to each `(z, slab)` pair.
pub fn par_iter_slabs<T, F>(data: &mut [T], slab_len: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    data.par_chunks_exact_mut(slab_len)
        .enumerate()
        .for_each(|(z, slab)| f(z, slab));
}
