// strata_core/src/pipeline/filter.rs

use rayon::prelude::*;

use super::RAY_BATCH_SIZE;
use crate::error::{try_buffer, ResourceError};
use crate::types::HitRecord;

/// Compacts the hit buffer into the ascending list of ray indices whose hit
/// distance is positive.
///
/// Stream compaction in three passes: every chunk counts its hits in
/// parallel, an exclusive prefix sum over the counts gives each chunk its
/// write offset, then every chunk writes its indices into its own disjoint
/// window of the output. No locks, no shared cursor, and the result is the
/// same on every run.
pub fn filter_hits(hits: &[HitRecord]) -> Result<Vec<usize>, ResourceError> {
    let counts: Vec<usize> = hits
        .par_chunks(RAY_BATCH_SIZE)
        .map(|chunk| chunk.iter().filter(|hit| hit.is_hit()).count())
        .collect();
    let total: usize = counts.iter().sum();

    let mut indices = try_buffer("hit index", total)?;
    indices.resize(total, 0);

    // Exclusive prefix sum, materialized as one output window per chunk.
    let mut windows: Vec<&mut [usize]> = Vec::with_capacity(counts.len());
    let mut rest = indices.as_mut_slice();
    for &count in &counts {
        let (window, tail) = std::mem::take(&mut rest).split_at_mut(count);
        windows.push(window);
        rest = tail;
    }

    hits.par_chunks(RAY_BATCH_SIZE)
        .zip(windows.into_par_iter())
        .enumerate()
        .for_each(|(chunk_index, (chunk, window))| {
            let base = chunk_index * RAY_BATCH_SIZE;
            let valid = chunk
                .iter()
                .enumerate()
                .filter(|(_, hit)| hit.is_hit())
                .map(|(offset, _)| base + offset);
            for (slot, index) in window.iter_mut().zip(valid) {
                *slot = index;
            }
        });

    Ok(indices)
}
