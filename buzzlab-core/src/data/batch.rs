//! Batch splitting: a bucket's entities cut into API-sized chunks.
//!
//! Pure and lazy. The returned iterator is `Clone`, so a batch sequence can
//! be restarted without recomputing anything.

use std::slice::Chunks;

/// Maximum keyword groups per trend API call.
pub const MAX_GROUP_SIZE: usize = 5;

/// Clamp a requested group size into `1..=MAX_GROUP_SIZE`.
pub fn effective_group_size(group_size: usize) -> usize {
    group_size.clamp(1, MAX_GROUP_SIZE)
}

/// Split `items` into order-preserving chunks of at most `group_size`.
pub fn split_batches<T>(items: &[T], group_size: usize) -> Chunks<'_, T> {
    items.chunks(effective_group_size(group_size))
}

/// Number of chunks `split_batches` yields for `len` items.
pub fn batch_count(len: usize, group_size: usize) -> usize {
    len.div_ceil(effective_group_size(group_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_chunk_may_be_smaller() {
        let items: Vec<u32> = (0..12).collect();
        let sizes: Vec<usize> = split_batches(&items, MAX_GROUP_SIZE).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![5, 5, 2]);
        assert_eq!(batch_count(items.len(), MAX_GROUP_SIZE), 3);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let items: Vec<u32> = Vec::new();
        assert_eq!(split_batches(&items, 5).count(), 0);
        assert_eq!(batch_count(0, 5), 0);
    }

    #[test]
    fn oversized_group_is_clamped() {
        let items: Vec<u32> = (0..11).collect();
        assert!(split_batches(&items, 50).all(|c| c.len() <= MAX_GROUP_SIZE));
        assert_eq!(split_batches(&items, 0).count(), 11);
    }

    #[test]
    fn sequence_is_restartable() {
        let items: Vec<u32> = (0..7).collect();
        let batches = split_batches(&items, 3);
        let first: Vec<&[u32]> = batches.clone().collect();
        let second: Vec<&[u32]> = batches.collect();
        assert_eq!(first, second);
    }
}
