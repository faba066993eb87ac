//! Top-K selection with a deterministic tie-break.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// The `k` entries with the largest counts, sorted by descending count and
/// then ascending key.
///
/// A min-heap of size ≤ `k` keeps memory bounded by `k` regardless of how
/// many categories are scanned. The heap orders by `(count, Reverse(key))`
/// so that, among equal counts, the lexically smallest keys survive.
///
/// `k == 0` always produces an empty vector.
pub fn top_k<K, I>(entries: I, k: usize) -> Vec<(K, u64)>
where
    K: Ord,
    I: IntoIterator<Item = (K, u64)>,
{
    if k == 0 {
        return Vec::new();
    }
    let mut heap: BinaryHeap<Reverse<(u64, Reverse<K>)>> = BinaryHeap::new();
    for (key, count) in entries {
        heap.push(Reverse((count, Reverse(key))));
        if heap.len() > k {
            heap.pop(); // drop the current smallest
        }
    }
    // Popping a min-heap yields ascending order; reverse for largest first.
    let mut out = Vec::with_capacity(heap.len());
    while let Some(Reverse((count, Reverse(key)))) = heap.pop() {
        out.push((key, count));
    }
    out.reverse();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_largest_counts_in_descending_order() {
        let top = top_k(vec![("a", 1), ("b", 5), ("c", 3), ("d", 4)], 2);
        assert_eq!(top, vec![("b", 5), ("d", 4)]);
    }

    #[test]
    fn breaks_ties_by_ascending_key() {
        let top = top_k(vec![("pear", 2), ("apple", 2), ("fig", 2), ("kiwi", 9)], 3);
        assert_eq!(top, vec![("kiwi", 9), ("apple", 2), ("fig", 2)]);
    }

    #[test]
    fn zero_or_oversized_k() {
        assert!(top_k(vec![("a", 1)], 0).is_empty());
        assert_eq!(top_k(vec![("a", 1), ("b", 1)], 10), vec![("a", 1), ("b", 1)]);
    }
}
