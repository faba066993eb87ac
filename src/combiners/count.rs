//! Per-category counting.

use super::CombineFn;
use super::topk::top_k;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;

/// Count of occurrences per category value.
///
/// - Accumulator: `HashMap<K, u64>`
/// - Output: [`Tally<K>`]
///
/// Missing values never reach the combiner: callers feed only present ones,
/// so "missing" is not a category.
#[derive(Clone, Copy, Debug, Default)]
pub struct CategoryCount<K>(PhantomData<K>);

impl<K> CategoryCount<K> {
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<K: Eq + Hash> CombineFn<K, HashMap<K, u64>, Tally<K>> for CategoryCount<K> {
    fn create(&self) -> HashMap<K, u64> {
        HashMap::new()
    }

    fn add_input(&self, acc: &mut HashMap<K, u64>, v: K) {
        *acc.entry(v).or_insert(0) += 1;
    }

    fn merge(&self, acc: &mut HashMap<K, u64>, other: HashMap<K, u64>) {
        if acc.is_empty() {
            *acc = other;
            return;
        }
        for (k, n) in other {
            *acc.entry(k).or_insert(0) += n;
        }
    }

    fn finish(&self, acc: HashMap<K, u64>) -> Tally<K> {
        Tally { counts: acc }
    }
}

/// Finished counts. Iteration order is unspecified until one of the
/// finalizing methods imposes one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally<K: Eq + Hash> {
    counts: HashMap<K, u64>,
}

impl<K: Eq + Hash> Tally<K> {
    pub fn get(&self, key: &K) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Number of distinct categories.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts, i.e. the number of values observed.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &u64)> {
        self.counts.iter()
    }
}

impl<K: Eq + Hash + Ord> Tally<K> {
    /// All categories in ascending key order (time series view).
    pub fn sorted_by_key(self) -> Vec<(K, u64)> {
        let mut out: Vec<(K, u64)> = self.counts.into_iter().collect();
        out.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// The `n` largest categories by descending count; equal counts are
    /// ordered by ascending key so the result is deterministic.
    pub fn top(self, n: usize) -> Vec<(K, u64)> {
        top_k(self.counts, n)
    }
}

impl<K: Eq + Hash> FromIterator<(K, u64)> for Tally<K> {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        let mut counts = HashMap::new();
        for (k, n) in iter {
            *counts.entry(k).or_insert(0) += n;
        }
        Self { counts }
    }
}
