//! Raw value collection for distribution plots.

use super::CombineFn;
use std::marker::PhantomData;

/// Every observed value, duplicates included, for later binning.
///
/// - Accumulator: `Vec<T>`
/// - Output: `Vec<T>` (unmodified)
///
/// This is the one aggregate whose size grows with the number of rows rather
/// than with the number of distinct values.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScalarDistribution<T>(PhantomData<T>);

impl<T> ScalarDistribution<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> CombineFn<T, Vec<T>, Vec<T>> for ScalarDistribution<T> {
    fn create(&self) -> Vec<T> {
        Vec::new()
    }

    fn add_input(&self, acc: &mut Vec<T>, v: T) {
        acc.push(v);
    }

    fn merge(&self, acc: &mut Vec<T>, mut other: Vec<T>) {
        acc.append(&mut other);
    }

    fn finish(&self, acc: Vec<T>) -> Vec<T> {
        acc
    }
}
