//! Mergeable aggregations folded over the batch stream.
//!
//! Every aggregate is a [`CombineFn`]: an empty accumulator is `create`d,
//! values are added with `add_input`, partial accumulators built from
//! different windows are combined with `merge`, and `finish` turns the final
//! accumulator into a presentation-ready value.
//!
//! `merge` is associative and commutative for every combiner here, so folding
//! a file as one window or as any partition into windows yields the same
//! finished result:
//!
//! - [`CategoryCount<K>`] -- per-value counts (additive merge).
//! - [`TokenFrequency`] -- case-folded alphabetic token counts (additive merge).
//! - [`ScalarDistribution<T>`] -- every observed value, multiplicity kept (union).
//!
//! Counting combiners finish into a [`Tally`], which is ordered only when it
//! is finalized ([`Tally::sorted_by_key`], [`Tally::top`]).
//!
//! # Example
//! ```
//! use scholarstream::combiners::{CategoryCount, CombineFn};
//!
//! let counter = CategoryCount::<i32>::new();
//! let mut left = counter.build_from_batch([2020, 2021, 2020]);
//! let right = counter.build_from_batch([2021, 2019]);
//! counter.merge(&mut left, right);
//! let years = counter.finish(left).sorted_by_key();
//! assert_eq!(years, vec![(2019, 1), (2020, 2), (2021, 2)]);
//! ```

mod count;
mod distribution;
mod tokens;
mod topk;

pub use count::{CategoryCount, Tally};
pub use distribution::ScalarDistribution;
pub use tokens::TokenFrequency;
pub use topk::top_k;

/// A mergeable aggregation from values `V` through accumulator `A` to output `O`.
pub trait CombineFn<V, A, O> {
    /// Fresh, empty accumulator.
    fn create(&self) -> A;

    /// Fold one value into `acc`.
    fn add_input(&self, acc: &mut A, v: V);

    /// Fold a partial accumulator into `acc`.
    fn merge(&self, acc: &mut A, other: A);

    /// Turn the final accumulator into the output.
    fn finish(&self, acc: A) -> O;

    /// Accumulate all `values` of one window into a fresh accumulator.
    fn build_from_batch<I>(&self, values: I) -> A
    where
        I: IntoIterator<Item = V>,
    {
        let mut acc = self.create();
        for v in values {
            self.add_input(&mut acc, v);
        }
        acc
    }
}
