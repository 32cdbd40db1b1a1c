//! Attribution of counter samples to a group's slices.
//!
//! Samples rarely line up with slice boundaries, so three attribution
//! strategies are maintained side by side:
//! - **min**: only samples that certainly belong to the group
//! - **estimate**: samples weighted by time overlap and shared between
//!   concurrent slices
//! - **max**: every sample that touches the group
//!
//! Each strategy maps a sample index to its weight.

use super::concurrency::{concurrency_weight, first_candidate_interval};
use crate::parser::schema::{Counter, Slice};
use std::collections::BTreeMap;

/// Sparse sample index -> weight mapping
pub type SampleWeightMap = BTreeMap<usize, f64>;

/// Sample weights of one group under the three attribution strategies
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleWeights {
    pub estimate: SampleWeightMap,
    pub min: SampleWeightMap,
    pub max: SampleWeightMap,
}

impl SampleWeights {
    pub fn is_empty(&self) -> bool {
        self.estimate.is_empty() && self.min.is_empty() && self.max.is_empty()
    }
}

/// Map counter samples onto one group's slices
///
/// **Public** - fourth pipeline stage
///
/// # Arguments
/// * `slices` - The group's slices, ascending by start time
/// * `counter` - Counter being attributed
/// * `concurrency` - Output of `scan_concurrency` for the same counter
///
/// # Algorithm
/// For a slice `[s, e]` and an overlapping interval `(c0, c1]`:
/// 1. Interval strictly inside the slice: estimate weight is the
///    concurrency weight; min weight 1 only if no other slice was active;
///    max weight 1.
/// 2. Otherwise (partial overlap, or interval containing the slice): the
///    estimate accumulates the overlapping fraction of the interval times the
///    concurrency weight; max weight 1.
pub fn map_counter_samples(
    slices: &[&Slice],
    counter: &Counter,
    concurrency: &[u32],
) -> SampleWeights {
    let timestamps = &counter.timestamps;
    let mut weights = SampleWeights::default();

    for slice in slices {
        let (s_start, s_end) = (slice.ts, slice.end());

        for i in first_candidate_interval(timestamps, s_start)..timestamps.len() {
            let (c_start, c_end) = counter.interval(i);
            if c_start > s_end {
                break;
            }

            let count = concurrency.get(i).copied().unwrap_or(0);
            let weight = concurrency_weight(count);

            if c_start > s_start && c_end < s_end {
                weights.estimate.insert(i, weight);
                // With other slices active the sample may belong entirely to one of them
                if count <= 1 {
                    weights.min.insert(i, 1.0);
                }
            } else {
                let fraction = if c_end != c_start {
                    let overlap = c_end.min(s_end).saturating_sub(c_start.max(s_start));
                    overlap as f64 / (c_end - c_start) as f64
                } else {
                    0.0
                };
                *weights.estimate.entry(i).or_insert(0.0) += fraction * weight;
            }
            weights.max.insert(i, 1.0);
        }
    }

    weights
}
