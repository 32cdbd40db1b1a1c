//! Concurrency scan of counter sample intervals.
//!
//! A sample interval overlapped by several slices (from any group) cannot be
//! attributed to one of them with certainty, so its weight is later divided
//! by the number of slices active during it.

use crate::parser::schema::{Counter, Slice};

/// First sample interval that may overlap a span starting at `start`
///
/// Intervals ending before `start` can never overlap, and timestamps are
/// strictly increasing, so this is a binary search. Interval 0 does not
/// exist, hence the lower bound of 1.
pub(crate) fn first_candidate_interval(timestamps: &[u64], start: u64) -> usize {
    timestamps.partition_point(|&t| t < start).max(1)
}

/// Count, for each sample interval, the slices overlapping it
///
/// **Public** - third pipeline stage
///
/// # Arguments
/// * `slices` - All profiled slices, across groups
/// * `counter` - Counter whose intervals are scanned
///
/// # Returns
/// A vector with one count per timestamp; index 0 is always 0.
/// Touching endpoints count as overlap.
pub fn scan_concurrency(slices: &[&Slice], counter: &Counter) -> Vec<u32> {
    let timestamps = &counter.timestamps;
    let mut counts = vec![0u32; timestamps.len()];

    for slice in slices {
        let (s_start, s_end) = (slice.ts, slice.end());
        for i in first_candidate_interval(timestamps, s_start)..timestamps.len() {
            if timestamps[i - 1] > s_end {
                break;
            }
            counts[i] += 1;
        }
    }

    counts
}

/// Share of a sample that one of `count` concurrent slices may claim
pub fn concurrency_weight(count: u32) -> f64 {
    if count > 1 {
        1.0 / count as f64
    } else {
        1.0
    }
}
