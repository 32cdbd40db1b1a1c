//! Aggregation of GPU slices and hardware counters into per-command metrics.
//!
//! The pipeline runs in this order:
//! 1. `preprocess` - filter and sort slices, seed one leaf entry per group
//! 2. `metrics` - GPU time and wall time per group
//! 3. `concurrency` - concurrently active slices per counter sample
//! 4. `attribution` - min / estimate / max sample weights per group
//! 5. `counter` - weighted samples reduced to one value per group
//! 6. `merge` - leaf values rolled up to every ancestor command

pub mod attribution;
pub mod concurrency;
pub mod counter;
pub mod merge;
pub mod metrics;
pub mod preprocess;

use crate::parser::schema::{Counter, GpuCounters, GpuSlices};
use crate::parser::validate_profiling_data;
use crate::utils::error::ProfileError;
use log::debug;

// Re-export main types and functions
pub use attribution::{map_counter_samples, SampleWeightMap, SampleWeights};
pub use concurrency::{concurrency_weight, scan_concurrency};
pub use counter::{aggregate_counter_samples, perf_from_weights, set_counter_metrics};
pub use merge::{index_to_groups, merge_leaf_entries};
pub use metrics::{gpu_time_for_group, set_time_metrics, time_metrics};
pub use preprocess::{preprocess, LeafEntry, LeafStore, PreparedSlices};

/// Compute the GPU performance of every command node
///
/// **Public** - main entry point of the library
///
/// # Arguments
/// * `slices` - GPU slices and the groups they belong to
/// * `counters` - Hardware counter traces
///
/// # Returns
/// Metric metadata (ids 0 and 1 for GPU time and wall time, then one per
/// counter in input order) and one entry per command node.
///
/// # Errors
/// * `ProfileError::InvalidProfilingData` - Inconsistent input traces, or a
///   group whose total GPU time overflows
pub fn compute_counters(
    slices: &GpuSlices,
    counters: &[Counter],
) -> Result<GpuCounters, ProfileError> {
    validate_profiling_data(slices, counters)?;

    let (prepared, mut store) = preprocess(slices);
    let mut metrics = Vec::with_capacity(counters.len() + 2);

    set_time_metrics(&prepared, &mut metrics, &mut store)?;
    set_counter_metrics(&prepared, counters, &mut metrics, &mut store);

    let entries = merge_leaf_entries(&metrics, &store);
    debug!(
        "Computed {} metrics for {} command nodes",
        metrics.len(),
        entries.len()
    );

    Ok(GpuCounters { metrics, entries })
}
