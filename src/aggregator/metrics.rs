//! Metric metadata and GPU time metrics.
//!
//! GPU time counts every nanosecond of work issued by a group, overlapping
//! work included. Wall time counts the time the group occupied the GPU,
//! so the two only differ when a group's slices overlap.

use super::preprocess::{LeafStore, PreparedSlices};
use crate::parser::schema::{AggregationOperator, Counter, Metric, Perf, Slice};
use crate::utils::config::{
    COUNTER_METRIC_ID_OFFSET, GPU_TIME_METRIC_ID, GPU_TIME_METRIC_NAME, GPU_WALL_TIME_METRIC_ID,
    GPU_WALL_TIME_METRIC_NAME, NANOSECOND_UNIT,
};
use crate::utils::error::ProfileError;
use log::debug;

/// Metadata of the two synthetic time metrics
pub fn time_metrics() -> [Metric; 2] {
    [
        Metric {
            id: GPU_TIME_METRIC_ID,
            name: GPU_TIME_METRIC_NAME.to_string(),
            unit: NANOSECOND_UNIT.to_string(),
            op: AggregationOperator::Summation,
        },
        Metric {
            id: GPU_WALL_TIME_METRIC_ID,
            name: GPU_WALL_TIME_METRIC_NAME.to_string(),
            unit: NANOSECOND_UNIT.to_string(),
            op: AggregationOperator::Summation,
        },
    ]
}

/// Metadata of the metric derived from the `position`-th input counter
pub fn counter_metric(position: usize, counter: &Counter) -> Metric {
    Metric {
        id: COUNTER_METRIC_ID_OFFSET + position as i32,
        name: counter.name.clone(),
        unit: counter.unit.clone(),
        op: counter.operator,
    }
}

/// GPU time and wall time of one group
///
/// **Public** - exact, no uncertainty
///
/// # Arguments
/// * `slices` - The group's slices, ascending by start time
///
/// # Returns
/// `(gpu_time, wall_time)` in nanoseconds
///
/// # Errors
/// * `ProfileError::InvalidProfilingData` - GPU time does not fit in `u64`
pub fn gpu_time_for_group(slices: &[&Slice]) -> Result<(u64, u64), ProfileError> {
    let mut gpu_time = 0u64;
    let mut wall_time = 0u64;
    let mut last_end = 0u64;

    for slice in slices {
        let end = slice.end();
        gpu_time = gpu_time.checked_add(slice.dur).ok_or_else(|| {
            ProfileError::InvalidProfilingData(format!(
                "GPU time of group {} overflows at slice {}",
                slice.group_id, slice.ts
            ))
        })?;

        if end <= last_end && slice.ts < last_end {
            // Fully covered by time already counted
            continue;
        }
        wall_time += end - slice.ts.max(last_end);
        last_end = last_end.max(end);
    }

    // Wall time never exceeds GPU time, so it cannot overflow either
    Ok((gpu_time, wall_time))
}

/// Register the time metrics and compute them for every leaf group
///
/// **Public** - second pipeline stage
pub fn set_time_metrics(
    prepared: &PreparedSlices<'_>,
    metrics: &mut Vec<Metric>,
    store: &mut LeafStore,
) -> Result<(), ProfileError> {
    metrics.extend(time_metrics());

    for group_id in store.group_ids() {
        let (gpu_time, wall_time) = gpu_time_for_group(prepared.group_slices(group_id))?;
        store.set(group_id, GPU_TIME_METRIC_ID, Some(Perf::exact(gpu_time as f64)));
        store.set(group_id, GPU_WALL_TIME_METRIC_ID, Some(Perf::exact(wall_time as f64)));
    }

    debug!("Computed time metrics for {} groups", store.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times(slices: &[Slice]) -> (u64, u64) {
        let refs: Vec<&Slice> = slices.iter().collect();
        gpu_time_for_group(&refs).unwrap()
    }

    #[test]
    fn test_partial_overlap() {
        let slices = [Slice::new(1, 0, 0, 10), Slice::new(1, 0, 5, 10)];
        assert_eq!(times(&slices), (20, 15));
    }

    #[test]
    fn test_contained_slice_adds_no_wall_time() {
        let slices = [Slice::new(1, 0, 0, 20), Slice::new(1, 0, 5, 5)];
        assert_eq!(times(&slices), (25, 20));
    }

    #[test]
    fn test_contained_then_overlapping() {
        // The contained slice must not shrink the running end
        let slices = [
            Slice::new(1, 0, 0, 20),
            Slice::new(1, 0, 5, 5),
            Slice::new(1, 0, 15, 10),
        ];
        assert_eq!(times(&slices), (35, 25));
    }

    #[test]
    fn test_disjoint_slices() {
        let slices = [Slice::new(1, 0, 0, 10), Slice::new(1, 0, 10, 5), Slice::new(1, 0, 40, 1)];
        assert_eq!(times(&slices), (16, 16));
    }

    #[test]
    fn test_zero_duration_and_empty() {
        assert_eq!(times(&[]), (0, 0));
        let slices = [Slice::new(1, 0, 5, 0), Slice::new(1, 0, 5, 3)];
        assert_eq!(times(&slices), (3, 3));
    }

    #[test]
    fn test_gpu_time_overflow_is_rejected() {
        let half = 1u64 << 63;
        let a = Slice::new(7, 0, 0, half);
        let b = Slice::new(7, 0, 1, half);

        let err = gpu_time_for_group(&[&a, &b]).unwrap_err();
        assert!(matches!(err, ProfileError::InvalidProfilingData(_)));
        assert!(err.to_string().contains("group 7"));
    }

    #[test]
    fn test_metric_ids() {
        let [gpu, wall] = time_metrics();
        assert_eq!((gpu.id, gpu.name.as_str()), (0, "GPU Time"));
        assert_eq!((wall.id, wall.name.as_str()), (1, "GPU Wall Time"));
        assert_eq!(wall.op, AggregationOperator::Summation);

        let counter = Counter::new("ALU", "%", vec![], vec![], AggregationOperator::Summation);
        let metric = counter_metric(3, &counter);
        assert_eq!(metric.id, 5);
        assert_eq!(metric.unit, "%");
    }
}
