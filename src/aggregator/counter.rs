//! Reduction of attributed counter samples to per-group values.

use super::attribution::{map_counter_samples, SampleWeightMap, SampleWeights};
use super::concurrency::scan_concurrency;
use super::metrics::counter_metric;
use super::preprocess::{LeafStore, PreparedSlices};
use crate::parser::schema::{AggregationOperator, Counter, Metric, Perf};
use log::{debug, warn};

/// Aggregate weighted samples with the given operator
///
/// **Public** - used for each of the three attribution strategies
///
/// # Returns
/// * `Summation` - `Σ value × weight` (0 for an empty set)
/// * `TimeWeightedAverage` - `Σ value × Δt × weight / Σ Δt × weight`,
///   `None` when the weighted time is zero
/// * `Unsupported` - always `None`
pub fn aggregate_counter_samples(
    weights: &SampleWeightMap,
    counter: &Counter,
    op: AggregationOperator,
) -> Option<f64> {
    match op {
        AggregationOperator::Summation => Some(
            weights
                .iter()
                .map(|(&i, &weight)| counter.values[i] * weight)
                .sum(),
        ),
        AggregationOperator::TimeWeightedAverage => {
            let mut value_sum = 0.0;
            let mut time_sum = 0.0;
            for (&i, &weight) in weights {
                let (start, end) = counter.interval(i);
                let duration = (end - start) as f64;
                value_sum += counter.values[i] * duration * weight;
                time_sum += duration * weight;
            }
            if time_sum != 0.0 {
                Some(value_sum / time_sum)
            } else {
                None
            }
        }
        AggregationOperator::Unsupported => None,
    }
}

/// Combine the three attribution strategies into one value
///
/// The min/max strategies bound how many samples are included, not the
/// resulting number, so both of their results widen both bounds.
///
/// Returns `None` when the estimate cannot be computed.
pub fn perf_from_weights(
    weights: &SampleWeights,
    counter: &Counter,
    op: AggregationOperator,
) -> Option<Perf> {
    let estimate = aggregate_counter_samples(&weights.estimate, counter, op)?;

    let (mut min, mut max) = (estimate, estimate);
    let candidates = [
        aggregate_counter_samples(&weights.min, counter, op),
        aggregate_counter_samples(&weights.max, counter, op),
    ];
    for value in candidates.into_iter().flatten() {
        min = min.min(value);
        max = max.max(value);
    }

    Some(Perf::new(estimate, min, max))
}

/// Register one metric per counter and compute it for every leaf group
///
/// **Public** - fifth pipeline stage
///
/// Counters with an unsupported operator keep their metric id but produce
/// no values.
pub fn set_counter_metrics(
    prepared: &PreparedSlices<'_>,
    counters: &[Counter],
    metrics: &mut Vec<Metric>,
    store: &mut LeafStore,
) {
    let group_ids = store.group_ids();

    for (position, counter) in counters.iter().enumerate() {
        let metric = counter_metric(position, counter);
        let (metric_id, op) = (metric.id, metric.op);
        metrics.push(metric);

        if !op.is_supported() {
            warn!(
                "Counter '{}' uses an unsupported aggregation operator, skipping metric {}",
                counter.name, metric_id
            );
            continue;
        }

        let concurrency = scan_concurrency(&prepared.global, counter);
        for &group_id in &group_ids {
            let weights =
                map_counter_samples(prepared.group_slices(group_id), counter, &concurrency);
            store.set(group_id, metric_id, perf_from_weights(&weights, counter, op));
        }

        debug!(
            "Counter '{}' ({} samples) attributed to {} groups",
            counter.name,
            counter.interval_count(),
            group_ids.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(timestamps: Vec<u64>, values: Vec<f64>) -> Counter {
        Counter::new("c", "", timestamps, values, AggregationOperator::Summation)
    }

    fn weights(pairs: &[(usize, f64)]) -> SampleWeightMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_summation() {
        let c = counter(vec![0, 10, 30], vec![0.0, 4.0, 6.0]);
        let w = weights(&[(1, 0.5), (2, 1.0)]);
        assert_eq!(
            aggregate_counter_samples(&w, &c, AggregationOperator::Summation),
            Some(8.0)
        );
        assert_eq!(
            aggregate_counter_samples(&weights(&[]), &c, AggregationOperator::Summation),
            Some(0.0)
        );
    }

    #[test]
    fn test_time_weighted_average() {
        let c = counter(vec![0, 10, 30], vec![0.0, 4.0, 7.0]);
        let w = weights(&[(1, 1.0), (2, 1.0)]);
        // (4*10 + 7*20) / 30
        let value = aggregate_counter_samples(&w, &c, AggregationOperator::TimeWeightedAverage);
        assert!((value.unwrap() - 6.0).abs() < 1e-12);

        let zero = weights(&[(1, 0.0)]);
        assert_eq!(
            aggregate_counter_samples(&zero, &c, AggregationOperator::TimeWeightedAverage),
            None
        );
    }

    #[test]
    fn test_unsupported_has_no_value() {
        let c = counter(vec![0, 10], vec![0.0, 4.0]);
        assert_eq!(
            aggregate_counter_samples(&weights(&[(1, 1.0)]), &c, AggregationOperator::Unsupported),
            None
        );
    }

    #[test]
    fn test_min_set_can_exceed_max_set() {
        // Inside sample is high, edge samples low: the smallest inclusion
        // gives the largest average
        let c = counter(vec![0, 10, 20, 30], vec![0.0, 1.0, 9.0, 1.0]);
        let w = SampleWeights {
            estimate: weights(&[(1, 0.5), (2, 1.0), (3, 0.5)]),
            min: weights(&[(2, 1.0)]),
            max: weights(&[(1, 1.0), (2, 1.0), (3, 1.0)]),
        };

        let perf = perf_from_weights(&w, &c, AggregationOperator::TimeWeightedAverage).unwrap();
        assert!((perf.estimate - 5.0).abs() < 1e-12);
        assert!((perf.min - 11.0 / 3.0).abs() < 1e-12);
        assert!((perf.max - 9.0).abs() < 1e-12);
        assert!(perf.min <= perf.estimate && perf.estimate <= perf.max);
    }

    #[test]
    fn test_empty_min_set_is_ignored() {
        let c = counter(vec![0, 100], vec![0.0, 8.0]);
        let w = SampleWeights {
            estimate: weights(&[(1, 0.25)]),
            min: weights(&[]),
            max: weights(&[(1, 1.0)]),
        };

        let perf = perf_from_weights(&w, &c, AggregationOperator::TimeWeightedAverage);
        assert_eq!(perf, Some(Perf::exact(8.0)));
    }

    #[test]
    fn test_unknown_estimate() {
        let c = counter(vec![0, 10], vec![0.0, 3.0]);
        let perf = perf_from_weights(
            &SampleWeights::default(),
            &c,
            AggregationOperator::TimeWeightedAverage,
        );
        assert_eq!(perf, None);
    }

    #[test]
    fn test_negative_one_is_a_real_value() {
        let c = counter(vec![0, 10], vec![0.0, -1.0]);
        let w = SampleWeights {
            estimate: weights(&[(1, 1.0)]),
            min: weights(&[(1, 1.0)]),
            max: weights(&[(1, 1.0)]),
        };

        let perf = perf_from_weights(&w, &c, AggregationOperator::Summation);
        assert_eq!(perf, Some(Perf::exact(-1.0)));
    }
}
