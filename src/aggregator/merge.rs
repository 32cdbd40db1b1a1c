//! Roll-up of leaf entries into the command tree.
//!
//! A leaf group with command index `[2, 0, 5]` contributes to the nodes
//! `[2, 0, 5]`, `[2, 0]` and `[2]`. Every node is re-aggregated from the
//! pre-aggregated values of the leaves beneath it, never from raw samples.

use super::preprocess::{LeafEntry, LeafStore};
use crate::parser::schema::{AggregationOperator, Entry, Metric, Perf};
use crate::parser::CommandIndex;
use crate::utils::config::GPU_TIME_METRIC_ID;
use log::debug;
use std::collections::BTreeMap;

/// Group leaf ids under every command node they contribute to
///
/// **Public** - exposed for inspection and tests
pub fn index_to_groups(store: &LeafStore) -> BTreeMap<CommandIndex, Vec<i32>> {
    let mut nodes: BTreeMap<CommandIndex, Vec<i32>> = BTreeMap::new();
    for (group_id, entry) in store.iter() {
        for prefix in entry.command_index.prefixes() {
            nodes.entry(prefix).or_default().push(group_id);
        }
    }
    nodes
}

/// Merge leaf entries into one entry per command node
///
/// **Public** - last pipeline stage
///
/// # Returns
/// One entry per distinct command index (leaves and all ancestors),
/// ascending by command index. Values that cannot be computed are written
/// as `Perf::UNKNOWN`.
pub fn merge_leaf_entries(metrics: &[Metric], store: &LeafStore) -> Vec<Entry> {
    let nodes = index_to_groups(store);
    debug!(
        "Merging {} leaf entries into {} command nodes",
        store.len(),
        nodes.len()
    );

    nodes
        .into_iter()
        .map(|(command_index, group_ids)| {
            let members: Vec<&LeafEntry> =
                group_ids.iter().filter_map(|id| store.get(*id)).collect();
            let mut merged = Entry::new(command_index);
            for metric in metrics {
                if metric.op.is_supported() {
                    let perf = merge_metric(metric, &members).unwrap_or(Perf::UNKNOWN);
                    merged.metric_to_value.insert(metric.id, perf);
                }
            }
            merged
        })
        .collect()
}

/// Aggregate one metric across member leaves
///
/// Members without a computable value for the metric are skipped.
fn merge_metric(metric: &Metric, members: &[&LeafEntry]) -> Option<Perf> {
    match metric.op {
        AggregationOperator::Summation => {
            let mut sum = Perf::exact(0.0);
            for perf in members.iter().filter_map(|m| m.value(metric.id)) {
                sum.estimate += perf.estimate;
                sum.min += perf.min;
                sum.max += perf.max;
            }
            Some(sum)
        }
        AggregationOperator::TimeWeightedAverage => {
            let mut time_sum = 0.0;
            let mut weighted = Perf::exact(0.0);
            for member in members {
                let Some(perf) = member.value(metric.id) else {
                    continue;
                };
                let gpu_time = member
                    .value(GPU_TIME_METRIC_ID)
                    .map(|p| p.estimate)
                    .unwrap_or(0.0);
                time_sum += gpu_time;
                weighted.estimate += gpu_time * perf.estimate;
                weighted.min += gpu_time * perf.min;
                weighted.max += gpu_time * perf.max;
            }
            if time_sum == 0.0 {
                return None;
            }
            Some(Perf::new(
                weighted.estimate / time_sum,
                weighted.min / time_sum,
                weighted.max / time_sum,
            ))
        }
        AggregationOperator::Unsupported => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::metrics::time_metrics;
    use crate::aggregator::preprocess::preprocess;
    use crate::parser::schema::{GpuSlices, Group};
    use pretty_assertions::assert_eq;

    fn store_with(groups: Vec<Group>, values: &[(i32, i32, Option<Perf>)]) -> LeafStore {
        let slices = GpuSlices {
            slices: vec![],
            groups,
        };
        let (_, mut store) = preprocess(&slices);
        for &(group_id, metric_id, perf) in values {
            store.set(group_id, metric_id, perf);
        }
        store
    }

    fn twa_metric(id: i32) -> Metric {
        Metric {
            id,
            name: "occupancy".to_string(),
            unit: "%".to_string(),
            op: AggregationOperator::TimeWeightedAverage,
        }
    }

    #[test]
    fn test_index_to_groups() {
        let store = store_with(
            vec![
                Group::new(1, vec![0, 1]),
                Group::new(2, vec![0, 2, 7]),
                Group::new(3, vec![1]),
            ],
            &[],
        );

        let nodes: Vec<(String, Vec<i32>)> = index_to_groups(&store)
            .into_iter()
            .map(|(index, ids)| (index.to_string(), ids))
            .collect();

        assert_eq!(
            nodes,
            vec![
                ("0".to_string(), vec![1, 2]),
                ("0,1".to_string(), vec![1]),
                ("0,2".to_string(), vec![2]),
                ("0,2,7".to_string(), vec![2]),
                ("1".to_string(), vec![3]),
            ]
        );
    }

    #[test]
    fn test_summation_merge() {
        let store = store_with(
            vec![Group::new(1, vec![0, 1]), Group::new(2, vec![0, 2])],
            &[
                (1, 0, Some(Perf::new(10.0, 8.0, 12.0))),
                (2, 0, Some(Perf::new(5.0, 5.0, 6.0))),
            ],
        );

        let entries = merge_leaf_entries(&time_metrics(), &store);
        assert_eq!(entries.len(), 3);

        let root = &entries[0];
        assert_eq!(root.command_index.to_string(), "0");
        assert_eq!(root.value(0), Some(&Perf::new(15.0, 13.0, 18.0)));
        // Wall time was never set on the leaves
        assert_eq!(root.value(1), Some(&Perf::exact(0.0)));
    }

    #[test]
    fn test_time_weighted_merge() {
        let store = store_with(
            vec![Group::new(1, vec![3, 0]), Group::new(2, vec![3, 1])],
            &[
                (1, 0, Some(Perf::exact(30.0))),
                (2, 0, Some(Perf::exact(10.0))),
                (1, 2, Some(Perf::new(4.0, 2.0, 6.0))),
                (2, 2, Some(Perf::new(8.0, 8.0, 8.0))),
            ],
        );

        let entries = merge_leaf_entries(&[twa_metric(2)], &store);
        let root = entries
            .iter()
            .find(|e| e.command_index.to_string() == "3")
            .unwrap();

        // (30*4 + 10*8) / 40
        assert_eq!(root.value(2), Some(&Perf::new(5.0, 3.5, 6.5)));
    }

    #[test]
    fn test_time_weighted_merge_without_gpu_time() {
        let store = store_with(
            vec![Group::new(1, vec![0])],
            &[(1, 0, Some(Perf::exact(0.0))), (1, 2, Some(Perf::exact(4.0)))],
        );

        let entries = merge_leaf_entries(&[twa_metric(2)], &store);
        assert!(entries[0].value(2).unwrap().is_unknown());
    }

    #[test]
    fn test_unknown_members_are_skipped() {
        let store = store_with(
            vec![Group::new(1, vec![0, 0]), Group::new(2, vec![0, 1])],
            &[
                (1, 0, Some(Perf::exact(10.0))),
                (2, 0, Some(Perf::exact(10.0))),
                (1, 2, Some(Perf::exact(7.0))),
                (2, 2, None),
            ],
        );

        let entries = merge_leaf_entries(&[twa_metric(2)], &store);
        assert_eq!(entries[0].value(2), Some(&Perf::exact(7.0)));
    }

    #[test]
    fn test_negative_one_is_kept() {
        let summed = Metric {
            id: 2,
            name: "delta".to_string(),
            unit: String::new(),
            op: AggregationOperator::Summation,
        };
        let store = store_with(
            vec![Group::new(1, vec![0, 0]), Group::new(2, vec![0, 1])],
            &[
                (1, 0, Some(Perf::exact(10.0))),
                (2, 0, Some(Perf::exact(10.0))),
                (1, 2, Some(Perf::exact(-1.0))),
                (2, 2, Some(Perf::exact(3.0))),
                (1, 3, Some(Perf::exact(-1.0))),
            ],
        );

        let entries = merge_leaf_entries(&[summed, twa_metric(3)], &store);
        let values: Vec<(String, Option<&Perf>, Option<&Perf>)> = entries
            .iter()
            .map(|e| (e.command_index.to_string(), e.value(2), e.value(3)))
            .collect();

        assert_eq!(
            values,
            vec![
                ("0".to_string(), Some(&Perf::exact(2.0)), Some(&Perf::exact(-1.0))),
                ("0,0".to_string(), Some(&Perf::exact(-1.0)), Some(&Perf::exact(-1.0))),
                ("0,1".to_string(), Some(&Perf::exact(3.0)), Some(&Perf::UNKNOWN)),
            ]
        );
    }

    #[test]
    fn test_unsupported_metric_is_omitted() {
        let store = store_with(vec![Group::new(1, vec![0])], &[]);
        let metric = Metric {
            id: 2,
            name: "mystery".to_string(),
            unit: String::new(),
            op: AggregationOperator::Unsupported,
        };

        let entries = merge_leaf_entries(&[metric], &store);
        assert!(entries[0].metric_to_value.is_empty());
    }

    #[test]
    fn test_empty_command_index_contributes_nowhere() {
        let store = store_with(vec![Group::new(1, Vec::<u64>::new())], &[]);
        assert!(merge_leaf_entries(&time_metrics(), &store).is_empty());
    }
}
