//! Slice filtering and per-group bucketing.
//!
//! Only top-level slices of known groups are profiled. They are sorted by
//! start time once, and every later stage relies on that order.

use crate::parser::schema::{GpuSlices, Perf, Slice};
use crate::parser::CommandIndex;
use crate::utils::config::PROFILED_SLICE_DEPTH;
use log::debug;
use std::collections::BTreeMap;

/// Filtered, time-ordered slices
///
/// **Public** - input of every aggregation stage
#[derive(Debug, Clone, Default)]
pub struct PreparedSlices<'a> {
    /// All profiled slices across groups, ascending by start time
    pub global: Vec<&'a Slice>,

    /// Same slices bucketed per group, preserving the global order
    pub by_group: BTreeMap<i32, Vec<&'a Slice>>,
}

impl<'a> PreparedSlices<'a> {
    /// Slices of one group (empty if the group has no profiled slice)
    pub fn group_slices(&self, group_id: i32) -> &[&'a Slice] {
        self.by_group
            .get(&group_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Metric values of one leaf group
///
/// `None` marks a value that could not be computed. It only becomes the
/// `-1` wire sentinel once the merger emits entries, so a computed `-1` is
/// never mistaken for a missing one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeafEntry {
    pub command_index: CommandIndex,
    pub values: BTreeMap<i32, Option<Perf>>,
}

impl LeafEntry {
    fn new(command_index: CommandIndex) -> Self {
        Self {
            command_index,
            values: BTreeMap::new(),
        }
    }

    /// Computed value of a metric, `None` if missing or not computable
    pub fn value(&self, metric_id: i32) -> Option<Perf> {
        self.values.get(&metric_id).copied().flatten()
    }
}

/// Leaf entries of one computation, keyed by group id
///
/// Stages write their metric values into it; the merger consumes it.
#[derive(Debug, Clone, Default)]
pub struct LeafStore {
    entries: BTreeMap<i32, LeafEntry>,
}

impl LeafStore {
    /// Record a metric value for a group
    ///
    /// Values for groups that were never seeded are ignored.
    pub fn set(&mut self, group_id: i32, metric_id: i32, perf: Option<Perf>) {
        if let Some(entry) = self.entries.get_mut(&group_id) {
            entry.values.insert(metric_id, perf);
        }
    }

    pub fn get(&self, group_id: i32) -> Option<&LeafEntry> {
        self.entries.get(&group_id)
    }

    pub fn group_ids(&self) -> Vec<i32> {
        self.entries.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &LeafEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Filter, sort and bucket slices; seed one empty leaf entry per group
///
/// **Public** - first pipeline stage
///
/// Slices deeper than the top level, or referring to a group that is not
/// listed, are dropped silently: they belong to work that is not attributed
/// to a command.
pub fn preprocess(slices: &GpuSlices) -> (PreparedSlices<'_>, LeafStore) {
    let entries: BTreeMap<i32, LeafEntry> = slices
        .groups
        .iter()
        .map(|group| (group.id, LeafEntry::new(group.command_index.clone())))
        .collect();

    let mut global: Vec<&Slice> = slices
        .slices
        .iter()
        .filter(|s| s.depth == PROFILED_SLICE_DEPTH && entries.contains_key(&s.group_id))
        .collect();
    global.sort_by_key(|s| s.ts);

    let dropped = slices.slices.len() - global.len();
    if dropped > 0 {
        debug!("Dropped {} nested or unattributed slices", dropped);
    }

    let mut by_group: BTreeMap<i32, Vec<&Slice>> = BTreeMap::new();
    for slice in &global {
        by_group.entry(slice.group_id).or_default().push(*slice);
    }

    debug!(
        "Prepared {} slices in {} groups ({} groups declared)",
        global.len(),
        by_group.len(),
        entries.len()
    );

    (PreparedSlices { global, by_group }, LeafStore { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::schema::Group;

    fn sample_slices() -> GpuSlices {
        GpuSlices {
            slices: vec![
                Slice::new(1, 0, 30, 5),
                Slice::new(2, 0, 10, 5),
                Slice::new(1, 1, 0, 100), // nested
                Slice::new(9, 0, 0, 100), // unknown group
                Slice::new(1, 0, 20, 5),
            ],
            groups: vec![
                Group::new(1, vec![0, 1]),
                Group::new(2, vec![0, 2]),
                Group::new(3, vec![1]),
            ],
        }
    }

    #[test]
    fn test_filters_and_sorts() {
        let data = sample_slices();
        let (prepared, _) = preprocess(&data);

        let starts: Vec<u64> = prepared.global.iter().map(|s| s.ts).collect();
        assert_eq!(starts, vec![10, 20, 30]);

        let group_1: Vec<u64> = prepared.group_slices(1).iter().map(|s| s.ts).collect();
        assert_eq!(group_1, vec![20, 30]);
        assert_eq!(prepared.group_slices(2).len(), 1);
        assert!(prepared.group_slices(3).is_empty());
        assert!(prepared.group_slices(9).is_empty());
    }

    #[test]
    fn test_seeds_one_entry_per_group() {
        let data = sample_slices();
        let (_, store) = preprocess(&data);

        assert_eq!(store.len(), 3);
        assert_eq!(store.group_ids(), vec![1, 2, 3]);
        assert_eq!(store.get(2).unwrap().command_index.to_string(), "0,2");
        assert!(store.get(3).unwrap().values.is_empty());
    }

    #[test]
    fn test_set_ignores_unknown_groups() {
        let data = sample_slices();
        let (_, mut store) = preprocess(&data);

        store.set(1, 0, Some(Perf::exact(1.0)));
        store.set(42, 0, Some(Perf::exact(1.0)));
        store.set(2, 0, None);

        assert_eq!(store.get(1).unwrap().value(0), Some(Perf::exact(1.0)));
        assert!(store.get(42).is_none());
        // Recorded as not computable, not merely absent
        assert_eq!(store.get(2).unwrap().values.get(&0), Some(&None));
        assert_eq!(store.get(2).unwrap().value(0), None);
    }
}
