//! Data model for profiling input and computed counters.
//!
//! Input types (`GpuSlices`, `Counter`) describe the captured traces.
//! Output types (`GpuCounters`, `Metric`, `Entry`, `Perf`) describe the
//! per-command performance tree written to reports.

use super::command_index::CommandIndex;
use crate::utils::config::{SCHEMA_VERSION, UNKNOWN_VALUE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One span of GPU execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    /// Owning command group
    #[serde(alias = "groupId")]
    pub group_id: i32,

    /// Nesting level within the group (only depth 0 is profiled)
    #[serde(default)]
    pub depth: i32,

    /// Start timestamp in nanoseconds
    #[serde(alias = "timestamp")]
    pub ts: u64,

    /// Duration in nanoseconds
    #[serde(alias = "duration")]
    pub dur: u64,
}

impl Slice {
    pub fn new(group_id: i32, depth: i32, ts: u64, dur: u64) -> Self {
        Self {
            group_id,
            depth,
            ts,
            dur,
        }
    }

    /// End timestamp of the slice
    pub fn end(&self) -> u64 {
        self.ts.saturating_add(self.dur)
    }
}

/// A profiled unit of GPU work, linked to a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(alias = "groupId", alias = "group_id")]
    pub id: i32,

    #[serde(alias = "commandIndex", alias = "indices")]
    pub command_index: CommandIndex,
}

impl Group {
    pub fn new(id: i32, command_index: impl Into<CommandIndex>) -> Self {
        Self {
            id,
            command_index: command_index.into(),
        }
    }
}

/// Slice trace plus the groups slices refer to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuSlices {
    #[serde(default)]
    pub slices: Vec<Slice>,

    #[serde(default)]
    pub groups: Vec<Group>,
}

/// How samples of a metric are reduced to a single value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationOperator {
    Summation,

    #[default]
    #[serde(alias = "time_weighted_avg", alias = "TimeWeightedAvg")]
    TimeWeightedAverage,

    /// Any operator this tool does not know how to compute
    #[serde(other)]
    Unsupported,
}

impl AggregationOperator {
    pub fn is_supported(&self) -> bool {
        !matches!(self, AggregationOperator::Unsupported)
    }
}

impl fmt::Display for AggregationOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregationOperator::Summation => "summation",
            AggregationOperator::TimeWeightedAverage => "time_weighted_average",
            AggregationOperator::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// One hardware counter's full trace
///
/// `values[i]` covers the interval `(timestamps[i-1], timestamps[i]]`,
/// so `values[0]` is never aggregated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counter {
    pub name: String,

    #[serde(default)]
    pub unit: String,

    pub timestamps: Vec<u64>,

    pub values: Vec<f64>,

    #[serde(
        default,
        alias = "aggregation_operator",
        alias = "aggregationOperator",
        alias = "op"
    )]
    pub operator: AggregationOperator,
}

impl Counter {
    pub fn new(
        name: impl Into<String>,
        unit: impl Into<String>,
        timestamps: Vec<u64>,
        values: Vec<f64>,
        operator: AggregationOperator,
    ) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            timestamps,
            values,
            operator,
        }
    }

    /// Number of aggregatable sample intervals
    pub fn interval_count(&self) -> usize {
        self.timestamps.len().saturating_sub(1)
    }

    /// Bounds `(start, end)` of sample interval `i` (`i >= 1`)
    pub fn interval(&self, i: usize) -> (u64, u64) {
        (self.timestamps[i - 1], self.timestamps[i])
    }
}

/// Complete profiling input for one capture
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfilingData {
    #[serde(default)]
    pub slices: GpuSlices,

    #[serde(default)]
    pub counters: Vec<Counter>,
}

/// Aggregation metadata for one metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub id: i32,
    pub name: String,
    pub unit: String,
    pub op: AggregationOperator,
}

/// Estimate plus uncertainty band for one metric at one command node
///
/// All three fields are `-1` when the value could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Perf {
    pub estimate: f64,
    pub min: f64,
    pub max: f64,
}

impl Perf {
    pub const UNKNOWN: Perf = Perf {
        estimate: UNKNOWN_VALUE,
        min: UNKNOWN_VALUE,
        max: UNKNOWN_VALUE,
    };

    pub fn new(estimate: f64, min: f64, max: f64) -> Self {
        Self { estimate, min, max }
    }

    /// A value without uncertainty
    pub fn exact(value: f64) -> Self {
        Self::new(value, value, value)
    }

    /// True if this is the `-1` wire marker
    ///
    /// Only meaningful for averaged metrics read back from a report: a
    /// summed value of exactly `-1` is a real result.
    pub fn is_unknown(&self) -> bool {
        self.estimate == UNKNOWN_VALUE && self.min == UNKNOWN_VALUE && self.max == UNKNOWN_VALUE
    }
}

/// Performance profile of one command-tree node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub command_index: CommandIndex,
    pub metric_to_value: BTreeMap<i32, Perf>,
}

impl Entry {
    pub fn new(command_index: CommandIndex) -> Self {
        Self {
            command_index,
            metric_to_value: BTreeMap::new(),
        }
    }

    pub fn value(&self, metric_id: i32) -> Option<&Perf> {
        self.metric_to_value.get(&metric_id)
    }
}

/// Result of the counter computation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuCounters {
    pub metrics: Vec<Metric>,
    pub entries: Vec<Entry>,
}

impl GpuCounters {
    pub fn metric(&self, id: i32) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.id == id)
    }

    pub fn entry(&self, command_index: &CommandIndex) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|e| &e.command_index == command_index)
    }
}

/// Top-level report structure written to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterReport {
    /// Schema version for compatibility checking
    pub version: String,

    /// Where the profiling data came from (usually the input file)
    pub source: String,

    /// Timestamp when the report was generated
    pub generated_at: String,

    pub metrics: Vec<Metric>,

    pub entries: Vec<Entry>,
}

impl CounterReport {
    /// Wrap computed counters with report metadata
    pub fn new(counters: GpuCounters, source: impl Into<String>) -> Self {
        use chrono::Utc;

        Self {
            version: SCHEMA_VERSION.to_string(),
            source: source.into(),
            generated_at: Utc::now().to_rfc3339(),
            metrics: counters.metrics,
            entries: counters.entries,
        }
    }

    /// Drop the report metadata
    pub fn into_counters(self) -> GpuCounters {
        GpuCounters {
            metrics: self.metrics,
            entries: self.entries,
        }
    }
}
