//! Profiling data parsing and schema definitions.
//!
//! This module handles:
//! - Parsing raw JSON profiling data (slices, groups, counters)
//! - Validating trace consistency
//! - Defining the input and output data model

pub mod command_index;
pub mod profiling_data;
pub mod schema;

// Re-export main types
pub use command_index::CommandIndex;
pub use profiling_data::{parse_profiling_data, read_profiling_data, validate_profiling_data};
pub use schema::{
    AggregationOperator, Counter, CounterReport, Entry, GpuCounters, GpuSlices, Group, Metric, Perf,
    ProfilingData, Slice,
};
