//! GPU Perf Trace
//!
//! Per-command GPU performance metrics from GPU slice traces and
//! sampled hardware counters.
//!
//! Slices are attributed to commands through their group's command index.
//! Every command node, leaf or ancestor, receives an estimate and a
//! `[min, max]` band for GPU time, GPU wall time and each counter.
//!
//! ## Getting Started
//!
//! ```ignore
//! use gpu_perf_trace::{compute_counters, parser::read_profiling_data};
//!
//! let data = read_profiling_data("trace.json")?;
//! let counters = compute_counters(&data.slices, &data.counters)?;
//! ```
//!
//! Or from the command line:
//!
//! ```bash
//! gpu-perf-trace compute --input trace.json --summary
//! ```

pub mod aggregator;
pub mod commands;
pub mod flamegraph;
pub mod output;
pub mod parser;
pub mod utils;

pub use aggregator::compute_counters;
pub use parser::schema::{Counter, Entry, GpuCounters, GpuSlices, Group, Metric, Perf, Slice};
pub use parser::{AggregationOperator, CommandIndex};
pub use utils::error::ProfileError;
