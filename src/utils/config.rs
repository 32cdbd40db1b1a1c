//! Configuration and constants for the library and CLI.

/// Current report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

// Metric ids are part of the report format and must never be renumbered.
pub const GPU_TIME_METRIC_ID: i32 = 0;
pub const GPU_WALL_TIME_METRIC_ID: i32 = 1;
pub const COUNTER_METRIC_ID_OFFSET: i32 = 2;

pub const GPU_TIME_METRIC_NAME: &str = "GPU Time";
pub const GPU_WALL_TIME_METRIC_NAME: &str = "GPU Wall Time";

/// Unit of the synthetic time metrics
pub const NANOSECOND_UNIT: &str = "ns";

/// Value written for estimate/min/max when a metric cannot be computed
pub const UNKNOWN_VALUE: f64 = -1.0;

/// Only top-level slices are attributed to commands
pub const PROFILED_SLICE_DEPTH: i32 = 0;

// CLI defaults
pub const DEFAULT_TOP_ENTRIES: usize = 20;
pub const MAX_TOP_ENTRIES: usize = 1000;
pub const DEFAULT_FLAMEGRAPH_WIDTH: usize = 1200;
pub const MIN_FLAMEGRAPH_WIDTH: usize = 200;

// Field names for the nested slice section (different capture tools use different names)
pub const SLICE_SECTION_NAMES: &[&str] = &["slices", "gpuSlices", "gpu_slices"];
pub const COUNTER_SECTION_NAMES: &[&str] = &["counters", "gpuCounters", "gpu_counters"];
