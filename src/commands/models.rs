use crate::flamegraph::FlamegraphConfig;
use crate::utils::config::{DEFAULT_TOP_ENTRIES, GPU_TIME_METRIC_ID};
use std::path::PathBuf;

/// Arguments for the compute command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct ComputeArgs {
    /// Profiling data JSON (slices, groups, counters)
    pub input: PathBuf,

    /// Output path for the JSON report
    pub output_json: PathBuf,

    /// Output path for SVG flamegraph (optional)
    pub output_svg: Option<PathBuf>,

    /// Metric used to rank the summary and size the flamegraph
    pub metric_id: i32,

    /// Number of command nodes listed in the summary
    pub top_entries: usize,

    /// Flamegraph configuration
    pub flamegraph_config: Option<FlamegraphConfig>,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for ComputeArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output_json: PathBuf::from("counters.json"),
            output_svg: None,
            metric_id: GPU_TIME_METRIC_ID,
            top_entries: DEFAULT_TOP_ENTRIES,
            flamegraph_config: None,
            print_summary: false,
        }
    }
}
