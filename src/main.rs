//! GPU Perf Trace CLI
//!
//! Computes per-command GPU performance metrics from captured profiling
//! data and writes them as a JSON report, optionally with a flamegraph.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use gpu_perf_trace::commands::{
    display_schema, display_version, execute_compute, validate_args, validate_report_file,
    ComputeArgs,
};
use gpu_perf_trace::flamegraph::FlamegraphConfig;
use gpu_perf_trace::utils::config::{
    DEFAULT_FLAMEGRAPH_WIDTH, DEFAULT_TOP_ENTRIES, GPU_TIME_METRIC_ID,
};

/// GPU Perf Trace - per-command GPU performance metrics
#[derive(Parser, Debug)]
#[command(name = "gpu-perf-trace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute per-command metrics from profiling data
    Compute {
        /// Profiling data JSON (slices, groups, counters)
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the JSON report
        #[arg(short, long, default_value = "counters.json")]
        output: PathBuf,

        /// Output path for SVG flamegraph (optional)
        #[arg(short, long)]
        flamegraph: Option<PathBuf>,

        /// Metric id used for the summary and flamegraph (0 = GPU Time)
        #[arg(short, long, default_value_t = GPU_TIME_METRIC_ID)]
        metric: i32,

        /// Number of command nodes listed in the summary
        #[arg(long, default_value_t = DEFAULT_TOP_ENTRIES)]
        top: usize,

        /// Flamegraph title
        #[arg(long)]
        title: Option<String>,

        /// Flamegraph width in pixels
        #[arg(long, default_value_t = DEFAULT_FLAMEGRAPH_WIDTH)]
        width: usize,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Validate a report JSON file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Compute {
            input,
            output,
            flamegraph,
            metric,
            top,
            title,
            width,
            summary,
        } => {
            let fg_config = if flamegraph.is_some() {
                let mut config = FlamegraphConfig::new();

                if let Some(title_str) = title {
                    config = config.with_title(title_str);
                }

                config.width = width;

                Some(config)
            } else {
                None
            };

            let args = ComputeArgs {
                input,
                output_json: output,
                output_svg: flamegraph,
                metric_id: metric,
                top_entries: top,
                flamegraph_config: fg_config,
                print_summary: summary,
            };

            validate_args(&args)?;
            execute_compute(args)?;
        }

        Commands::Validate { file } => {
            validate_report_file(file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
