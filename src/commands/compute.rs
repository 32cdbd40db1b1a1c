//! Compute command implementation.
//!
//! The compute command:
//! 1. Reads the profiling data
//! 2. Computes per-command GPU metrics
//! 3. Generates a flamegraph (optional)
//! 4. Writes output files

use super::models::ComputeArgs;
use crate::aggregator::compute_counters;
use crate::flamegraph::{generate_flamegraph, generate_text_summary};
use crate::output::{write_report, write_svg};
use crate::parser::schema::CounterReport;
use crate::parser::read_profiling_data;
use crate::utils::config::{MAX_TOP_ENTRIES, MIN_FLAMEGRAPH_WIDTH};
use anyhow::{Context, Result};
use log::{debug, info};
use std::time::Instant;

/// Execute the compute command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Unreadable or malformed profiling data
/// * Inconsistent traces (`InvalidProfilingData`)
/// * Flamegraph or file write errors
pub fn execute_compute(args: ComputeArgs) -> Result<CounterReport> {
    let start_time = Instant::now();

    info!("Computing GPU counters for: {}", args.input.display());

    // Step 1: Read profiling data
    info!("Step 1/4: Reading profiling data...");
    let data = read_profiling_data(&args.input).with_context(|| {
        format!("Failed to read profiling data from {}", args.input.display())
    })?;

    debug!(
        "Profiling data: {} slices, {} groups, {} counters",
        data.slices.slices.len(),
        data.slices.groups.len(),
        data.counters.len()
    );

    // Step 2: Compute metrics
    info!("Step 2/4: Computing per-command metrics...");
    let counters =
        compute_counters(&data.slices, &data.counters).context("Failed to compute GPU counters")?;

    if counters.metric(args.metric_id).is_none() {
        anyhow::bail!(
            "Metric {} does not exist (computed {} metrics)",
            args.metric_id,
            counters.metrics.len()
        );
    }

    // Step 3: Generate flamegraph (if requested)
    let svg_content = if args.output_svg.is_some() {
        info!("Step 3/4: Generating flamegraph...");
        let config = args
            .flamegraph_config
            .clone()
            .unwrap_or_default()
            .with_metric(args.metric_id);
        let svg =
            generate_flamegraph(&counters, Some(&config)).context("Failed to generate flamegraph")?;
        Some(svg)
    } else {
        info!("Step 3/4: Skipping flamegraph generation (not requested)");
        None
    };

    // Print text summary (if requested)
    if args.print_summary {
        println!("\n{}", "=".repeat(80));
        println!("GPU COUNTER SUMMARY");
        println!("{}", "=".repeat(80));
        println!("Input:         {}", args.input.display());
        println!("Metrics:       {}", counters.metrics.len());
        println!("Command nodes: {}", counters.entries.len());
        println!(
            "\n{}",
            generate_text_summary(&counters, args.metric_id, args.top_entries)
        );
        println!("{}", "=".repeat(80));
    }

    // Step 4: Write outputs
    info!("Step 4/4: Writing output files...");
    let report = CounterReport::new(counters, args.input.display().to_string());

    write_report(&report, &args.output_json).context("Failed to write report JSON")?;
    info!("✓ Report written to: {}", args.output_json.display());

    if let (Some(svg), Some(svg_path)) = (svg_content, &args.output_svg) {
        write_svg(&svg, svg_path).context("Failed to write flamegraph SVG")?;
        info!("✓ Flamegraph written to: {}", svg_path.display());
    }

    let elapsed = start_time.elapsed();
    info!("Compute completed in {:.2}s", elapsed.as_secs_f64());

    Ok(report)
}

/// Validate compute arguments
///
/// **Public** - can be called before execute_compute for early validation
pub fn validate_args(args: &ComputeArgs) -> Result<()> {
    if args.input.as_os_str().is_empty() {
        anyhow::bail!("Input path cannot be empty");
    }

    if !args.input.is_file() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    if args.output_json.as_os_str().is_empty() {
        anyhow::bail!("Output path cannot be empty");
    }

    if args.metric_id < 0 {
        anyhow::bail!("Metric id must be non-negative");
    }

    if args.top_entries == 0 {
        anyhow::bail!("top_entries must be greater than 0");
    }

    if args.top_entries > MAX_TOP_ENTRIES {
        anyhow::bail!("top_entries is too large (max {})", MAX_TOP_ENTRIES);
    }

    if let Some(config) = &args.flamegraph_config {
        if config.width < MIN_FLAMEGRAPH_WIDTH {
            anyhow::bail!(
                "Flamegraph width must be at least {} pixels",
                MIN_FLAMEGRAPH_WIDTH
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flamegraph::FlamegraphConfig;
    use tempfile::NamedTempFile;

    fn args_with_input() -> (NamedTempFile, ComputeArgs) {
        let input = NamedTempFile::new().unwrap();
        let args = ComputeArgs {
            input: input.path().to_path_buf(),
            ..Default::default()
        };
        (input, args)
    }

    #[test]
    fn test_validate_args_valid() {
        let (_input, args) = args_with_input();
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_missing_input() {
        let args = ComputeArgs {
            input: "does/not/exist.json".into(),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
        assert!(validate_args(&ComputeArgs::default()).is_err());
    }

    #[test]
    fn test_validate_args_top_entries() {
        let (_input, mut args) = args_with_input();
        args.top_entries = 0;
        assert!(validate_args(&args).is_err());
        args.top_entries = 2000;
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_negative_metric() {
        let (_input, mut args) = args_with_input();
        args.metric_id = -1;
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_narrow_flamegraph() {
        let (_input, mut args) = args_with_input();
        let mut config = FlamegraphConfig::new();
        config.width = 10;
        args.flamegraph_config = Some(config);
        assert!(validate_args(&args).is_err());
    }
}
