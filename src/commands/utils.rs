use crate::output::read_report;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::Result;
use std::path::PathBuf;

/// Validate a report JSON file
pub fn validate_report_file(file_path: PathBuf) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let report = read_report(&file_path)?;

    let empty_entries = report
        .entries
        .iter()
        .filter(|e| e.metric_to_value.is_empty())
        .count();

    println!("✓ Valid report JSON");
    println!("  Version: {}", report.version);
    println!("  Source: {}", report.source);
    println!("  Generated: {}", report.generated_at);
    println!("  Metrics: {}", report.metrics.len());
    for metric in &report.metrics {
        println!("    [{}] {} ({}, {})", metric.id, metric.name, metric.unit, metric.op);
    }
    println!("  Command Nodes: {}", report.entries.len());
    if empty_entries > 0 {
        println!("  Nodes without values: {}", empty_entries);
    }

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("GPU Perf Trace Report Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string          - Schema version (e.g., '1.0.0')");
        println!("  source: string           - Profiling data the report was computed from");
        println!("  generated_at: string     - ISO 8601 timestamp");
        println!("  metrics: array           - Metric metadata");
        println!("    id: number             - 0 = GPU Time, 1 = GPU Wall Time, 2.. = counters");
        println!("    name: string           - Metric name");
        println!("    unit: string           - Metric unit");
        println!("    op: string             - summation | time_weighted_average | unsupported");
        println!("  entries: array           - One per command node (leaves and ancestors)");
        println!("    command_index: array   - Position in the command tree");
        println!("    metric_to_value: object - Metric id -> {{estimate, min, max}}");
        println!("                               (-1 in all three = not computable)");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("GPU Perf Trace v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Per-command GPU performance metrics from slice traces and hardware counters.");
}
