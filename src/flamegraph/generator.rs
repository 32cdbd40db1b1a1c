//! SVG flamegraph of the command tree.
//!
//! Each command node is drawn with a width proportional to its value for
//! one additive metric (GPU time by default), root commands at the bottom.

use crate::parser::schema::{AggregationOperator, GpuCounters, Metric, Perf};
use crate::parser::CommandIndex;
use crate::utils::config::{DEFAULT_FLAMEGRAPH_WIDTH, GPU_TIME_METRIC_ID};
use crate::utils::error::FlamegraphError;
use log::info;
use std::collections::BTreeMap;

/// Flamegraph configuration
#[derive(Debug, Clone)]
pub struct FlamegraphConfig {
    pub title: String,
    pub width: usize,
    pub metric_id: i32,
}

impl Default for FlamegraphConfig {
    fn default() -> Self {
        Self {
            title: "GPU Command Profile".to_string(),
            width: DEFAULT_FLAMEGRAPH_WIDTH,
            metric_id: GPU_TIME_METRIC_ID,
        }
    }
}

impl FlamegraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_metric(mut self, metric_id: i32) -> Self {
        self.metric_id = metric_id;
        self
    }
}

/// Internal Node structure for building the tree
struct Node {
    index: CommandIndex,
    perf: Perf,
    children: BTreeMap<u64, Node>,
}

impl Node {
    fn new(index: CommandIndex) -> Self {
        Self {
            index,
            perf: Perf::exact(0.0),
            children: BTreeMap::new(),
        }
    }

    /// Width share of the node; negative sums get no width
    fn value(&self) -> f64 {
        self.perf.estimate.max(0.0)
    }

    fn insert(&mut self, path: &[u64], index: &CommandIndex, perf: Perf) {
        let Some((head, tail)) = path.split_first() else {
            self.perf = perf;
            return;
        };
        let depth = index.len() - tail.len();
        let child = self
            .children
            .entry(*head)
            .or_insert_with(|| Node::new(CommandIndex::from(&index.as_slice()[..depth])));
        child.insert(tail, index, perf);
    }

    fn name(&self) -> String {
        match self.index.last() {
            Some(last) => format!("#{}", last),
            None => "all".to_string(),
        }
    }
}

/// Check that a metric exists and can be split across children
fn additive_metric(counters: &GpuCounters, metric_id: i32) -> Result<&Metric, FlamegraphError> {
    let metric = counters
        .metric(metric_id)
        .ok_or(FlamegraphError::UnknownMetric(metric_id))?;
    if metric.op != AggregationOperator::Summation {
        return Err(FlamegraphError::UnsupportedMetric(metric.name.clone()));
    }
    Ok(metric)
}

fn build_tree(counters: &GpuCounters, metric_id: i32) -> Node {
    let mut root = Node::new(CommandIndex::default());
    for entry in &counters.entries {
        if let Some(perf) = entry.value(metric_id) {
            root.insert(entry.command_index.as_slice(), &entry.command_index, *perf);
        }
    }
    root.perf = Perf::exact(root.children.values().map(Node::value).sum());
    root
}

/// Generate SVG flamegraph from computed counters
///
/// # Errors
/// * `FlamegraphError::EmptyEntries` - Nothing to draw
/// * `FlamegraphError::UnknownMetric` - Metric id not in the result
/// * `FlamegraphError::UnsupportedMetric` - Metric is not a summation
pub fn generate_flamegraph(
    counters: &GpuCounters,
    config: Option<&FlamegraphConfig>,
) -> Result<String, FlamegraphError> {
    if counters.entries.is_empty() {
        return Err(FlamegraphError::EmptyEntries);
    }

    let config = config.cloned().unwrap_or_default();
    let metric = additive_metric(counters, config.metric_id)?;
    info!(
        "Generating flamegraph of '{}' over {} command nodes",
        metric.name,
        counters.entries.len()
    );

    let root = build_tree(counters, config.metric_id);
    let max_depth = calculate_max_depth(&root);

    let mut svg_content = String::new();
    let width = config.width;
    let height_per_level = 20;
    let graph_height = (max_depth + 1) * height_per_level;
    let footer_height = 60;
    let total_height = graph_height + footer_height;

    svg_content.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        width, total_height, width, total_height
    ));
    svg_content.push_str(
        r#"<style>.cmd { font: 12px sans-serif; } .cmd:hover { stroke: black; stroke-width: 1; cursor: pointer; opacity: 0.9; }</style>"#,
    );
    svg_content.push_str(&format!(
        r#"<text x="{}" y="20" font-size="16" text-anchor="middle" font-weight="bold">{}</text>"#,
        width / 2,
        escape_xml(&config.title)
    ));

    let style = RenderStyle {
        h: height_per_level,
        graph_height,
        unit: &metric.unit,
    };
    render_node(&root, 0, 0.0, width as f64, &mut svg_content, &style);

    svg_content.push_str(&format!(
        r#"<text x="10" y="{}" font-size="12">Metric: {} ({}) | Total: {:.0}</text>"#,
        graph_height + 45,
        escape_xml(&metric.name),
        escape_xml(&metric.unit),
        root.value()
    ));
    svg_content.push_str("</svg>");

    info!("Flamegraph generated successfully ({} bytes)", svg_content.len());
    Ok(svg_content)
}

fn calculate_max_depth(node: &Node) -> usize {
    node.children
        .values()
        .map(|child| calculate_max_depth(child) + 1)
        .max()
        .unwrap_or(0)
}

fn get_node_color(depth: usize) -> &'static str {
    match depth {
        0 => "rgb(100, 149, 237)", // Cornflower Blue
        1 => "rgb(220, 20, 60)",   // Crimson
        2 => "rgb(255, 140, 0)",   // Dark Orange
        3 => "rgb(255, 165, 0)",   // Orange
        4 => "rgb(218, 165, 32)",  // Goldenrod
        _ => "rgb(169, 169, 169)", // Gray
    }
}

fn get_ansi_color(depth: usize) -> &'static str {
    match depth {
        0 | 1 => "\x1b[31;1m",
        2 => "\x1b[33m",
        3 => "\x1b[35m",
        _ => "\x1b[90m",
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

struct RenderStyle<'a> {
    h: usize,
    graph_height: usize,
    unit: &'a str,
}

fn render_node(node: &Node, level: usize, x: f64, w: f64, out: &mut String, style: &RenderStyle<'_>) {
    if w < 0.5 {
        return;
    }

    let color = get_node_color(level);
    // Inverted: root at the bottom, 30px margin for the title
    let y = style.graph_height - ((level + 1) * style.h) + 30;

    let label = if node.index.is_empty() {
        "all commands".to_string()
    } else {
        format!("command {}", node.index)
    };
    out.push_str(&format!(
        r#"<rect x="{:.2}" y="{}" width="{:.2}" height="{}" fill="{}" class="cmd"><title>{}: {:.0} {} [{:.0}, {:.0}]</title></rect>"#,
        x, y, w, style.h, color, label, node.perf.estimate, escape_xml(style.unit), node.perf.min, node.perf.max
    ));

    if w > 35.0 {
        let char_width = 7.0;
        let max_chars = (w / char_width) as usize;
        let name = node.name();
        let display_name = if name.len() > max_chars && max_chars > 3 {
            format!("{}...", &name[0..max_chars - 3])
        } else {
            name
        };
        out.push_str(&format!(
            r#"<text x="{:.2}" y="{}" dx="4" dy="14" font-size="12" fill="white" pointer-events="none">{}</text>"#,
            x, y, display_name
        ));
    }

    let total = node.value();
    if total <= 0.0 {
        return;
    }

    let mut children_vec: Vec<&Node> = node.children.values().collect();
    children_vec.sort_by(|a, b| b.value().total_cmp(&a.value()));

    let mut current_x = x;
    for child in children_vec {
        let child_w = (child.value() / total).min(1.0) * w;
        render_node(child, level + 1, current_x, child_w, out, style);
        current_x += child_w;
    }
}

/// Create a text summary of the heaviest command nodes
///
/// # Arguments
/// * `counters` - Computed counters
/// * `metric_id` - Metric to rank by
/// * `max_lines` - Number of nodes to list
pub fn generate_text_summary(counters: &GpuCounters, metric_id: i32, max_lines: usize) -> String {
    let Some(metric) = counters.metric(metric_id) else {
        return format!("  Unknown metric id {}", metric_id);
    };

    // Summation values are always computable, so -1 is a real sum there
    let additive = metric.op == AggregationOperator::Summation;
    let mut rows: Vec<(&CommandIndex, &Perf)> = counters
        .entries
        .iter()
        .filter_map(|e| e.value(metric_id).map(|p| (&e.command_index, p)))
        .filter(|(_, p)| additive || !p.is_unknown())
        .collect();
    rows.sort_by(|a, b| b.1.estimate.total_cmp(&a.1.estimate).then_with(|| a.0.cmp(b.0)));

    // Share of the whole trace only makes sense for additive metrics
    let total: Option<f64> = additive.then(|| {
        rows.iter()
            .filter(|(index, _)| index.depth() == 1)
            .map(|(_, p)| p.estimate)
            .sum::<f64>()
            .max(f64::MIN_POSITIVE)
    });

    let mut lines = Vec::new();
    lines.push(format!("  {} ({})", metric.name.to_uppercase(), metric.unit));
    lines.push("  ┏━━━━━━━━━━━━━━━━━━━━━━━━━━┳━━━━━━━━━━━━━━━━┳━━━━━━━━━━━━━━━━┳━━━━━━━━━━━━━━━━┳━━━━━━━━━┓".to_string());
    lines.push(format!(
        "  ┃ {:<24} ┃ {:^14} ┃ {:^14} ┃ {:^14} ┃ {:^7} ┃",
        "Command (Heaviest First)", "ESTIMATE", "MIN", "MAX", "%"
    ));
    lines.push("  ┣━━━━━━━━━━━━━━━━━━━━━━━━━━╋━━━━━━━━━━━━━━━━╋━━━━━━━━━━━━━━━━╋━━━━━━━━━━━━━━━━╋━━━━━━━━━┫".to_string());

    for (index, perf) in rows.iter().take(max_lines) {
        let color = get_ansi_color(index.depth());
        let reset = "\x1b[0m";

        let rendered = index.to_string();
        let display_index = if rendered.len() > 24 {
            format!("...{}", &rendered[rendered.len() - 21..])
        } else {
            rendered
        };
        let share = match total {
            Some(total) => format!("{:>6.1}%", perf.estimate / total * 100.0),
            None => format!("{:>7}", "-"),
        };

        lines.push(format!(
            "  ┃ {}{:<24}{} ┃ {:>14.2} ┃ {:>14.2} ┃ {:>14.2} ┃ {} ┃",
            color, display_index, reset, perf.estimate, perf.min, perf.max, share
        ));
    }

    lines.push("  ┗━━━━━━━━━━━━━━━━━━━━━━━━━━┻━━━━━━━━━━━━━━━━┻━━━━━━━━━━━━━━━━┻━━━━━━━━━━━━━━━━┻━━━━━━━━━┛".to_string());

    if rows.len() > max_lines {
        lines.push(String::new());
        lines.push(format!(
            "   (Showing top {} of {} command nodes)",
            max_lines,
            rows.len()
        ));
    }

    lines.join("\n")
}
