//! Flamegraph rendering of the command tree.
//!
//! Command nodes are drawn as an icicle graph whose widths follow an
//! additive metric such as GPU time.

pub mod generator;

// Re-export main types
pub use generator::{generate_flamegraph, generate_text_summary, FlamegraphConfig};
