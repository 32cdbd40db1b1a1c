//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod compute;
pub mod models;
pub mod utils;

// Re-export main command functions
pub use compute::{execute_compute, validate_args};
pub use models::ComputeArgs;
pub use utils::{display_schema, display_version, validate_report_file};
