//! CLI commands for selective-testing
//!
//! - **select**: analyze a change and rewrite the test plan
//! - **output**: text, JSON and DOT rendering
//!
//! Commands accept `&WorkspaceContext` so the workspace is parsed once.

pub mod output;
pub mod select;

pub use select::{SelectOptions, run_select};
