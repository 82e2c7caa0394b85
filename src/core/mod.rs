//! Core engine for selective-testing
//!
//! - **config**: persisted configuration (selective-testing.toml)
//! - **context**: workspace context built once per run
//! - **error**: error types with contextual help messages
//! - **vcs**: changed files from git (SystemGit)

pub mod config;
pub mod context;
pub mod error;
pub mod vcs;
