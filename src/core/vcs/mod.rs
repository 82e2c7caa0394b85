//! Source control collaborator: changed files between two points in history

pub mod system_git;

pub use system_git::SystemGit;
