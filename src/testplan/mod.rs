//! Test plan documents
//!
//! - **document**: raw tree with typed views and `enabled` write-back
//! - **spans**: source spans so write-back is a splice, not a re-encode
//! - **mutate**: enable affected targets, disable the rest
//! - **scheme**: find the test plans a scheme runs

pub mod document;
pub mod mutate;
pub mod scheme;
pub mod spans;

pub use document::TestPlanDocument;
pub use mutate::{MutationReport, TestPlanMutator, write_all_atomic};
pub use scheme::Scheme;

use crate::utils::absolutize;
use std::path::{Path, PathBuf};

/// Resolve a `container:`/`absolute:` reference to an absolute path.
///
/// `container:` paths are relative to the workspace root. References without
/// a known prefix are treated the same way.
pub fn resolve_container_reference(root: &Path, reference: &str) -> PathBuf {
  if let Some(path) = reference.strip_prefix("absolute:") {
    return absolutize(root, Path::new(path));
  }
  let relative = reference
    .strip_prefix("container:")
    .or_else(|| reference.strip_prefix("group:"))
    .unwrap_or(reference);
  absolutize(root, Path::new(relative))
}
