//! Test plan mutation
//!
//! Every entry that resolves to a known target is enabled when the target is
//! affected and disabled otherwise. Entries that resolve to nothing are left
//! exactly as they were.

use super::document::{TargetReference, TestPlanDocument};
use super::resolve_container_reference;
use crate::core::error::{ResultExt, SelectResult};
use crate::graph::{TargetIdentity, WorkspaceModel};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Outcome of mutating one test plan
#[derive(Debug, Clone, Default, Serialize)]
pub struct MutationReport {
  pub plan: PathBuf,
  pub enabled: Vec<String>,
  pub disabled: Vec<String>,
  pub unresolved: Vec<String>,
  /// Whether the document differs from what was loaded
  pub changed: bool,
}

pub struct TestPlanMutator<'a> {
  model: &'a WorkspaceModel,
  root: &'a Path,
}

impl<'a> TestPlanMutator<'a> {
  pub fn new(model: &'a WorkspaceModel, root: &'a Path) -> Self {
    Self { model, root }
  }

  /// Target a test plan entry refers to.
  ///
  /// When a container declares the name under several flags, the test target
  /// wins: test plans only list test bundles.
  pub fn resolve(&self, reference: &TargetReference) -> Option<TargetIdentity> {
    let container = resolve_container_reference(self.root, &reference.container_path);
    let candidates = self.model.find_targets(&container, &reference.name);
    candidates
      .iter()
      .find(|t| t.is_test())
      .or_else(|| candidates.first())
      .cloned()
  }

  /// Enable exactly the affected entries of `document`.
  pub fn apply(&self, document: &mut TestPlanDocument, affected: &BTreeSet<TargetIdentity>) -> MutationReport {
    let mut report = MutationReport {
      plan: document.path().to_path_buf(),
      ..Default::default()
    };

    for (index, entry) in document.test_targets().into_iter().enumerate() {
      let Some(entry) = entry else {
        tracing::warn!(plan = %document.path().display(), index, "Test target entry has no target descriptor, leaving it untouched");
        report.unresolved.push(format!("#{}", index));
        continue;
      };

      let Some(identity) = self.resolve(&entry.target) else {
        tracing::warn!(
          plan = %document.path().display(),
          target = %entry.target.name,
          container = %entry.target.container_path,
          "Test target not found in workspace, leaving it untouched"
        );
        report.unresolved.push(entry.target.name.clone());
        continue;
      };

      let enabled = affected.contains(&identity);
      if entry.is_enabled() != enabled {
        tracing::debug!(name = %entry.target.name, enabled, "Flipping test target");
      }
      report.changed |= document.set_enabled(index, enabled);
      if enabled {
        report.enabled.push(entry.target.name.clone());
      } else {
        report.disabled.push(entry.target.name.clone());
      }
    }

    tracing::debug!(
      plan = %report.plan.display(),
      enabled = report.enabled.len(),
      disabled = report.disabled.len(),
      unresolved = report.unresolved.len(),
      "Mutated test plan"
    );
    report
  }
}

/// Write every document through sibling temporary files.
///
/// All temporary files are written before any plan is replaced, so a failed
/// write leaves every plan untouched. Temporary files are removed on failure.
pub fn write_all_atomic(documents: &[TestPlanDocument]) -> SelectResult<()> {
  let mut staged: Vec<(PathBuf, &Path)> = Vec::with_capacity(documents.len());

  for document in documents {
    let temp = temp_sibling(document.path());
    let written =
      std::fs::write(&temp, document.encode()).with_context(|| format!("Failed to write {}", temp.display()));
    if let Err(e) = written {
      // A directory squatting on the temp path is not ours to remove
      if temp.is_file() {
        remove_temp(&temp);
      }
      discard(&staged);
      return Err(e);
    }
    staged.push((temp, document.path()));
  }

  for (index, (temp, path)) in staged.iter().enumerate() {
    let renamed = std::fs::rename(temp, path).with_context(|| format!("Failed to replace {}", path.display()));
    if let Err(e) = renamed {
      discard(&staged[index..]);
      return Err(e);
    }
    tracing::debug!(plan = %path.display(), "Wrote test plan");
  }
  Ok(())
}

fn discard(staged: &[(PathBuf, &Path)]) {
  for (temp, _) in staged {
    remove_temp(temp);
  }
}

fn remove_temp(temp: &Path) {
  if let Err(e) = std::fs::remove_file(temp) {
    tracing::warn!(path = %temp.display(), error = %e, "Failed to remove temporary file");
  }
}

fn temp_sibling(path: &Path) -> PathBuf {
  let name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();
  path.with_file_name(format!(".{}.tmp", name))
}
