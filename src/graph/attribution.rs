//! Change attribution: which targets own the changed files
//!
//! Lookup order per changed path:
//! 1. Exact file ownership (O(1) through the model's reverse index)
//! 2. Most specific owning folder, compared by path segments
//! 3. Otherwise the path is unattributed and only logged

use super::affected::{AffectedTarget, Cause};
use super::changeset::Changeset;
use super::workspace_model::WorkspaceModel;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Result of attributing a changeset.
#[derive(Debug, Clone, Default)]
pub struct Attribution {
  /// One Direct record per attributed path
  pub direct: BTreeSet<AffectedTarget>,

  /// Changed paths no target claims
  pub unattributed: Vec<PathBuf>,
}

/// Maps changed paths onto directly affected targets.
pub struct ChangeAttributor<'a> {
  model: &'a WorkspaceModel,
}

impl<'a> ChangeAttributor<'a> {
  pub fn new(model: &'a WorkspaceModel) -> Self {
    Self { model }
  }

  pub fn attribute(&self, changeset: &Changeset) -> Attribution {
    let mut attribution = Attribution::default();

    for change in changeset.iter() {
      let owner = self
        .model
        .owner_of_file(&change.path)
        .or_else(|| self.model.owner_of_folder(&change.path));

      match owner {
        Some(target) => {
          tracing::debug!(path = %change.path.display(), target = %target, "Attributed change");
          attribution.direct.insert(AffectedTarget {
            target: target.clone(),
            cause: Cause::Direct {
              path: change.path.clone(),
              lines: change.changed_lines,
            },
          });
        }
        None => {
          tracing::warn!(path = %change.path.display(), "Changed file does not belong to any target");
          attribution.unattributed.push(change.path.clone());
        }
      }
    }

    attribution
  }
}
