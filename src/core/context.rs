//! Unified workspace context - build once, pass everywhere
//!
//! # Architecture
//!
//! ```text
//! main.rs:
//!   SelectConfig::discover() -> WorkspaceContext::build()
//!   |
//!   v
//! commands/select.rs:
//!   fn run_select(ctx: &WorkspaceContext, ..)
//! ```

use crate::adapters::{self, ParseOptions};
use crate::core::config::SelectConfig;
use crate::core::error::SelectResult;
use crate::graph::WorkspaceModel;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared workspace-level data for a single run.
///
/// The model is merged from every container fragment and never mutated
/// afterwards, so it is shared through `Arc`.
#[derive(Clone)]
pub struct WorkspaceContext {
  /// Workspace root directory (absolute path)
  pub root: PathBuf,

  /// Merged workspace model
  pub model: Arc<WorkspaceModel>,

  /// Persisted configuration, if a config file was found
  pub config: Option<Arc<SelectConfig>>,
}

impl WorkspaceContext {
  /// Build workspace context from a root directory.
  ///
  /// Discovers containers under `workspace_root`, parses them in parallel and
  /// merges the fragments together with the targets and edges the config
  /// declares.
  pub fn build(workspace_root: &Path, config: Option<SelectConfig>, options: ParseOptions) -> SelectResult<Self> {
    let root = workspace_root.to_path_buf();
    let config = config.map(Arc::new);
    let model = adapters::load_model(&root, config.as_deref(), options)?;

    tracing::debug!(
      root = %root.display(),
      targets = model.targets().len(),
      edges = model.dependency_graph().edge_count(),
      "Built workspace model"
    );

    Ok(Self {
      root,
      model: Arc::new(model),
      config,
    })
  }

  /// Get workspace root as Path reference (convenience)
  pub fn workspace_root(&self) -> &Path {
    &self.root
  }

  /// Folders excluded from attribution, absolute
  pub fn excluded_folders(&self) -> Vec<PathBuf> {
    self
      .config
      .as_ref()
      .map(|c| {
        c.workspace
          .exclude
          .iter()
          .map(|p| crate::utils::absolutize(&self.root, p))
          .collect()
      })
      .unwrap_or_default()
  }
}
