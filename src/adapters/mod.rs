//! Container-specific parsers producing workspace model fragments
//!
//! Every container found under the workspace root is handed to the first
//! parser that claims it. Fragments are parsed in parallel and merged in
//! discovery order, then the targets and edges declared in config are merged
//! on top. Product dependencies across packages are expanded last, once every
//! package's products are known.
//!
//! Currently supports:
//! - Package manifests (`Package.swift`, read through `swift package dump-package`)
//! - Config-declared targets and edges (any container kind)

use crate::core::config::SelectConfig;
use crate::core::error::{SelectError, SelectResult};
use crate::graph::WorkspaceModel;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub mod declared;
pub mod package;
pub mod parallel;

pub use declared::DeclaredParser;
pub use package::PackageParser;

/// Folder names never descended into during discovery
const SKIPPED_DIRS: &[&str] = &[".build", "DerivedData", "node_modules", "Pods", "Carthage"];

/// Parser trait
///
/// Each container format implements this trait to turn one container into a
/// model fragment. Implementations must not share mutable state: fragments are
/// built concurrently.
pub trait WorkspaceParser: Send + Sync {
  /// Short name used in logs
  fn name(&self) -> &'static str;

  /// Detect if this parser can handle the container at `path`
  fn can_handle(&self, path: &Path) -> bool;

  /// Parse a container into a fragment with absolute paths
  fn parse(&self, path: &Path) -> SelectResult<WorkspaceModel>;
}

/// Options for building the model
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
  /// Draw a progress bar while parsing containers
  pub progress: bool,
}

/// A discovered container and the parser that claimed it
pub struct Container<'a> {
  pub path: PathBuf,
  pub parser: &'a dyn WorkspaceParser,
}

/// Every available parser, in priority order
pub fn parsers() -> Vec<Box<dyn WorkspaceParser>> {
  vec![Box::new(PackageParser::new())]
}

/// Walk `root` and collect every container some parser can handle.
///
/// Hidden folders and build or dependency output folders are skipped. The
/// result is sorted by path so batches are stable between runs.
pub fn discover_containers<'a>(root: &Path, parsers: &'a [Box<dyn WorkspaceParser>]) -> SelectResult<Vec<Container<'a>>> {
  let walker = WalkDir::new(root)
    .follow_links(false)
    .into_iter()
    .filter_entry(|e| e.depth() == 0 || !should_skip(e.path()));

  let mut containers = Vec::new();
  for entry in walker {
    let entry = entry.map_err(|e| SelectError::message(format!("Failed to walk {}: {}", root.display(), e)))?;
    if !entry.file_type().is_dir() {
      continue;
    }
    if let Some(parser) = parsers.iter().find(|p| p.can_handle(entry.path())) {
      containers.push(Container {
        path: entry.path().to_path_buf(),
        parser: parser.as_ref(),
      });
    }
  }

  containers.sort_by(|a, b| a.path.cmp(&b.path));
  tracing::debug!(count = containers.len(), "Discovered containers");
  Ok(containers)
}

pub(crate) fn should_skip(path: &Path) -> bool {
  let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
    return true;
  };
  (name.starts_with('.') && name != ".") || SKIPPED_DIRS.contains(&name) || is_bundle(name)
}

/// Project and workspace bundles hold metadata, never nested containers
fn is_bundle(name: &str) -> bool {
  name.ends_with(".xcodeproj") || name.ends_with(".xcworkspace")
}

/// Build the merged model for the workspace at `root`.
pub fn load_model(root: &Path, config: Option<&SelectConfig>, options: ParseOptions) -> SelectResult<WorkspaceModel> {
  let parsers = parsers();
  let containers = discover_containers(root, &parsers)?;
  let mut model = parallel::parse_containers(&containers, options)?;

  if let Some(config) = config {
    let declared = DeclaredParser::new(root, &config.extra).fragment(&model);
    model.merge(declared);
  }
  model.resolve_products();

  Ok(model)
}
