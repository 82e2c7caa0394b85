//! Workspace model: file ownership plus the dependency graph
//!
//! One fragment is produced per parsed container; the run merges all fragments
//! into a single model and never mutates it afterwards.

use super::dependency_graph::DependencyGraph;
use super::target::TargetIdentity;
use crate::utils::{is_strictly_within, normalize_path, segment_count};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Ownership and dependency information for every target in the workspace.
#[derive(Debug, Default)]
pub struct WorkspaceModel {
  /// Explicit ownership from source/resource file lists
  files_by_target: BTreeMap<TargetIdentity, BTreeSet<PathBuf>>,

  /// Fallback ownership for targets declared by folder
  folders_by_target: BTreeMap<PathBuf, TargetIdentity>,

  dependency_graph: DependencyGraph,

  /// Library products: (package root, product name) → targets it vends
  products: BTreeMap<(PathBuf, String), BTreeSet<TargetIdentity>>,

  /// Product dependencies not yet expanded into target edges
  product_dependencies: BTreeSet<(TargetIdentity, PathBuf, String)>,

  /// Derived: exact path → owning target
  file_index: OnceLock<HashMap<PathBuf, TargetIdentity>>,

  /// Derived: (container path, target name) → targets, for resolving references
  name_index: OnceLock<HashMap<(PathBuf, String), Vec<TargetIdentity>>>,
}

impl Clone for WorkspaceModel {
  fn clone(&self) -> Self {
    Self {
      files_by_target: self.files_by_target.clone(),
      folders_by_target: self.folders_by_target.clone(),
      dependency_graph: self.dependency_graph.clone(),
      products: self.products.clone(),
      product_dependencies: self.product_dependencies.clone(),
      file_index: OnceLock::new(),
      name_index: OnceLock::new(),
    }
  }
}

impl PartialEq for WorkspaceModel {
  fn eq(&self, other: &Self) -> bool {
    self.files_by_target == other.files_by_target
      && self.folders_by_target == other.folders_by_target
      && self.dependency_graph == other.dependency_graph
      && self.products == other.products
      && self.product_dependencies == other.product_dependencies
  }
}

impl WorkspaceModel {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record that `target` owns the file at `path`.
  pub fn add_file(&mut self, target: TargetIdentity, path: impl AsRef<Path>) {
    self
      .files_by_target
      .entry(target)
      .or_default()
      .insert(normalize_path(path.as_ref()));
    self.invalidate();
  }

  /// Record that everything under `folder` belongs to `target` unless a file
  /// list says otherwise.
  pub fn add_folder(&mut self, target: TargetIdentity, folder: impl AsRef<Path>) {
    self.folders_by_target.insert(normalize_path(folder.as_ref()), target);
    self.invalidate();
  }

  /// Declare a target even if it owns nothing and has no edges.
  pub fn add_target(&mut self, target: TargetIdentity) {
    self.dependency_graph.insert_node(target);
    self.invalidate();
  }

  pub fn add_dependency(&mut self, from: TargetIdentity, to: TargetIdentity) {
    self.dependency_graph.insert_edge(from, to);
    self.invalidate();
  }

  /// Record that the package at `package` vends `targets` as product `name`.
  pub fn add_product(
    &mut self,
    package: impl AsRef<Path>,
    name: &str,
    targets: impl IntoIterator<Item = TargetIdentity>,
  ) {
    self
      .products
      .entry((normalize_path(package.as_ref()), name.to_string()))
      .or_default()
      .extend(targets);
  }

  /// Record that `from` depends on product `name` of the package at `package`.
  ///
  /// The package may live in another container, so the edge is only expanded
  /// by [`resolve_products`](Self::resolve_products) once every fragment is merged.
  pub fn add_product_dependency(&mut self, from: TargetIdentity, package: impl AsRef<Path>, name: &str) {
    self
      .product_dependencies
      .insert((from, normalize_path(package.as_ref()), name.to_string()));
  }

  /// Replace every product dependency with direct edges to the targets the
  /// product vends.
  ///
  /// Products never become graph nodes: a product named like one of its
  /// targets would otherwise alias that target. A product the model does not
  /// know falls back to a non-test target of the same name in that package;
  /// anything else is a package outside the workspace and is dropped.
  pub fn resolve_products(&mut self) {
    let pending = std::mem::take(&mut self.product_dependencies);
    for (from, package, name) in pending {
      let vended: Vec<TargetIdentity> = match self.products.get(&(package.clone(), name.clone())) {
        Some(targets) => targets.iter().cloned().collect(),
        None => self
          .find_targets(&package, &name)
          .iter()
          .filter(|t| !t.is_test())
          .cloned()
          .collect(),
      };

      if vended.is_empty() {
        tracing::debug!(
          product = %name,
          package = %package.display(),
          "Product not found in workspace, dropping dependency"
        );
        continue;
      }
      for to in vended {
        if to != from {
          self.dependency_graph.insert_edge(from.clone(), to);
        }
      }
    }
    self.invalidate();
  }

  /// Merge another fragment into this one.
  ///
  /// File sets, dependency sets and products are unioned. A folder claimed by
  /// two containers keeps the incoming owner.
  pub fn merge(&mut self, other: WorkspaceModel) {
    for (target, files) in other.files_by_target {
      self.files_by_target.entry(target).or_default().extend(files);
    }
    self.folders_by_target.extend(other.folders_by_target);
    self.dependency_graph.merge(other.dependency_graph);
    for (key, targets) in other.products {
      self.products.entry(key).or_default().extend(targets);
    }
    self.product_dependencies.extend(other.product_dependencies);
    self.invalidate();
  }

  pub fn dependency_graph(&self) -> &DependencyGraph {
    &self.dependency_graph
  }

  pub fn files_by_target(&self) -> &BTreeMap<TargetIdentity, BTreeSet<PathBuf>> {
    &self.files_by_target
  }

  pub fn folders_by_target(&self) -> &BTreeMap<PathBuf, TargetIdentity> {
    &self.folders_by_target
  }

  /// Owner of an exact file path, via the derived reverse index.
  pub fn owner_of_file(&self, path: &Path) -> Option<&TargetIdentity> {
    let index = self.file_index.get_or_init(|| {
      let mut index = HashMap::new();
      for (target, files) in &self.files_by_target {
        for file in files {
          index.insert(file.clone(), target.clone());
        }
      }
      index
    });
    index.get(path)
  }

  /// Owner of the most specific registered folder strictly containing `path`.
  pub fn owner_of_folder(&self, path: &Path) -> Option<&TargetIdentity> {
    self
      .folders_by_target
      .iter()
      .filter(|(folder, _)| is_strictly_within(path, folder))
      .max_by_key(|(folder, _)| segment_count(folder))
      .map(|(_, target)| target)
  }

  /// Every target known to the model: owners, folder owners and graph nodes.
  pub fn targets(&self) -> BTreeSet<TargetIdentity> {
    let mut targets = self.dependency_graph.nodes();
    targets.extend(self.files_by_target.keys().cloned());
    targets.extend(self.folders_by_target.values().cloned());
    targets
  }

  /// Targets declared in `container` under `name`, regardless of kind and test flag.
  pub fn find_targets(&self, container: &Path, name: &str) -> &[TargetIdentity] {
    let index = self.name_index.get_or_init(|| {
      let mut index: HashMap<(PathBuf, String), Vec<TargetIdentity>> = HashMap::new();
      for target in self.targets() {
        index
          .entry((normalize_path(target.path()), target.name().to_string()))
          .or_default()
          .push(target);
      }
      index
    });
    index
      .get(&(normalize_path(container), name.to_string()))
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  fn invalidate(&mut self) {
    self.file_index.take();
    self.name_index.take();
  }
}
