//! Targets and edges declared in configuration
//!
//! Covers containers no parser reads (project bundles) and edges a parser
//! cannot see. References resolve against discovered targets by container and
//! name first, so a declared edge can point at a parsed package target without
//! repeating its test flag.

use crate::core::config::{ExtraConfig, TargetRef};
use crate::graph::{TargetIdentity, WorkspaceModel};
use crate::utils::{absolutize, normalize_path};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct DeclaredParser<'a> {
  root: &'a Path,
  extra: &'a ExtraConfig,
}

impl<'a> DeclaredParser<'a> {
  pub fn new(root: &'a Path, extra: &'a ExtraConfig) -> Self {
    Self { root, extra }
  }

  /// Build the declared fragment, resolving references against `discovered`.
  pub fn fragment(&self, discovered: &WorkspaceModel) -> WorkspaceModel {
    let mut model = WorkspaceModel::new();
    let mut declared: HashMap<(PathBuf, String), TargetIdentity> = HashMap::new();

    for target in &self.extra.targets {
      let identity = self.resolve(&target.reference(), discovered, &declared);
      declared.insert(self.key(&target.reference()), identity.clone());

      model.add_target(identity.clone());
      for file in &target.files {
        model.add_file(identity.clone(), absolutize(self.root, file));
      }
      for folder in &target.folders {
        model.add_folder(identity.clone(), absolutize(self.root, folder));
      }
    }

    for edge in &self.extra.dependencies {
      let from = self.resolve(&edge.from, discovered, &declared);
      let to = self.resolve(&edge.to, discovered, &declared);
      tracing::debug!(from = %from, to = %to, "Declared dependency");
      model.add_dependency(from, to);
    }

    model
  }

  fn key(&self, reference: &TargetRef) -> (PathBuf, String) {
    (
      normalize_path(&absolutize(self.root, &reference.container)),
      reference.name.clone(),
    )
  }

  /// Discovered target, then a target declared earlier, then the literal identity
  fn resolve(
    &self,
    reference: &TargetRef,
    discovered: &WorkspaceModel,
    declared: &HashMap<(PathBuf, String), TargetIdentity>,
  ) -> TargetIdentity {
    let (container, name) = self.key(reference);
    let literal = TargetIdentity::new(reference.kind, &container, &name, reference.test);

    let candidates = discovered.find_targets(&container, &name);
    match candidates {
      [] => declared.get(&(container, name)).cloned().unwrap_or(literal),
      [only] => only.clone(),
      // Same name under several flags: only an exact match is unambiguous
      many => many.iter().find(|t| **t == literal).cloned().unwrap_or(literal),
    }
  }
}
