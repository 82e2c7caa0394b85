//! Target identity - the key every other structure is indexed by

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Which kind of container declares a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
  /// Declared by an IDE project container
  #[default]
  Project,
  /// Declared by a package manifest
  Package,
}

impl fmt::Display for TargetKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TargetKind::Project => write!(f, "project"),
      TargetKind::Package => write!(f, "package"),
    }
  }
}

/// A unique buildable or testable unit in the workspace.
///
/// Equality, hashing and ordering cover every field, so the same target name in
/// two containers, or a test and non-test target sharing a name, stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TargetIdentity {
  Project {
    container_path: PathBuf,
    name: String,
    is_test: bool,
  },
  Package {
    /// Package root directory (the folder holding the manifest)
    manifest_path: PathBuf,
    name: String,
    is_test: bool,
  },
}

impl TargetIdentity {
  pub fn project(container_path: impl Into<PathBuf>, name: impl Into<String>, is_test: bool) -> Self {
    TargetIdentity::Project {
      container_path: container_path.into(),
      name: name.into(),
      is_test,
    }
  }

  pub fn package(manifest_path: impl Into<PathBuf>, name: impl Into<String>, is_test: bool) -> Self {
    TargetIdentity::Package {
      manifest_path: manifest_path.into(),
      name: name.into(),
      is_test,
    }
  }

  pub fn new(kind: TargetKind, path: impl Into<PathBuf>, name: impl Into<String>, is_test: bool) -> Self {
    match kind {
      TargetKind::Project => Self::project(path, name, is_test),
      TargetKind::Package => Self::package(path, name, is_test),
    }
  }

  pub fn kind(&self) -> TargetKind {
    match self {
      TargetIdentity::Project { .. } => TargetKind::Project,
      TargetIdentity::Package { .. } => TargetKind::Package,
    }
  }

  /// Container path for projects, package root for packages
  pub fn path(&self) -> &Path {
    match self {
      TargetIdentity::Project { container_path, .. } => container_path,
      TargetIdentity::Package { manifest_path, .. } => manifest_path,
    }
  }

  pub fn name(&self) -> &str {
    match self {
      TargetIdentity::Project { name, .. } | TargetIdentity::Package { name, .. } => name,
    }
  }

  pub fn is_test(&self) -> bool {
    match self {
      TargetIdentity::Project { is_test, .. } | TargetIdentity::Package { is_test, .. } => *is_test,
    }
  }
}

impl fmt::Display for TargetIdentity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let container = self
      .path()
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| self.path().display().to_string());
    write!(f, "{} ({})", self.name(), container)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn test_identity_covers_every_field() {
    let app = TargetIdentity::project("App.xcodeproj", "App", false);
    let mut set = HashSet::new();
    set.insert(app.clone());
    set.insert(TargetIdentity::project("App.xcodeproj", "App", false));
    set.insert(TargetIdentity::project("App.xcodeproj", "App", true));
    set.insert(TargetIdentity::project("Other.xcodeproj", "App", false));
    set.insert(TargetIdentity::package("App.xcodeproj", "App", false));
    assert_eq!(set.len(), 4);
  }

  #[test]
  fn test_accessors() {
    let core = TargetIdentity::new(TargetKind::Package, "/ws/Packages/Core", "CoreTests", true);
    assert_eq!(core.kind(), TargetKind::Package);
    assert_eq!(core.path(), Path::new("/ws/Packages/Core"));
    assert_eq!(core.name(), "CoreTests");
    assert!(core.is_test());
    assert_eq!(core.to_string(), "CoreTests (Core)");
  }

  #[test]
  fn test_serializes_with_kind_tag() {
    let target = TargetIdentity::project("App.xcodeproj", "App", false);
    let json = serde_json::to_value(&target).unwrap();
    assert_eq!(json["kind"], "project");
    assert_eq!(json["name"], "App");
  }
}
