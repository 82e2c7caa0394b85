use crate::core::error::{ConfigError, ResultExt, SelectResult};
use crate::graph::TargetKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for selective-testing
/// Searched in order: selective-testing.toml, .selective-testing.toml, .config/selective-testing.toml
///
/// `workspace.root` is relative to the directory the tool runs in; every other
/// path is relative to the workspace root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectConfig {
  #[serde(default)]
  pub workspace: WorkspaceConfig,
  #[serde(default)]
  pub extra: ExtraConfig,
}

/// Defaults for the run, each overridable from the command line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
  /// Container path to analyze (default: current directory)
  #[serde(default)]
  pub root: Option<PathBuf>,

  /// Test plan to rewrite
  #[serde(default)]
  pub test_plan: Option<PathBuf>,

  /// Scheme whose test plans are rewritten when no test plan is given
  #[serde(default)]
  pub scheme: Option<String>,

  /// Changes inside these folders never affect any target
  #[serde(default)]
  pub exclude: Vec<PathBuf>,
}

/// Statically declared workspace facts merged into the parsed model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtraConfig {
  #[serde(default)]
  pub targets: Vec<DeclaredTarget>,
  #[serde(default)]
  pub dependencies: Vec<DeclaredDependency>,
}

/// Reference to a target by container and name
///
/// # Example
///
/// ```toml
/// from = { container = "App.xcodeproj", name = "AppTests", test = true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRef {
  pub container: PathBuf,
  pub name: String,
  #[serde(default)]
  pub kind: TargetKind,
  #[serde(default)]
  pub test: bool,
}

/// A target with ownership declared in config
///
/// # Example
///
/// ```toml
/// [[extra.targets]]
/// container = "App.xcodeproj"
/// name = "App"
/// files = ["App/AppDelegate.swift"]
/// folders = ["App"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclaredTarget {
  pub container: PathBuf,
  pub name: String,
  #[serde(default)]
  pub kind: TargetKind,
  #[serde(default)]
  pub test: bool,
  #[serde(default)]
  pub files: Vec<PathBuf>,
  #[serde(default)]
  pub folders: Vec<PathBuf>,
}

impl DeclaredTarget {
  pub fn reference(&self) -> TargetRef {
    TargetRef {
      container: self.container.clone(),
      name: self.name.clone(),
      kind: self.kind,
      test: self.test,
    }
  }
}

/// A dependency edge declared in config: `from` depends on `to`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclaredDependency {
  pub from: TargetRef,
  pub to: TargetRef,
}

impl SelectConfig {
  /// Find config file in search order
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = [
      path.join("selective-testing.toml"),
      path.join(".selective-testing.toml"),
      path.join(".config").join("selective-testing.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load the first config found in `dirs`, searched in order.
  ///
  /// Configuration is optional: no file anywhere is `None`, not an error.
  pub fn discover<'p>(dirs: impl IntoIterator<Item = &'p Path>) -> SelectResult<Option<Self>> {
    dirs
      .into_iter()
      .find_map(Self::find_config_path)
      .map(|path| Self::load_from(&path))
      .transpose()
  }

  /// Load config from an explicit file
  pub fn load_from(config_path: &Path) -> SelectResult<Self> {
    let content = fs::read_to_string(config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: SelectConfig = toml_edit::de::from_str(&content).map_err(|e| ConfigError::Invalid {
      path: config_path.to_path_buf(),
      reason: e.to_string(),
    })?;

    config.validate().map_err(|reason| ConfigError::Invalid {
      path: config_path.to_path_buf(),
      reason,
    })?;

    tracing::debug!(path = %config_path.display(), "Loaded configuration");
    Ok(config)
  }

  fn validate(&self) -> Result<(), String> {
    let refs = self
      .extra
      .targets
      .iter()
      .map(DeclaredTarget::reference)
      .chain(self.extra.dependencies.iter().flat_map(|d| [d.from.clone(), d.to.clone()]));

    for target in refs {
      if target.name.trim().is_empty() {
        return Err(format!(
          "target in container '{}' has an empty name",
          target.container.display()
        ));
      }
      if target.container.as_os_str().is_empty() {
        return Err(format!("target '{}' has an empty container path", target.name));
      }
    }

    Ok(())
  }
}
