//! Package manifest parser
//!
//! The manifest is Swift source, so it is never read directly: the toolchain
//! evaluates it (`swift package dump-package`) and the JSON dump is mapped onto
//! a model fragment.
//!
//! - every target owns its source folder (explicit `path`, else the
//!   conventional `Sources/`, `Tests/` or `Plugins/` folder)
//! - intra-package dependencies become edges between targets
//! - product dependencies on local (`fileSystem`) packages are recorded
//!   against that package and expanded to the targets the product vends once
//!   every container is merged
//! - products are recorded with the targets they vend; they are never nodes

use super::WorkspaceParser;
use crate::core::error::{ResultExt, SelectError, SelectResult};
use crate::graph::{TargetIdentity, WorkspaceModel};
use crate::utils::absolutize;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::process::Command;

const MANIFEST: &str = "Package.swift";

pub struct PackageParser;

impl PackageParser {
  pub fn new() -> Self {
    Self
  }

  /// Evaluate the manifest through the toolchain
  fn dump_package(&self, package_root: &Path) -> SelectResult<String> {
    let output = Command::new("swift")
      .args(["package", "dump-package", "--package-path"])
      .arg(package_root)
      .output()
      .context("Failed to execute swift package dump-package")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(SelectError::parse(package_root.join(MANIFEST), stderr.trim()));
    }

    Ok(String::from_utf8(output.stdout)?)
  }
}

impl Default for PackageParser {
  fn default() -> Self {
    Self::new()
  }
}

impl WorkspaceParser for PackageParser {
  fn name(&self) -> &'static str {
    "package"
  }

  fn can_handle(&self, path: &Path) -> bool {
    path.join(MANIFEST).is_file()
  }

  fn parse(&self, path: &Path) -> SelectResult<WorkspaceModel> {
    let dump = self.dump_package(path)?;
    parse_dump(&dump, path)
  }
}

/// `dump-package` output (minimal fields we care about)
#[derive(Debug, Deserialize)]
struct PackageDump {
  #[serde(default)]
  dependencies: Vec<Map<String, Value>>,
  #[serde(default)]
  products: Vec<ProductDump>,
  #[serde(default)]
  targets: Vec<TargetDump>,
}

#[derive(Debug, Deserialize)]
struct ProductDump {
  name: String,
  #[serde(default)]
  targets: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TargetDump {
  name: String,
  #[serde(rename = "type", default)]
  kind: String,
  #[serde(default)]
  path: Option<String>,
  #[serde(default)]
  dependencies: Vec<Map<String, Value>>,
}

impl TargetDump {
  fn is_test(&self) -> bool {
    self.kind == "test"
  }

  /// Folder owning the target's sources, relative to the package root
  fn folder(&self) -> Option<PathBuf> {
    if let Some(path) = &self.path {
      return Some(PathBuf::from(path));
    }
    match self.kind.as_str() {
      "test" => Some(Path::new("Tests").join(&self.name)),
      "plugin" => Some(Path::new("Plugins").join(&self.name)),
      // Remote binaries have no sources in the repository
      "binary" => None,
      _ => Some(Path::new("Sources").join(&self.name)),
    }
  }
}

/// A dependency of a target, as written in the manifest
#[derive(Debug, PartialEq, Eq)]
enum TargetDependency {
  /// Either a sibling target or a product named like its package
  ByName(String),
  Target(String),
  Product { name: String, package: Option<String> },
}

impl TargetDependency {
  /// Entries are single-key objects: `{"byName": ["Name", null]}`
  fn from_entry(entry: &Map<String, Value>) -> Option<Self> {
    let (key, value) = entry.iter().next()?;
    let values = value.as_array()?;
    let text = |i: usize| values.get(i).and_then(Value::as_str).map(str::to_string);

    match key.as_str() {
      "byName" => text(0).map(TargetDependency::ByName),
      "target" => text(0).map(TargetDependency::Target),
      "product" => text(0).map(|name| TargetDependency::Product { name, package: text(1) }),
      _ => None,
    }
  }
}

/// Local package dependencies keyed by package identity (lowercased folder name)
fn local_packages(dump: &PackageDump, package_root: &Path) -> HashMap<String, PathBuf> {
  let mut packages = HashMap::new();
  for entry in &dump.dependencies {
    let Some(Value::Array(specs)) = entry.get("fileSystem") else {
      continue;
    };
    for spec in specs {
      let Some(path) = spec.get("path").and_then(Value::as_str) else {
        continue;
      };
      let path = absolutize(package_root, Path::new(path));
      let identity = spec
        .get("identity")
        .and_then(Value::as_str)
        .map(str::to_lowercase)
        .or_else(|| path.file_name().map(|n| n.to_string_lossy().to_lowercase()));
      if let Some(identity) = identity {
        packages.insert(identity, path);
      }
    }
  }
  packages
}

/// Map a `dump-package` JSON document onto a fragment rooted at `package_root`.
pub fn parse_dump(json: &str, package_root: &Path) -> SelectResult<WorkspaceModel> {
  let dump: PackageDump = serde_json::from_str(json)
    .map_err(|e| SelectError::parse(package_root.join(MANIFEST), format!("invalid manifest dump: {}", e)))?;

  let root = package_root.to_path_buf();
  let identity = |name: &str, is_test: bool| TargetIdentity::package(&root, name, is_test);
  let local_targets: HashMap<&str, TargetIdentity> = dump
    .targets
    .iter()
    .map(|t| (t.name.as_str(), identity(&t.name, t.is_test())))
    .collect();
  let local_packages = local_packages(&dump, package_root);

  let mut model = WorkspaceModel::new();

  for target in &dump.targets {
    let from = identity(&target.name, target.is_test());
    model.add_target(from.clone());
    if let Some(folder) = target.folder() {
      model.add_folder(from.clone(), absolutize(package_root, &folder));
    }

    for entry in &target.dependencies {
      let Some(dependency) = TargetDependency::from_entry(entry) else {
        tracing::debug!(name = %target.name, "Skipping unrecognized dependency entry");
        continue;
      };

      match dependency {
        TargetDependency::Target(name) => {
          if let Some(to) = local_targets.get(name.as_str()) {
            model.add_dependency(from.clone(), to.clone());
          }
        }
        TargetDependency::ByName(name) => {
          if let Some(to) = local_targets.get(name.as_str()) {
            model.add_dependency(from.clone(), to.clone());
          } else if let Some(path) = local_packages.get(&name.to_lowercase()) {
            model.add_product_dependency(from.clone(), path, &name);
          }
        }
        TargetDependency::Product { name, package } => {
          // Remote packages never change inside the repository
          if let Some(path) = package.and_then(|p| local_packages.get(&p.to_lowercase())) {
            model.add_product_dependency(from.clone(), path, &name);
          }
        }
      }
    }
  }

  for product in &dump.products {
    let vended: BTreeSet<TargetIdentity> = product
      .targets
      .iter()
      .filter_map(|name| local_targets.get(name.as_str()).cloned())
      .collect();
    model.add_product(&root, &product.name, vended);
  }

  Ok(model)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::{Changeset, PropagationMode, affected};

  const DUMP: &str = r#"{
    "name": "Core",
    "dependencies": [
      { "fileSystem": [ { "identity": "utils", "path": "/ws/Packages/Utils", "productFilter": null } ] },
      { "sourceControl": [ { "identity": "swift-log", "location": { "remote": [ "https://example.com/swift-log" ] } } ] }
    ],
    "products": [
      { "name": "Core", "targets": ["Core"], "type": { "library": ["automatic"] } },
      { "name": "CoreKit", "targets": ["Core", "CoreUI"], "type": { "library": ["automatic"] } }
    ],
    "targets": [
      { "name": "Core", "type": "regular", "path": null, "dependencies": [
          { "byName": ["Models", null] },
          { "product": ["Logging", "swift-log", null, null] },
          { "product": ["Utils", "utils", null, null] }
        ] },
      { "name": "CoreUI", "type": "regular", "path": "UI/CoreUI", "dependencies": [ { "target": ["Core", null] } ] },
      { "name": "Models", "type": "regular", "dependencies": [ { "byName": ["Utils", null] } ] },
      { "name": "CoreTests", "type": "test", "dependencies": [ { "byName": ["Core", null] } ] },
      { "name": "Lint", "type": "plugin", "dependencies": [] },
      { "name": "Blob", "type": "binary", "url": "https://example.com/blob.zip", "dependencies": [] }
    ],
    "toolsVersion": { "_version": "5.9.0" }
  }"#;

  fn pkg(name: &str) -> TargetIdentity {
    TargetIdentity::package("/ws/Packages/Core", name, name.ends_with("Tests"))
  }

  fn parse() -> WorkspaceModel {
    parse_dump(DUMP, Path::new("/ws/Packages/Core")).unwrap()
  }

  #[test]
  fn test_folders_follow_conventions() {
    let model = parse();
    let owner = |p: &str| model.owner_of_folder(Path::new(p)).cloned();
    assert_eq!(owner("/ws/Packages/Core/Sources/Core/A.swift"), Some(pkg("Core")));
    assert_eq!(owner("/ws/Packages/Core/UI/CoreUI/View.swift"), Some(pkg("CoreUI")));
    assert_eq!(owner("/ws/Packages/Core/Tests/CoreTests/T.swift"), Some(pkg("CoreTests")));
    assert_eq!(owner("/ws/Packages/Core/Plugins/Lint/main.swift"), Some(pkg("Lint")));
    assert!(model.targets().contains(&pkg("Blob")));
  }

  #[test]
  fn test_intra_package_edges() {
    let model = parse();
    let graph = model.dependency_graph();
    assert!(graph.dependencies(&pkg("CoreTests")).contains(&pkg("Core")));
    assert!(graph.dependencies(&pkg("Core")).contains(&pkg("Models")));
    assert!(graph.dependencies(&pkg("CoreUI")).contains(&pkg("Core")));
    assert!(pkg("CoreTests").is_test());
  }

  const UTILS_DUMP: &str = r#"{
    "name": "Utils",
    "products": [ { "name": "Utils", "targets": ["Utils", "UtilsMacros"], "type": { "library": ["automatic"] } } ],
    "targets": [
      { "name": "Utils", "type": "regular", "dependencies": [] },
      { "name": "UtilsMacros", "type": "regular", "dependencies": [] }
    ]
  }"#;

  fn utils(name: &str) -> TargetIdentity {
    TargetIdentity::package("/ws/Packages/Utils", name, false)
  }

  /// Core and Utils fragments merged and resolved, as a full load does
  fn workspace() -> WorkspaceModel {
    let mut model = parse();
    model.merge(parse_dump(UTILS_DUMP, Path::new("/ws/Packages/Utils")).unwrap());
    model.resolve_products();
    model
  }

  #[test]
  fn test_local_products_expand_to_vended_targets() {
    let model = workspace();
    let graph = model.dependency_graph();
    let vended = BTreeSet::from([utils("Utils"), utils("UtilsMacros")]);
    assert!(graph.dependencies(&pkg("Core")).is_superset(&vended));
    assert_eq!(graph.dependencies(&pkg("Models")), vended);
    // Models plus the two Utils targets; the remote product is dropped
    assert_eq!(graph.dependencies(&pkg("Core")).len(), 3);
  }

  #[test]
  fn test_products_are_not_graph_nodes() {
    let model = workspace();
    let graph = model.dependency_graph();
    assert!(!model.targets().contains(&pkg("CoreKit")));
    // Product `Core` vends Core; it must not make Core depend on anything else it vends
    assert!(!graph.dependencies(&pkg("Core")).contains(&pkg("CoreUI")));
  }

  #[test]
  fn test_product_named_like_target_adds_no_edges() {
    let dump = r#"{
      "products": [ { "name": "Core", "targets": ["Core", "CoreUI"] } ],
      "targets": [
        { "name": "Core", "type": "regular", "dependencies": [] },
        { "name": "CoreUI", "type": "regular", "dependencies": [ { "target": ["Core", null] } ] },
        { "name": "CoreTests", "type": "test", "dependencies": [ { "byName": ["Core", null] } ] }
      ]
    }"#;
    let mut model = parse_dump(dump, Path::new("/ws/Packages/Core")).unwrap();
    model.resolve_products();

    assert!(model.dependency_graph().dependencies(&pkg("Core")).is_empty());
    let analysis = affected::analyze(
      &model,
      &Changeset::from_paths(["/ws/Packages/Core/Sources/CoreUI/View.swift"]),
      PropagationMode::Transitive,
    );
    assert_eq!(analysis.impact.targets(), BTreeSet::from([pkg("CoreUI")]));
  }

  #[test]
  fn test_turbo_reaches_product_consumers() {
    let app = r#"{
      "dependencies": [ { "fileSystem": [ { "identity": "core", "path": "../Core" } ] } ],
      "targets": [
        { "name": "Feature", "type": "regular", "dependencies": [ { "product": ["CoreKit", "core", null, null] } ] }
      ]
    }"#;
    let mut model = parse();
    model.merge(parse_dump(app, Path::new("/ws/Packages/App")).unwrap());
    model.resolve_products();

    let feature = TargetIdentity::package("/ws/Packages/App", "Feature", false);
    let analysis = affected::analyze(
      &model,
      &Changeset::from_paths(["/ws/Packages/Core/UI/CoreUI/View.swift"]),
      PropagationMode::Restricted,
    );
    assert!(analysis.impact.targets().contains(&feature));
  }

  #[test]
  fn test_dependency_entries() {
    let entry = |json: &str| TargetDependency::from_entry(&serde_json::from_str(json).unwrap());
    assert_eq!(entry(r#"{"byName": ["A", null]}"#), Some(TargetDependency::ByName("A".into())));
    assert_eq!(
      entry(r#"{"product": ["P", "pkg", null]}"#),
      Some(TargetDependency::Product {
        name: "P".into(),
        package: Some("pkg".into())
      })
    );
    assert_eq!(entry(r#"{"macro": ["M"]}"#), None);
  }

  #[test]
  fn test_malformed_dump_reports_manifest() {
    let err = parse_dump("{ not json", Path::new("/ws/Pkg")).unwrap_err();
    match err {
      SelectError::Parse(e) => assert_eq!(e.path, PathBuf::from("/ws/Pkg/Package.swift")),
      other => panic!("unexpected error: {}", other),
    }
  }

  #[test]
  fn test_can_handle() {
    let dir = tempfile::TempDir::new().unwrap();
    let parser = PackageParser::new();
    assert!(!parser.can_handle(dir.path()));
    std::fs::write(dir.path().join("Package.swift"), "// swift-tools-version:5.9\n").unwrap();
    assert!(parser.can_handle(dir.path()));
  }
}
