//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Declared layout shared by every test:
/// MainAppTests→MainApp→Module, ModuleTests→Module→SubModule, SubModuleTests→SubModule
pub const CONFIG: &str = r#"[workspace]
exclude = ["Docs"]

[[extra.targets]]
container = "App.xcodeproj"
name = "MainApp"
folders = ["MainApp"]

[[extra.targets]]
container = "App.xcodeproj"
name = "Module"
folders = ["Module"]

[[extra.targets]]
container = "App.xcodeproj"
name = "SubModule"
folders = ["SubModule"]
files = ["Shared/SubModuleConfig.swift"]

[[extra.targets]]
container = "App.xcodeproj"
name = "MainAppTests"
test = true
folders = ["MainAppTests"]

[[extra.targets]]
container = "App.xcodeproj"
name = "ModuleTests"
test = true
folders = ["ModuleTests"]

[[extra.targets]]
container = "App.xcodeproj"
name = "SubModuleTests"
test = true
folders = ["SubModuleTests"]

[[extra.dependencies]]
from = { container = "App.xcodeproj", name = "MainAppTests" }
to = { container = "App.xcodeproj", name = "MainApp" }

[[extra.dependencies]]
from = { container = "App.xcodeproj", name = "MainApp" }
to = { container = "App.xcodeproj", name = "Module" }

[[extra.dependencies]]
from = { container = "App.xcodeproj", name = "ModuleTests" }
to = { container = "App.xcodeproj", name = "Module" }

[[extra.dependencies]]
from = { container = "App.xcodeproj", name = "Module" }
to = { container = "App.xcodeproj", name = "SubModule" }

[[extra.dependencies]]
from = { container = "App.xcodeproj", name = "SubModuleTests" }
to = { container = "App.xcodeproj", name = "SubModule" }
"#;

/// Test plan in the IDE's layout; `SubModuleTests` starts disabled
pub const TEST_PLAN: &str = r#"{
  "configurations" : [
    {
      "id" : "3C1A8A52-0000-4000-8000-000000000001",
      "name" : "Configuration 1",
      "options" : {

      }
    }
  ],
  "defaultOptions" : {
    "codeCoverage" : false
  },
  "testTargets" : [
    {
      "parallelizable" : true,
      "target" : {
        "containerPath" : "container:App.xcodeproj",
        "identifier" : "A1",
        "name" : "MainAppTests"
      }
    },
    {
      "target" : {
        "containerPath" : "container:App.xcodeproj",
        "identifier" : "A2",
        "name" : "ModuleTests"
      }
    },
    {
      "enabled" : false,
      "target" : {
        "containerPath" : "container:App.xcodeproj",
        "identifier" : "A3",
        "name" : "SubModuleTests"
      }
    },
    {
      "target" : {
        "containerPath" : "container:Legacy\/Legacy.xcodeproj",
        "identifier" : "B1",
        "name" : "LegacyTests"
      }
    }
  ],
  "version" : 1
}
"#;

/// A test workspace with git history
pub struct TestWorkspace {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestWorkspace {
  /// Create a workspace with the declared layout, one source file per
  /// target and the test plan, all committed on `main`
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;

    let ws = Self { _root: root, path };
    ws.write("selective-testing.toml", CONFIG)?;
    ws.write("App.xctestplan", TEST_PLAN)?;
    for target in ["MainApp", "Module", "SubModule", "MainAppTests", "ModuleTests", "SubModuleTests"] {
      ws.write(&format!("{}/{}.swift", target, target), &format!("// {}\n", target))?;
    }
    ws.write("Shared/SubModuleConfig.swift", "let config = 1\n")?;
    ws.write("Docs/README.md", "# Docs\n")?;
    ws.commit("Initial workspace setup")?;

    Ok(ws)
  }

  /// Write a file relative to the workspace, creating parent folders
  pub fn write(&self, file: &str, content: &str) -> Result<()> {
    let file_path = self.path.join(file);
    if let Some(parent) = file_path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(file_path, content)?;
    Ok(())
  }

  /// Read a file
  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }

  /// Commit current changes
  pub fn commit(&self, message: &str) -> Result<()> {
    git(&self.path, &["add", "."])?;
    git(&self.path, &["commit", "-m", message])?;
    Ok(())
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run the CLI, whatever its exit status
pub fn run_raw(cwd: &Path, args: &[&str]) -> Result<Output> {
  Command::new(env!("CARGO_BIN_EXE_selective-testing"))
    .current_dir(cwd)
    .args(args)
    .env_remove("RUST_LOG")
    .output()
    .context("Failed to run selective-testing")
}

/// Run the CLI and require success
pub fn run(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_raw(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "selective-testing failed: {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

/// Run with `--json` and return the sorted names of the targets to test
pub fn affected_names(cwd: &Path, args: &[&str]) -> Result<Vec<String>> {
  let mut all_args = vec!["--json"];
  all_args.extend_from_slice(args);
  let output = run(cwd, &all_args)?;
  let report: serde_json::Value = serde_json::from_slice(&output.stdout).context("stdout is not JSON")?;

  let mut names: Vec<String> = report["targets"]
    .as_array()
    .context("missing targets")?
    .iter()
    .filter_map(|t| t["name"].as_str().map(String::from))
    .collect();
  names.sort();
  Ok(names)
}
