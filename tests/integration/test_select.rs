//! Integration tests for change analysis: changeset sources, propagation and reports

use crate::helpers::{TestWorkspace, affected_names, git, run, run_raw};
use anyhow::Result;

const ALL_SIX: [&str; 6] = ["MainApp", "MainAppTests", "Module", "ModuleTests", "SubModule", "SubModuleTests"];

#[test]
fn test_branch_comparison_reaches_every_dependent() -> Result<()> {
  let ws = TestWorkspace::new()?;
  git(&ws.path, &["checkout", "-b", "feature"])?;
  ws.write("SubModule/SubModule.swift", "// SubModule\nlet changed = true\n")?;
  ws.commit("Change SubModule")?;

  let names = affected_names(&ws.path, &["--base-branch", "main"])?;
  assert_eq!(names, ALL_SIX);

  Ok(())
}

#[test]
fn test_local_changes_against_current_branch() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.write("Module/Module.swift", "// Module\nlet changed = true\n")?;

  let names = affected_names(&ws.path, &[])?;
  assert_eq!(names, ["MainApp", "MainAppTests", "Module", "ModuleTests"]);

  Ok(())
}

#[test]
fn test_exact_file_ownership_beats_folders() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let names = affected_names(&ws.path, &["--changed-files", "Shared/SubModuleConfig.swift"])?;
  assert_eq!(names, ALL_SIX);

  Ok(())
}

#[test]
fn test_turbo_stops_after_one_hop() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let names = affected_names(&ws.path, &["--turbo", "--changed-files", "SubModule/New.swift"])?;
  assert_eq!(names, ["Module", "SubModule", "SubModuleTests"]);

  Ok(())
}

#[test]
fn test_unattributed_and_excluded_changes_are_not_errors() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run(
    &ws.path,
    &["--json", "--changed-files", "Docs/README.md,Scripts/build.sh"],
  )?;
  let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(report["targets"].as_array().map(Vec::len), Some(0));

  // Excluded files are dropped before attribution, so only the script is reported
  let unattributed = report["unattributed"].as_array().cloned().unwrap_or_default();
  assert_eq!(unattributed.len(), 1);
  assert!(unattributed[0].as_str().unwrap_or("").ends_with("Scripts/build.sh"));

  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("does not belong to any target"), "stderr: {}", stderr);

  Ok(())
}

#[test]
fn test_branch_comparison_requires_current_branch() -> Result<()> {
  let ws = TestWorkspace::new()?;
  git(&ws.path, &["checkout", "--detach"])?;

  let output = run_raw(&ws.path, &["--base-branch", "main", "--json"])?;
  assert_eq!(output.status.code(), Some(2));
  assert!(output.stdout.is_empty());

  // The local path only warns and diffs against HEAD
  let names = affected_names(&ws.path, &[])?;
  assert!(names.is_empty());

  Ok(())
}

#[test]
fn test_json_records_carry_provenance() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run(&ws.path, &["--json", "--changed-files", "Module/Module.swift"])?;
  let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
  let records = report["records"].as_array().cloned().unwrap_or_default();

  let direct = records
    .iter()
    .find(|r| r["cause"]["type"] == "direct")
    .expect("direct record");
  assert_eq!(direct["target"]["name"], "Module");

  let main_app_tests = records
    .iter()
    .find(|r| r["target"]["name"] == "MainAppTests")
    .expect("MainAppTests record");
  assert_eq!(
    main_app_tests["cause"]["chain"],
    serde_json::json!(["MainAppTests", "MainApp", "Module"])
  );
  assert_eq!(report["summary"]["targets_count"], 4);

  Ok(())
}

#[test]
fn test_dependency_graph_output() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run(&ws.path, &["--dependency-graph", "--changed-files", "Module/Module.swift"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("digraph"), "stdout: {}", stdout);
  assert!(stdout.contains("fillcolor"));
  assert!(stdout.contains("SubModuleTests"));

  Ok(())
}

#[test]
fn test_text_report() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run(&ws.path, &["--dry-run", "--changed-files", "SubModule/SubModule.swift"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("Direct impact: 1 targets"), "stdout: {}", stdout);
  assert!(stdout.contains("Indirect impact: 5 targets"));
  assert!(stdout.contains("Targets to test: 6"));

  Ok(())
}

#[test]
fn test_invalid_config_is_fatal() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.write("selective-testing.toml", "[[extra.targets]]\ncontainer = \"App.xcodeproj\"\n")?;

  let output = run_raw(&ws.path, &["--json", "--changed-files", "Module/Module.swift"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("selective-testing.toml"));

  Ok(())
}

#[test]
fn test_missing_workspace_root_suggests_a_fix() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_raw(&ws.path, &["--path", "Nowhere", "--changed-files", "Module/Module.swift"])?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("Nowhere"), "stderr: {}", stderr);
  assert!(stderr.contains("Help: Pass an existing directory with --path"));

  Ok(())
}
