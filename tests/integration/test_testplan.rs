//! Integration tests for test plan rewriting

use crate::helpers::{TEST_PLAN, TestWorkspace, run, run_raw};
use anyhow::Result;

const PLAN: &str = "App.xctestplan";

fn scheme_xml(action: &str) -> String {
  format!(
    r#"<?xml version="1.0" encoding="UTF-8"?>
<Scheme
   LastUpgradeVersion = "1500"
   version = "1.7">
   <TestAction
      buildConfiguration = "Debug"
      shouldUseLaunchSchemeArgsEnv = "YES">
{}
   </TestAction>
</Scheme>
"#,
    action
  )
}

fn write_scheme(ws: &TestWorkspace, action: &str) -> Result<()> {
  ws.write("App.xcodeproj/xcshareddata/xcschemes/App.xcscheme", &scheme_xml(action))
}

#[test]
fn test_unchanged_state_keeps_plan_byte_identical() -> Result<()> {
  let ws = TestWorkspace::new()?;

  // Module affects MainAppTests and ModuleTests, already enabled; SubModuleTests already disabled
  let output = run(&ws.path, &["--changed-files", "Module/Module.swift", "--test-plan", PLAN])?;
  assert_eq!(ws.read_file(PLAN)?, TEST_PLAN);

  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("Unchanged"), "stdout: {}", stdout);

  Ok(())
}

#[test]
fn test_affected_disabled_entry_is_enabled() -> Result<()> {
  let ws = TestWorkspace::new()?;

  run(&ws.path, &["--changed-files", "SubModule/SubModule.swift", "--test-plan", PLAN])?;
  let plan = ws.read_file(PLAN)?;

  assert_eq!(plan, TEST_PLAN.replace("\"enabled\" : false", "\"enabled\" : true"));

  Ok(())
}

#[test]
fn test_unaffected_entries_are_disabled_in_place() -> Result<()> {
  let ws = TestWorkspace::new()?;

  run(&ws.path, &["--changed-files", "Scripts/build.sh", "--test-plan", PLAN])?;
  let plan = ws.read_file(PLAN)?;

  // Sorted entries get the key in sorted position, with the IDE's separators
  assert!(plan.contains("{\n      \"enabled\" : false,\n      \"parallelizable\" : true,"), "plan: {}", plan);
  assert!(plan.contains("{\n      \"enabled\" : false,\n      \"target\" : {\n        \"containerPath\" : \"container:App.xcodeproj\",\n        \"identifier\" : \"A2\""));
  assert_eq!(plan.matches("\"enabled\" : false").count(), 3);

  // Unresolvable entries are left alone, escapes included
  assert!(plan.contains("{\n      \"target\" : {\n        \"containerPath\" : \"container:Legacy\\/Legacy.xcodeproj\""));
  assert!(plan.ends_with("\"version\" : 1\n}\n"));

  let parsed: serde_json::Value = serde_json::from_str(&plan)?;
  assert_eq!(parsed["testTargets"].as_array().map(Vec::len), Some(4));

  Ok(())
}

#[test]
fn test_dry_run_and_json_never_write() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run(&ws.path, &["--dry-run", "--changed-files", "Scripts/build.sh", "--test-plan", PLAN])?;
  assert_eq!(ws.read_file(PLAN)?, TEST_PLAN);
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("DRY RUN: Would update"), "stdout: {}", stdout);
  assert!(stdout.contains("0 enabled, 3 disabled, 1 untouched"));

  run(&ws.path, &["--json", "--changed-files", "Scripts/build.sh", "--test-plan", PLAN])?;
  assert_eq!(ws.read_file(PLAN)?, TEST_PLAN);

  Ok(())
}

#[test]
fn test_config_test_plan_is_the_default() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let config = ws.read_file("selective-testing.toml")?;
  ws.write(
    "selective-testing.toml",
    &config.replace("[workspace]\n", "[workspace]\ntest_plan = \"App.xctestplan\"\n"),
  )?;

  run(&ws.path, &["--changed-files", "SubModule/SubModule.swift"])?;
  assert!(ws.read_file(PLAN)?.contains("\"enabled\" : true"));

  Ok(())
}

#[test]
fn test_scheme_test_plans_are_rewritten() -> Result<()> {
  let ws = TestWorkspace::new()?;
  write_scheme(
    &ws,
    r#"      <TestPlans>
         <TestPlanReference
            reference = "container:App.xctestplan"
            default = "YES">
         </TestPlanReference>
      </TestPlans>"#,
  )?;

  let output = run(&ws.path, &["--scheme", "App", "--changed-files", "SubModule/SubModule.swift"])?;
  assert!(ws.read_file(PLAN)?.contains("\"enabled\" : true"));
  assert!(String::from_utf8_lossy(&output.stdout).contains("Updated"));

  Ok(())
}

#[test]
fn test_inline_testables_scheme_is_rejected() -> Result<()> {
  let ws = TestWorkspace::new()?;
  write_scheme(
    &ws,
    r#"      <Testables>
         <TestableReference
            skipped = "NO">
         </TestableReference>
      </Testables>"#,
  )?;

  let output = run_raw(&ws.path, &["--scheme", "App", "--changed-files", "Scripts/build.sh"])?;
  assert_eq!(output.status.code(), Some(3));
  assert_eq!(ws.read_file(PLAN)?, TEST_PLAN);

  Ok(())
}

#[test]
fn test_unknown_scheme_is_rejected() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_raw(&ws.path, &["--scheme", "Missing", "--changed-files", "Scripts/build.sh"])?;
  assert_eq!(output.status.code(), Some(3));
  assert!(String::from_utf8_lossy(&output.stderr).contains("Missing"));

  Ok(())
}

#[test]
fn test_missing_test_plan_aborts_without_writing() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_raw(
    &ws.path,
    &["--changed-files", "Scripts/build.sh", "--test-plan", "Nope.xctestplan"],
  )?;
  assert!(!output.status.success());
  assert_eq!(ws.read_file(PLAN)?, TEST_PLAN);

  Ok(())
}
