//! Report rendering: human-readable text, JSON and DOT

use crate::core::error::SelectResult;
use crate::graph::{AffectedAnalysis, AffectedTarget, Cause, TargetIdentity, WorkspaceModel};
use crate::testplan::MutationReport;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Serialized cause of one affected record
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum CauseReport<'a> {
  Direct { path: &'a Path, lines: u64 },
  Indirect { via: &'a TargetIdentity, chain: Vec<&'a str> },
}

#[derive(Debug, Serialize)]
struct RecordReport<'a> {
  target: &'a TargetIdentity,
  cause: CauseReport<'a>,
}

impl<'a> From<&'a AffectedTarget> for RecordReport<'a> {
  fn from(record: &'a AffectedTarget) -> Self {
    let cause = match &record.cause {
      Cause::Direct { path, lines } => CauseReport::Direct { path, lines: *lines },
      Cause::Indirect { via } => CauseReport::Indirect {
        via: &via.target,
        chain: record.chain().into_iter().map(TargetIdentity::name).collect(),
      },
    };
    Self {
      target: &record.target,
      cause,
    }
  }
}

/// JSON document printed by `--json`
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
  changed_files: &'a [PathBuf],
  unattributed: &'a [PathBuf],
  records: Vec<RecordReport<'a>>,
  targets: BTreeSet<TargetIdentity>,
  summary: Summary,
  #[serde(skip_serializing_if = "Option::is_none")]
  dependency_graph: Option<String>,
}

#[derive(Debug, Serialize)]
struct Summary {
  changed_files_count: usize,
  direct_count: usize,
  dependents_count: usize,
  targets_count: usize,
}

impl<'a> JsonReport<'a> {
  pub fn new(analysis: &'a AffectedAnalysis, dependency_graph: Option<String>) -> Self {
    let targets = analysis.impact.targets();
    Self {
      changed_files: &analysis.changed_files,
      unattributed: &analysis.unattributed,
      records: analysis.impact.records.iter().map(RecordReport::from).collect(),
      summary: Summary {
        changed_files_count: analysis.changed_files.len(),
        direct_count: analysis.impact.direct_targets().len(),
        dependents_count: analysis.impact.dependents().len(),
        targets_count: targets.len(),
      },
      targets,
      dependency_graph,
    }
  }

  pub fn to_json(&self) -> SelectResult<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }
}

/// DOT rendering of the whole dependency graph, affected targets highlighted
pub fn render_dot(model: &WorkspaceModel, analysis: &AffectedAnalysis) -> String {
  model.dependency_graph().to_dot(&analysis.impact.targets())
}

fn display_path<'p>(path: &'p Path, root: &Path) -> std::path::Display<'p> {
  path.strip_prefix(root).unwrap_or(path).display()
}

/// Display results in human-readable text format
pub fn print_text(analysis: &AffectedAnalysis, root: &Path) {
  println!("Affected Analysis");
  println!("=================");
  println!();

  println!("Changed files: {}", analysis.changed_files.len());
  if !analysis.changed_files.is_empty() && analysis.changed_files.len() <= 20 {
    for file in &analysis.changed_files {
      println!("  {}", display_path(file, root));
    }
    println!();
  }

  if !analysis.unattributed.is_empty() {
    println!("Unattributed files: {}", analysis.unattributed.len());
    for file in &analysis.unattributed {
      println!("  ⚠️  {}", display_path(file, root));
    }
    println!();
  }

  let direct = analysis.impact.direct_targets();
  println!("Direct impact: {} targets", direct.len());
  for target in &direct {
    println!("  📦 {}", target);
  }
  println!();

  let dependents = analysis.impact.dependents();
  println!("Indirect impact: {} targets", dependents.len());
  for target in &dependents {
    let via: BTreeSet<&str> = analysis
      .impact
      .records
      .iter()
      .filter(|r| &r.target == target)
      .filter_map(|r| r.via().map(|v| v.target.name()))
      .collect();
    println!("  ⬆  {} (via {})", target, via.into_iter().collect::<Vec<_>>().join(", "));
  }
  println!();

  let targets = analysis.impact.targets();
  println!("Targets to test: {}", targets.len());
  for target in &targets {
    println!("  🎯 {}", target);
  }
}

/// Summarize what happened (or would happen) to each test plan
pub fn print_mutations(reports: &[MutationReport], root: &Path, dry_run: bool) {
  println!();
  for report in reports {
    let plan = display_path(&report.plan, root);
    let verb = match (dry_run, report.changed) {
      (true, true) => "DRY RUN: Would update",
      (true, false) | (false, false) => "Unchanged",
      (false, true) => "✅ Updated",
    };
    println!(
      "{} {}: {} enabled, {} disabled, {} untouched",
      verb,
      plan,
      report.enabled.len(),
      report.disabled.len(),
      report.unresolved.len()
    );
  }
}
