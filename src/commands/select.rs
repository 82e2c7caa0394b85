//! `selective-testing` - pick the tests a change needs and rewrite the test plan
//!
//! 1. Collect the changeset (explicit list, or git against a base branch or
//!    the local working tree) and drop excluded folders
//! 2. Attribute changed files to targets and propagate over reverse edges
//! 3. Report (text, JSON, DOT)
//! 4. Enable affected entries in every test plan, disable the rest, and write
//!    all documents atomically
//!
//! Every fatal error aborts before any document is written.

use super::output::{self, JsonReport};
use crate::core::context::WorkspaceContext;
use crate::core::error::SelectResult;
use crate::core::vcs::SystemGit;
use crate::graph::{AffectedAnalysis, Changeset, PropagationMode, affected};
use crate::testplan::{MutationReport, Scheme, TestPlanDocument, TestPlanMutator, write_all_atomic};
use crate::utils::absolutize;
use std::path::PathBuf;

/// Options for one run, command line merged over config
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
  /// Compare the current branch against this branch instead of the working tree
  pub base_branch: Option<String>,
  /// Use these files instead of asking git
  pub changed_files: Option<Vec<PathBuf>>,
  pub test_plan: Option<PathBuf>,
  pub scheme: Option<String>,
  pub json: bool,
  pub dependency_graph: bool,
  pub dry_run: bool,
  /// One reverse hop only
  pub turbo: bool,
}

impl SelectOptions {
  fn mode(&self) -> PropagationMode {
    if self.turbo {
      PropagationMode::Restricted
    } else {
      PropagationMode::Transitive
    }
  }
}

/// Run the select command
pub fn run_select(ctx: &WorkspaceContext, options: SelectOptions) -> SelectResult<()> {
  let changeset = collect_changeset(ctx, &options)?.without_excluded(&ctx.excluded_folders());
  let analysis = affected::analyze(&ctx.model, &changeset, options.mode());

  if options.json {
    let graph = options
      .dependency_graph
      .then(|| output::render_dot(&ctx.model, &analysis));
    println!("{}", JsonReport::new(&analysis, graph).to_json()?);
    // JSON output is for tooling; it never rewrites documents
    return Ok(());
  }

  if options.dependency_graph {
    println!("{}", output::render_dot(&ctx.model, &analysis));
  } else {
    output::print_text(&analysis, ctx.workspace_root());
  }

  let plans = resolve_test_plans(ctx, &options)?;
  if plans.is_empty() {
    tracing::info!("No test plan configured, nothing to rewrite");
    return Ok(());
  }

  let (documents, reports) = mutate_test_plans(ctx, &analysis, &plans)?;
  if !options.dependency_graph {
    output::print_mutations(&reports, ctx.workspace_root(), options.dry_run);
  }

  if options.dry_run {
    return Ok(());
  }

  let changed: Vec<TestPlanDocument> = documents
    .into_iter()
    .zip(&reports)
    .filter(|(_, report)| report.changed)
    .map(|(doc, _)| doc)
    .collect();
  write_all_atomic(&changed)?;
  tracing::debug!(written = changed.len(), "Wrote test plans");

  Ok(())
}

/// Changed files from the explicit list, or from git
fn collect_changeset(ctx: &WorkspaceContext, options: &SelectOptions) -> SelectResult<Changeset> {
  if let Some(files) = &options.changed_files {
    tracing::debug!(count = files.len(), "Using explicit changed files");
    return Ok(Changeset::from_paths(files).absolutize(ctx.workspace_root()));
  }

  let git = SystemGit::open(ctx.workspace_root())?;
  git.changeset(options.base_branch.as_deref())
}

/// Test plans to rewrite: `--test-plan`, else `--scheme`, else config defaults
fn resolve_test_plans(ctx: &WorkspaceContext, options: &SelectOptions) -> SelectResult<Vec<PathBuf>> {
  let root = ctx.workspace_root();
  let workspace = ctx.config.as_ref().map(|c| &c.workspace);

  if let Some(plan) = &options.test_plan {
    return Ok(vec![absolutize(root, plan)]);
  }
  if let Some(name) = &options.scheme {
    return Ok(Scheme::find(root, name)?.test_plans()?.to_vec());
  }
  if let Some(plan) = workspace.and_then(|w| w.test_plan.as_ref()) {
    return Ok(vec![absolutize(root, plan)]);
  }
  if let Some(name) = workspace.and_then(|w| w.scheme.as_ref()) {
    return Ok(Scheme::find(root, name)?.test_plans()?.to_vec());
  }
  Ok(Vec::new())
}

/// Load and mutate every plan in memory; nothing touches disk here
fn mutate_test_plans(
  ctx: &WorkspaceContext,
  analysis: &AffectedAnalysis,
  plans: &[PathBuf],
) -> SelectResult<(Vec<TestPlanDocument>, Vec<MutationReport>)> {
  let affected = analysis.impact.targets();
  let mutator = TestPlanMutator::new(&ctx.model, ctx.workspace_root());

  let mut documents = Vec::with_capacity(plans.len());
  let mut reports = Vec::with_capacity(plans.len());
  for path in plans {
    let mut document = TestPlanDocument::load(path)?;
    tracing::debug!(
      plan = %path.display(),
      version = ?document.version(),
      configurations = document.configurations().len(),
      "Loaded test plan"
    );
    reports.push(mutator.apply(&mut document, &affected));
    documents.push(document);
  }
  Ok((documents, reports))
}
