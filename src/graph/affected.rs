//! Affected target analysis
//!
//! Given a set of changed files, determine:
//! - Which targets directly own those files
//! - Which targets transitively depend on them, and through which path
//! - The final set of targets whose tests must run

use super::attribution::ChangeAttributor;
use super::changeset::Changeset;
use super::dependency_graph::DependencyGraph;
use super::target::TargetIdentity;
use super::workspace_model::WorkspaceModel;
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Why a target is affected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Cause {
  /// The target owns a changed file
  Direct { path: PathBuf, lines: u64 },
  /// The target depends on another affected record
  Indirect { via: Arc<AffectedTarget> },
}

/// A target together with one reason it is affected.
///
/// The same target can carry several records: one per changed file it owns and
/// one per distinct dependency it was reached through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AffectedTarget {
  pub target: TargetIdentity,
  pub cause: Cause,
}

impl AffectedTarget {
  pub fn is_direct(&self) -> bool {
    matches!(self.cause, Cause::Direct { .. })
  }

  /// The immediate predecessor record, if any.
  pub fn via(&self) -> Option<&AffectedTarget> {
    match &self.cause {
      Cause::Direct { .. } => None,
      Cause::Indirect { via } => Some(via),
    }
  }

  /// Provenance chain from this target back to the directly changed one.
  pub fn chain(&self) -> Vec<&TargetIdentity> {
    let mut chain = vec![&self.target];
    let mut current = self;
    while let Some(prev) = current.via() {
      chain.push(&prev.target);
      current = prev;
    }
    chain
  }

  /// The Direct record at the end of the chain.
  pub fn origin(&self) -> &AffectedTarget {
    let mut current = self;
    while let Some(prev) = current.via() {
      current = prev;
    }
    current
  }
}

/// How far impact spreads over reverse dependency edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropagationMode {
  /// Full transitive closure
  #[default]
  Transitive,
  /// Only immediate dependents of directly changed targets ("turbo")
  Restricted,
}

/// Direct and indirect records produced by propagation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AffectedSet {
  pub records: BTreeSet<AffectedTarget>,
}

impl AffectedSet {
  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  /// Unique targets, whatever the cause
  pub fn targets(&self) -> BTreeSet<TargetIdentity> {
    self.records.iter().map(|r| r.target.clone()).collect()
  }

  /// Targets owning at least one changed file
  pub fn direct_targets(&self) -> BTreeSet<TargetIdentity> {
    self
      .records
      .iter()
      .filter(|r| r.is_direct())
      .map(|r| r.target.clone())
      .collect()
  }

  /// Targets affected only through their dependencies
  pub fn dependents(&self) -> BTreeSet<TargetIdentity> {
    let direct = self.direct_targets();
    self
      .records
      .iter()
      .filter(|r| !r.is_direct() && !direct.contains(&r.target))
      .map(|r| r.target.clone())
      .collect()
  }
}

/// Spread impact from the direct records over reverse dependency edges.
///
/// Breadth-first fixpoint. `visited` is keyed on the pair (dependent,
/// predecessor target), not on the predecessor record: a dependent `D` reached
/// from a record for `T` is recorded once per distinct pair `(D, T)`. Two
/// dependency paths into `D` give two provenance records, while several records
/// for `T` (say, two changed files it owns) give `D` a single record via
/// whichever of them is expanded first. Cycles terminate because there are only
/// finitely many pairs.
pub fn propagate(
  graph: &DependencyGraph,
  direct: &BTreeSet<AffectedTarget>,
  mode: PropagationMode,
) -> AffectedSet {
  let mut records = direct.clone();
  let mut visited: HashSet<(TargetIdentity, TargetIdentity)> = HashSet::new();
  let mut frontier: Vec<Arc<AffectedTarget>> = direct.iter().cloned().map(Arc::new).collect();
  let mut hops = 0usize;

  while !frontier.is_empty() {
    if mode == PropagationMode::Restricted && hops == 1 {
      break;
    }

    let mut next = Vec::new();
    for record in &frontier {
      for dependent in graph.dependents(&record.target) {
        if !visited.insert((dependent.clone(), record.target.clone())) {
          continue;
        }

        let produced = AffectedTarget {
          target: dependent,
          cause: Cause::Indirect {
            via: Arc::clone(record),
          },
        };
        records.insert(produced.clone());
        next.push(Arc::new(produced));
      }
    }

    tracing::debug!(hop = hops + 1, produced = next.len(), "Propagation pass");
    frontier = next;
    hops += 1;
  }

  AffectedSet { records }
}

/// Complete affected analysis.
#[derive(Debug, Clone)]
pub struct AffectedAnalysis {
  /// Files that changed
  pub changed_files: Vec<PathBuf>,

  /// Changed files no target owns
  pub unattributed: Vec<PathBuf>,

  /// Impact set
  pub impact: AffectedSet,
}

/// Analyze which targets are affected by a changeset.
///
/// Algorithm:
/// 1. Attribute files → owning targets (exact, then folder fallback)
/// 2. Propagate over reverse edges according to `mode`
pub fn analyze(model: &WorkspaceModel, changeset: &Changeset, mode: PropagationMode) -> AffectedAnalysis {
  let attribution = ChangeAttributor::new(model).attribute(changeset);
  let impact = propagate(model.dependency_graph(), &attribution.direct, mode);

  AffectedAnalysis {
    changed_files: changeset.paths().map(PathBuf::from).collect(),
    unattributed: attribution.unattributed,
    impact,
  }
}
