//! Target dependency graph with order-independent merge
//!
//! # Graph Structure
//!
//! - **Edges**: `A → B` means "A depends on B"
//! - **Storage**: ordered map of target → set of dependencies. A target that only
//!   ever appears as a dependency is still a node; a missing key just means "no
//!   known dependencies"
//! - **Merge**: per-key set union, so fragments parsed in any order and grouped in
//!   any way produce the same graph
//! - **Reverse index**: petgraph `DiGraph` built lazily on the first reverse
//!   query and dropped by any mutation. Propagation only runs on a frozen graph.

use super::target::TargetIdentity;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

/// Directed "depends on" graph between targets.
#[derive(Debug, Default)]
pub struct DependencyGraph {
  edges: BTreeMap<TargetIdentity, BTreeSet<TargetIdentity>>,

  /// Derived reverse index, built once per frozen state
  reverse: OnceLock<ReverseIndex>,
}

/// petgraph view of the edge map for incoming-edge queries and rendering.
#[derive(Debug)]
struct ReverseIndex {
  graph: DiGraph<TargetIdentity, ()>,
  node_of: HashMap<TargetIdentity, NodeIndex>,
}

impl ReverseIndex {
  fn build(edges: &BTreeMap<TargetIdentity, BTreeSet<TargetIdentity>>) -> Self {
    let mut graph = DiGraph::new();
    let mut node_of = HashMap::new();

    let mut node = |graph: &mut DiGraph<TargetIdentity, ()>, target: &TargetIdentity| {
      *node_of
        .entry(target.clone())
        .or_insert_with(|| graph.add_node(target.clone()))
    };

    for (from, deps) in edges {
      let from_idx = node(&mut graph, from);
      for to in deps {
        let to_idx = node(&mut graph, to);
        graph.add_edge(from_idx, to_idx, ());
      }
    }

    Self { graph, node_of }
  }
}

impl Clone for DependencyGraph {
  fn clone(&self) -> Self {
    Self {
      edges: self.edges.clone(),
      reverse: OnceLock::new(),
    }
  }
}

/// Edge-set equality; the derived index never participates.
impl PartialEq for DependencyGraph {
  fn eq(&self, other: &Self) -> bool {
    self.edge_set() == other.edge_set()
  }
}

impl Eq for DependencyGraph {}

impl DependencyGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add `to` to the dependencies of `from`. Idempotent.
  pub fn insert_edge(&mut self, from: TargetIdentity, to: TargetIdentity) {
    self.edges.entry(from).or_default().insert(to);
    self.reverse.take();
  }

  /// Register a node without dependencies.
  pub fn insert_node(&mut self, target: TargetIdentity) {
    self.edges.entry(target).or_default();
    self.reverse.take();
  }

  /// Direct dependencies of a target (empty when none are known).
  pub fn dependencies(&self, target: &TargetIdentity) -> BTreeSet<TargetIdentity> {
    self.edges.get(target).cloned().unwrap_or_default()
  }

  /// Direct dependents of a target: every node with an edge to it.
  ///
  /// Uses the reverse index, built on first call after the last mutation.
  pub fn dependents(&self, target: &TargetIdentity) -> BTreeSet<TargetIdentity> {
    let index = self.reverse.get_or_init(|| ReverseIndex::build(&self.edges));

    let Some(&node_idx) = index.node_of.get(target) else {
      return BTreeSet::new();
    };

    index
      .graph
      .neighbors_directed(node_idx, Direction::Incoming)
      .map(|idx| index.graph[idx].clone())
      .collect()
  }

  /// Union another graph into this one, per dependency set.
  pub fn merge(&mut self, other: DependencyGraph) {
    for (from, deps) in other.edges {
      self.edges.entry(from).or_default().extend(deps);
    }
    self.reverse.take();
  }

  /// Every node, whether declared as a key or only referenced as a dependency.
  pub fn nodes(&self) -> BTreeSet<TargetIdentity> {
    let mut nodes: BTreeSet<TargetIdentity> = self.edges.keys().cloned().collect();
    for deps in self.edges.values() {
      nodes.extend(deps.iter().cloned());
    }
    nodes
  }

  /// Flattened `(from, to)` pairs, sorted.
  pub fn edge_set(&self) -> BTreeSet<(TargetIdentity, TargetIdentity)> {
    self
      .edges
      .iter()
      .flat_map(|(from, deps)| deps.iter().map(move |to| (from.clone(), to.clone())))
      .collect()
  }

  pub fn edge_count(&self) -> usize {
    self.edges.values().map(BTreeSet::len).sum()
  }

  /// Export graph to DOT format (Graphviz), filling `highlighted` nodes.
  ///
  /// # Example
  /// ```bash
  /// selective-testing --dependency-graph > graph.dot
  /// dot -Tpng graph.dot -o graph.png
  /// ```
  pub fn to_dot(&self, highlighted: &BTreeSet<TargetIdentity>) -> String {
    use petgraph::dot::{Config, Dot};
    use petgraph::graph::EdgeReference;

    let index = self.reverse.get_or_init(|| ReverseIndex::build(&self.edges));

    let edge_attrs = |_: &DiGraph<TargetIdentity, ()>, _: EdgeReference<'_, ()>| String::new();
    let node_attrs = |_: &DiGraph<TargetIdentity, ()>, (_idx, node): (NodeIndex, &TargetIdentity)| {
      let shape = if node.is_test() { "ellipse" } else { "box" };
      let label = node.to_string().replace('"', "\\\"");
      if highlighted.contains(node) {
        format!("label=\"{}\" shape={} style=filled fillcolor=orange", label, shape)
      } else {
        format!("label=\"{}\" shape={}", label, shape)
      }
    };

    let dot = Dot::with_attr_getters(
      &index.graph,
      &[Config::EdgeNoLabel, Config::NodeNoLabel],
      &edge_attrs,
      &node_attrs,
    );

    format!("{:?}", dot)
  }
}
