//! Target dependency graph built from focus.toml + petgraph
//!
//! ## Graph Structure
//!
//! - **Directed Graph**: `A → B` means "target A consumes the output of target B"
//! - **Nodes**: declared targets
//! - **Index**: name → node index
//! - **Algorithms**: toposort for build order, Tarjan SCC for cycle detection
//!
//! This is the static, declared view. The evaluation graph (one node per
//! computed value) lives in [`super::InMemoryGraph`] and is derived from it.

use crate::core::config::TargetConfig;
use crate::core::error::{ConfigError, FocusError, FocusResult};
use petgraph::Direction;
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// Declared targets and their dependency edges.
pub struct TargetGraph {
  graph: DiGraph<String, ()>,
  name_to_node: HashMap<String, NodeIndex>,
}

impl TargetGraph {
  /// Build the graph. Dependencies on undeclared targets are skipped here;
  /// config validation reports them.
  pub fn build(targets: &[TargetConfig]) -> Self {
    let mut graph = DiGraph::new();
    let mut name_to_node = HashMap::new();

    for target in targets {
      let idx = graph.add_node(target.name.clone());
      name_to_node.insert(target.name.clone(), idx);
    }

    for target in targets {
      let from_idx = name_to_node[&target.name];
      for dep in &target.deps {
        if let Some(to_idx) = name_to_node.get(dep) {
          graph.add_edge(from_idx, *to_idx, ());
        }
      }
    }

    Self { graph, name_to_node }
  }

  /// All declared target names, sorted.
  pub fn targets(&self) -> Vec<String> {
    let mut names: Vec<_> = self.name_to_node.keys().cloned().collect();
    names.sort();
    names
  }

  /// Direct dependencies of a target.
  pub fn direct_dependencies(&self, name: &str) -> FocusResult<Vec<String>> {
    let node_idx = self.find_node(name)?;

    let mut deps: Vec<String> = self
      .graph
      .neighbors_directed(node_idx, Direction::Outgoing)
      .map(|idx| self.graph[idx].clone())
      .collect();

    deps.sort();
    deps.dedup();
    Ok(deps)
  }

  /// Every target needed to build `requested`, in build order: a target always
  /// appears after everything it depends on.
  pub fn build_order(&self, requested: &[String]) -> FocusResult<Vec<String>> {
    let mut needed = HashSet::new();
    let mut stack = Vec::new();
    for name in requested {
      stack.push(self.find_node(name)?);
    }
    while let Some(idx) = stack.pop() {
      if !needed.insert(idx) {
        continue;
      }
      stack.extend(self.graph.neighbors_directed(idx, Direction::Outgoing));
    }

    // toposort puts consumers before their deps; build order is the reverse
    let topo = algo::toposort(&self.graph, None).map_err(|cycle| {
      FocusError::Config(ConfigError::TargetCycle {
        members: vec![self.graph[cycle.node_id()].clone()],
      })
    })?;

    Ok(
      topo
        .into_iter()
        .rev()
        .filter(|idx| needed.contains(idx))
        .map(|idx| self.graph[idx].clone())
        .collect(),
    )
  }

  /// Detect dependency cycles using Tarjan's SCC algorithm.
  ///
  /// Returns components with more than one target, plus self-dependencies.
  pub fn find_cycles(&self) -> Vec<Vec<String>> {
    algo::tarjan_scc(&self.graph)
      .into_iter()
      .filter(|component| {
        component.len() > 1 || component.iter().any(|idx| self.graph.contains_edge(*idx, *idx))
      })
      .map(|component| {
        let mut names: Vec<String> = component.into_iter().map(|idx| self.graph[idx].clone()).collect();
        names.sort();
        names
      })
      .collect()
  }

  fn find_node(&self, name: &str) -> FocusResult<NodeIndex> {
    self.name_to_node.get(name).copied().ok_or_else(|| {
      FocusError::Config(ConfigError::UnknownTarget {
        name: name.to_string(),
        referenced_by: None,
      })
    })
  }
}
