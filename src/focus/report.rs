//! Focus statistics and the verbose kept-key dump
//!
//! Formatting only. Nothing here feeds back into marking or sweeping.

use super::marker::{MarkResult, MarkSet};
use super::sweeper::SweepStats;
use crate::graph::heap::to_megabytes;
use crate::graph::{FocusGraph, NodeKind};
use serde::Serialize;
use std::collections::BTreeMap;

/// Numbers reported after every focus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FocusStats {
  pub roots: usize,
  pub leafs: usize,
  pub reverse_closure: usize,
  pub direct_deps: usize,
  pub rdep_edges_before: usize,
  pub rdep_edges_after: usize,
  pub heap_before: usize,
  pub heap_after: usize,
  pub nodes_before: usize,
  pub nodes_after: usize,
}

impl FocusStats {
  pub fn new(mark: &MarkResult, sweep: &SweepStats) -> Self {
    Self {
      roots: mark.roots,
      leafs: mark.leafs,
      reverse_closure: mark.reverse_closure.len(),
      direct_deps: mark.direct_deps.len(),
      rdep_edges_before: sweep.rdep_edges_before,
      rdep_edges_after: sweep.rdep_edges_after,
      heap_before: sweep.heap_before,
      heap_after: sweep.heap_after,
      nodes_before: sweep.nodes_before,
      nodes_after: sweep.nodes_after,
    }
  }

  pub fn node_reduction_pct(&self) -> f64 {
    reduction_pct(self.nodes_before, self.nodes_after)
  }

  pub fn heap_reduction_pct(&self) -> f64 {
    reduction_pct(self.heap_before, self.heap_after)
  }

  /// The stats block, one line per entry.
  pub fn lines(&self) -> Vec<String> {
    vec![
      format!("Focusing on {} roots, {} leafs", self.roots, self.leafs),
      format!("Nodes in reverse transitive closure from leafs: {}", self.reverse_closure),
      format!("Nodes in direct deps of reverse transitive closure: {}", self.direct_deps),
      format!("Rdep edges: {} -> {}", self.rdep_edges_before, self.rdep_edges_after),
      format!(
        "Heap: {}MB -> {}MB ({:.2}% reduction)",
        to_megabytes(self.heap_before),
        to_megabytes(self.heap_after),
        self.heap_reduction_pct()
      ),
      format!(
        "Node count: {} -> {} ({:.2}% reduction)",
        self.nodes_before,
        self.nodes_after,
        self.node_reduction_pct()
      ),
    ]
  }
}

/// `(before - after) / before * 100`, or 0 when there was nothing before or
/// nothing went away.
pub fn reduction_pct(before: usize, after: usize) -> f64 {
  if before == 0 || after >= before {
    return 0.0;
  }
  (before - after) as f64 / before as f64 * 100.0
}

/// Verbose listing of what was kept, grouped by node kind.
///
/// Must be produced while the marked ids are still valid, i.e. before the
/// graph changes again.
pub fn kept_keys_dump<G: FocusGraph>(graph: &G, mark: &MarkResult) -> Vec<String> {
  let mut lines = Vec::new();

  lines.push("Rdeps kept:".to_string());
  lines.extend(grouped_listing(graph, &mark.reverse_closure));

  lines.push("Deps kept:".to_string());
  lines.extend(grouped_listing(graph, &mark.direct_deps));

  lines.push("Summary of kept keys:".to_string());
  let counts = count_by_kind(graph, &mark.keep);
  for kind in NodeKind::ALL {
    if let Some(count) = counts.get(&kind) {
      lines.push(format!("  {}: {}", kind, count));
    }
  }
  lines
}

fn grouped_listing<G: FocusGraph>(graph: &G, set: &MarkSet) -> Vec<String> {
  let mut by_kind: BTreeMap<NodeKind, Vec<&str>> = BTreeMap::new();
  for id in set.iter() {
    if let Some(key) = graph.key(id) {
      by_kind.entry(key.kind).or_default().push(key.name.as_str());
    }
  }

  let mut lines = Vec::new();
  for (kind, mut names) in by_kind {
    names.sort_unstable();
    lines.push(format!("  {} ({}):", kind, names.len()));
    lines.extend(names.into_iter().map(|name| format!("    {}", name)));
  }
  lines
}

fn count_by_kind<G: FocusGraph>(graph: &G, set: &MarkSet) -> BTreeMap<NodeKind, usize> {
  let mut counts = BTreeMap::new();
  for id in set.iter() {
    if let Some(key) = graph.key(id) {
      *counts.entry(key.kind).or_insert(0) += 1;
    }
  }
  counts
}
