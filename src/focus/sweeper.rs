//! Sweep phase: delete what the mark phase did not keep
//!
//! Two sub-phases, always run back to back:
//! - **sweep_nodes**: drop every node outside the Keep set, payload included
//! - **sweep_edges**: strip references to dropped nodes from the survivors
//!
//! Between the two the graph holds dangling edges and must not be read. The
//! graph is told when a sweep starts and finishes; a sweep that never
//! finishes (the thread panicked) leaves it flagged as corrupt.

use super::marker::KeepSet;
use super::profiler::Profiler;
use crate::graph::{FocusGraph, NodeKey, NodeKind};
use std::collections::BTreeSet;
use tracing::debug;

/// What a sweep changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepStats {
  pub nodes_before: usize,
  pub nodes_after: usize,
  pub heap_before: usize,
  pub heap_after: usize,
  pub rdep_edges_before: usize,
  pub rdep_edges_after: usize,
  pub removed_deps: usize,
  pub removed_rdeps: usize,
  /// File-state and directory-listing keys that were deleted
  pub swept_sources: BTreeSet<NodeKey>,
}

/// Delete every node not in `keep`. Returns the deleted source keys and the
/// number of nodes deleted.
pub fn sweep_nodes<G: FocusGraph>(graph: &mut G, keep: &KeepSet) -> (BTreeSet<NodeKey>, usize) {
  let mut swept_sources = BTreeSet::new();
  let mut deleted = 0;
  for id in graph.node_ids() {
    if keep.contains(id) {
      continue;
    }
    if let Some(key) = graph.key(id)
      && matches!(key.kind, NodeKind::FileState | NodeKind::DirectoryListing)
    {
      swept_sources.insert(key.clone());
    }
    if graph.delete_node(id) {
      deleted += 1;
    }
  }
  (swept_sources, deleted)
}

/// Strip dangling references from every surviving node.
/// Returns `(deps removed, rdeps removed)`.
pub fn sweep_edges<G: FocusGraph>(graph: &mut G) -> (usize, usize) {
  let mut removed = (0, 0);
  for id in graph.node_ids() {
    let (deps, rdeps) = graph.strip_dangling_edges(id);
    removed.0 += deps;
    removed.1 += rdeps;
  }
  removed
}

/// Run both sub-phases, timing each in `profiler`.
pub fn sweep<G: FocusGraph>(graph: &mut G, keep: &KeepSet, profiler: &mut Profiler) -> SweepStats {
  let nodes_before = graph.node_count();
  let heap_before = graph.estimate_heap_bytes();
  let rdep_edges_before = graph.rdep_edge_count();

  graph.begin_sweep();

  let phase = profiler.start("focus.sweep_nodes");
  let (swept_sources, deleted) = sweep_nodes(graph, keep);
  profiler.finish(phase);
  debug!(deleted, "swept nodes");

  let phase = profiler.start("focus.sweep_edges");
  let (removed_deps, removed_rdeps) = sweep_edges(graph);
  profiler.finish(phase);
  debug!(removed_deps, removed_rdeps, "swept edges");

  graph.finish_sweep();

  SweepStats {
    nodes_before,
    nodes_after: graph.node_count(),
    heap_before,
    heap_after: graph.estimate_heap_bytes(),
    rdep_edges_before,
    rdep_edges_after: graph.rdep_edge_count(),
    removed_deps,
    removed_rdeps,
    swept_sources,
  }
}
