//! Mark phase: decide which nodes survive a focus
//!
//! Algorithm:
//! 1. U = everything reachable from the leaves over rdep edges (leaves included)
//! 2. D = one-hop deps of U that are not already in U
//! 3. C = roots plus their full transitive dependency closure
//! 4. Keep = U ∪ D ∪ C
//!
//! All walks use an explicit stack and a mark table indexed by [`NodeId`], so
//! graph depth never turns into call-stack depth and every node is expanded
//! at most once per walk.

use crate::core::error::InvariantViolation;
use crate::graph::{FocusGraph, NodeId};
use rayon::prelude::*;
use std::collections::HashSet;

/// Membership table indexed by node id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkSet {
  marks: Vec<bool>,
  len: usize,
}

impl MarkSet {
  pub fn with_bound(bound: usize) -> Self {
    Self {
      marks: vec![false; bound],
      len: 0,
    }
  }

  /// Mark `id`. Returns true if it was not marked before.
  pub fn insert(&mut self, id: NodeId) -> bool {
    let idx = id.index();
    if idx >= self.marks.len() {
      self.marks.resize(idx + 1, false);
    }
    if self.marks[idx] {
      return false;
    }
    self.marks[idx] = true;
    self.len += 1;
    true
  }

  /// Unmark `id`. Returns true if it was marked.
  pub fn remove(&mut self, id: NodeId) -> bool {
    match self.marks.get_mut(id.index()) {
      Some(marked) if *marked => {
        *marked = false;
        self.len -= 1;
        true
      }
      _ => false,
    }
  }

  pub fn contains(&self, id: NodeId) -> bool {
    self.marks.get(id.index()).copied().unwrap_or(false)
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Marked ids in ascending order.
  pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
    self
      .marks
      .iter()
      .enumerate()
      .filter(|(_, marked)| **marked)
      .map(|(i, _)| NodeId(i as u32))
  }
}

/// The nodes to retain.
pub type KeepSet = MarkSet;

/// Output of the mark phase.
#[derive(Debug, Clone)]
pub struct MarkResult {
  pub keep: KeepSet,
  /// Live leaves the walk started from
  pub leafs: usize,
  /// Live roots
  pub roots: usize,
  /// U: reverse transitive closure of the leaves
  pub reverse_closure: MarkSet,
  /// D: direct deps of U outside U
  pub direct_deps: MarkSet,
  /// C: roots and everything they depend on
  pub root_closure: MarkSet,
}

/// Computes Keep sets.
#[derive(Debug, Clone, Copy)]
pub struct Marker {
  parallel_threshold: usize,
}

impl Default for Marker {
  fn default() -> Self {
    Self::new(64)
  }
}

impl Marker {
  /// `parallel_threshold`: leaf count at which the reverse walk fans out over
  /// rayon. Zero disables fan-out.
  pub fn new(parallel_threshold: usize) -> Self {
    Self { parallel_threshold }
  }

  pub fn mark<G: FocusGraph + Sync>(&self, graph: &G, leafs: &[NodeId], roots: &[NodeId]) -> MarkResult {
    let bound = graph.id_bound();
    let live_leafs: Vec<NodeId> = leafs.iter().copied().filter(|id| graph.key(*id).is_some()).collect();
    let live_roots: Vec<NodeId> = roots.iter().copied().filter(|id| graph.key(*id).is_some()).collect();

    let reverse_closure = if self.parallel_threshold > 0 && live_leafs.len() >= self.parallel_threshold {
      reverse_closure_parallel(graph, &live_leafs, bound)
    } else {
      reverse_closure(graph, &live_leafs, bound)
    };

    let mut direct_deps = MarkSet::with_bound(bound);
    for id in reverse_closure.iter() {
      for dep in graph.deps(id) {
        if graph.key(*dep).is_some() && !reverse_closure.contains(*dep) {
          direct_deps.insert(*dep);
        }
      }
    }

    let root_closure = dependency_closure(graph, &live_roots, bound);

    let mut keep = MarkSet::with_bound(bound);
    for id in reverse_closure.iter().chain(direct_deps.iter()).chain(root_closure.iter()) {
      keep.insert(id);
    }

    MarkResult {
      keep,
      leafs: live_leafs.len(),
      roots: live_roots.len(),
      reverse_closure,
      direct_deps,
      root_closure,
    }
  }
}

/// Everything reachable from `leafs` over rdep edges, leaves included.
fn reverse_closure<G: FocusGraph>(graph: &G, leafs: &[NodeId], bound: usize) -> MarkSet {
  let mut marked = MarkSet::with_bound(bound);
  let mut stack = Vec::new();
  for leaf in leafs {
    if marked.insert(*leaf) {
      stack.push(*leaf);
    }
  }
  while let Some(id) = stack.pop() {
    for rdep in graph.rdeps(id) {
      if graph.key(*rdep).is_some() && marked.insert(*rdep) {
        stack.push(*rdep);
      }
    }
  }
  marked
}

/// Same result as [`reverse_closure`], with leaves split into chunks walked
/// concurrently. Frontiers that overlap are walked more than once; the union
/// removes the duplicates.
fn reverse_closure_parallel<G: FocusGraph + Sync>(graph: &G, leafs: &[NodeId], bound: usize) -> MarkSet {
  let chunk_size = leafs.len().div_ceil(rayon::current_num_threads().max(1)).max(1);

  let partials: Vec<Vec<NodeId>> = leafs
    .par_chunks(chunk_size)
    .map(|chunk| {
      let mut seen: HashSet<NodeId> = HashSet::new();
      let mut stack: Vec<NodeId> = Vec::new();
      for leaf in chunk {
        if seen.insert(*leaf) {
          stack.push(*leaf);
        }
      }
      while let Some(id) = stack.pop() {
        for rdep in graph.rdeps(id) {
          if graph.key(*rdep).is_some() && seen.insert(*rdep) {
            stack.push(*rdep);
          }
        }
      }
      seen.into_iter().collect()
    })
    .collect();

  let mut marked = MarkSet::with_bound(bound);
  for id in partials.into_iter().flatten() {
    marked.insert(id);
  }
  marked
}

/// `roots` plus everything they transitively depend on.
fn dependency_closure<G: FocusGraph>(graph: &G, roots: &[NodeId], bound: usize) -> MarkSet {
  let mut marked = MarkSet::with_bound(bound);
  let mut stack = Vec::new();
  for root in roots {
    if marked.insert(*root) {
      stack.push(*root);
    }
  }
  while let Some(id) = stack.pop() {
    for dep in graph.deps(id) {
      if graph.key(*dep).is_some() && marked.insert(*dep) {
        stack.push(*dep);
      }
    }
  }
  marked
}

/// Check the Keep set before anything is deleted.
///
/// Roots must be kept, and every node in U or C must have all of its deps
/// kept, since those are the nodes that can be re-evaluated later. Nodes kept
/// only as context (D) are exempt: their deps may be swept, and the sweep
/// strips those edges.
pub fn verify_keep_set<G: FocusGraph>(graph: &G, result: &MarkResult, roots: &[NodeId]) -> Result<(), InvariantViolation> {
  let keep = &result.keep;
  let describe = |id: NodeId| graph.key(id).map_or_else(|| id.to_string(), |k| k.to_string());

  for root in roots {
    if graph.key(*root).is_some() && !keep.contains(*root) {
      return Err(InvariantViolation::MissingRoot { root: describe(*root) });
    }
  }

  for id in result.reverse_closure.iter().chain(result.root_closure.iter()) {
    if graph.key(id).is_none() {
      continue;
    }
    for dep in graph.deps(id) {
      if graph.key(*dep).is_some() && !keep.contains(*dep) {
        return Err(InvariantViolation::DanglingDependency {
          node: describe(id),
          dep: describe(*dep),
        });
      }
    }
  }
  Ok(())
}
