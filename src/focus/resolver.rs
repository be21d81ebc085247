//! Working set resolution: user paths → leaf keys
//!
//! A file path maps to its file-state node. A directory path maps to every
//! file-state node reachable through the directory-listing nodes beneath it.
//! Only edges already in the graph are followed; the filesystem is never
//! consulted, so a path nobody has built yet does not resolve.

use crate::core::error::{FocusResult, WorkingSetError};
use crate::graph::{FocusGraph, NodeId, NodeKey, NodeKind};
use crate::utils::{is_same_or_nested, normalize_relative_path};
use std::collections::{BTreeSet, HashSet};

/// Paths plus the leaves they resolved to.
#[derive(Debug, Clone, Default)]
pub struct ResolvedWorkingSet {
  pub paths: Vec<String>,
  pub leafs: Vec<NodeId>,
  pub leaf_keys: BTreeSet<NodeKey>,
}

/// Normalize a user path list, rejecting absolute and escaping paths.
///
/// The result is sorted and deduplicated.
pub fn normalize_working_set(paths: &[String]) -> FocusResult<Vec<String>> {
  let mut invalid = Vec::new();
  let mut normalized = Vec::new();
  for path in paths {
    match normalize_relative_path(path) {
      Some(p) => normalized.push(p),
      None => invalid.push(path.clone()),
    }
  }
  if !invalid.is_empty() {
    return Err(WorkingSetError::Resolution { paths: invalid }.into());
  }
  normalized.sort();
  normalized.dedup();
  Ok(normalized)
}

/// Resolve normalized paths to file-state leaves.
///
/// Fails with a resolution error naming every path that matched no node.
pub fn resolve<G: FocusGraph>(graph: &G, paths: &[String]) -> FocusResult<ResolvedWorkingSet> {
  let mut leafs = BTreeSet::new();
  let mut unresolved = Vec::new();

  for path in paths {
    if let Some(id) = graph.find(&NodeKey::file(path.as_str())) {
      leafs.insert(id);
    } else if let Some(dir) = graph.find(&NodeKey::directory(path.as_str())) {
      // A listed directory with no files beneath it pins nothing
      if collect_nested_files(graph, dir, &mut leafs) == 0 {
        unresolved.push(path.clone());
      }
    } else {
      let nested = nested_file_nodes(graph, path);
      if nested.is_empty() {
        unresolved.push(path.clone());
      } else {
        leafs.extend(nested);
      }
    }
  }

  if !unresolved.is_empty() {
    return Err(WorkingSetError::Resolution { paths: unresolved }.into());
  }

  let leaf_keys = leafs.iter().filter_map(|id| graph.key(*id).cloned()).collect();
  Ok(ResolvedWorkingSet {
    paths: paths.to_vec(),
    leafs: leafs.into_iter().collect(),
    leaf_keys,
  })
}

/// Walk directory-listing deps below `dir` and gather file-state nodes.
/// Returns the number of file-state nodes found.
fn collect_nested_files<G: FocusGraph>(graph: &G, dir: NodeId, leafs: &mut BTreeSet<NodeId>) -> usize {
  let mut visited = HashSet::new();
  let mut stack = vec![dir];
  let mut found = 0;

  while let Some(current) = stack.pop() {
    if !visited.insert(current) {
      continue;
    }
    for dep in graph.deps(current) {
      match graph.key(*dep).map(|k| k.kind) {
        Some(NodeKind::FileState) => {
          leafs.insert(*dep);
          found += 1;
        }
        Some(NodeKind::DirectoryListing) => stack.push(*dep),
        _ => {}
      }
    }
  }
  found
}

/// File-state nodes under `dir` when the directory itself was never listed
/// (its files were named individually by targets).
fn nested_file_nodes<G: FocusGraph>(graph: &G, dir: &str) -> Vec<NodeId> {
  graph
    .node_ids()
    .into_iter()
    .filter(|id| {
      graph
        .key(*id)
        .is_some_and(|k| k.is_file() && k.name != dir && is_same_or_nested(&k.name, dir))
    })
    .collect()
}
