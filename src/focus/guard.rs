//! Validity guard: refuse to build on top of edits the focused graph cannot see
//!
//! After a focus, only the working set's leaves (and whatever consumes them)
//! can be invalidated soundly. A source that survived only as context, or was
//! swept entirely, has lost the edges that would carry its change upward. An
//! edit to such a source aborts the build before anything is invalidated.

use super::store::{WorkingSet, paths_cover};
use crate::core::error::{FocusResult, WorkingSetError};
use crate::graph::{FocusGraph, NodeKey};
use crate::utils::parent_path;
use serde::Serialize;
use tracing::debug;

/// How a path changed since the previous poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
  Added,
  Modified,
  Deleted,
}

/// A changed file, named by its workspace-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChangedPath {
  pub path: String,
  pub kind: ChangeKind,
}

impl ChangedPath {
  pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
    Self {
      path: path.into(),
      kind,
    }
  }

  pub fn modified(path: impl Into<String>) -> Self {
    Self::new(path, ChangeKind::Modified)
  }

  /// Graph keys whose values this change makes stale. Adding or deleting a
  /// file also changes the listings above it (a new file can bring new
  /// directories with it).
  pub fn affected_keys(&self) -> Vec<NodeKey> {
    let mut keys = vec![NodeKey::file(self.path.as_str())];
    if self.kind != ChangeKind::Modified {
      let mut dir = parent_path(&self.path);
      loop {
        keys.push(NodeKey::directory(dir));
        if dir.is_empty() {
          break;
        }
        dir = parent_path(dir);
      }
    }
    keys
  }
}

/// Source of changed-file lists, polled once per build.
pub trait ChangeDetector {
  /// Files changed since the last accepted state. The first call establishes
  /// the baseline and reports nothing.
  fn poll(&mut self) -> FocusResult<Vec<ChangedPath>>;

  /// Accept the state seen by the last poll; its changes have been applied.
  fn accept(&mut self);

  /// Forget the baseline. The next poll starts over.
  fn reset(&mut self);
}

/// Outcome of a passing check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardReport {
  /// Changes inside the working set
  pub covered: usize,
  /// Changes to files the graph never tracked
  pub untracked: usize,
}

/// Check every change against the focused graph.
///
/// `active_paths` is the working set in force for this build: the newly
/// requested one if the build supplies a list, otherwise the persisted one.
pub fn check<G: FocusGraph>(
  graph: &G,
  working_set: &WorkingSet,
  active_paths: &[String],
  changes: &[ChangedPath],
) -> FocusResult<GuardReport> {
  let mut report = GuardReport::default();
  let mut offending = Vec::new();

  for change in changes {
    let leaf = NodeKey::file(change.path.as_str());
    if working_set.leaf_keys.contains(&leaf) || paths_cover(active_paths, &change.path) {
      report.covered += 1;
      continue;
    }

    let tracked = change
      .affected_keys()
      .iter()
      .any(|key| graph.find(key).is_some() || working_set.swept_sources.contains(key));
    if tracked {
      offending.push(change.path.clone());
    } else {
      report.untracked += 1;
    }
  }

  if !offending.is_empty() {
    offending.sort();
    offending.dedup();
    return Err(WorkingSetError::OutOfWorkingSet { paths: offending }.into());
  }

  debug!(covered = report.covered, untracked = report.untracked, "working set guard passed");
  Ok(report)
}
