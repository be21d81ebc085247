//! Working set store: the active working set and what the last focus left behind
//!
//! # Lifecycle
//!
//! ```text
//! server start ──► empty
//!   build --working-set=a,b ──► replace(a,b)     (after a successful focus)
//!   build                   ──► unchanged        (persisted set reused)
//!   reset / restart         ──► clear()
//! ```
//!
//! The store is owned by the build server and handed to the focuser by
//! reference; there is no global state.

use crate::graph::NodeKey;
use crate::utils::is_same_or_nested;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// Text returned by [`WorkingSetStore::describe`] when nothing is active.
pub const NO_WORKING_SET: &str = "No working set found.";

/// How a newly requested working set relates to the active one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkingSetUpdate {
  /// No working set was active
  Initial,
  /// Same paths as before
  Unchanged,
  /// Every new path is covered by the previous set
  Reduction,
  /// At least one new path was not covered by the previous set
  Expansion,
}

impl WorkingSetUpdate {
  /// Swept nodes coming back into scope cannot be rebuilt incrementally, so an
  /// expansion throws the analysis cache away.
  pub fn requires_reanalysis(self) -> bool {
    matches!(self, WorkingSetUpdate::Expansion)
  }
}

/// The committed working set.
#[derive(Debug, Clone, Serialize)]
pub struct WorkingSet {
  /// Normalized, sorted, deduplicated paths as supplied by the user
  pub paths: Vec<String>,
  /// File-state keys the paths resolved to
  pub leaf_keys: BTreeSet<NodeKey>,
  /// File-state and directory-listing keys deleted by focusing and not rebuilt since
  pub swept_sources: BTreeSet<NodeKey>,
  /// Number of successful focus operations so far
  pub generation: u64,
  pub updated_at: DateTime<Utc>,
}

impl WorkingSet {
  /// True if `path` is one of the working set paths or nested beneath one.
  pub fn covers(&self, path: &str) -> bool {
    paths_cover(&self.paths, path)
  }
}

/// True if any of `paths` equals `path` or is a directory above it.
pub fn paths_cover(paths: &[String], path: &str) -> bool {
  paths.iter().any(|p| is_same_or_nested(path, p))
}

/// Owner of the active working set for the life of the server process.
#[derive(Debug, Default)]
pub struct WorkingSetStore {
  active: Option<WorkingSet>,
  generation: u64,
}

impl WorkingSetStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn active(&self) -> Option<&WorkingSet> {
    self.active.as_ref()
  }

  pub fn is_active(&self) -> bool {
    self.active.is_some()
  }

  /// Active paths, if any.
  pub fn paths(&self) -> Option<&[String]> {
    self.active.as_ref().map(|ws| ws.paths.as_slice())
  }

  /// Compare a requested (normalized) path list against the active set.
  pub fn classify(&self, new_paths: &[String]) -> WorkingSetUpdate {
    let Some(active) = &self.active else {
      return WorkingSetUpdate::Initial;
    };

    if new_paths.iter().any(|p| !active.covers(p)) {
      return WorkingSetUpdate::Expansion;
    }

    let mut sorted = new_paths.to_vec();
    sorted.sort();
    sorted.dedup();
    if sorted == active.paths {
      WorkingSetUpdate::Unchanged
    } else {
      WorkingSetUpdate::Reduction
    }
  }

  /// Commit the result of a successful focus. Replaces, never merges.
  pub fn replace(&mut self, paths: Vec<String>, leaf_keys: BTreeSet<NodeKey>, swept_sources: BTreeSet<NodeKey>) {
    let mut paths = paths;
    paths.sort();
    paths.dedup();
    self.generation += 1;
    self.active = Some(WorkingSet {
      paths,
      leaf_keys,
      swept_sources,
      generation: self.generation,
      updated_at: Utc::now(),
    });
  }

  /// Forget the working set. Only a full graph reset (or a fresh process) does this.
  pub fn clear(&mut self) {
    self.active = None;
  }

  /// Active paths one per line, or [`NO_WORKING_SET`].
  pub fn describe(&self) -> String {
    match &self.active {
      Some(ws) if !ws.paths.is_empty() => ws.paths.join("\n"),
      _ => NO_WORKING_SET.to_string(),
    }
  }
}
