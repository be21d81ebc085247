//! Snapshot-based change detection
//!
//! Each poll walks the workspace and hashes every file. Changes are reported
//! against the last *accepted* snapshot, so a build that is refused by the
//! working set guard sees the same edits again next time (unless they were
//! reverted in the meantime).

use super::{SourceFilter, digest_hex};
use crate::core::error::{FocusResult, ResultExt};
use crate::focus::guard::{ChangeDetector, ChangeKind, ChangedPath};
use crate::utils::relative_key_path;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

type Snapshot = BTreeMap<String, String>;

/// Detects changes by diffing digests of every workspace file.
#[derive(Debug)]
pub struct SnapshotChangeDetector {
  root: PathBuf,
  filter: SourceFilter,
  accepted: Option<Snapshot>,
  pending: Option<Snapshot>,
}

impl SnapshotChangeDetector {
  pub fn new(root: impl Into<PathBuf>, filter: SourceFilter) -> Self {
    Self {
      root: root.into(),
      filter,
      accepted: None,
      pending: None,
    }
  }

  fn snapshot(&self) -> FocusResult<Snapshot> {
    let mut snapshot = Snapshot::new();
    let walker = WalkDir::new(&self.root)
      .follow_links(false)
      .min_depth(1)
      .into_iter()
      .filter_entry(|e| !SourceFilter::skips_name(&e.file_name().to_string_lossy()));

    for entry in walker {
      let entry = entry?;
      if !entry.file_type().is_file() {
        continue;
      }
      let Some(rel) = relative_key_path(&self.root, entry.path()) else {
        continue;
      };
      if self.filter.skips(&rel) {
        continue;
      }
      snapshot.insert(rel, file_digest(entry.path())?);
    }
    Ok(snapshot)
  }
}

fn file_digest(path: &Path) -> FocusResult<String> {
  let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
  Ok(digest_hex(&bytes))
}

fn diff(old: &Snapshot, new: &Snapshot) -> Vec<ChangedPath> {
  let mut changes = Vec::new();
  for (path, digest) in new {
    match old.get(path) {
      None => changes.push(ChangedPath::new(path.as_str(), ChangeKind::Added)),
      Some(prev) if prev != digest => changes.push(ChangedPath::modified(path.as_str())),
      Some(_) => {}
    }
  }
  for path in old.keys() {
    if !new.contains_key(path) {
      changes.push(ChangedPath::new(path.as_str(), ChangeKind::Deleted));
    }
  }
  changes.sort_by(|a, b| a.path.cmp(&b.path));
  changes
}

impl ChangeDetector for SnapshotChangeDetector {
  fn poll(&mut self) -> FocusResult<Vec<ChangedPath>> {
    let current = self.snapshot()?;
    let Some(accepted) = &self.accepted else {
      debug!(files = current.len(), "recorded baseline snapshot");
      self.accepted = Some(current);
      return Ok(Vec::new());
    };
    let changes = diff(accepted, &current);
    self.pending = Some(current);
    Ok(changes)
  }

  fn accept(&mut self) {
    if let Some(pending) = self.pending.take() {
      self.accepted = Some(pending);
    }
  }

  fn reset(&mut self) {
    self.accepted = None;
    self.pending = None;
  }
}
