//! Node identity: what a node *is* (its key) and where it lives (its id).

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of value a node computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
  /// Content of a single source file
  FileState,
  /// Entries of a source directory
  DirectoryListing,
  /// Analysis result for a target
  ConfiguredTarget,
  /// Output of running a target's action
  ActionExecution,
  /// Top-level node for a requested target
  BuildDriver,
}

impl NodeKind {
  pub const ALL: [NodeKind; 5] = [
    NodeKind::FileState,
    NodeKind::DirectoryListing,
    NodeKind::ConfiguredTarget,
    NodeKind::ActionExecution,
    NodeKind::BuildDriver,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      NodeKind::FileState => "FILE_STATE",
      NodeKind::DirectoryListing => "DIRECTORY_LISTING",
      NodeKind::ConfiguredTarget => "CONFIGURED_TARGET",
      NodeKind::ActionExecution => "ACTION_EXECUTION",
      NodeKind::BuildDriver => "BUILD_DRIVER",
    }
  }
}

impl fmt::Display for NodeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Stable identity of a graph node: kind plus a kind-specific name
/// (a workspace-relative path or a target name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
  pub kind: NodeKind,
  pub name: String,
}

impl NodeKey {
  pub fn new(kind: NodeKind, name: impl Into<String>) -> Self {
    Self {
      kind,
      name: name.into(),
    }
  }

  pub fn file(path: impl Into<String>) -> Self {
    Self::new(NodeKind::FileState, path)
  }

  pub fn directory(path: impl Into<String>) -> Self {
    Self::new(NodeKind::DirectoryListing, path)
  }

  pub fn configured_target(target: impl Into<String>) -> Self {
    Self::new(NodeKind::ConfiguredTarget, target)
  }

  pub fn action(target: impl Into<String>) -> Self {
    Self::new(NodeKind::ActionExecution, target)
  }

  pub fn build_driver(target: impl Into<String>) -> Self {
    Self::new(NodeKind::BuildDriver, target)
  }

  pub fn is_file(&self) -> bool {
    self.kind == NodeKind::FileState
  }
}

impl fmt::Display for NodeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.kind, self.name)
  }
}

/// Opaque, stable index of a node in its graph's table.
///
/// An id stays dangling while any edge may still name it. The table only
/// hands it out again after a finished sweep has stripped those edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}
