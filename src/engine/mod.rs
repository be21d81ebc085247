//! Minimal incremental build engine used to drive the focuser
//!
//! - **evaluator**: computes node values on demand, reusing clean nodes
//! - **change_detector**: workspace snapshots diffed between builds
//! - **analysis_cache**: configured-target results, discarded on expansion
//! - **server**: owns all of the above plus the working set store
//!
//! Node kinds and their values:
//!
//! | Kind | Value | Deps |
//! |------|-------|------|
//! | `FILE_STATE` | digest + contents, or missing | none |
//! | `DIRECTORY_LISTING` | direct files and subdirectories | listed files and sub-listings |
//! | `CONFIGURED_TARGET` | expanded source files, target deps | source files and listings |
//! | `ACTION_EXECUTION` | concatenated output + digest | configured target, files, dep actions |
//! | `BUILD_DRIVER` | output digest | the target's action |

pub mod analysis_cache;
pub mod change_detector;
pub mod evaluator;
pub mod server;

pub use analysis_cache::{AnalysisCache, ConfiguredTargetCache};
pub use change_detector::SnapshotChangeDetector;
pub use evaluator::Evaluator;
pub use server::{BuildOutcome, BuildRequest, BuildServer};

use crate::graph::{HeapSize, InMemoryGraph};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// The graph type the engine builds.
pub type BuildGraph = InMemoryGraph<NodeValue>;

/// Content of a source file as last read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileState {
  Present { digest: String, contents: String },
  Missing,
}

/// Analysis result for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredTarget {
  /// Every source file, directories expanded, sorted
  pub files: Vec<String>,
  /// Names of targets this one depends on
  pub deps: Vec<String>,
}

/// Value stored in a graph node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
  File(FileState),
  Directory { files: Vec<String>, dirs: Vec<String> },
  Configured(ConfiguredTarget),
  Action { output: String, digest: String },
  Driver { digest: String },
}

impl NodeValue {
  pub fn as_configured(&self) -> Option<&ConfiguredTarget> {
    match self {
      NodeValue::Configured(ct) => Some(ct),
      _ => None,
    }
  }

  pub fn action_output(&self) -> Option<&str> {
    match self {
      NodeValue::Action { output, .. } => Some(output),
      _ => None,
    }
  }
}

impl HeapSize for NodeValue {
  fn heap_size(&self) -> usize {
    match self {
      NodeValue::File(FileState::Present { digest, contents }) => digest.heap_size() + contents.heap_size(),
      NodeValue::File(FileState::Missing) => 0,
      NodeValue::Directory { files, dirs } => files.heap_size() + dirs.heap_size(),
      NodeValue::Configured(ct) => ct.files.heap_size() + ct.deps.heap_size(),
      NodeValue::Action { output, digest } => output.heap_size() + digest.heap_size(),
      NodeValue::Driver { digest } => digest.heap_size(),
    }
  }
}

/// Hex SHA-256 of `bytes`.
pub fn digest_hex(bytes: &[u8]) -> String {
  let hash = Sha256::digest(bytes);
  hash.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Workspace entries the engine never looks at: anything hidden and any
/// explicitly ignored path (the trace file the server itself writes).
#[derive(Debug, Clone, Default)]
pub struct SourceFilter {
  ignored: BTreeSet<String>,
}

impl SourceFilter {
  pub fn new(ignored: impl IntoIterator<Item = String>) -> Self {
    Self {
      ignored: ignored.into_iter().collect(),
    }
  }

  /// True if the entry named `name` is skipped.
  pub fn skips_name(name: &str) -> bool {
    name.starts_with('.')
  }

  /// True if the workspace-relative `path` is skipped.
  pub fn skips(&self, path: &str) -> bool {
    self.ignored.contains(path) || path.split('/').any(Self::skips_name)
  }
}
