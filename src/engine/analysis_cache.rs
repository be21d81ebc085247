//! Configured-target analysis cache
//!
//! Analysis results live outside the graph so they survive a sweep of the
//! configured-target nodes. Expanding the working set discards them all.

use super::ConfiguredTarget;
use std::collections::HashMap;
use tracing::info;

/// What the build server needs from an analysis cache.
pub trait AnalysisCache {
  /// Drop every cached result; the next build reanalyzes all targets.
  fn discard(&mut self);
}

/// In-memory cache keyed by target name, with counters for observability.
#[derive(Debug, Default)]
pub struct ConfiguredTargetCache {
  entries: HashMap<String, ConfiguredTarget>,
  discards: usize,
  analyses: usize,
}

impl ConfiguredTargetCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, target: &str) -> Option<&ConfiguredTarget> {
    self.entries.get(target)
  }

  /// Record a fresh analysis.
  pub fn insert(&mut self, target: &str, configured: ConfiguredTarget) {
    self.analyses += 1;
    self.entries.insert(target.to_string(), configured);
  }

  /// Number of times the cache was discarded.
  pub fn discard_count(&self) -> usize {
    self.discards
  }

  /// Number of target analyses performed.
  pub fn analysis_count(&self) -> usize {
    self.analyses
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl AnalysisCache for ConfiguredTargetCache {
  fn discard(&mut self) {
    info!(entries = self.entries.len(), "discarding analysis cache");
    self.entries.clear();
    self.discards += 1;
  }
}
