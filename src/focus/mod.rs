//! Working-set focusing for a long-lived build graph
//!
//! A focus prunes the graph down to what is needed to rebuild after edits
//! confined to the working set:
//! - **resolver**: working set paths → file-state leaves
//! - **marker**: leaves + roots → Keep set
//! - **sweeper**: delete everything outside Keep, then strip dangling edges
//! - **store**: the committed working set, replaced after every focus
//! - **guard**: rejects later edits the pruned graph can no longer see
//! - **report** / **profiler**: stats lines, verbose dump, Chrome trace
//!
//! [`Focuser::focus`] runs the whole sequence. It only touches the store once
//! the graph has been swept, so a failed focus leaves both as they were.

pub mod guard;
pub mod marker;
pub mod profiler;
pub mod report;
pub mod resolver;
pub mod store;
pub mod sweeper;

pub use guard::{ChangeDetector, ChangeKind, ChangedPath, GuardReport};
pub use marker::{KeepSet, MarkResult, Marker};
pub use profiler::{FOCUS_PHASE, Profiler, TraceEvent};
pub use report::FocusStats;
pub use resolver::ResolvedWorkingSet;
pub use store::{NO_WORKING_SET, WorkingSet, WorkingSetStore, WorkingSetUpdate};
pub use sweeper::SweepStats;

use crate::core::error::{FocusError, FocusResult};
use crate::graph::{FocusGraph, NodeId, NodeKey};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Result of a successful focus.
#[derive(Debug, Clone)]
pub struct FocusReport {
  pub stats: FocusStats,
  /// Kept-key dump, present in verbose mode
  pub verbose: Option<Vec<String>>,
  pub leaf_keys: BTreeSet<NodeKey>,
  /// Source keys deleted by this focus
  pub swept_sources: BTreeSet<NodeKey>,
}

impl FocusReport {
  /// Stats lines followed by the verbose dump, if any.
  pub fn lines(&self) -> Vec<String> {
    let mut lines = self.stats.lines();
    if let Some(verbose) = &self.verbose {
      lines.extend(verbose.iter().cloned());
    }
    lines
  }
}

/// Runs focus operations against a graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct Focuser {
  marker: Marker,
  verbose: bool,
}

impl Focuser {
  pub fn new(verbose: bool, parallel_mark_threshold: usize) -> Self {
    Self {
      marker: Marker::new(parallel_mark_threshold),
      verbose,
    }
  }

  /// Focus `graph` on `paths`, keeping everything `roots` need.
  ///
  /// Roots missing from the graph are ignored. On success the store holds the
  /// new working set; on any error neither the graph nor the store changed.
  pub fn focus<G: FocusGraph + Sync>(
    &self,
    graph: &mut G,
    store: &mut WorkingSetStore,
    roots: &[NodeKey],
    paths: &[String],
    profiler: &mut Profiler,
  ) -> FocusResult<FocusReport> {
    let outer = profiler.start(FOCUS_PHASE);
    let result = self.run(graph, store, roots, paths, profiler);
    profiler.finish(outer);
    result
  }

  fn run<G: FocusGraph + Sync>(
    &self,
    graph: &mut G,
    store: &mut WorkingSetStore,
    roots: &[NodeKey],
    paths: &[String],
    profiler: &mut Profiler,
  ) -> FocusResult<FocusReport> {
    let paths = resolver::normalize_working_set(paths)?;
    if paths.is_empty() {
      return Err(FocusError::with_help(
        "working set is empty",
        "Pass at least one file or directory to --working-set.",
      ));
    }
    let resolved = resolver::resolve(&*graph, &paths)?;
    let root_ids: Vec<NodeId> = roots.iter().filter_map(|key| graph.find(key)).collect();

    let phase = profiler.start("focus.mark");
    let mark = self.marker.mark(&*graph, &resolved.leafs, &root_ids);
    profiler.finish(phase);

    if let Err(violation) = marker::verify_keep_set(&*graph, &mark, &root_ids) {
      warn!(%violation, "Keep set failed verification, leaving graph unfocused");
      return Err(violation.into());
    }

    // Keys are gone once the sweep runs
    let verbose = self.verbose.then(|| report::kept_keys_dump(&*graph, &mark));

    let sweep = sweeper::sweep(graph, &mark.keep, profiler);

    let mut swept_sources: BTreeSet<NodeKey> = store
      .active()
      .map(|ws| {
        ws.swept_sources
          .iter()
          .filter(|key| graph.find(key).is_none())
          .cloned()
          .collect()
      })
      .unwrap_or_default();
    swept_sources.extend(sweep.swept_sources.iter().cloned());

    let stats = FocusStats::new(&mark, &sweep);
    for line in stats.lines() {
      info!("{}", line);
    }

    store.replace(resolved.paths, resolved.leaf_keys.clone(), swept_sources);

    Ok(FocusReport {
      stats,
      verbose,
      leaf_keys: resolved.leaf_keys,
      swept_sources: sweep.swept_sources,
    })
  }
}
