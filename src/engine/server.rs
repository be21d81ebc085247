//! Long-lived build server
//!
//! Owns the build graph and every piece of state that must outlive a single
//! build: the working set store, the analysis cache, the change detector
//! baseline and the profiler. One `build` call runs:
//!
//! ```text
//! detect changes -> guard -> discard analysis on expansion -> invalidate
//!   -> evaluate -> focus -> write trace
//! ```
//!
//! The guard runs before anything is invalidated, so a refused build leaves
//! the graph exactly as the previous build did.

use super::analysis_cache::{AnalysisCache, ConfiguredTargetCache};
use super::change_detector::SnapshotChangeDetector;
use super::evaluator::Evaluator;
use super::{BuildGraph, SourceFilter};
use crate::core::context::WorkspaceContext;
use crate::core::error::{FocusError, FocusResult};
use crate::focus::guard::{self, ChangeDetector, ChangedPath};
use crate::focus::resolver::normalize_working_set;
use crate::focus::{FocusReport, Focuser, Profiler, WorkingSetStore, WorkingSetUpdate};
use crate::graph::{FocusGraph, NodeId, NodeKey};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// One build command.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
  pub targets: Vec<String>,
  /// New working set; `None` reuses the persisted one
  pub working_set: Option<Vec<String>>,
  /// Print the kept-key dump for this build
  pub verbose: bool,
}

impl BuildRequest {
  pub fn new<I, S>(targets: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      targets: targets.into_iter().map(Into::into).collect(),
      ..Self::default()
    }
  }

  pub fn with_working_set<I, S>(mut self, paths: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.working_set = Some(paths.into_iter().map(Into::into).collect());
    self
  }

  pub fn verbose(mut self, verbose: bool) -> Self {
    self.verbose = verbose;
    self
  }
}

/// What a successful build produced.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
  /// Action output per requested target
  pub outputs: BTreeMap<String, String>,
  /// Changes picked up since the previous build
  pub changes: Vec<ChangedPath>,
  /// How the requested working set related to the previous one
  pub update: Option<WorkingSetUpdate>,
  /// Present when a working set was in force
  pub focus: Option<FocusReport>,
  /// The graph was found mid-sweep and rebuilt from scratch
  pub recovered: bool,
}

/// Build server state for one workspace.
pub struct BuildServer {
  ctx: WorkspaceContext,
  filter: SourceFilter,
  graph: BuildGraph,
  store: WorkingSetStore,
  cache: ConfiguredTargetCache,
  detector: Box<dyn ChangeDetector>,
  profiler: Profiler,
  /// Expanding set whose discard already happened but which never got committed
  discarded_for: Option<Vec<String>>,
}

impl BuildServer {
  pub fn new(ctx: WorkspaceContext) -> Self {
    let filter = SourceFilter::new(ctx.trace_file_key());
    let detector = Box::new(SnapshotChangeDetector::new(ctx.root.clone(), filter.clone()));
    Self {
      ctx,
      filter,
      graph: BuildGraph::new(),
      store: WorkingSetStore::new(),
      cache: ConfiguredTargetCache::new(),
      detector,
      profiler: Profiler::new(),
      discarded_for: None,
    }
  }

  /// Load the workspace at `root` and start a server for it.
  pub fn open(root: &Path) -> FocusResult<Self> {
    Ok(Self::new(WorkspaceContext::build(root)?))
  }

  /// Replace the change detector.
  pub fn with_detector(mut self, detector: Box<dyn ChangeDetector>) -> Self {
    self.detector = detector;
    self
  }

  pub fn build(&mut self, request: &BuildRequest) -> FocusResult<BuildOutcome> {
    if request.targets.is_empty() {
      return Err(FocusError::with_help("No targets requested", "Name at least one target from focus.toml"));
    }
    let recovered = self.recover_if_corrupt();

    let requested = request
      .working_set
      .as_deref()
      .map(normalize_working_set)
      .transpose()?;

    let changes = self.detector.poll()?;
    if let Some(ws) = self.store.active() {
      let active_paths = requested.as_deref().unwrap_or(ws.paths.as_slice());
      guard::check(&self.graph, ws, active_paths, &changes)?;
    }

    let update = requested.as_ref().map(|paths| self.store.classify(paths));
    if let (Some(update), Some(paths)) = (update, requested.as_ref()) {
      debug!(?update, "working set update");
      if update.requires_reanalysis() {
        // A retried expansion that failed before committing was already reanalyzed
        if self.discarded_for.as_ref() == Some(paths) {
          debug!("analysis already discarded for this working set");
        } else {
          self.cache.discard();
          self.discarded_for = Some(paths.clone());
        }
      }
    }

    self.invalidate(&changes);
    self.detector.accept();

    let outputs = Evaluator::new(&self.ctx.root, &self.ctx.config, &self.filter, &mut self.graph, &mut self.cache)
      .build(&request.targets)?;

    let paths = requested.or_else(|| self.store.paths().map(<[String]>::to_vec));
    let focus = match paths {
      Some(paths) => {
        let roots: Vec<NodeKey> = request
          .targets
          .iter()
          .map(|t| NodeKey::build_driver(t.as_str()))
          .collect();
        let settings = &self.ctx.config.focus;
        let focuser = Focuser::new(request.verbose || settings.verbose, settings.parallel_mark_threshold);
        let report = focuser.focus(&mut self.graph, &mut self.store, &roots, &paths, &mut self.profiler)?;
        self.discarded_for = None;
        Some(report)
      }
      None => None,
    };

    if let Some(trace) = self.ctx.trace_file_path()
      && focus.is_some()
    {
      self.profiler.write_chrome_trace(&trace)?;
    }

    Ok(BuildOutcome {
      outputs,
      changes,
      update,
      focus,
      recovered,
    })
  }

  /// Active working set paths one per line, or the no-working-set sentinel.
  pub fn working_set(&self) -> String {
    self.store.describe()
  }

  /// Drop the whole graph, the working set and the analysis cache.
  pub fn reset(&mut self) {
    info!(nodes = self.graph.node_count(), "resetting build graph");
    self.graph.clear();
    self.store.clear();
    self.cache.discard();
    self.detector.reset();
    self.discarded_for = None;
  }

  pub fn context(&self) -> &WorkspaceContext {
    &self.ctx
  }

  pub fn graph(&self) -> &BuildGraph {
    &self.graph
  }

  /// Mutable graph access for callers that drive the engine directly.
  pub fn graph_mut(&mut self) -> &mut BuildGraph {
    &mut self.graph
  }

  pub fn store(&self) -> &WorkingSetStore {
    &self.store
  }

  pub fn cache(&self) -> &ConfiguredTargetCache {
    &self.cache
  }

  pub fn profiler(&self) -> &Profiler {
    &self.profiler
  }

  /// A sweep that never finished leaves the graph untrustworthy.
  fn recover_if_corrupt(&mut self) -> bool {
    if !self.graph.is_corrupt() {
      return false;
    }
    warn!("build graph was left mid-sweep by an interrupted focus; rebuilding from scratch");
    self.reset();
    true
  }

  fn invalidate(&mut self, changes: &[ChangedPath]) {
    let seeds: Vec<NodeId> = changes
      .iter()
      .flat_map(ChangedPath::affected_keys)
      .filter_map(|key| self.graph.find(&key))
      .collect();
    let marked = self.graph.invalidate(&seeds);
    debug!(changes = changes.len(), marked, "invalidated changed nodes");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::config::FocusConfig;
  use crate::focus::{ChangeKind, NO_WORKING_SET};
  use std::cell::RefCell;
  use std::fs;
  use std::rc::Rc;
  use tempfile::TempDir;

  /// Detector fed by the test instead of the filesystem.
  #[derive(Default, Clone)]
  struct ScriptedDetector {
    queued: Rc<RefCell<Vec<ChangedPath>>>,
  }

  impl ChangeDetector for ScriptedDetector {
    fn poll(&mut self) -> FocusResult<Vec<ChangedPath>> {
      Ok(self.queued.borrow().clone())
    }

    fn accept(&mut self) {
      self.queued.borrow_mut().clear();
    }

    fn reset(&mut self) {
      self.queued.borrow_mut().clear();
    }
  }

  const CONFIG: &str = r#"
[[targets]]
name = "gen"
srcs = ["in.txt", "in2.txt"]

[[targets]]
name = "other"
srcs = ["other.txt"]
"#;

  fn server() -> (TempDir, BuildServer, ScriptedDetector) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("in.txt"), "in;").unwrap();
    fs::write(dir.path().join("in2.txt"), "in2;").unwrap();
    fs::write(dir.path().join("other.txt"), "other;").unwrap();
    let ctx = WorkspaceContext::with_config(dir.path(), FocusConfig::parse(CONFIG).unwrap());
    let detector = ScriptedDetector::default();
    let server = BuildServer::new(ctx).with_detector(Box::new(detector.clone()));
    (dir, server, detector)
  }

  #[test]
  fn test_build_without_working_set_does_not_focus() {
    let (_dir, mut server, _) = server();
    let outcome = server.build(&BuildRequest::new(["gen", "other"])).unwrap();
    assert_eq!(outcome.outputs["gen"], "in;in2;");
    assert_eq!(outcome.outputs["other"], "other;");
    assert!(outcome.focus.is_none());
    assert_eq!(server.working_set(), NO_WORKING_SET);
  }

  #[test]
  fn test_working_set_persists_across_builds() {
    let (_dir, mut server, _) = server();
    server
      .build(&BuildRequest::new(["gen"]).with_working_set(["in.txt"]))
      .unwrap();
    let outcome = server.build(&BuildRequest::new(["gen"])).unwrap();
    assert!(outcome.focus.is_some());
    assert_eq!(outcome.update, None);
    assert_eq!(server.working_set(), "in.txt");
  }

  #[test]
  fn test_refused_build_leaves_graph_untouched() {
    let (dir, mut server, detector) = server();
    server
      .build(&BuildRequest::new(["gen"]).with_working_set(["in.txt"]))
      .unwrap();
    let nodes = server.graph().node_count();

    fs::write(dir.path().join("in2.txt"), "edited;").unwrap();
    detector.queued.borrow_mut().push(ChangedPath::modified("in2.txt"));
    let err = server.build(&BuildRequest::new(["gen"])).unwrap_err();
    assert!(err.is_out_of_working_set());
    assert_eq!(server.graph().node_count(), nodes);
    // Still pending: the same edit is refused again
    assert!(server.build(&BuildRequest::new(["gen"])).is_err());
  }

  #[test]
  fn test_unresolvable_working_set_keeps_previous() {
    let (_dir, mut server, _) = server();
    server
      .build(&BuildRequest::new(["gen"]).with_working_set(["in.txt"]))
      .unwrap();
    let err = server
      .build(&BuildRequest::new(["gen"]).with_working_set(["other.txt"]))
      .unwrap_err();
    assert!(err.to_string().contains("other.txt"));
    assert_eq!(server.working_set(), "in.txt");
  }

  #[test]
  fn test_corrupt_graph_is_rebuilt() {
    let (_dir, mut server, _) = server();
    server
      .build(&BuildRequest::new(["gen"]).with_working_set(["in.txt"]))
      .unwrap();
    // Simulate a sweep that never finished
    server.graph_mut().begin_sweep();

    let outcome = server.build(&BuildRequest::new(["gen"])).unwrap();
    assert!(outcome.recovered);
    assert!(outcome.focus.is_none());
    assert_eq!(server.working_set(), NO_WORKING_SET);
    assert_eq!(outcome.outputs["gen"], "in;in2;");
    assert!(!server.graph().is_corrupt());
  }

  #[test]
  fn test_reset_clears_everything() {
    let (_dir, mut server, _) = server();
    server
      .build(&BuildRequest::new(["gen"]).with_working_set(["in.txt"]))
      .unwrap();
    server.reset();
    assert_eq!(server.graph().node_count(), 0);
    assert_eq!(server.working_set(), NO_WORKING_SET);
  }

  #[test]
  fn test_added_file_in_working_set_directory_is_built() {
    let (dir, _, detector) = server();
    fs::create_dir_all(dir.path().join("data")).unwrap();
    fs::write(dir.path().join("data/a.txt"), "a;").unwrap();
    let ctx = WorkspaceContext::with_config(
      dir.path(),
      FocusConfig::parse("[[targets]]\nname = \"d\"\nsrcs = [\"data\"]\n").unwrap(),
    );
    let mut server = BuildServer::new(ctx).with_detector(Box::new(detector.clone()));
    server
      .build(&BuildRequest::new(["d"]).with_working_set(["data"]))
      .unwrap();

    fs::create_dir_all(dir.path().join("data/new")).unwrap();
    fs::write(dir.path().join("data/new/b.txt"), "b;").unwrap();
    detector
      .queued
      .borrow_mut()
      .push(ChangedPath::new("data/new/b.txt", ChangeKind::Added));
    let outcome = server.build(&BuildRequest::new(["d"])).unwrap();
    assert_eq!(outcome.outputs["d"], "a;b;");
  }

  #[test]
  fn test_retried_expansion_discards_once() {
    let (_dir, mut server, _) = server();
    server
      .build(&BuildRequest::new(["gen"]).with_working_set(["in.txt"]))
      .unwrap();
    let discards = server.cache().discard_count();

    let widened = BuildRequest::new(["gen"]).with_working_set(["in.txt", "missing.txt"]);
    assert!(server.build(&widened).is_err());
    assert!(server.build(&widened).is_err());
    assert_eq!(server.cache().discard_count(), discards + 1);
    assert_eq!(server.working_set(), "in.txt");

    let outcome = server
      .build(&BuildRequest::new(["gen"]).with_working_set(["in.txt", "in2.txt"]))
      .unwrap();
    assert_eq!(outcome.update, Some(WorkingSetUpdate::Expansion));
    assert_eq!(server.cache().discard_count(), discards + 2);
  }
}
