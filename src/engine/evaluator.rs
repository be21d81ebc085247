//! On-demand node evaluation
//!
//! Dependencies are always evaluated before the node itself. A node is reused
//! only if it is clean and the dependency list it was computed from is the one
//! just recomputed; otherwise its value is computed again and, if it changed,
//! its consumers are invalidated. That second condition is what repairs
//! context nodes whose edges were stripped by a focus.

use super::analysis_cache::ConfiguredTargetCache;
use super::{BuildGraph, ConfiguredTarget, FileState, NodeValue, SourceFilter, digest_hex};
use crate::core::config::FocusConfig;
use crate::core::error::{FocusError, FocusResult, ResultExt};
use crate::graph::{FocusGraph, NodeId, NodeKey, NodeKind, TargetGraph};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Counters for one evaluation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalStats {
  pub reused: usize,
  pub computed: usize,
}

/// One evaluation pass over the build graph.
pub struct Evaluator<'a> {
  root: &'a Path,
  config: &'a FocusConfig,
  filter: &'a SourceFilter,
  graph: &'a mut BuildGraph,
  cache: &'a mut ConfiguredTargetCache,
  done: HashMap<NodeKey, NodeId>,
  stats: EvalStats,
}

impl<'a> Evaluator<'a> {
  pub fn new(
    root: &'a Path,
    config: &'a FocusConfig,
    filter: &'a SourceFilter,
    graph: &'a mut BuildGraph,
    cache: &'a mut ConfiguredTargetCache,
  ) -> Self {
    Self {
      root,
      config,
      filter,
      graph,
      cache,
      done: HashMap::new(),
      stats: EvalStats::default(),
    }
  }

  pub fn stats(&self) -> EvalStats {
    self.stats
  }

  /// Build `targets` and return each one's action output.
  pub fn build(&mut self, targets: &[String]) -> FocusResult<BTreeMap<String, String>> {
    let order = TargetGraph::build(&self.config.targets).build_order(targets)?;
    for name in &order {
      self.evaluate(&NodeKey::action(name.as_str()))?;
    }

    let mut outputs = BTreeMap::new();
    for name in targets {
      self.evaluate(&NodeKey::build_driver(name.as_str()))?;
      let output = self
        .graph
        .value_of(&NodeKey::action(name.as_str()))
        .and_then(NodeValue::action_output)
        .unwrap_or_default();
      outputs.insert(name.clone(), output.to_string());
    }
    debug!(reused = self.stats.reused, computed = self.stats.computed, "evaluation finished");
    Ok(outputs)
  }

  /// Bring `key` up to date and return its id.
  pub fn evaluate(&mut self, key: &NodeKey) -> FocusResult<NodeId> {
    if let Some(id) = self.done.get(key) {
      return Ok(*id);
    }

    let dep_keys = self.dep_keys(key)?;
    let mut deps = Vec::with_capacity(dep_keys.len());
    for dep in &dep_keys {
      deps.push(self.evaluate(dep)?);
    }

    let id = self.graph.get_or_insert(key)?;
    let reusable = self.graph.is_clean(id) && self.graph.deps(id) == deps.as_slice() && !self.needs_analysis(key);
    if reusable {
      self.stats.reused += 1;
    } else {
      let value = self.compute(key, &deps)?;
      if self.graph.value(id).is_some_and(|old| *old != value) {
        let consumers = self.graph.rdeps(id).to_vec();
        self.graph.invalidate(&consumers);
      }
      self.graph.set_value(id, value, deps);
      self.stats.computed += 1;
    }

    self.done.insert(key.clone(), id);
    Ok(id)
  }

  /// A configured target whose cached analysis was discarded is analyzed again.
  fn needs_analysis(&self, key: &NodeKey) -> bool {
    key.kind == NodeKind::ConfiguredTarget && self.cache.get(&key.name).is_none()
  }

  fn dep_keys(&mut self, key: &NodeKey) -> FocusResult<Vec<NodeKey>> {
    match key.kind {
      NodeKind::FileState => Ok(Vec::new()),
      NodeKind::DirectoryListing => self.list_directory(&key.name),
      NodeKind::ConfiguredTarget => {
        let target = self.config.target(&key.name)?;
        Ok(
          target
            .normalized_srcs()
            .into_iter()
            .map(|src| {
              if self.root.join(&src).is_dir() {
                NodeKey::directory(src)
              } else {
                NodeKey::file(src)
              }
            })
            .collect(),
        )
      }
      NodeKind::ActionExecution => {
        let ct_key = NodeKey::configured_target(key.name.as_str());
        let ct_id = self.evaluate(&ct_key)?;
        let configured = self
          .graph
          .value(ct_id)
          .and_then(NodeValue::as_configured)
          .cloned()
          .ok_or_else(|| FocusError::message(format!("{} has no analysis result", ct_key)))?;

        let mut keys = vec![ct_key];
        keys.extend(configured.files.iter().map(|f| NodeKey::file(f.as_str())));
        keys.extend(configured.deps.iter().map(|d| NodeKey::action(d.as_str())));
        Ok(keys)
      }
      NodeKind::BuildDriver => Ok(vec![NodeKey::action(key.name.as_str())]),
    }
  }

  /// Direct entries of a workspace directory as file-state and listing keys.
  /// A directory that no longer exists lists as empty.
  fn list_directory(&self, dir: &str) -> FocusResult<Vec<NodeKey>> {
    let path = self.root.join(dir);
    let entries = match fs::read_dir(&path) {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(FocusError::from(e).context(format!("Failed to list {}", path.display()))),
    };

    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for entry in entries {
      let entry = entry.with_context(|| format!("Failed to list {}", path.display()))?;
      let name = entry.file_name().to_string_lossy().into_owned();
      let rel = if dir.is_empty() { name } else { format!("{}/{}", dir, name) };
      if self.filter.skips(&rel) {
        continue;
      }
      let file_type = entry.file_type()?;
      if file_type.is_dir() {
        dirs.push(NodeKey::directory(rel));
      } else if file_type.is_file() {
        files.push(NodeKey::file(rel));
      }
    }
    files.sort();
    dirs.sort();
    files.extend(dirs);
    Ok(files)
  }

  fn compute(&mut self, key: &NodeKey, deps: &[NodeId]) -> FocusResult<NodeValue> {
    match key.kind {
      NodeKind::FileState => self.read_file(&key.name),
      NodeKind::DirectoryListing => {
        let mut files = Vec::new();
        let mut dirs = Vec::new();
        for dep in self.dep_keys_of(deps) {
          match dep.kind {
            NodeKind::FileState => files.push(dep.name.clone()),
            NodeKind::DirectoryListing => dirs.push(dep.name.clone()),
            _ => {}
          }
        }
        Ok(NodeValue::Directory { files, dirs })
      }
      NodeKind::ConfiguredTarget => {
        let configured = self.analyze(&key.name, deps)?;
        self.cache.insert(&key.name, configured.clone());
        Ok(NodeValue::Configured(configured))
      }
      NodeKind::ActionExecution => self.execute(&key.name, deps),
      NodeKind::BuildDriver => {
        let digest = deps
          .iter()
          .find_map(|id| match self.graph.value(*id) {
            Some(NodeValue::Action { digest, .. }) => Some(digest.clone()),
            _ => None,
          })
          .unwrap_or_default();
        Ok(NodeValue::Driver { digest })
      }
    }
  }

  fn dep_keys_of(&self, deps: &[NodeId]) -> Vec<NodeKey> {
    deps.iter().filter_map(|id| self.graph.key(*id).cloned()).collect()
  }

  fn read_file(&self, rel: &str) -> FocusResult<NodeValue> {
    let path = self.root.join(rel);
    if !path.is_file() {
      return Ok(NodeValue::File(FileState::Missing));
    }
    let bytes = fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(NodeValue::File(FileState::Present {
      digest: digest_hex(&bytes),
      contents: String::from_utf8_lossy(&bytes).into_owned(),
    }))
  }

  /// Expand a target's sources into the files it reads.
  fn analyze(&self, name: &str, deps: &[NodeId]) -> FocusResult<ConfiguredTarget> {
    let target = self.config.target(name)?;
    let mut files = Vec::new();

    for dep in self.dep_keys_of(deps) {
      match dep.kind {
        NodeKind::FileState => match self.graph.value_of(&dep) {
          Some(NodeValue::File(FileState::Present { .. })) => files.push(dep.name.clone()),
          _ => {
            return Err(FocusError::with_help(
              format!("Target '{}' reads '{}', which does not exist", name, dep.name),
              "Create the file or remove it from `srcs` in focus.toml",
            ));
          }
        },
        NodeKind::DirectoryListing => files.extend(self.nested_files(&dep.name)),
        _ => {}
      }
    }

    files.sort();
    files.dedup();
    Ok(ConfiguredTarget {
      files,
      deps: target.deps.clone(),
    })
  }

  /// Every file below an evaluated directory listing.
  fn nested_files(&self, dir: &str) -> Vec<String> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_string()];
    while let Some(current) = stack.pop() {
      if let Some(NodeValue::Directory { files: listed, dirs }) = self.graph.value_of(&NodeKey::directory(current)) {
        files.extend(listed.iter().cloned());
        stack.extend(dirs.iter().cloned());
      }
    }
    files
  }

  /// Concatenate the target's file contents followed by its dependencies' outputs.
  fn execute(&self, name: &str, deps: &[NodeId]) -> FocusResult<NodeValue> {
    let mut output = String::new();
    for id in deps {
      match self.graph.value(*id) {
        Some(NodeValue::File(FileState::Present { contents, .. })) => output.push_str(contents),
        Some(NodeValue::File(FileState::Missing)) => {
          let path = self.graph.key(*id).map(|k| k.name.clone()).unwrap_or_default();
          return Err(FocusError::with_help(
            format!("Target '{}' reads '{}', which was deleted", name, path),
            "Restore the file or remove it from `srcs` in focus.toml",
          ));
        }
        Some(NodeValue::Action { output: dep_output, .. }) => output.push_str(dep_output),
        _ => {}
      }
    }
    let digest = digest_hex(output.as_bytes());
    Ok(NodeValue::Action { output, digest })
  }
}
