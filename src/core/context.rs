//! Workspace context - load once, pass everywhere
//!
//! ```text
//! main.rs:
//!   WorkspaceContext::build() -> WorkspaceContext
//!   |
//!   v
//! BuildServer::new(ctx)
//!   build, serve and working-set commands all read from it
//! ```

use crate::core::config::FocusConfig;
use crate::core::error::{FocusResult, ResultExt};
use crate::utils::relative_key_path;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Workspace root plus its parsed configuration.
#[derive(Debug, Clone)]
pub struct WorkspaceContext {
  /// Workspace root directory (absolute path)
  pub root: PathBuf,

  /// Parsed focus.toml, shared so the server and commands can hold it cheaply
  pub config: Arc<FocusConfig>,
}

impl WorkspaceContext {
  /// Canonicalize `workspace_root` and load its focus.toml.
  pub fn build(workspace_root: &Path) -> FocusResult<Self> {
    let root = workspace_root
      .canonicalize()
      .with_context(|| format!("Workspace root {} is not accessible", workspace_root.display()))?;
    let config = Arc::new(FocusConfig::load(&root)?);
    Ok(Self { root, config })
  }

  /// Context over an already-parsed config.
  pub fn with_config(root: impl Into<PathBuf>, config: FocusConfig) -> Self {
    Self {
      root: root.into(),
      config: Arc::new(config),
    }
  }

  pub fn workspace_root(&self) -> &Path {
    &self.root
  }

  /// Absolute trace file path, if configured.
  pub fn trace_file_path(&self) -> Option<PathBuf> {
    let trace = self.config.focus.trace_file.as_ref()?;
    Some(if trace.is_absolute() {
      trace.clone()
    } else {
      self.root.join(trace)
    })
  }

  /// Trace file as a workspace-relative key, if it lies inside the workspace.
  pub fn trace_file_key(&self) -> Option<String> {
    relative_key_path(&self.root, &self.trace_file_path()?)
  }
}
