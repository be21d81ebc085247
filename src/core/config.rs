use crate::core::error::{ConfigError, FocusError, FocusResult, ResultExt};
use crate::graph::TargetGraph;
use crate::utils::normalize_relative_path;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for focuser
/// Searched in order: focus.toml, .focus.toml, .config/focus.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FocusConfig {
  #[serde(default)]
  pub focus: FocusSettings,
  #[serde(default)]
  pub targets: Vec<TargetConfig>,
}

/// Knobs for the focus operation itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusSettings {
  /// Print the kept-key dump after every focus
  #[serde(default)]
  pub verbose: bool,

  /// Where to write the Chrome trace of focus phases (relative to the workspace root)
  #[serde(default)]
  pub trace_file: Option<PathBuf>,

  /// Leaf count at which the reverse walk fans out over rayon
  #[serde(default = "default_parallel_mark_threshold")]
  pub parallel_mark_threshold: usize,
}

fn default_parallel_mark_threshold() -> usize {
  64
}

impl Default for FocusSettings {
  fn default() -> Self {
    Self {
      verbose: false,
      trace_file: None,
      parallel_mark_threshold: default_parallel_mark_threshold(),
    }
  }
}

/// A buildable target: its sources (files or directories) and the targets it consumes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetConfig {
  pub name: String,
  #[serde(default)]
  pub srcs: Vec<String>,
  #[serde(default)]
  pub deps: Vec<String>,
}

impl TargetConfig {
  /// Sources in normalized form. Only valid after [`FocusConfig::validate`].
  pub fn normalized_srcs(&self) -> Vec<String> {
    self.srcs.iter().filter_map(|s| normalize_relative_path(s)).collect()
  }
}

impl FocusConfig {
  /// Find config file in search order: focus.toml, .focus.toml, .config/focus.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("focus.toml"),
      path.join(".focus.toml"),
      path.join(".config").join("focus.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from focus.toml (searches multiple locations)
  pub fn load(path: &Path) -> FocusResult<Self> {
    let config_path = Self::find_config_path(path).ok_or_else(|| {
      FocusError::Config(ConfigError::NotFound {
        workspace_root: path.to_path_buf(),
      })
    })?;

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    Self::parse(&content).with_context(|| format!("Invalid configuration in {}", config_path.display()))
  }

  /// Parse and validate config text
  pub fn parse(content: &str) -> FocusResult<Self> {
    let config: FocusConfig = toml_edit::de::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Validate targets: unique names, known deps, relative sources, no cycles
  pub fn validate(&self) -> FocusResult<()> {
    let mut seen = HashSet::new();
    for target in &self.targets {
      if target.name.trim().is_empty() {
        return Err(FocusError::with_help(
          "Target with an empty name",
          "Every [[targets]] entry needs a non-empty `name`",
        ));
      }
      if !seen.insert(target.name.as_str()) {
        return Err(ConfigError::DuplicateTarget {
          name: target.name.clone(),
        }
        .into());
      }
      for src in &target.srcs {
        if normalize_relative_path(src).is_none() {
          return Err(
            ConfigError::InvalidSource {
              target: target.name.clone(),
              path: src.clone(),
            }
            .into(),
          );
        }
      }
    }

    for target in &self.targets {
      for dep in &target.deps {
        if !seen.contains(dep.as_str()) {
          return Err(
            ConfigError::UnknownTarget {
              name: dep.clone(),
              referenced_by: Some(target.name.clone()),
            }
            .into(),
          );
        }
      }
    }

    let graph = TargetGraph::build(&self.targets);
    let cycles = graph.find_cycles();
    if let Some(cycle) = cycles.into_iter().next() {
      return Err(ConfigError::TargetCycle { members: cycle }.into());
    }

    Ok(())
  }

  /// Find a target by name
  pub fn target(&self, name: &str) -> FocusResult<&TargetConfig> {
    self.targets.iter().find(|t| t.name == name).ok_or_else(|| {
      ConfigError::UnknownTarget {
        name: name.to_string(),
        referenced_by: None,
      }
      .into()
    })
  }
}
