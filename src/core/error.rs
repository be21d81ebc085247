//! Error types for focuser with contextual messages and exit codes
//!
//! Every user-correctable error (bad working set, out-of-scope edit, config
//! problems) carries a help message pointing at the fix. Internal defects such
//! as a broken Keep set are kept in their own category so callers can tell
//! "you did something wrong" apart from "we did something wrong".

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for focuser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, bad working set)
  User = 1,
  /// System error (I/O, internal invariant failures)
  System = 2,
  /// Validation failure (edits outside the working set)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for focuser
#[derive(Debug)]
pub enum FocusError {
  /// Configuration errors
  Config(ConfigError),

  /// Working set resolution and validity errors
  WorkingSet(WorkingSetError),

  /// Internal graph invariant violations
  Invariant(InvariantViolation),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl FocusError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    FocusError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    FocusError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      FocusError::Message { message, context, help } => FocusError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      FocusError::Config(_) => ExitCode::User,
      FocusError::WorkingSet(WorkingSetError::OutOfWorkingSet { .. }) => ExitCode::Validation,
      FocusError::WorkingSet(_) => ExitCode::User,
      FocusError::Invariant(_) => ExitCode::System,
      FocusError::Io(_) => ExitCode::System,
      FocusError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      FocusError::Config(e) => e.help_message(),
      FocusError::WorkingSet(e) => e.help_message(),
      FocusError::Invariant(_) => {
        Some("The graph was left unfocused. Please report this together with the focus trace.".to_string())
      }
      FocusError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }

  /// True for an edit outside the active working set.
  pub fn is_out_of_working_set(&self) -> bool {
    matches!(self, FocusError::WorkingSet(WorkingSetError::OutOfWorkingSet { .. }))
  }
}

impl fmt::Display for FocusError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FocusError::Config(e) => write!(f, "{}", e),
      FocusError::WorkingSet(e) => write!(f, "{}", e),
      FocusError::Invariant(e) => write!(f, "{}", e),
      FocusError::Io(e) => write!(f, "I/O error: {}", e),
      FocusError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for FocusError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      FocusError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for FocusError {
  fn from(err: io::Error) -> Self {
    FocusError::Io(err)
  }
}

impl From<String> for FocusError {
  fn from(msg: String) -> Self {
    FocusError::message(msg)
  }
}

impl From<&str> for FocusError {
  fn from(msg: &str) -> Self {
    FocusError::message(msg)
  }
}

impl From<ConfigError> for FocusError {
  fn from(err: ConfigError) -> Self {
    FocusError::Config(err)
  }
}

impl From<WorkingSetError> for FocusError {
  fn from(err: WorkingSetError) -> Self {
    FocusError::WorkingSet(err)
  }
}

impl From<InvariantViolation> for FocusError {
  fn from(err: InvariantViolation) -> Self {
    FocusError::Invariant(err)
  }
}

impl From<toml_edit::de::Error> for FocusError {
  fn from(err: toml_edit::de::Error) -> Self {
    FocusError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for FocusError {
  fn from(err: serde_json::Error) -> Self {
    FocusError::message(format!("JSON error: {}", err))
  }
}

impl From<walkdir::Error> for FocusError {
  fn from(err: walkdir::Error) -> Self {
    FocusError::message(format!("Workspace scan error: {}", err))
  }
}

impl From<std::path::StripPrefixError> for FocusError {
  fn from(err: std::path::StripPrefixError) -> Self {
    FocusError::message(format!("Path strip prefix error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// focus.toml not found
  NotFound { workspace_root: PathBuf },

  /// A target was declared twice
  DuplicateTarget { name: String },

  /// A requested or referenced target does not exist
  UnknownTarget { name: String, referenced_by: Option<String> },

  /// Target dependencies form a cycle
  TargetCycle { members: Vec<String> },

  /// A src path is absolute or escapes the workspace
  InvalidSource { target: String, path: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => Some("Create a focus.toml declaring at least one [[targets]] entry.".to_string()),
      ConfigError::UnknownTarget { .. } => Some("Declared targets are listed under [[targets]] in focus.toml.".to_string()),
      ConfigError::TargetCycle { .. } => Some("Remove one of the `deps` entries that closes the cycle.".to_string()),
      ConfigError::InvalidSource { .. } => Some("Sources must be relative paths inside the workspace.".to_string()),
      ConfigError::DuplicateTarget { .. } => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { workspace_root } => {
        write!(
          f,
          "No focuser configuration found.\nExpected file: {}/focus.toml",
          workspace_root.display()
        )
      }
      ConfigError::DuplicateTarget { name } => write!(f, "Target '{}' is declared more than once", name),
      ConfigError::UnknownTarget { name, referenced_by } => match referenced_by {
        Some(owner) => write!(f, "Target '{}' depends on unknown target '{}'", owner, name),
        None => write!(f, "Target '{}' not found in configuration", name),
      },
      ConfigError::TargetCycle { members } => {
        write!(f, "Target dependency cycle detected: {}", members.join(" -> "))
      }
      ConfigError::InvalidSource { target, path } => {
        write!(f, "Target '{}' has invalid source path '{}'", target, path)
      }
    }
  }
}

/// Working set errors
#[derive(Debug)]
pub enum WorkingSetError {
  /// One or more working set paths have no node in the graph
  Resolution { paths: Vec<String> },

  /// Files outside the working set changed since the last build
  OutOfWorkingSet { paths: Vec<String> },
}

impl WorkingSetError {
  fn help_message(&self) -> Option<String> {
    match self {
      WorkingSetError::Resolution { .. } => Some(
        "Working set paths must be relative to the workspace root and used by a target that has been built.".to_string(),
      ),
      WorkingSetError::OutOfWorkingSet { .. } => Some(
        "Add the paths to --working-set (this triggers a full reanalysis) or revert the edits.".to_string(),
      ),
    }
  }

  /// The paths named by this error.
  pub fn paths(&self) -> &[String] {
    match self {
      WorkingSetError::Resolution { paths } | WorkingSetError::OutOfWorkingSet { paths } => paths,
    }
  }
}

impl fmt::Display for WorkingSetError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WorkingSetError::Resolution { paths } => {
        write!(f, "unable to resolve working set paths to graph nodes:")?;
        for path in paths {
          write!(f, "\n{}", path)?;
        }
        Ok(())
      }
      WorkingSetError::OutOfWorkingSet { paths } => {
        write!(f, "detected changes outside of the working set")?;
        for path in paths {
          write!(f, "\n{}", path)?;
        }
        Ok(())
      }
    }
  }
}

/// A Keep set that would leave the graph in a broken state
#[derive(Debug)]
pub enum InvariantViolation {
  /// A kept node depends on a node that would be swept
  DanglingDependency { node: String, dep: String },

  /// A requested root would be swept
  MissingRoot { root: String },
}

impl fmt::Display for InvariantViolation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      InvariantViolation::DanglingDependency { node, dep } => {
        write!(f, "Keep set is not closed: {} is kept but its dependency {} is not", node, dep)
      }
      InvariantViolation::MissingRoot { root } => write!(f, "Keep set is missing root {}", root),
    }
  }
}

/// Result type alias for focuser
pub type FocusResult<T> = Result<T, FocusError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> FocusResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> FocusResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<FocusError>,
{
  fn context(self, ctx: impl Into<String>) -> FocusResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> FocusResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &FocusError) {
  eprintln!("\nERROR: {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("Help: {}\n", help);
  }
}

impl From<anyhow::Error> for FocusError {
  fn from(err: anyhow::Error) -> Self {
    FocusError::message(err.to_string())
  }
}
