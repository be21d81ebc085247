//! Test helpers for integration tests

use anyhow::{Context, Result};
use focuser::{BuildOutcome, BuildRequest, BuildServer};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Default workspace layout:
/// - `gen` reads in.txt and in2.txt and consumes `lib`
/// - `lib` reads everything under lib/
/// - `other` reads other.txt and nothing else
pub const DEFAULT_CONFIG: &str = r#"[focus]
trace_file = "focus-trace.json"

[[targets]]
name = "lib"
srcs = ["lib"]

[[targets]]
name = "gen"
srcs = ["in.txt", "in2.txt"]
deps = ["lib"]

[[targets]]
name = "other"
srcs = ["other.txt"]
"#;

/// A temporary workspace with a focus.toml
pub struct TestWorkspace {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestWorkspace {
  /// Create the default workspace
  pub fn new() -> Result<Self> {
    let ws = Self::with_config(DEFAULT_CONFIG)?;
    ws.write_file("in.txt", "in;")?;
    ws.write_file("in2.txt", "in2;")?;
    ws.write_file("lib/a.txt", "a;")?;
    ws.write_file("lib/deep/er/b.txt", "b;")?;
    ws.write_file("other.txt", "other;")?;
    Ok(ws)
  }

  /// Create an empty workspace with the given focus.toml
  pub fn with_config(config: &str) -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().canonicalize()?;
    std::fs::write(path.join("focus.toml"), config)?;
    Ok(Self { _root: root, path })
  }

  /// Write a file, creating parent directories
  pub fn write_file(&self, rel: &str, content: &str) -> Result<()> {
    let file_path = self.path.join(rel);
    if let Some(parent) = file_path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&file_path, content).with_context(|| format!("Failed to write {}", rel))?;
    Ok(())
  }

  pub fn remove_file(&self, rel: &str) -> Result<()> {
    std::fs::remove_file(self.path.join(rel))?;
    Ok(())
  }

  pub fn file_exists(&self, rel: &str) -> bool {
    self.path.join(rel).exists()
  }

  pub fn read_file(&self, rel: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(rel))?)
  }

  /// Start a build server over this workspace
  pub fn server(&self) -> Result<BuildServer> {
    Ok(BuildServer::open(&self.path)?)
  }
}

/// Build `targets` with a new working set
pub fn build_with(server: &mut BuildServer, targets: &[&str], working_set: &[&str]) -> Result<BuildOutcome> {
  let request = BuildRequest::new(targets.iter().copied()).with_working_set(working_set.iter().copied());
  Ok(server.build(&request)?)
}

/// Build `targets` reusing the persisted working set
pub fn build(server: &mut BuildServer, targets: &[&str]) -> Result<BuildOutcome> {
  Ok(server.build(&BuildRequest::new(targets.iter().copied()))?)
}

/// Run the focuser binary, failing on a non-zero exit
pub fn run_focuser(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_focuser_unchecked(cwd, args, None)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "focuser command failed: focuser {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

/// Run the focuser binary, optionally feeding `stdin`, whatever the exit status
pub fn run_focuser_unchecked(cwd: &Path, args: &[&str], stdin: Option<&str>) -> Result<Output> {
  let focuser_bin = env!("CARGO_BIN_EXE_focuser");

  let mut child = Command::new(focuser_bin)
    .current_dir(cwd)
    .args(args)
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()
    .context("Failed to run focuser")?;

  {
    let mut pipe = child.stdin.take().context("focuser stdin unavailable")?;
    if let Some(input) = stdin {
      pipe.write_all(input.as_bytes())?;
    }
  }

  Ok(child.wait_with_output()?)
}
