//! End-to-end tests of the focuser binary

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_build_prints_outputs_and_stats() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_focuser(&ws.path, &["build", "gen", "--working-set", "in.txt"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  let lines: Vec<&str> = stdout.lines().collect();

  assert_eq!(lines[0], "gen: in;in2;a;b;");
  assert_eq!(lines[1], "Focusing on 1 roots, 1 leafs");
  assert!(lines[2].starts_with("Nodes in reverse transitive closure from leafs: "));
  assert!(lines[3].starts_with("Nodes in direct deps of reverse transitive closure: "));
  assert!(lines[4].starts_with("Rdep edges: "));
  assert!(lines[5].starts_with("Heap: ") && lines[5].ends_with("% reduction)"));
  assert!(lines[6].starts_with("Node count: ") && lines[6].ends_with("% reduction)"));
  assert!(ws.file_exists("focus-trace.json"));

  Ok(())
}

#[test]
fn test_build_without_working_set_prints_outputs_only() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_focuser(&ws.path, &["build", "gen", "other"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert_eq!(stdout, "gen: in;in2;a;b;\nother: other;\n");

  Ok(())
}

#[test]
fn test_verbose_build_prints_kept_keys() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_focuser(&ws.path, &["build", "gen", "--working-set=in.txt", "--verbose"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("Rdeps kept:\n"));
  assert!(stdout.contains("Deps kept:\n"));
  assert!(stdout.contains("Summary of kept keys:\n"));
  assert!(stdout.contains("  BUILD_DRIVER: 1\n"));

  Ok(())
}

#[test]
fn test_working_set_command_prints_sentinel() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_focuser(&ws.path, &["working-set"])?;
  assert_eq!(String::from_utf8_lossy(&output.stdout), "No working set found.\n");

  Ok(())
}

#[test]
fn test_serve_keeps_working_set_between_builds() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let script = "build gen --working-set=in.txt\nworking-set\nbuild gen\nreset\nworking-set\nquit\n";
  let output = run_focuser_unchecked(&ws.path, &["serve"], Some(script))?;
  assert!(output.status.success());

  let stdout = String::from_utf8_lossy(&output.stdout);
  assert_eq!(stdout.matches("gen: in;in2;a;b;").count(), 2);
  assert_eq!(stdout.matches("Focusing on 1 roots, 1 leafs").count(), 2);
  assert!(stdout.contains("\nin.txt\n"));
  assert!(stdout.ends_with("Graph reset\nNo working set found.\n"));

  Ok(())
}

#[test]
fn test_serve_reports_failed_build_and_continues() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let script = "build gen --working-set=in.txt\nbuild gen --working-set=missing.txt\nworking-set\n";
  let output = run_focuser_unchecked(&ws.path, &["serve"], Some(script))?;
  assert!(output.status.success());

  let stdout = String::from_utf8_lossy(&output.stdout);
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("unable to resolve working set paths to graph nodes"));
  assert!(stdout.ends_with("in.txt\n"));

  Ok(())
}

#[test]
fn test_missing_config_exits_with_user_error() -> Result<()> {
  let dir = tempfile::TempDir::new()?;

  let output = run_focuser_unchecked(dir.path(), &["build", "gen"], None)?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("ERROR:"));

  Ok(())
}

#[test]
fn test_unknown_target_exits_with_user_error() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_focuser_unchecked(&ws.path, &["build", "nope"], None)?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("nope"));

  Ok(())
}

#[test]
fn test_unresolvable_working_set_exits_with_user_error() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_focuser_unchecked(&ws.path, &["build", "gen", "--working-set", "other.txt"], None)?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("other.txt"));
  assert!(stderr.contains("Help:"));

  Ok(())
}
