//! Working set guard against additions and deletions

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_deletion_outside_working_set_is_refused() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;
  build_with(&mut server, &["gen"], &["in.txt"])?;

  ws.remove_file("in2.txt")?;
  let err = build(&mut server, &["gen"]).unwrap_err();
  assert!(err.to_string().contains("in2.txt"));

  Ok(())
}

#[test]
fn test_addition_to_swept_directory_is_refused() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;
  build_with(&mut server, &["gen"], &["in.txt"])?;

  ws.write_file("lib/new.txt", "new;")?;
  let err = build(&mut server, &["gen"]).unwrap_err();
  assert!(err.to_string().contains("lib/new.txt"));

  Ok(())
}

#[test]
fn test_deletion_inside_working_set_directory_rebuilds() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;
  build_with(&mut server, &["gen"], &["lib"])?;

  ws.remove_file("lib/a.txt")?;
  let outcome = build(&mut server, &["gen"])?;
  assert_eq!(outcome.outputs["gen"], "in;in2;b;");

  Ok(())
}

#[test]
fn test_reported_paths_are_sorted() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;
  build_with(&mut server, &["gen"], &["in.txt"])?;

  ws.write_file("lib/a.txt", "x;")?;
  ws.write_file("in2.txt", "y;")?;
  let err = build(&mut server, &["gen"]).unwrap_err();
  assert_eq!(
    err.to_string(),
    "detected changes outside of the working set\nin2.txt\nlib/a.txt"
  );

  Ok(())
}

#[test]
fn test_new_working_set_covers_pending_edit() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;
  build_with(&mut server, &["gen"], &["in.txt"])?;

  ws.write_file("in2.txt", "edited;")?;
  assert!(build(&mut server, &["gen"]).is_err());

  // Widening the working set in the same request lets the edit through
  let outcome = build_with(&mut server, &["gen"], &["in.txt", "in2.txt"])?;
  assert_eq!(outcome.outputs["gen"], "in;edited;a;b;");

  Ok(())
}
