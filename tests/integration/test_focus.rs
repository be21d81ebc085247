//! Focus behavior through a real build server

use crate::helpers::*;
use anyhow::Result;
use focuser::focus::{FOCUS_PHASE, NO_WORKING_SET, WorkingSetUpdate};
use focuser::graph::FocusGraph;

#[test]
fn test_first_build_with_working_set_focuses() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;

  let outcome = build_with(&mut server, &["gen"], &["in.txt"])?;
  assert_eq!(outcome.outputs["gen"], "in;in2;a;b;");
  assert_eq!(outcome.update, Some(WorkingSetUpdate::Initial));

  let report = outcome.focus.expect("focus report");
  assert_eq!(report.stats.roots, 1);
  assert_eq!(report.stats.leafs, 1);
  assert!(report.stats.nodes_after < report.stats.nodes_before);
  assert!(report.stats.rdep_edges_after <= report.stats.rdep_edges_before);
  assert!(report.stats.heap_after <= report.stats.heap_before);
  assert_eq!(server.working_set(), "in.txt");

  Ok(())
}

#[test]
fn test_build_without_working_set_keeps_everything() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;

  let outcome = build(&mut server, &["gen", "other"])?;
  assert!(outcome.focus.is_none());
  assert_eq!(outcome.outputs["other"], "other;");
  assert_eq!(server.working_set(), NO_WORKING_SET);
  assert!(!ws.file_exists("focus-trace.json"));

  Ok(())
}

#[test]
fn test_edit_inside_working_set_rebuilds() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;
  build_with(&mut server, &["gen"], &["in.txt"])?;

  ws.write_file("in.txt", "edited;")?;
  let outcome = build(&mut server, &["gen"])?;
  assert_eq!(outcome.outputs["gen"], "edited;in2;a;b;");
  assert_eq!(outcome.changes.len(), 1);
  assert_eq!(outcome.changes[0].path, "in.txt");

  Ok(())
}

#[test]
fn test_edit_outside_working_set_is_refused() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;
  build_with(&mut server, &["gen"], &["in.txt"])?;

  ws.write_file("in2.txt", "edited;")?;
  let err = build(&mut server, &["gen"]).unwrap_err();
  let message = err.to_string();
  assert!(message.contains("detected changes outside of the working set"));
  assert!(message.contains("in2.txt"));

  // Refused again until the edit is reverted
  assert!(build(&mut server, &["gen"]).is_err());
  ws.write_file("in2.txt", "in2;")?;
  let outcome = build(&mut server, &["gen"])?;
  assert_eq!(outcome.outputs["gen"], "in;in2;a;b;");

  Ok(())
}

#[test]
fn test_edit_of_swept_source_is_refused() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;
  build_with(&mut server, &["gen"], &["in.txt"])?;

  ws.write_file("lib/a.txt", "changed;")?;
  let err = build(&mut server, &["gen"]).unwrap_err();
  assert!(err.to_string().contains("lib/a.txt"));

  Ok(())
}

#[test]
fn test_untracked_edit_is_ignored() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;
  build_with(&mut server, &["gen"], &["in.txt"])?;

  ws.write_file("notes/todo.md", "unrelated")?;
  let outcome = build(&mut server, &["gen"])?;
  assert_eq!(outcome.outputs["gen"], "in;in2;a;b;");

  Ok(())
}

#[test]
fn test_expansion_discards_analysis_once() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;
  build_with(&mut server, &["gen"], &["in.txt"])?;
  let discards = server.cache().discard_count();

  let outcome = build_with(&mut server, &["gen"], &["in.txt", "in2.txt"])?;
  assert_eq!(outcome.update, Some(WorkingSetUpdate::Expansion));
  assert_eq!(server.cache().discard_count(), discards + 1);
  assert_eq!(server.working_set(), "in.txt\nin2.txt");

  let outcome = build_with(&mut server, &["gen"], &["in2.txt", "in.txt"])?;
  assert_eq!(outcome.update, Some(WorkingSetUpdate::Unchanged));
  assert_eq!(server.cache().discard_count(), discards + 1);

  // in2.txt is now editable
  ws.write_file("in2.txt", "edited;")?;
  let outcome = build(&mut server, &["gen"])?;
  assert_eq!(outcome.outputs["gen"], "in;edited;a;b;");

  Ok(())
}

#[test]
fn test_reduction_keeps_analysis() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;
  build_with(&mut server, &["gen"], &["in.txt", "in2.txt"])?;
  let discards = server.cache().discard_count();

  let outcome = build_with(&mut server, &["gen"], &["in.txt"])?;
  assert_eq!(outcome.update, Some(WorkingSetUpdate::Reduction));
  assert_eq!(server.cache().discard_count(), discards);
  assert_eq!(server.working_set(), "in.txt");

  Ok(())
}

#[test]
fn test_directory_working_set_accepts_nested_edits() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;
  let outcome = build_with(&mut server, &["gen"], &["lib"])?;
  let report = outcome.focus.expect("focus report");
  assert_eq!(report.stats.leafs, 2);

  ws.write_file("lib/deep/er/b.txt", "B;")?;
  let outcome = build(&mut server, &["gen"])?;
  assert_eq!(outcome.outputs["gen"], "in;in2;a;B;");

  ws.write_file("lib/deep/c.txt", "c;")?;
  let outcome = build(&mut server, &["gen"])?;
  assert_eq!(outcome.outputs["gen"], "in;in2;a;c;B;");

  Ok(())
}

#[test]
fn test_unresolvable_working_set_is_rejected() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;
  build_with(&mut server, &["gen"], &["in.txt"])?;

  let err = build_with(&mut server, &["gen"], &["missing.txt"]).unwrap_err();
  assert!(err.to_string().contains("unable to resolve working set paths to graph nodes"));
  assert!(err.to_string().contains("missing.txt"));
  assert_eq!(server.working_set(), "in.txt");

  Ok(())
}

#[test]
fn test_repeated_focus_is_idempotent() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;

  let first = build_with(&mut server, &["gen"], &["in.txt"])?
    .focus
    .expect("focus report");
  let second = build(&mut server, &["gen"])?.focus.expect("focus report");
  let third = build(&mut server, &["gen"])?.focus.expect("focus report");

  assert_eq!(first.stats.nodes_after, second.stats.nodes_after);
  assert_eq!(second.stats.nodes_after, third.stats.nodes_after);
  assert_eq!(first.leaf_keys, third.leaf_keys);
  assert_eq!(second.stats.reverse_closure, third.stats.reverse_closure);

  Ok(())
}

#[test]
fn test_verbose_build_lists_kept_keys() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;

  let request = focuser::BuildRequest::new(["gen"])
    .with_working_set(["in.txt"])
    .verbose(true);
  let outcome = server.build(&request)?;
  let lines = outcome.focus.expect("focus report").lines();
  assert!(lines.iter().any(|l| l == "Rdeps kept:"));
  assert!(lines.iter().any(|l| l == "    in.txt"));
  assert!(lines.iter().any(|l| l == "Summary of kept keys:"));

  Ok(())
}

#[test]
fn test_trace_file_records_focus_phases() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;
  build_with(&mut server, &["gen"], &["in.txt"])?;

  let trace: serde_json::Value = serde_json::from_str(&ws.read_file("focus-trace.json")?)?;
  let names: Vec<&str> = trace["traceEvents"]
    .as_array()
    .expect("traceEvents array")
    .iter()
    .filter_map(|e| e["name"].as_str())
    .collect();
  for phase in [FOCUS_PHASE, "focus.mark", "focus.sweep_nodes", "focus.sweep_edges"] {
    assert!(names.contains(&phase), "missing {} in {:?}", phase, names);
  }

  // Rewriting the trace is not an edit
  let outcome = build(&mut server, &["gen"])?;
  assert!(outcome.changes.is_empty());

  Ok(())
}

#[test]
fn test_trace_file_holds_latest_focus_only() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;
  build_with(&mut server, &["gen"], &["in.txt"])?;
  for _ in 0..5 {
    build(&mut server, &["gen"])?;
  }

  let trace: serde_json::Value = serde_json::from_str(&ws.read_file("focus-trace.json")?)?;
  let events = trace["traceEvents"].as_array().expect("traceEvents array");
  let outer = events.iter().filter(|e| e["name"] == FOCUS_PHASE).count();
  assert_eq!(outer, 1);
  assert_eq!(events.len(), 4);
  assert_eq!(server.profiler().events().len(), 4);

  Ok(())
}

#[test]
fn test_node_table_stays_bounded_across_builds() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;
  build_with(&mut server, &["gen"], &["in.txt"])?;

  let mut peak_live = 0;
  for _ in 0..50 {
    for target in ["other", "gen"] {
      let report = build(&mut server, &[target])?.focus.expect("focus report");
      peak_live = peak_live.max(report.stats.nodes_before);
    }
  }

  let graph = server.graph();
  assert!(graph.id_bound() <= peak_live, "{} slots for a peak of {} live nodes", graph.id_bound(), peak_live);

  let settled = build(&mut server, &["gen"])?.focus.expect("focus report");
  let again = build(&mut server, &["gen"])?.focus.expect("focus report");
  assert_eq!(settled.stats.heap_after, again.stats.heap_after);

  Ok(())
}

#[test]
fn test_reset_forgets_working_set() -> Result<()> {
  let ws = TestWorkspace::new()?;
  let mut server = ws.server()?;
  build_with(&mut server, &["gen"], &["in.txt"])?;
  server.reset();

  // Anything goes once the working set is gone
  ws.write_file("in2.txt", "edited;")?;
  let outcome = build(&mut server, &["gen"])?;
  assert!(outcome.focus.is_none());
  assert_eq!(outcome.outputs["gen"], "in;edited;a;b;");
  assert_eq!(server.working_set(), NO_WORKING_SET);

  Ok(())
}
