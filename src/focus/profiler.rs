//! Focus phase timing
//!
//! Phases are recorded as Chrome trace "complete" events (`ph: "X"`, times in
//! microseconds), loadable in `chrome://tracing` or Perfetto. Every phase is
//! also entered as a `tracing` span so log lines emitted during a phase carry
//! its name.
//!
//! Only the most recent focus is kept: opening a new outer phase drops the
//! events of the previous one, so a long-lived server's trace stays one focus
//! long.

use crate::core::error::{FocusResult, ResultExt};
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::span::EnteredSpan;

/// Name of the outer phase wrapping a whole focus operation.
pub const FOCUS_PHASE: &str = "SkyframeFocuser";

/// One complete event.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TraceEvent {
  pub name: String,
  pub cat: &'static str,
  pub ph: &'static str,
  pub ts: u64,
  pub dur: u64,
  pub pid: u32,
  pub tid: u64,
}

/// An open phase. Hand it back to [`Profiler::finish`] to record it.
#[must_use = "a phase is only recorded once it is finished"]
pub struct Phase {
  name: &'static str,
  started: Instant,
  _span: EnteredSpan,
}

/// Collects phase events of the most recent focus.
#[derive(Debug)]
pub struct Profiler {
  origin: Instant,
  events: Vec<TraceEvent>,
}

impl Default for Profiler {
  fn default() -> Self {
    Self::new()
  }
}

impl Profiler {
  pub fn new() -> Self {
    Self {
      origin: Instant::now(),
      events: Vec::new(),
    }
  }

  /// Open a phase. Phases nest; finish them innermost first.
  pub fn start(&mut self, name: &'static str) -> Phase {
    if name == FOCUS_PHASE {
      self.events.clear();
    }
    Phase {
      name,
      started: Instant::now(),
      _span: tracing::info_span!("focus_phase", phase = name).entered(),
    }
  }

  /// Close a phase and record its event.
  pub fn finish(&mut self, phase: Phase) {
    let ts = phase.started.saturating_duration_since(self.origin).as_micros() as u64;
    let dur = phase.started.elapsed().as_micros() as u64;
    self.events.push(TraceEvent {
      name: phase.name.to_string(),
      cat: "focus",
      ph: "X",
      ts,
      dur,
      pid: std::process::id(),
      tid: 1,
    });
  }

  /// Events of the most recent focus in completion order.
  pub fn events(&self) -> &[TraceEvent] {
    &self.events
  }

  /// Chrome trace document for the most recent focus.
  pub fn to_chrome_trace(&self) -> serde_json::Value {
    json!({
      "traceEvents": self.events,
      "displayTimeUnit": "ms",
    })
  }

  /// Write the Chrome trace document to `path`.
  pub fn write_chrome_trace(&self, path: &Path) -> FocusResult<()> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(&self.to_chrome_trace())?;
    fs::write(path, content).with_context(|| format!("Failed to write trace to {}", path.display()))?;
    Ok(())
  }
}
