//! CLI commands for focuser
//!
//! - **build**: one-shot build, optionally focusing on `--working-set`
//! - **serve**: long-lived server reading commands from stdin
//! - **working_set**: print the active working set
//!
//! Build output goes to stdout; logs and errors go to stderr.

pub mod build;
pub mod serve;
pub mod working_set;

pub use build::run_build;
pub use serve::run_serve;
pub use working_set::run_working_set;

use focuser::BuildOutcome;
use std::io::{self, Write};

/// Write target outputs followed by the focus report.
pub fn write_outcome<W: Write>(out: &mut W, outcome: &BuildOutcome) -> io::Result<()> {
  for (target, output) in &outcome.outputs {
    writeln!(out, "{}: {}", target, output.trim_end())?;
  }
  if let Some(focus) = &outcome.focus {
    for line in focus.lines() {
      writeln!(out, "{}", line)?;
    }
  }
  Ok(())
}
