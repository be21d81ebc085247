//! `focuser working-set` - print the active working set

use focuser::WorkingSetStore;
use focuser::core::error::FocusResult;
use focuser::focus::NO_WORKING_SET;
use std::io::{self, Write};

/// Run the working-set command. A fresh process has no working set.
pub fn run_working_set() -> FocusResult<()> {
  write_working_set(&mut io::stdout().lock(), None)?;
  Ok(())
}

/// Write the store's paths one per line, or the no-working-set sentinel.
pub fn write_working_set<W: Write>(out: &mut W, store: Option<&WorkingSetStore>) -> io::Result<()> {
  match store {
    Some(store) => writeln!(out, "{}", store.describe()),
    None => writeln!(out, "{}", NO_WORKING_SET),
  }
}
