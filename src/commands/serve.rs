//! `focuser serve` - long-lived build server on stdin/stdout
//!
//! One command per line:
//!
//! ```text
//! build <targets..> [--working-set=a,b] [--verbose]
//! working-set
//! reset
//! quit
//! ```
//!
//! The graph and the working set live for as long as the process does. A
//! failed command prints its error to stderr and the server keeps going.

use super::working_set::write_working_set;
use super::write_outcome;
use clap::{Parser, Subcommand};
use focuser::core::context::WorkspaceContext;
use focuser::core::error::{FocusResult, print_error};
use focuser::utils::split_path_list;
use focuser::{BuildRequest, BuildServer};
use std::io::{self, BufRead, Write};
use tracing::info;

/// A single line of server input
#[derive(Parser)]
#[command(name = "focuser", no_binary_name = true)]
struct ServeLine {
  #[command(subcommand)]
  command: ServeCommand,
}

#[derive(Subcommand)]
enum ServeCommand {
  /// Build targets, optionally replacing the working set
  Build {
    #[arg(required = true)]
    targets: Vec<String>,
    #[arg(long, value_name = "PATHS")]
    working_set: Option<String>,
    #[arg(short, long)]
    verbose: bool,
  },
  /// Print the active working set
  WorkingSet,
  /// Drop the graph and the working set
  Reset,
  /// Stop the server
  Quit,
}

/// Run the serve command
pub fn run_serve(ctx: WorkspaceContext) -> FocusResult<()> {
  info!(root = %ctx.root.display(), "serving");
  let mut server = BuildServer::new(ctx);
  serve(&mut server, io::stdin().lock(), &mut io::stdout().lock())
}

/// Process commands from `input` until it ends or `quit` is read.
pub fn serve<R: BufRead, W: Write>(server: &mut BuildServer, input: R, out: &mut W) -> FocusResult<()> {
  for line in input.lines() {
    let line = line?;
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
      continue;
    }

    let command = match ServeLine::try_parse_from(line.split_whitespace()) {
      Ok(parsed) => parsed.command,
      Err(err) => {
        eprintln!("{}", err);
        continue;
      }
    };

    match command {
      ServeCommand::Build {
        targets,
        working_set,
        verbose,
      } => {
        let mut request = BuildRequest::new(targets).verbose(verbose);
        if let Some(list) = working_set {
          request = request.with_working_set(split_path_list(&list));
        }
        match server.build(&request) {
          Ok(outcome) => write_outcome(out, &outcome)?,
          Err(err) => print_error(&err),
        }
      }
      ServeCommand::WorkingSet => write_working_set(out, Some(server.store()))?,
      ServeCommand::Reset => {
        server.reset();
        writeln!(out, "Graph reset")?;
      }
      ServeCommand::Quit => break,
    }
    out.flush()?;
  }
  Ok(())
}
