use clap::{Parser, Subcommand};
use focuser::core::context::WorkspaceContext;
use focuser::core::error::{FocusError, print_error};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

/// Working-set focused incremental builds
#[derive(Parser)]
#[command(name = "focuser")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Workspace root (defaults to the current directory)
  #[arg(long, global = true)]
  workspace: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build targets once, focusing the graph on the working set
  Build {
    /// Targets to build (declared in focus.toml)
    #[arg(required = true)]
    targets: Vec<String>,
    /// Comma-separated files or directories you intend to edit
    #[arg(long, value_name = "PATHS")]
    working_set: Option<String>,
    /// Print which rdeps and deps were kept, grouped by node kind
    #[arg(short, long)]
    verbose: bool,
  },

  /// Run a long-lived server reading commands from stdin
  Serve,

  /// Print the active working set
  WorkingSet,
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_tracing() {
  let filter = EnvFilter::try_from_env("FOCUSER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_tracing();

  let workspace_root = match cli.workspace {
    Some(dir) => dir,
    None => match std::env::current_dir() {
      Ok(dir) => dir,
      Err(e) => {
        eprintln!("Error: Failed to get current directory: {}", e);
        std::process::exit(1);
      }
    },
  };

  // The working set of a fresh process is always empty; no config needed to say so
  if matches!(cli.command, Commands::WorkingSet) {
    if let Err(err) = commands::run_working_set() {
      handle_error(err);
    }
    return;
  }

  let ctx = match WorkspaceContext::build(&workspace_root) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  let result = match cli.command {
    Commands::Build {
      targets,
      working_set,
      verbose,
    } => commands::run_build(ctx, targets, working_set, verbose),
    Commands::Serve => commands::run_serve(ctx),
    Commands::WorkingSet => Ok(()),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: FocusError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
