//! `focuser build` - build targets once
//!
//! A one-shot process starts with an empty graph and no working set, so the
//! guard has nothing to check; the focus still runs and reports its stats.

use super::write_outcome;
use focuser::core::context::WorkspaceContext;
use focuser::core::error::FocusResult;
use focuser::utils::split_path_list;
use focuser::{BuildRequest, BuildServer};

/// Run the build command
pub fn run_build(
  ctx: WorkspaceContext,
  targets: Vec<String>,
  working_set: Option<String>,
  verbose: bool,
) -> FocusResult<()> {
  let mut request = BuildRequest::new(targets).verbose(verbose);
  if let Some(list) = working_set {
    request = request.with_working_set(split_path_list(&list));
  }

  let mut server = BuildServer::new(ctx);
  let outcome = server.build(&request)?;
  write_outcome(&mut std::io::stdout().lock(), &outcome)?;
  Ok(())
}
