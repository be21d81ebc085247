//! focuser - working-set graph focusing for long-running build servers
//!
//! A build server keeps one graph node per value it has ever computed. Given
//! the set of paths a user intends to edit, [`focus::Focuser`] prunes that
//! graph down to what a rebuild after such edits can touch, and
//! [`focus::guard`] refuses later builds whose edits fall outside it.
//!
//! - **core**: config, workspace context, errors
//! - **graph**: node keys, the node table and the declared target graph
//! - **focus**: resolve, mark, sweep, store, guard, report, profile
//! - **engine**: a small incremental build engine that drives the focuser

pub mod core;
pub mod engine;
pub mod focus;
pub mod graph;
pub mod utils;

pub use crate::core::error::{FocusError, FocusResult};
pub use engine::{BuildOutcome, BuildRequest, BuildServer};
pub use focus::{Focuser, WorkingSetStore};
