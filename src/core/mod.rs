//! Core building blocks shared by the engine, the focuser and the CLI
//!
//! - **config**: focus.toml parsing and validation
//! - **context**: workspace root plus loaded config, built once in main.rs
//! - **error**: error types with contextual help messages and exit codes

pub mod config;
pub mod context;
pub mod error;
