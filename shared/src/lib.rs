//! Shared support for the subprocess harness crates
//!
//! Contains the pieces every crate in the workspace leans on: logging setup
//! and process-aware logging macros, configuration loading, and small shared
//! types.

pub mod config;
pub mod errors;
pub mod logging;
pub mod types;

pub use config::HarnessConfig;
pub use errors::*;
pub use types::*;
