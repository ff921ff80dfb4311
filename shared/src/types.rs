//! Core shared types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::SharedError;

/// How chatty a child interpreter should be about warnings.
///
/// Carried in an explicit context value instead of a process-wide flag so a
/// caller can narrow it for one block and have it restored afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Warnings suppressed
    Silent,
    /// Interpreter defaults
    #[default]
    Default,
    /// All warnings enabled
    Verbose,
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verbosity::Silent => write!(f, "silent"),
            Verbosity::Default => write!(f, "default"),
            Verbosity::Verbose => write!(f, "verbose"),
        }
    }
}

impl FromStr for Verbosity {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "silent" | "quiet" | "0" => Ok(Verbosity::Silent),
            "default" | "1" => Ok(Verbosity::Default),
            "verbose" | "2" => Ok(Verbosity::Verbose),
            _ => Err(SharedError::InvalidVerbosity { input: s.to_string() }),
        }
    }
}
