//! Shared error types for the subprocess harness

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },

    #[error("Unknown verbosity level: {input}")]
    InvalidVerbosity { input: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
