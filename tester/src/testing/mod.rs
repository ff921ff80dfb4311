//! Testing Framework
//!
//! Assertions over child interpreter runs, ordered pattern lists, joined task
//! batches and error messages.

pub mod assertions;
pub mod expected;
pub mod failure;
pub mod patterns;
pub mod tasks;

// Re-export main types
pub use assertions::{
    AssertionResult, assert_error_message, assert_in_out_err, assert_normal_exit, assert_separately,
    assert_status_success,
};
pub use expected::Expected;
pub use failure::describe_failure;
pub use patterns::{PatternItem, assert_pattern_list};
pub use tasks::assert_join_tasks;
