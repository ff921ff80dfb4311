//! Assertion helpers for testing an interpreter as a child process
//!
//! Every helper runs the interpreter through the bounded [`runner`], so a hung
//! child turns into a timeout failure instead of a hung test suite.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tester::*;
//!
//! # async fn demo() {
//! let config = shared::HarnessConfig::from_env().unwrap_or_default();
//! let ctx = AssertContext::from_config(&config, "ruby");
//!
//! assert_normal_exit(&ctx, "puts 1", None, &[]).await.expect_success();
//! assert_in_out_err(&ctx, ["-e", "puts 2"], "", &Expected::lines(["2"]), &Expected::empty(), None)
//!     .await
//!     .expect_success();
//! # }
//! ```

// Core modules
pub mod context;
pub mod interpreter;
pub mod testing;

// Main interfaces - re-exported at crate root for convenience
pub use context::{AssertContext, ScopedContext};
pub use interpreter::Interpreter;
pub use testing::*;
