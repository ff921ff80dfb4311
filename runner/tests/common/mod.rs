//! Common test utilities for runner integration tests

pub mod fixtures;
pub mod helpers;

pub use fixtures::TestFixtures;
pub use helpers::{InvocationBuilderExt, TestHelpers};
