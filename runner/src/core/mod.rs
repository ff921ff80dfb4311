//! Core supervision logic
//!
//! This module contains pure logic with no I/O dependencies: the signal
//! policy table, child environment composition, and the supervisor's phase
//! transitions. Everything here is deterministic and easily testable.

pub mod environment;
pub mod phase;
pub mod policy;

pub use environment::{LOCALE_VARS, NEUTRAL_LOCALE, child_environment};
pub use phase::Phase;
pub use policy::{PlatformClass, SignalPolicy};
