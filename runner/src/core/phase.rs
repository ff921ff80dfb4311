//! Supervisor phases and their legal transitions
//!
//! ```text
//! Running ──► Completed
//!    │
//!    └──► TimedOut ──► Terminating ──► Reaped ──► Failed
//!                          │              ▲
//!                          └─► Escalated ─┘
//! ```

use std::fmt;

use crate::traits::TermSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for collectors and the child inside the deadline
    Running,
    /// Finished in time; an outcome will be returned
    Completed,
    /// Deadline passed
    TimedOut,
    /// A signal was sent; waiting for the child to exit
    Terminating(TermSignal),
    /// The forceful signal followed an ignored terminate signal
    Escalated,
    /// The child has been waited for after signalling
    Reaped,
    /// A timeout failure will be raised
    Failed,
}

impl Phase {
    pub fn can_transition_to(&self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Running, Completed)
                | (Running, TimedOut)
                | (TimedOut, Terminating(_))
                | (Terminating(_), Reaped)
                | (Terminating(_), Escalated)
                | (Escalated, Terminating(TermSignal::Kill))
                | (Escalated, Reaped)
                | (Reaped, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Running => write!(f, "RUNNING"),
            Phase::Completed => write!(f, "COMPLETED"),
            Phase::TimedOut => write!(f, "TIMED_OUT"),
            Phase::Terminating(signal) => write!(f, "TERMINATING({signal})"),
            Phase::Escalated => write!(f, "ESCALATED"),
            Phase::Reaped => write!(f, "REAPED"),
            Phase::Failed => write!(f, "FAILED"),
        }
    }
}
