//! Termination signal policy per platform class

use crate::traits::TermSignal;

/// Broad platform families with different termination semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformClass {
    /// Terminate requests are honoured and can be escalated
    Posix,
    /// No reliable terminate request; go straight to the forceful signal
    Windows,
}

impl PlatformClass {
    pub fn current() -> Self {
        if cfg!(windows) {
            PlatformClass::Windows
        } else {
            PlatformClass::Posix
        }
    }
}

/// First signal to send on timeout and the one to escalate to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalPolicy {
    pub terminate: TermSignal,
    pub escalate: TermSignal,
}

impl SignalPolicy {
    pub fn for_platform(platform: PlatformClass) -> Self {
        match platform {
            PlatformClass::Posix => Self {
                terminate: TermSignal::Terminate,
                escalate: TermSignal::Kill,
            },
            PlatformClass::Windows => Self {
                terminate: TermSignal::Kill,
                escalate: TermSignal::Kill,
            },
        }
    }

    /// Whether `signal` is the last resort and nothing follows it
    pub fn is_final(&self, signal: TermSignal) -> bool {
        signal == self.escalate
    }
}

impl Default for SignalPolicy {
    fn default() -> Self {
        Self::for_platform(PlatformClass::current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posix_escalates_term_to_kill() {
        let policy = SignalPolicy::for_platform(PlatformClass::Posix);
        assert_eq!(policy.terminate, TermSignal::Terminate);
        assert_eq!(policy.escalate, TermSignal::Kill);
        assert!(!policy.is_final(TermSignal::Terminate));
        assert!(policy.is_final(TermSignal::Kill));
    }

    #[test]
    fn test_windows_starts_with_kill() {
        let policy = SignalPolicy::for_platform(PlatformClass::Windows);
        assert_eq!(policy.terminate, TermSignal::Kill);
        assert!(policy.is_final(policy.terminate));
    }

    #[cfg(unix)]
    #[test]
    fn test_default_policy_on_unix() {
        assert_eq!(PlatformClass::current(), PlatformClass::Posix);
        assert_eq!(SignalPolicy::default().terminate, TermSignal::Terminate);
    }
}
