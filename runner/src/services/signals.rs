//! Signal delivery through `kill(2)`

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use crate::traits::{DeliveryError, KillTarget, SignalSender, TermSignal};

/// Sends real signals to processes and process groups
#[derive(Debug, Default, Clone, Copy)]
pub struct NixSignalSender;

impl NixSignalSender {
    pub fn new() -> Self {
        Self
    }
}

impl SignalSender for NixSignalSender {
    fn send(&self, target: KillTarget, signal: TermSignal) -> Result<(), DeliveryError> {
        let sig = match signal {
            TermSignal::Terminate => Signal::SIGTERM,
            TermSignal::Kill => Signal::SIGKILL,
        };

        match kill(Pid::from_raw(target.raw()), sig) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => Err(DeliveryError::NoSuchProcess),
            Err(errno) => Err(DeliveryError::Failed(errno.desc().to_string())),
        }
    }
}
