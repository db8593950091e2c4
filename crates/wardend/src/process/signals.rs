use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Operator requests delivered to the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Reload configuration and apply the differences.
    Reload,
    /// Stop the server and exit.
    Shutdown,
}

/// Blocking source of [`ControlSignal`]s.
pub trait SignalSource {
    /// Blocks until the next request arrives.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError`] when signals can no longer be received.
    fn next_signal(&mut self) -> Result<ControlSignal, SignalError>;
}

/// Errors reported by signal listeners.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Maps `SIGHUP` to [`ControlSignal::Reload`] and termination signals to
/// [`ControlSignal::Shutdown`].
#[derive(Debug)]
pub struct SystemSignals {
    signals: Signals,
}

impl SystemSignals {
    /// Installs handlers for `SIGHUP`, `SIGTERM`, `SIGINT` and `SIGQUIT`.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Install`] when registration fails.
    pub fn install() -> Result<Self, SignalError> {
        let signals = Signals::new([SIGHUP, SIGTERM, SIGINT, SIGQUIT])
            .map_err(|source| SignalError::Install { source })?;
        Ok(Self { signals })
    }
}

impl SignalSource for SystemSignals {
    fn next_signal(&mut self) -> Result<ControlSignal, SignalError> {
        let Some(signal) = self.signals.forever().next() else {
            return Ok(ControlSignal::Shutdown);
        };
        let request = if signal == SIGHUP {
            ControlSignal::Reload
        } else {
            ControlSignal::Shutdown
        };
        info!(
            target: PROCESS_TARGET,
            signal,
            request = ?request,
            "control signal received"
        );
        Ok(request)
    }
}
