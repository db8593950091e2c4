//! Boundary to the directory server process.
//!
//! The controller never talks to the server engine directly. It asks a
//! [`ProcessSupervisor`] to start the server against an install root, to stop
//! it, and whether it is still running. [`CommandSupervisor`] is the
//! production implementation and runs the server as a child process.

mod command;
mod signals;

use std::io;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use thiserror::Error;

pub use self::command::CommandSupervisor;
pub use self::signals::{ControlSignal, SignalError, SignalSource, SystemSignals};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Environment handed to the server on start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartOptions {
    /// Start without any network connection handlers.
    pub disable_connection_handlers: bool,
    /// Keep an archive of every configuration change.
    pub maintain_config_archive: bool,
}

/// Errors raised at the process boundary.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The server executable could not be spawned.
    #[error("failed to spawn '{command}' for '{root}': {source}")]
    Spawn {
        /// Executable being spawned.
        command: String,
        /// Install root passed to the server.
        root: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The server exited while starting.
    #[error("server exited during start-up with {status}")]
    ExitedEarly {
        /// Exit status reported by the operating system.
        status: String,
    },
    /// A start was requested while a server was already running.
    #[error("server is already running with pid {pid}")]
    AlreadyRunning {
        /// Pid of the running server.
        pid: u32,
    },
    /// Signalling the server failed.
    #[error("failed to signal server process {pid}: {source}")]
    Signal {
        /// Pid of the server.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// Waiting for the server to exit failed.
    #[error("failed to wait for server process {pid}: {source}")]
    Wait {
        /// Pid of the server.
        pid: u32,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The server rejected or failed the request.
    #[error("server process failure: {message}")]
    Failed {
        /// Reason for the failure.
        message: String,
    },
}

/// Controls the lifetime of the directory server process.
pub trait ProcessSupervisor: Send {
    /// Starts the server on `install_root`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the server cannot be started.
    fn start_process(
        &mut self,
        install_root: &Path,
        options: &StartOptions,
    ) -> Result<(), ProcessError>;

    /// Stops the running server.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the server cannot be stopped.
    fn stop_process(&mut self) -> Result<(), ProcessError>;

    /// Whether the server is running.
    fn is_process_running(&mut self) -> bool;
}

impl<T> ProcessSupervisor for Box<T>
where
    T: ProcessSupervisor + ?Sized,
{
    fn start_process(
        &mut self,
        install_root: &Path,
        options: &StartOptions,
    ) -> Result<(), ProcessError> {
        (**self).start_process(install_root, options)
    }

    fn stop_process(&mut self) -> Result<(), ProcessError> {
        (**self).stop_process()
    }

    fn is_process_running(&mut self) -> bool {
        (**self).is_process_running()
    }
}
