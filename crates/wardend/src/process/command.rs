use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::{info, warn};
use warden_config::Config;

use super::{PROCESS_TARGET, ProcessError, ProcessSupervisor, StartOptions};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const STARTUP_GRACE: Duration = Duration::from_millis(200);

/// Runs the server as a child process in the foreground.
///
/// The command receives `--server-root <root>` plus one flag per enabled
/// start option. Stopping sends `SIGTERM` and kills the child once the grace
/// period lapses.
#[derive(Debug)]
pub struct CommandSupervisor {
    program: String,
    stop_timeout: Duration,
    child: Option<Child>,
}

impl CommandSupervisor {
    /// Builds a supervisor running `program`.
    pub fn new(program: impl Into<String>, stop_timeout: Duration) -> Self {
        Self {
            program: program.into(),
            stop_timeout,
            child: None,
        }
    }

    /// Builds a supervisor from the configured command and stop timeout.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.server_command.clone(),
            Duration::from_millis(config.stop_timeout_ms),
        )
    }

    fn command(&self, install_root: &Path, options: &StartOptions) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("--server-root")
            .arg(install_root)
            .stdin(Stdio::null());
        if options.disable_connection_handlers {
            command.arg("--disable-connection-handlers");
        }
        if options.maintain_config_archive {
            command.arg("--maintain-config-archive");
        }
        command
    }

    /// Moment a stop escalates to a kill; `None` when the timeout is too
    /// large to represent, in which case the stop waits indefinitely.
    fn stop_deadline(&self) -> Option<Instant> {
        Instant::now().checked_add(self.stop_timeout)
    }
}

impl ProcessSupervisor for CommandSupervisor {
    fn start_process(
        &mut self,
        install_root: &Path,
        options: &StartOptions,
    ) -> Result<(), ProcessError> {
        if let Some(child) = self.child.as_mut()
            && child.try_wait().ok().flatten().is_none()
        {
            return Err(ProcessError::AlreadyRunning { pid: child.id() });
        }
        let mut child = self
            .command(install_root, options)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                command: self.program.clone(),
                root: install_root.to_path_buf(),
                source,
            })?;
        let pid = child.id();
        thread::sleep(STARTUP_GRACE);
        match child.try_wait() {
            Ok(Some(status)) => {
                return Err(ProcessError::ExitedEarly {
                    status: status.to_string(),
                });
            }
            Ok(None) => {}
            Err(source) => return Err(ProcessError::Wait { pid, source }),
        }
        info!(
            target: PROCESS_TARGET,
            pid,
            command = %self.program,
            root = %install_root.display(),
            "server process started"
        );
        self.child = Some(child);
        Ok(())
    }

    fn stop_process(&mut self) -> Result<(), ProcessError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let pid = child.id();
        let raw = i32::try_from(pid).map_err(|_| ProcessError::Failed {
            message: format!("pid {pid} out of range"),
        })?;
        match kill(Pid::from_raw(raw), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(source) => {
                self.child = Some(child);
                return Err(ProcessError::Signal { pid, source });
            }
        }
        let deadline = self.stop_deadline();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    info!(
                        target: PROCESS_TARGET,
                        pid,
                        %status,
                        "server process stopped"
                    );
                    return Ok(());
                }
                Ok(None) if deadline.is_some_and(|deadline| Instant::now() >= deadline) => break,
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => return Err(ProcessError::Wait { pid, source }),
            }
        }
        warn!(
            target: PROCESS_TARGET,
            pid,
            timeout_ms = self.stop_timeout.as_millis(),
            "server ignored SIGTERM; killing"
        );
        child
            .kill()
            .and_then(|()| child.wait().map(drop))
            .map_err(|source| ProcessError::Wait { pid, source })
    }

    fn is_process_running(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) | Err(_) => {
                self.child = None;
                false
            }
        }
    }
}
