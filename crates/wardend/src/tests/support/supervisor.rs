//! Test double for [`ProcessSupervisor`] that tracks a simulated server.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::process::{ProcessError, ProcessSupervisor, StartOptions};

/// Calls observed at the process boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// A start, with the main configuration as it was on disk at that time.
    Start {
        root: PathBuf,
        options: StartOptions,
        config: Option<String>,
        server_locked: bool,
    },
    Stop,
}

#[derive(Debug, Default)]
struct SupervisorState {
    running: bool,
    fail_start: bool,
    fail_stop: bool,
    events: Vec<SupervisorEvent>,
}

/// Supervisor whose server runs from a successful start until a stop.
#[derive(Debug, Clone, Default)]
pub struct RecordingSupervisor {
    state: Arc<Mutex<SupervisorState>>,
}

impl RecordingSupervisor {
    /// Makes subsequent starts fail.
    pub fn fail_starts(&self) {
        self.state().fail_start = true;
    }

    /// Makes subsequent stops fail.
    pub fn fail_stops(&self) {
        self.state().fail_stop = true;
    }

    /// Simulates the server exiting on its own.
    pub fn crash(&self) {
        self.state().running = false;
    }

    /// Whether the simulated server is running.
    pub fn running(&self) -> bool {
        self.state().running
    }

    /// Recorded calls.
    pub fn events(&self) -> Vec<SupervisorEvent> {
        self.state().events.clone()
    }

    /// Number of recorded starts.
    pub fn starts(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, SupervisorEvent::Start { .. }))
            .count()
    }

    /// Number of recorded stops.
    pub fn stops(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, SupervisorEvent::Stop))
            .count()
    }

    /// Configuration on disk at the most recent start.
    pub fn last_started_config(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|event| match event {
            SupervisorEvent::Start { config, .. } => config,
            SupervisorEvent::Stop => None,
        })
    }

    fn state(&self) -> MutexGuard<'_, SupervisorState> {
        self.state.lock().expect("supervisor recorder mutex poisoned")
    }
}

impl ProcessSupervisor for RecordingSupervisor {
    fn start_process(
        &mut self,
        install_root: &Path,
        options: &StartOptions,
    ) -> Result<(), ProcessError> {
        let mut state = self.state();
        state.events.push(SupervisorEvent::Start {
            root: install_root.to_path_buf(),
            options: *options,
            config: fs::read_to_string(install_root.join("config/config.ldif")).ok(),
            server_locked: install_root.join("locks/server.lock").exists(),
        });
        if state.fail_start {
            return Err(ProcessError::Failed {
                message: "start refused".to_owned(),
            });
        }
        state.running = true;
        Ok(())
    }

    fn stop_process(&mut self) -> Result<(), ProcessError> {
        let mut state = self.state();
        state.events.push(SupervisorEvent::Stop);
        if state.fail_stop {
            return Err(ProcessError::Failed {
                message: "stop refused".to_owned(),
            });
        }
        state.running = false;
        Ok(())
    }

    fn is_process_running(&mut self) -> bool {
        self.state().running
    }
}
