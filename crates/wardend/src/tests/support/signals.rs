//! Scripted control signals for driving the daemon loop synchronously.

use std::collections::VecDeque;
use std::io;

use crate::process::{ControlSignal, SignalError, SignalSource};

/// Step of a signal script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    Signal(ControlSignal),
}

/// Signal source replaying a fixed script; an exhausted script fails.
#[derive(Debug, Default)]
pub struct ScriptedSignals {
    script: VecDeque<ScriptStep>,
}

impl ScriptedSignals {
    /// Appends a step and returns the script.
    #[must_use]
    pub fn then(mut self, step: ScriptStep) -> Self {
        self.script.push_back(step);
        self
    }
}

impl SignalSource for ScriptedSignals {
    fn next_signal(&mut self) -> Result<ControlSignal, SignalError> {
        match self.script.pop_front() {
            Some(ScriptStep::Signal(signal)) => Ok(signal),
            None => Err(SignalError::Install {
                source: io::Error::other("signal script exhausted"),
            }),
        }
    }
}
