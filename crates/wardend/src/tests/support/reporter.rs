//! Test double for [`LifecycleReporter`] that records structured events for assertions.

use std::path::Path;
use std::sync::Mutex;

use crate::health::LifecycleReporter;
use crate::lifecycle::{LifecycleState, UpdateOutcome};
use crate::loader::{ImportError, ImportResult};

/// Lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    StateChanged {
        from: LifecycleState,
        to: LifecycleState,
    },
    Provisioned(String),
    DataLoaded {
        source: String,
        imported: u64,
    },
    DataLoadFailed(String),
    UpdateApplied(UpdateOutcome),
}

/// Records lifecycle events for assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .clone()
    }

    /// States entered, in order.
    #[must_use]
    pub fn states(&self) -> Vec<LifecycleState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LifecycleEvent::StateChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }

    /// Sources of successful data loads, in order.
    #[must_use]
    pub fn loaded_sources(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LifecycleEvent::DataLoaded { source, .. } => Some(source),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingReporter {
    fn state_changed(&self, from: LifecycleState, to: LifecycleState) {
        self.record(LifecycleEvent::StateChanged { from, to });
    }

    fn provisioned(&self, root: &Path) {
        self.record(LifecycleEvent::Provisioned(root.display().to_string()));
    }

    fn data_loaded(&self, source: &str, result: &ImportResult) {
        self.record(LifecycleEvent::DataLoaded {
            source: source.to_owned(),
            imported: result.entries_imported,
        });
    }

    fn data_load_failed(&self, source: &str, _error: &ImportError) {
        self.record(LifecycleEvent::DataLoadFailed(source.to_owned()));
    }

    fn update_applied(&self, outcome: &UpdateOutcome) {
        self.record(LifecycleEvent::UpdateApplied(outcome.clone()));
    }
}
