//! Structured reporting of supervisor lifecycle events.

use std::path::Path;
use std::sync::Arc;

use crate::lifecycle::{LifecycleState, UpdateOutcome};
use crate::loader::{ImportError, ImportResult};

const HEALTH_TARGET: &str = "wardend::health";

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait LifecycleReporter: Send + Sync {
    /// Invoked on every state transition.
    fn state_changed(&self, from: LifecycleState, to: LifecycleState);

    /// Invoked after a fresh install root has been provisioned.
    fn provisioned(&self, root: &Path);

    /// Invoked after LDIF from `source` replaced the backend contents.
    fn data_loaded(&self, source: &str, result: &ImportResult);

    /// Invoked when loading LDIF from `source` failed.
    fn data_load_failed(&self, source: &str, error: &ImportError);

    /// Invoked after an update request has been applied.
    fn update_applied(&self, outcome: &UpdateOutcome);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter + ?Sized,
{
    fn state_changed(&self, from: LifecycleState, to: LifecycleState) {
        (**self).state_changed(from, to);
    }

    fn provisioned(&self, root: &Path) {
        (**self).provisioned(root);
    }

    fn data_loaded(&self, source: &str, result: &ImportResult) {
        (**self).data_loaded(source, result);
    }

    fn data_load_failed(&self, source: &str, error: &ImportError) {
        (**self).data_load_failed(source, error);
    }

    fn update_applied(&self, outcome: &UpdateOutcome) {
        (**self).update_applied(outcome);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn state_changed(&self, from: LifecycleState, to: LifecycleState) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "state_changed",
            from = %from,
            to = %to,
            "lifecycle state changed"
        );
    }

    fn provisioned(&self, root: &Path) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "provisioned",
            root = %root.display(),
            "install root provisioned"
        );
    }

    fn data_loaded(&self, source: &str, result: &ImportResult) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "data_loaded",
            source,
            read = result.entries_read,
            imported = result.entries_imported,
            rejected = result.entries_rejected,
            "directory data loaded"
        );
    }

    fn data_load_failed(&self, source: &str, error: &ImportError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "data_load_failed",
            source,
            error = %error,
            "directory data load failed"
        );
    }

    fn update_applied(&self, outcome: &UpdateOutcome) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "update_applied",
            changed = ?outcome.changed,
            restarted = outcome.restarted,
            base_data_loaded = outcome.base_data.is_some(),
            "configuration update applied"
        );
    }
}
