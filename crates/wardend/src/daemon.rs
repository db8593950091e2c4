//! Daemon entry point: configuration, telemetry, and the signal loop.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;
use tracing::{info, warn};
use warden_config::{Config, ConfigError};

use crate::health::{LifecycleReporter, StructuredLifecycleReporter};
use crate::lifecycle::{LifecycleController, LifecycleError, UpdateRequest};
use crate::loader::{BackendRegistry, LdifBackendRegistry};
use crate::process::{
    CommandSupervisor, ControlSignal, PROCESS_TARGET, ProcessSupervisor, SignalError,
    SignalSource, SystemSignals,
};
use crate::telemetry::{self, TelemetryError};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when no configuration can be assembled.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Errors that end the daemon.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Configuration loaded but describes a server that cannot run.
    #[error("invalid configuration: {source}")]
    InvalidConfiguration {
        /// Underlying validation error.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Signal handling failed.
    #[error("signal handling failed: {source}")]
    Signals {
        /// Underlying signal error.
        #[source]
        source: SignalError,
    },
    /// The supervised server could not be driven.
    #[error("lifecycle operation failed: {source}")]
    Lifecycle {
        /// Underlying lifecycle error.
        #[source]
        source: LifecycleError,
    },
}

impl From<LifecycleError> for DaemonError {
    fn from(source: LifecycleError) -> Self {
        Self::Lifecycle { source }
    }
}

impl From<TelemetryError> for DaemonError {
    fn from(source: TelemetryError) -> Self {
        Self::Telemetry { source }
    }
}

impl From<SignalError> for DaemonError {
    fn from(source: SignalError) -> Self {
        Self::Signals { source }
    }
}

/// Runs the daemon with the production collaborators.
///
/// # Errors
///
/// Returns [`DaemonError`] when start-up fails or the server cannot be
/// stopped on shutdown.
pub fn run_daemon() -> Result<(), DaemonError> {
    let loader = SystemConfigLoader;
    let config = load_config(&loader)?;
    telemetry::initialise(&config)?;
    let reporter: Arc<dyn LifecycleReporter> = Arc::new(StructuredLifecycleReporter::new());
    let mut controller = LifecycleController::from_config(
        &config,
        CommandSupervisor::from_config(&config),
        LdifBackendRegistry::new(),
        reporter,
    )?;
    let mut signals = SystemSignals::install()?;
    run_daemon_with(&loader, &config, &mut controller, &mut signals)
}

/// Starts `controller`, applies `config`, then serves control signals until
/// shutdown.
///
/// A reload re-reads configuration through `loader` and applies it with
/// [`LifecycleController::update`]; reload failures are logged and the
/// server keeps running with its previous settings. Only ports, the base
/// LDIF, and the data path follow a reload.
///
/// # Errors
///
/// Returns [`DaemonError`] when the first start fails, when signals can no
/// longer be received, or when the final stop fails. The server is stopped
/// before a signal failure is returned.
pub fn run_daemon_with<S, B, G>(
    loader: &dyn ConfigLoader,
    config: &Config,
    controller: &mut LifecycleController<S, B>,
    signals: &mut G,
) -> Result<(), DaemonError>
where
    S: ProcessSupervisor,
    B: BackendRegistry,
    G: SignalSource + ?Sized,
{
    info!(
        target: PROCESS_TARGET,
        root = %controller.data_path().display(),
        "starting supervisor"
    );
    controller.start()?;
    controller.update(&UpdateRequest::from_config(config))?;

    let served = loop {
        match signals.next_signal() {
            Ok(ControlSignal::Reload) => reload(loader, controller),
            Ok(ControlSignal::Shutdown) => break Ok(()),
            Err(error) => break Err(DaemonError::from(error)),
        }
    };
    info!(target: PROCESS_TARGET, "stopping supervisor");
    controller.stop()?;
    served
}

fn load_config(loader: &dyn ConfigLoader) -> Result<Config, DaemonError> {
    let config = loader
        .load()
        .map_err(|source| DaemonError::Configuration { source })?;
    config
        .validate()
        .map_err(|source| DaemonError::InvalidConfiguration { source })?;
    Ok(config)
}

fn reload<S, B>(loader: &dyn ConfigLoader, controller: &mut LifecycleController<S, B>)
where
    S: ProcessSupervisor,
    B: BackendRegistry,
{
    let config = match load_config(loader) {
        Ok(config) => config,
        Err(error) => {
            warn!(
                target: PROCESS_TARGET,
                error = %error,
                "reload rejected; keeping current settings"
            );
            return;
        }
    };
    match controller.update(&UpdateRequest::from_config(&config)) {
        Ok(outcome) => info!(
            target: PROCESS_TARGET,
            changed = ?outcome.changed,
            restarted = outcome.restarted,
            "configuration reloaded"
        ),
        Err(error) => warn!(
            target: PROCESS_TARGET,
            error = %error,
            "failed to apply reloaded configuration"
        ),
    }
}
