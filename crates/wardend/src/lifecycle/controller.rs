use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use warden_config::Config;

use super::update::{DATA_PATH_KEY, UpdateOutcome, UpdateRequest, UpdateSetting};
use super::{LIFECYCLE_TARGET, LifecycleError, LifecycleState};
use crate::connectors::{ConnectorKind, ConnectorRegistry};
use crate::credentials;
use crate::health::LifecycleReporter;
use crate::keystore::KeystoreBindings;
use crate::loader::{BackendRegistry, DataLoader, ImportResult};
use crate::locks::FileLock;
use crate::process::{ProcessSupervisor, StartOptions};
use crate::provision::{CONFIG_TEMPLATE, FileProvisioner, InstallLayout};
use crate::resources::ResourceResolver;

/// Seed data loaded on the first start of an install root.
pub const SEED_PATTERN: &str = "default-*.ldif";

/// Settings of a controller that are not connector or keystore state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Install root of the server.
    pub data_path: PathBuf,
    /// Backend receiving seed and base data.
    pub backend_id: String,
    /// Environment handed to the server on start.
    pub start_options: StartOptions,
}

impl ControllerSettings {
    /// Reads the settings from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            data_path: config.data_path().as_std_path().to_path_buf(),
            backend_id: config.backend_id.clone(),
            start_options: StartOptions::default(),
        }
    }
}

/// Drives one directory server install through its lifecycle.
///
/// Operations take `&mut self`; callers serialise them. The only
/// coordination with other processes is the server lock held while the
/// server runs and the backend lock held during bulk loads.
pub struct LifecycleController<S, B> {
    settings: ControllerSettings,
    connectors: ConnectorRegistry,
    keystores: KeystoreBindings,
    provisioner: FileProvisioner,
    supervisor: S,
    backends: B,
    reporter: Arc<dyn LifecycleReporter>,
    state: LifecycleState,
    server_lock: Option<FileLock>,
}

impl<S, B> LifecycleController<S, B>
where
    S: ProcessSupervisor,
    B: BackendRegistry,
{
    /// Assembles a controller from explicit collaborators.
    pub fn new(
        settings: ControllerSettings,
        connectors: ConnectorRegistry,
        keystores: KeystoreBindings,
        resources: ResourceResolver,
        supervisor: S,
        backends: B,
        reporter: Arc<dyn LifecycleReporter>,
    ) -> Self {
        Self {
            settings,
            connectors,
            keystores,
            provisioner: FileProvisioner::new(resources),
            supervisor,
            backends,
            reporter,
            state: LifecycleState::Stopped,
            server_lock: None,
        }
    }

    /// Builds a controller whose state mirrors `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Keystore`] when keystore paths cannot be
    /// made absolute.
    pub fn from_config(
        config: &Config,
        supervisor: S,
        backends: B,
        reporter: Arc<dyn LifecycleReporter>,
    ) -> Result<Self, LifecycleError> {
        let keystores = KeystoreBindings::from_config(config)
            .map_err(|source| LifecycleError::Keystore { source })?;
        Ok(Self::new(
            ControllerSettings::from_config(config),
            ConnectorRegistry::from_config(config),
            keystores,
            ResourceResolver::from_config(config),
            supervisor,
            backends,
            reporter,
        ))
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Requested connector ports.
    #[must_use]
    pub const fn connectors(&self) -> &ConnectorRegistry {
        &self.connectors
    }

    /// Mutable access to the requested ports; applied on the next start.
    pub const fn connectors_mut(&mut self) -> &mut ConnectorRegistry {
        &mut self.connectors
    }

    /// Keystore bindings rendered into the configuration.
    #[must_use]
    pub const fn keystores(&self) -> &KeystoreBindings {
        &self.keystores
    }

    /// Install root.
    #[must_use]
    pub fn data_path(&self) -> &Path {
        self.settings.data_path.as_path()
    }

    /// Moves the install root; applied on the next start.
    pub fn set_data_path(&mut self, data_path: impl Into<PathBuf>) {
        self.settings.data_path = data_path.into();
    }

    /// Layout of the current install root.
    #[must_use]
    pub fn layout(&self) -> InstallLayout {
        InstallLayout::new(&self.settings.data_path, &self.settings.backend_id)
    }

    /// Whether the process boundary reports a running server.
    pub fn is_running(&mut self) -> bool {
        self.supervisor.is_process_running()
    }

    /// Starts the server, provisioning the install root on first run.
    ///
    /// Starting a server that is already running does nothing. Failures
    /// before the process starts leave the controller stopped. A failure
    /// while loading first-run seed data stops the server before the error
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns the [`LifecycleError`] of the failing step.
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        if self.state == LifecycleState::Running && self.supervisor.is_process_running() {
            info!(
                target: LIFECYCLE_TARGET,
                "server already running; nothing to start"
            );
            return Ok(());
        }
        let layout = self.layout();
        let first_run = !layout.is_provisioned();
        if first_run {
            self.transition(LifecycleState::Provisioning);
            let provisioned =
                self.provisioner
                    .provision_defaults(&layout, &self.connectors, &self.keystores);
            if let Err(error) = provisioned {
                return self.abort_start(error.into());
            }
            self.reporter.provisioned(layout.root());
        }

        self.transition(LifecycleState::StagingCredentials);
        if let Err(error) = credentials::stage_pin_files(&self.keystores) {
            return self.abort_start(error.into());
        }

        self.transition(LifecycleState::Starting);
        self.release_server_lock();
        let lock = match FileLock::acquire(layout.server_lock()) {
            Ok(lock) => lock,
            Err(error) => return self.abort_start(error.into()),
        };
        if let Err(source) = self
            .supervisor
            .start_process(layout.root(), &self.settings.start_options)
        {
            release_lock(lock);
            return self.abort_start(LifecycleError::Start { source });
        }
        self.server_lock = Some(lock);
        self.transition(LifecycleState::Running);
        info!(
            target: LIFECYCLE_TARGET,
            root = %layout.root().display(),
            first_run,
            "server started"
        );

        if first_run && let Err(error) = self.load_seed_data(&layout) {
            if let Err(stop_error) = self.stop() {
                warn!(
                    target: LIFECYCLE_TARGET,
                    error = %stop_error,
                    "failed to stop server after seed data failure"
                );
            }
            return Err(error);
        }
        Ok(())
    }

    /// Stops the server; a server that is not running is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Stop`] when the process boundary fails to
    /// stop the server. The controller then stays running.
    pub fn stop(&mut self) -> Result<(), LifecycleError> {
        if !self.supervisor.is_process_running() {
            info!(
                target: LIFECYCLE_TARGET,
                "server not running; nothing to stop"
            );
            self.release_server_lock();
            self.transition(LifecycleState::Stopped);
            return Ok(());
        }
        self.transition(LifecycleState::Stopping);
        if let Err(source) = self.supervisor.stop_process() {
            self.transition(LifecycleState::Running);
            return Err(LifecycleError::Stop { source });
        }
        self.release_server_lock();
        self.transition(LifecycleState::Stopped);
        info!(target: LIFECYCLE_TARGET, "server stopped");
        Ok(())
    }

    /// Stops then starts the server.
    ///
    /// # Errors
    ///
    /// Returns the error of whichever half failed.
    pub fn restart(&mut self) -> Result<(), LifecycleError> {
        if self.state == LifecycleState::Running {
            self.transition(LifecycleState::Restarting);
        }
        self.stop()?;
        self.start()
    }

    /// Reconciles the controller with `request`.
    ///
    /// Settings equal to the current state are skipped. Port and data path
    /// changes regenerate the main configuration and restart the server once
    /// every setting has been applied. A base LDIF is imported on every
    /// update that names one; its failures are logged and never fail the
    /// update. Empty paths are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] when regenerating the configuration or
    /// restarting fails.
    pub fn update(&mut self, request: &UpdateRequest) -> Result<UpdateOutcome, LifecycleError> {
        let mut outcome = UpdateOutcome::default();
        let mut restart_needed = false;
        for setting in request.settings() {
            match setting {
                UpdateSetting::Port { kind, port } => {
                    if self.apply_port(*kind, *port) {
                        outcome.changed.push(setting.key());
                        restart_needed = true;
                    }
                }
                UpdateSetting::BaseLdif(path) => {
                    if path.as_os_str().is_empty() {
                        continue;
                    }
                    outcome.changed.push(setting.key());
                    outcome.base_data = self.load_base_data(path);
                }
                UpdateSetting::DataPath(path) => {
                    if path.as_os_str().is_empty() || *path == self.settings.data_path {
                        continue;
                    }
                    info!(
                        target: LIFECYCLE_TARGET,
                        from = %self.settings.data_path.display(),
                        to = %path.display(),
                        "install root changed"
                    );
                    self.settings.data_path.clone_from(path);
                    outcome.changed.push(DATA_PATH_KEY);
                    restart_needed = true;
                }
            }
        }

        if restart_needed {
            self.regenerate_config()?;
            self.restart()?;
            outcome.restarted = true;
        }
        self.reporter.update_applied(&outcome);
        Ok(outcome)
    }

    fn apply_port(&mut self, kind: ConnectorKind, port: u16) -> bool {
        if self.connectors.port(kind) == port {
            return false;
        }
        let previous = self.connectors.set_port(kind, port);
        info!(
            target: LIFECYCLE_TARGET,
            connector = %kind,
            previous,
            port,
            "connector port changed"
        );
        true
    }

    fn regenerate_config(&self) -> Result<(), LifecycleError> {
        let layout = self.layout();
        if !layout.is_provisioned() {
            debug!(
                target: LIFECYCLE_TARGET,
                root = %layout.root().display(),
                "install root not provisioned; configuration written on start"
            );
            return Ok(());
        }
        self.provisioner.copy_templated_config(
            CONFIG_TEMPLATE,
            &layout.config_file(),
            &self.connectors,
            &self.keystores,
        )?;
        Ok(())
    }

    fn load_seed_data(&self, layout: &InstallLayout) -> Result<(), LifecycleError> {
        let seeds = self.provisioner.resources().resolve("/", SEED_PATTERN, false)?;
        let loader = DataLoader::new(&self.backends, layout);
        for seed in seeds {
            let identifier = seed.identifier();
            let mut stream = seed.open()?;
            match loader.load_bulk_data(&mut *stream, &self.settings.backend_id) {
                Ok(result) => self.reporter.data_loaded(&identifier, &result),
                Err(source) => {
                    self.reporter.data_load_failed(&identifier, &source);
                    return Err(LifecycleError::SeedData {
                        resource: identifier,
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    fn load_base_data(&self, path: &Path) -> Option<ImportResult> {
        let source = path.display().to_string();
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                warn!(
                    target: LIFECYCLE_TARGET,
                    file = %source,
                    "base LDIF not found; skipping"
                );
                return None;
            }
            Err(error) => {
                warn!(
                    target: LIFECYCLE_TARGET,
                    file = %source,
                    error = %error,
                    "base LDIF unreadable; skipping"
                );
                return None;
            }
        };
        let layout = self.layout();
        match DataLoader::new(&self.backends, &layout)
            .load_bulk_data(&mut file, &self.settings.backend_id)
        {
            Ok(result) => {
                self.reporter.data_loaded(&source, &result);
                Some(result)
            }
            Err(error) => {
                self.reporter.data_load_failed(&source, &error);
                None
            }
        }
    }

    fn abort_start(&mut self, error: LifecycleError) -> Result<(), LifecycleError> {
        self.transition(LifecycleState::Stopped);
        Err(error)
    }

    fn release_server_lock(&mut self) {
        if let Some(lock) = self.server_lock.take() {
            release_lock(lock);
        }
    }

    fn transition(&mut self, to: LifecycleState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        self.reporter.state_changed(from, to);
    }
}

fn release_lock(lock: FileLock) {
    let path = lock.path().to_path_buf();
    if let Err(error) = lock.release() {
        warn!(
            target: LIFECYCLE_TARGET,
            file = %path.display(),
            error = %error,
            "failed to release server lock"
        );
    }
}
