//! Controller wired to recording doubles and a temporary install workspace.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use super::{RecordingBackends, RecordingReporter, RecordingSupervisor, ResourceBundle};
use crate::connectors::ConnectorRegistry;
use crate::keystore::{KeystoreBinding, KeystoreBindings, KeystoreKind};
use crate::lifecycle::{ControllerSettings, LifecycleController};
use crate::process::StartOptions;
use crate::provision::InstallLayout;

/// Controller type exercised by the lifecycle suites.
pub type TestController = LifecycleController<RecordingSupervisor, RecordingBackends>;

/// A controller plus handles on every collaborator it was built with.
pub struct ControllerHarness {
    pub bundle: ResourceBundle,
    pub workspace: TempDir,
    pub supervisor: RecordingSupervisor,
    pub backends: RecordingBackends,
    pub reporter: Arc<RecordingReporter>,
    pub controller: TestController,
}

impl ControllerHarness {
    /// Builds a harness around a complete resource bundle.
    pub fn new() -> Self {
        Self::with_bundle(ResourceBundle::complete())
    }

    /// Builds a harness around `bundle`.
    pub fn with_bundle(bundle: ResourceBundle) -> Self {
        let workspace = TempDir::new().expect("controller workspace");
        let supervisor = RecordingSupervisor::default();
        let backends = RecordingBackends::with_backend("userRoot");
        let reporter = Arc::new(RecordingReporter::default());
        let settings = ControllerSettings {
            data_path: workspace.path().join("ldap"),
            backend_id: "userRoot".to_owned(),
            start_options: StartOptions::default(),
        };
        let pins = workspace.path().join("pins");
        let key_store = KeystoreBinding::new(
            KeystoreKind::KeyStore,
            Some(workspace.path().join("keys.jks").as_path()),
            "key-secret",
            "JKS",
            &pins.join("key"),
        )
        .expect("key store binding");
        let trust_store = KeystoreBinding::new(
            KeystoreKind::TrustStore,
            Some(workspace.path().join("trust.jks").as_path()),
            "trust-secret",
            "JKS",
            &pins.join("trust"),
        )
        .expect("trust store binding");
        let controller = LifecycleController::new(
            settings,
            ConnectorRegistry::default(),
            KeystoreBindings::new(key_store, trust_store),
            bundle.resolver(),
            supervisor.clone(),
            backends.clone(),
            reporter.clone(),
        );
        Self {
            bundle,
            workspace,
            supervisor,
            backends,
            reporter,
            controller,
        }
    }

    /// Install root the controller currently targets.
    pub fn root(&self) -> PathBuf {
        self.controller.data_path().to_path_buf()
    }

    /// Layout of the current install root.
    pub fn layout(&self) -> InstallLayout {
        self.controller.layout()
    }

    /// Writes a file inside the workspace and returns its path.
    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.workspace.path().join(name);
        std::fs::write(&path, contents).expect("write workspace file");
        path
    }
}
