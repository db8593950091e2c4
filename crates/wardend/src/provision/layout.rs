use std::path::{Path, PathBuf};

/// Version suffix of the upgrade schema shipped with the bundle.
pub const UPGRADE_SCHEMA_VERSION: &str = "9086";

/// On-disk layout of a server install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
    backend_id: String,
}

impl InstallLayout {
    /// Describes the install rooted at `root` whose data lives in `backend_id`.
    pub fn new(root: impl Into<PathBuf>, backend_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            backend_id: backend_id.into(),
        }
    }

    /// Install root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Whether the install root exists.
    ///
    /// Existence is the only first-run marker: a root left behind by an
    /// interrupted provisioning run counts as provisioned.
    #[must_use]
    pub fn is_provisioned(&self) -> bool {
        self.root.exists()
    }

    /// `config/`.
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    /// `config/schema/`.
    #[must_use]
    pub fn schema_dir(&self) -> PathBuf {
        self.config_dir().join("schema")
    }

    /// `config/upgrade/`.
    #[must_use]
    pub fn upgrade_dir(&self) -> PathBuf {
        self.config_dir().join("upgrade")
    }

    /// `locks/`.
    #[must_use]
    pub fn locks_dir(&self) -> PathBuf {
        self.root.join("locks")
    }

    /// `logs/`.
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Storage directory of backend `id`.
    #[must_use]
    pub fn backend_dir(&self, id: &str) -> PathBuf {
        self.root.join("db").join(id)
    }

    /// Main server configuration.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join("config.ldif")
    }

    /// Administration backend definition.
    #[must_use]
    pub fn admin_backend_file(&self) -> PathBuf {
        self.config_dir().join("admin-backend.ldif")
    }

    /// Build information consulted by the server on start.
    #[must_use]
    pub fn buildinfo_file(&self) -> PathBuf {
        self.config_dir().join("buildinfo")
    }

    /// Schema snapshot used by the upgrade tooling.
    #[must_use]
    pub fn upgrade_schema_file(&self) -> PathBuf {
        self.upgrade_dir()
            .join(format!("schema.ldif.{UPGRADE_SCHEMA_VERSION}"))
    }

    /// Lock held while the server process runs.
    #[must_use]
    pub fn server_lock(&self) -> PathBuf {
        self.locks_dir().join("server.lock")
    }

    /// Lock held while backend `id` is being bulk loaded.
    #[must_use]
    pub fn backend_lock(&self, id: &str) -> PathBuf {
        self.locks_dir().join(format!("backend-{id}.lock"))
    }

    /// Every directory a provisioned install contains.
    #[must_use]
    pub fn directories(&self) -> [PathBuf; 6] {
        [
            self.config_dir(),
            self.schema_dir(),
            self.upgrade_dir(),
            self.locks_dir(),
            self.logs_dir(),
            self.backend_dir(&self.backend_id),
        ]
    }
}
