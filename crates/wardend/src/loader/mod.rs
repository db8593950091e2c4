//! Bulk replacement of a live backend's contents.
//!
//! A bulk load takes the backend's lock file, finalizes the backend so it
//! lets go of its storage, imports the new data and initializes the backend
//! again. The backend is never imported into while initialized, and it is
//! always initialized again once finalize succeeded, whatever the import
//! outcome. The lock covers one backend only, so the rest of the server
//! keeps serving during the load.

mod ldif;

use std::fmt;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::locks::{FileLock, LockError};
use crate::provision::InstallLayout;

pub use self::ldif::{LdifBackendRegistry, LdifFileBackend};

pub(crate) const LOADER_TARGET: &str = "wardend::loader";

/// Options applied to a bulk import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportConfig {
    /// Replace entries that already exist.
    pub replace_existing: bool,
    /// Remove every entry before importing.
    pub clear_backend: bool,
    /// Check entries against the schema.
    pub validate_schema: bool,
    /// Skip distinguished name syntax checks.
    pub skip_dn_validation: bool,
}

impl ImportConfig {
    /// Replace-everything import used for seed and base data.
    #[must_use]
    pub const fn bulk_replace() -> Self {
        Self {
            replace_existing: true,
            clear_backend: true,
            validate_schema: false,
            skip_dn_validation: false,
        }
    }
}

/// Counters reported by a finished import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportResult {
    /// Records read from the source.
    pub entries_read: u64,
    /// Records stored in the backend.
    pub entries_imported: u64,
    /// Records refused by the backend.
    pub entries_rejected: u64,
}

/// Errors raised by a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Backend storage could not be read or written.
    #[error("backend '{id}' storage failure at '{path}': {source}")]
    Storage {
        /// Backend identifier.
        id: String,
        /// Storage path involved.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// An import was attempted while the backend was serving requests.
    #[error("backend '{id}' is initialized and cannot be imported into")]
    Online {
        /// Backend identifier.
        id: String,
    },
    /// The backend refused the operation.
    #[error("backend '{id}' failed: {message}")]
    Failed {
        /// Backend identifier.
        id: String,
        /// Reason reported by the backend.
        message: String,
    },
}

/// A storage backend of the supervised server.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Backend identifier.
    fn id(&self) -> &str;

    /// Stops serving and releases storage handles.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the backend cannot be taken offline.
    fn finalize(&self) -> Result<(), BackendError>;

    /// Imports LDIF records read from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the import cannot run to completion.
    fn import(
        &self,
        source: &mut dyn Read,
        config: &ImportConfig,
    ) -> Result<ImportResult, BackendError>;

    /// Resumes serving from storage.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the backend cannot come back online.
    fn initialize(&self) -> Result<(), BackendError>;
}

/// Lookup of the backends configured in an install root.
pub trait BackendRegistry: Send + Sync {
    /// Returns backend `id` of the install described by `layout`.
    fn backend(&self, layout: &InstallLayout, id: &str) -> Option<Arc<dyn Backend>>;
}

impl<T> BackendRegistry for Arc<T>
where
    T: BackendRegistry + ?Sized,
{
    fn backend(&self, layout: &InstallLayout, id: &str) -> Option<Arc<dyn Backend>> {
        (**self).backend(layout, id)
    }
}

/// Errors raised by a bulk load.
#[derive(Debug, Error)]
pub enum ImportError {
    /// No backend has the requested identifier.
    #[error("backend '{id}' not found")]
    BackendNotFound {
        /// Requested backend identifier.
        id: String,
    },
    /// The backend lock could not be taken.
    #[error("failed to lock backend '{id}': {source}")]
    Lock {
        /// Backend identifier.
        id: String,
        /// Underlying lock error.
        #[source]
        source: LockError,
    },
    /// Taking the backend offline failed.
    #[error("failed to finalize backend '{id}': {source}")]
    Finalize {
        /// Backend identifier.
        id: String,
        /// Underlying backend error.
        #[source]
        source: BackendError,
    },
    /// The import itself failed.
    #[error("failed to import into backend '{id}': {source}")]
    Import {
        /// Backend identifier.
        id: String,
        /// Underlying backend error.
        #[source]
        source: BackendError,
    },
    /// Bringing the backend back online failed.
    #[error("failed to initialize backend '{id}': {source}")]
    Initialize {
        /// Backend identifier.
        id: String,
        /// Underlying backend error.
        #[source]
        source: BackendError,
    },
}

/// Performs locked bulk loads against the backends of one install root.
#[derive(Debug)]
pub struct DataLoader<'a, B: ?Sized> {
    backends: &'a B,
    layout: &'a InstallLayout,
}

impl<'a, B> DataLoader<'a, B>
where
    B: BackendRegistry + ?Sized,
{
    /// Builds a loader for the install described by `layout`.
    pub const fn new(backends: &'a B, layout: &'a InstallLayout) -> Self {
        Self { backends, layout }
    }

    /// Replaces the contents of backend `backend_id` with the LDIF in `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::BackendNotFound`] before any lock is taken when
    /// the backend does not exist, and the failing step's error otherwise. An
    /// import failure takes precedence over a failure to initialize again.
    pub fn load_bulk_data(
        &self,
        source: &mut dyn Read,
        backend_id: &str,
    ) -> Result<ImportResult, ImportError> {
        let config = ImportConfig::bulk_replace();
        let backend = self.backends.backend(self.layout, backend_id).ok_or_else(|| {
            ImportError::BackendNotFound {
                id: backend_id.to_owned(),
            }
        })?;
        let lock = FileLock::acquire(self.layout.backend_lock(backend_id)).map_err(|source| {
            ImportError::Lock {
                id: backend_id.to_owned(),
                source,
            }
        })?;

        if let Err(source) = backend.finalize() {
            release(lock);
            return Err(ImportError::Finalize {
                id: backend_id.to_owned(),
                source,
            });
        }
        let imported = backend.import(source, &config);
        let initialized = backend.initialize();
        release(lock);

        match (imported, initialized) {
            (Ok(result), Ok(())) => {
                info!(
                    target: LOADER_TARGET,
                    backend = backend_id,
                    read = result.entries_read,
                    imported = result.entries_imported,
                    rejected = result.entries_rejected,
                    "bulk load complete"
                );
                Ok(result)
            }
            (Ok(_), Err(source)) => Err(ImportError::Initialize {
                id: backend_id.to_owned(),
                source,
            }),
            (Err(source), initialized) => {
                if let Err(error) = initialized {
                    warn!(
                        target: LOADER_TARGET,
                        backend = backend_id,
                        error = %error,
                        "backend did not initialize after failed import"
                    );
                }
                Err(ImportError::Import {
                    id: backend_id.to_owned(),
                    source,
                })
            }
        }
    }
}

fn release(lock: FileLock) {
    let path = lock.path().to_path_buf();
    if let Err(error) = lock.release() {
        warn!(
            target: LOADER_TARGET,
            file = %path.display(),
            error = %error,
            "failed to release backend lock"
        );
    }
}
