//! Orchestration of provisioning, start, stop, restart and live updates.

mod controller;
mod state;
mod update;

use std::io;

use thiserror::Error;

use crate::credentials::CredentialStagingError;
use crate::loader::ImportError;
use crate::locks::LockError;
use crate::process::ProcessError;
use crate::provision::ProvisioningError;
use crate::resources::ResourceError;

pub use self::controller::{ControllerSettings, LifecycleController, SEED_PATTERN};
pub use self::state::LifecycleState;
pub use self::update::{
    BASE_LDIF_KEY, DATA_PATH_KEY, UpdateError, UpdateOutcome, UpdateRequest, UpdateSetting,
};

pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Errors surfaced by [`LifecycleController`] operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Keystore paths could not be resolved.
    #[error("failed to resolve keystore paths: {source}")]
    Keystore {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Provisioning or regenerating configuration failed.
    #[error("provisioning failed: {source}")]
    Provisioning {
        /// Underlying provisioning error.
        #[source]
        source: ProvisioningError,
    },
    /// Writing pin files failed.
    #[error("credential staging failed: {source}")]
    Credentials {
        /// Underlying staging error.
        #[source]
        source: CredentialStagingError,
    },
    /// The server lock could not be taken.
    #[error("failed to lock install root: {source}")]
    ServerLock {
        /// Underlying lock error.
        #[source]
        source: LockError,
    },
    /// The server process failed to start.
    #[error("failed to start server: {source}")]
    Start {
        /// Underlying process error.
        #[source]
        source: ProcessError,
    },
    /// The server process failed to stop.
    #[error("failed to stop server: {source}")]
    Stop {
        /// Underlying process error.
        #[source]
        source: ProcessError,
    },
    /// Seed resources could not be enumerated or opened.
    #[error("failed to read seed data: {source}")]
    SeedResource {
        /// Underlying resolver error.
        #[source]
        source: ResourceError,
    },
    /// Loading seed data failed; the server has been stopped.
    #[error("failed to load seed data '{resource}': {source}")]
    SeedData {
        /// Seed resource identifier.
        resource: String,
        /// Underlying import error.
        #[source]
        source: ImportError,
    },
    /// An update map was malformed.
    #[error("invalid update: {source}")]
    Update {
        /// Underlying parse error.
        #[source]
        source: UpdateError,
    },
}

impl From<ProvisioningError> for LifecycleError {
    fn from(source: ProvisioningError) -> Self {
        Self::Provisioning { source }
    }
}

impl From<CredentialStagingError> for LifecycleError {
    fn from(source: CredentialStagingError) -> Self {
        Self::Credentials { source }
    }
}

impl From<LockError> for LifecycleError {
    fn from(source: LockError) -> Self {
        Self::ServerLock { source }
    }
}

impl From<ResourceError> for LifecycleError {
    fn from(source: ResourceError) -> Self {
        Self::SeedResource { source }
    }
}

impl From<UpdateError> for LifecycleError {
    fn from(source: UpdateError) -> Self {
        Self::Update { source }
    }
}
