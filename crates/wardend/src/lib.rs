//! Supervisor for an embedded directory server.
//!
//! `wardend` owns the on-disk install of a directory server and drives it
//! through its lifecycle. On the first start it provisions the install root
//! from bundled resources: the directory layout, the main configuration
//! rendered with the requested connector ports and keystore bindings, the
//! schema files, and the seed entries loaded into the default backend. Every
//! start stages keystore pin files and takes the server lock before the
//! process is launched through a [`ProcessSupervisor`].
//!
//! A running install is reconciled with new settings through
//! [`LifecycleController::update`]: changed ports or a moved install root
//! regenerate the configuration and restart the server once, while a base
//! LDIF replaces the backend contents under the backend lock without a
//! restart.
//!
//! The daemon binary wires the controller to a spawned server command and a
//! file-backed backend, then serves `SIGHUP` reloads until a termination
//! signal arrives. See [`run_daemon`].

pub mod connectors;
pub mod credentials;
pub mod daemon;
pub mod health;
pub mod keystore;
pub mod lifecycle;
pub mod loader;
pub mod locks;
pub mod process;
pub mod provision;
pub mod resources;
pub mod telemetry;
pub mod template;

pub use connectors::{Connector, ConnectorKind, ConnectorRegistry};
pub use daemon::{ConfigLoader, DaemonError, SystemConfigLoader, run_daemon, run_daemon_with};
pub use health::{LifecycleReporter, StructuredLifecycleReporter};
pub use keystore::{KeystoreBinding, KeystoreBindings, KeystoreKind};
pub use lifecycle::{
    LifecycleController, LifecycleError, LifecycleState, UpdateOutcome, UpdateRequest,
    UpdateSetting,
};
pub use loader::{DataLoader, ImportError, ImportResult};
pub use process::{CommandSupervisor, ProcessSupervisor, StartOptions};
pub use resources::{ResourceResolver, ResourceSource};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
