//! Desired state of the directory server's network connectors.
//!
//! The server exposes three endpoints. Each one has a compiled-in default
//! port and a pair of placeholder tokens in the configuration template. The
//! registry records the port the operator wants bound; a port of `0` means
//! the connector is disabled. The registry only records intent: the running
//! server picks up a change once the configuration is regenerated and the
//! process restarted.

use std::fmt;

use warden_config::{Config, DEFAULT_ADMIN_PORT, DEFAULT_LDAP_PORT, DEFAULT_LDAPS_PORT};

/// Network endpoints managed by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorKind {
    /// Plaintext LDAP.
    Ldap,
    /// LDAP over TLS.
    Ldaps,
    /// Administration connector.
    Admin,
}

/// Static attributes of a connector kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectorSpec {
    /// Name used in log events.
    pub name: &'static str,
    /// Template token replaced with the port; doubles as the update key.
    pub port_variable: &'static str,
    /// Template token replaced with `true` or `false`.
    pub enable_variable: &'static str,
    /// Port written to the template when the connector is disabled.
    pub default_port: u16,
}

static SPECS: [ConnectorSpec; 3] = [
    ConnectorSpec {
        name: "LDAP",
        port_variable: "ldap.port",
        enable_variable: "ldap.enable",
        default_port: DEFAULT_LDAP_PORT,
    },
    ConnectorSpec {
        name: "LDAPS",
        port_variable: "ldaps.port",
        enable_variable: "ldaps.enable",
        default_port: DEFAULT_LDAPS_PORT,
    },
    ConnectorSpec {
        name: "ADMIN",
        port_variable: "admin.port",
        enable_variable: "admin.enable",
        default_port: DEFAULT_ADMIN_PORT,
    },
];

impl ConnectorKind {
    /// Every connector, in template substitution order.
    pub const ALL: [Self; 3] = [Self::Ldap, Self::Ldaps, Self::Admin];

    const fn index(self) -> usize {
        match self {
            Self::Ldap => 0,
            Self::Ldaps => 1,
            Self::Admin => 2,
        }
    }

    /// Static attributes for this connector.
    #[must_use]
    pub fn spec(self) -> &'static ConnectorSpec {
        &SPECS[self.index()]
    }

    /// Finds the connector whose port setting uses `key`.
    #[must_use]
    pub fn from_port_variable(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.spec().port_variable == key)
    }
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.spec().name)
    }
}

/// A connector together with its requested port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connector {
    /// Which endpoint this is.
    pub kind: ConnectorKind,
    /// Requested port; `0` disables the connector.
    pub current_port: u16,
}

impl Connector {
    /// Returns `true` unless the connector was disabled with port `0`.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.current_port != 0
    }

    /// Port that must appear in the rendered configuration.
    ///
    /// The server rejects `0` even for disabled connectors, so the default
    /// port stands in.
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        if self.is_enabled() {
            self.current_port
        } else {
            self.kind.spec().default_port
        }
    }
}

/// Requested ports for all connectors of one supervised server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorRegistry {
    ports: [u16; 3],
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self {
            ports: SPECS.map(|spec| spec.default_port),
        }
    }
}

impl ConnectorRegistry {
    /// Builds a registry from the configured ports.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            ports: [config.ldap_port, config.ldaps_port, config.admin_port],
        }
    }

    /// Requested port for `kind`.
    #[must_use]
    pub const fn port(&self, kind: ConnectorKind) -> u16 {
        self.ports[kind.index()]
    }

    /// Records a new requested port and returns the previous one.
    pub fn set_port(&mut self, kind: ConnectorKind, port: u16) -> u16 {
        std::mem::replace(&mut self.ports[kind.index()], port)
    }

    /// Snapshot of a single connector.
    #[must_use]
    pub const fn connector(&self, kind: ConnectorKind) -> Connector {
        Connector {
            kind,
            current_port: self.port(kind),
        }
    }

    /// Iterates the connectors in template substitution order.
    pub fn iter(&self) -> impl Iterator<Item = Connector> + '_ {
        ConnectorKind::ALL
            .into_iter()
            .map(|kind| self.connector(kind))
    }
}
