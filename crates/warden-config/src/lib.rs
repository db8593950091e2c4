//! Shared configuration for the Warden directory-server supervisor.
//!
//! Values are layered by `ortho_config`: compiled-in defaults, then a
//! configuration file (`--config-path`), then `WARDEN_*` environment
//! variables, then command-line flags. The daemon reloads the same structure
//! on `SIGHUP` and feeds the differences into its update surface, so every
//! field here is either a start-up setting or a live-reconfigurable one.

mod defaults;
mod logging;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_ADMIN_PORT, DEFAULT_BACKEND_ID, DEFAULT_LDAP_PORT, DEFAULT_LDAPS_PORT,
    DEFAULT_LOG_FILTER, DEFAULT_SERVER_COMMAND, DEFAULT_STOP_TIMEOUT_MS, DEFAULT_STORE_TYPE,
    default_backend_id, default_data_path, default_log_filter, default_log_filter_string,
    default_log_format, default_pin_dir, default_resource_dir, default_server_command,
    default_store_type,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved supervisor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "WARDEN")]
pub struct Config {
    /// Install root of the managed directory server.
    #[ortho_config(default = defaults::default_data_path())]
    pub data_path: Utf8PathBuf,
    /// Plaintext LDAP port; `0` disables the connector.
    #[ortho_config(default = defaults::DEFAULT_LDAP_PORT)]
    pub ldap_port: u16,
    /// LDAPS port; `0` disables the connector.
    #[ortho_config(default = defaults::DEFAULT_LDAPS_PORT)]
    pub ldaps_port: u16,
    /// Administration connector port; `0` disables the connector.
    #[ortho_config(default = defaults::DEFAULT_ADMIN_PORT)]
    pub admin_port: u16,
    /// Backend that receives seed and base data.
    #[ortho_config(default = defaults::default_backend_id())]
    pub backend_id: String,
    /// Directory holding the bundled default assets.
    #[ortho_config(default = defaults::default_resource_dir())]
    pub resource_dir: Utf8PathBuf,
    /// Optional second asset directory searched after `resource_dir`.
    pub fragment_dir: Option<Utf8PathBuf>,
    /// Key store presented by the TLS and admin connectors.
    pub key_store: Option<Utf8PathBuf>,
    /// Password protecting the key store.
    pub key_store_password: Option<String>,
    /// Key store format understood by the server.
    #[ortho_config(default = defaults::default_store_type())]
    pub key_store_type: String,
    /// Trust store used to validate peers.
    pub trust_store: Option<Utf8PathBuf>,
    /// Password protecting the trust store.
    pub trust_store_password: Option<String>,
    /// Trust store format understood by the server.
    #[ortho_config(default = defaults::default_store_type())]
    pub trust_store_type: String,
    /// Directory receiving transient pin files.
    pub pin_dir: Option<Utf8PathBuf>,
    /// Executable that runs the directory server in the foreground.
    #[ortho_config(default = defaults::default_server_command())]
    pub server_command: String,
    /// Grace period in milliseconds before a stopping server is killed.
    #[ortho_config(default = defaults::DEFAULT_STOP_TIMEOUT_MS)]
    pub stop_timeout_ms: u64,
    /// LDIF file that replaces the backend contents when it changes.
    pub base_ldif: Option<Utf8PathBuf>,
    /// Log filter expression in `tracing_subscriber::EnvFilter` syntax.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            ldap_port: DEFAULT_LDAP_PORT,
            ldaps_port: DEFAULT_LDAPS_PORT,
            admin_port: DEFAULT_ADMIN_PORT,
            backend_id: default_backend_id(),
            resource_dir: default_resource_dir(),
            fragment_dir: None,
            key_store: None,
            key_store_password: None,
            key_store_type: default_store_type(),
            trust_store: None,
            trust_store_password: None,
            trust_store_type: default_store_type(),
            pin_dir: None,
            server_command: default_server_command(),
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
            base_ldif: None,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Install root of the managed server.
    #[must_use]
    pub fn data_path(&self) -> &Utf8Path {
        self.data_path.as_path()
    }

    /// Directory receiving pin files, falling back to the runtime directory.
    #[must_use]
    pub fn pin_dir(&self) -> Utf8PathBuf {
        self.pin_dir.clone().unwrap_or_else(default_pin_dir)
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Rejects configurations the server would refuse to bind.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PortConflict`] when two enabled connectors share
    /// a port and [`ConfigError::EmptyBackendId`] when no backend is named.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend_id.trim().is_empty() {
            return Err(ConfigError::EmptyBackendId);
        }
        let ports = [
            ("ldap", self.ldap_port),
            ("ldaps", self.ldaps_port),
            ("admin", self.admin_port),
        ];
        for (index, (first, port)) in ports.iter().enumerate() {
            if *port == 0 {
                continue;
            }
            let clash = ports
                .iter()
                .skip(index + 1)
                .find(|(_, other)| other == port);
            if let Some((second, _)) = clash {
                return Err(ConfigError::PortConflict {
                    port: *port,
                    first: *first,
                    second: *second,
                });
            }
        }
        Ok(())
    }
}

/// Semantic problems detected after configuration layers are merged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Two enabled connectors were configured with the same port.
    #[error("connectors '{first}' and '{second}' both bind port {port}")]
    PortConflict {
        /// Shared port.
        port: u16,
        /// First connector using the port.
        first: &'static str,
        /// Second connector using the port.
        second: &'static str,
    },
    /// The backend identifier was blank.
    #[error("backend_id must not be empty")]
    EmptyBackendId,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_match_the_documented_ports() {
        let config = Config::default();
        assert_eq!(config.ldap_port, 1389);
        assert_eq!(config.ldaps_port, 1636);
        assert_eq!(config.admin_port, 4444);
        assert_eq!(config.backend_id, "userRoot");
        assert_eq!(config.log_format(), LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case(9000, 9000, 4444, "ldap", "ldaps")]
    #[case(1389, 2636, 1389, "ldap", "admin")]
    #[case(1389, 4444, 4444, "ldaps", "admin")]
    fn rejects_shared_ports(
        #[case] ldap_port: u16,
        #[case] ldaps_port: u16,
        #[case] admin_port: u16,
        #[case] first: &'static str,
        #[case] second: &'static str,
    ) {
        let config = Config {
            ldap_port,
            ldaps_port,
            admin_port,
            ..Config::default()
        };
        let port = if first == "ldaps" { ldaps_port } else { ldap_port };
        assert_eq!(
            config.validate(),
            Err(ConfigError::PortConflict {
                port,
                first,
                second,
            })
        );
    }

    #[test]
    fn disabled_connectors_may_share_zero() {
        let config = Config {
            ldap_port: 0,
            ldaps_port: 0,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn blank_backend_is_rejected() {
        let config = Config {
            backend_id: "  ".to_owned(),
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyBackendId));
    }

    #[test]
    fn configured_pin_dir_wins_over_default() {
        let config = Config {
            pin_dir: Some(Utf8PathBuf::from("/run/pins")),
            ..Config::default()
        };
        assert_eq!(config.pin_dir(), Utf8PathBuf::from("/run/pins"));
    }
}
