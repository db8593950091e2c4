use std::path::PathBuf;

use serde_json::{Map, Value};
use thiserror::Error;
use warden_config::Config;

use crate::connectors::ConnectorKind;
use crate::loader::ImportResult;

/// Update key replacing the backend contents with an LDIF file.
pub const BASE_LDIF_KEY: &str = "base.ldif";
/// Update key moving the install root.
pub const DATA_PATH_KEY: &str = "dataPath";

/// A single recognised setting of an update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateSetting {
    /// Request a connector port; `0` disables the connector.
    Port {
        /// Connector being changed.
        kind: ConnectorKind,
        /// Requested port.
        port: u16,
    },
    /// Replace the backend contents with this LDIF file; empty means none.
    BaseLdif(PathBuf),
    /// Move the install root.
    DataPath(PathBuf),
}

impl UpdateSetting {
    /// Update key naming this setting.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Port { kind, .. } => kind.spec().port_variable,
            Self::BaseLdif(_) => BASE_LDIF_KEY,
            Self::DataPath(_) => DATA_PATH_KEY,
        }
    }

    const fn rank(&self) -> usize {
        match self {
            Self::Port { .. } => 0,
            Self::BaseLdif(_) => 1,
            Self::DataPath(_) => 2,
        }
    }
}

/// Errors raised while parsing an update map.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UpdateError {
    /// A port value was neither a number nor a numeric string in range.
    #[error("invalid port for '{key}': {value}")]
    InvalidPort {
        /// Update key.
        key: String,
        /// Offending value, rendered as JSON.
        value: String,
    },
    /// A path value was not a string.
    #[error("invalid path for '{key}': {value}")]
    InvalidPath {
        /// Update key.
        key: String,
        /// Offending value, rendered as JSON.
        value: String,
    },
}

/// Desired settings applied by [`LifecycleController::update`].
///
/// Settings are kept in application order: connector ports, then the base
/// LDIF, then the data path. The base LDIF therefore always loads into the
/// install root that is running when the update begins.
///
/// [`LifecycleController::update`]: super::LifecycleController::update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRequest {
    settings: Vec<UpdateSetting>,
}

impl UpdateRequest {
    /// Builds an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `setting` and returns the request.
    #[must_use]
    pub fn with(mut self, setting: UpdateSetting) -> Self {
        self.push(setting);
        self
    }

    /// Adds `setting`, replacing an earlier setting with the same key.
    pub fn push(&mut self, setting: UpdateSetting) {
        self.settings.retain(|existing| existing.key() != setting.key());
        let position = self
            .settings
            .iter()
            .position(|existing| existing.rank() > setting.rank())
            .unwrap_or(self.settings.len());
        self.settings.insert(position, setting);
    }

    /// Settings in application order.
    #[must_use]
    pub fn settings(&self) -> &[UpdateSetting] {
        self.settings.as_slice()
    }

    /// Parses a string-keyed map; unrecognised keys are ignored.
    ///
    /// Ports accept JSON numbers and numeric strings. Paths must be strings.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError`] for the first malformed recognised value.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, UpdateError> {
        let mut request = Self::new();
        for (key, value) in map {
            if let Some(kind) = ConnectorKind::from_port_variable(key) {
                request.push(UpdateSetting::Port {
                    kind,
                    port: parse_port(key, value)?,
                });
            } else if key == BASE_LDIF_KEY {
                request.push(UpdateSetting::BaseLdif(parse_path(key, value)?));
            } else if key == DATA_PATH_KEY {
                request.push(UpdateSetting::DataPath(parse_path(key, value)?));
            }
        }
        Ok(request)
    }

    /// Expresses a reloaded configuration as a request.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let ports = [
            (ConnectorKind::Ldap, config.ldap_port),
            (ConnectorKind::Ldaps, config.ldaps_port),
            (ConnectorKind::Admin, config.admin_port),
        ];
        let mut request = Self::new();
        for (kind, port) in ports {
            request.push(UpdateSetting::Port { kind, port });
        }
        if let Some(base_ldif) = &config.base_ldif {
            request.push(UpdateSetting::BaseLdif(base_ldif.clone().into_std_path_buf()));
        }
        request.push(UpdateSetting::DataPath(
            config.data_path().as_std_path().to_path_buf(),
        ));
        request
    }
}

fn parse_port(key: &str, value: &Value) -> Result<u16, UpdateError> {
    let parsed = match value {
        Value::Number(number) => number.as_u64().and_then(|port| u16::try_from(port).ok()),
        Value::String(text) => text.trim().parse::<u16>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| UpdateError::InvalidPort {
        key: key.to_owned(),
        value: value.to_string(),
    })
}

fn parse_path(key: &str, value: &Value) -> Result<PathBuf, UpdateError> {
    value
        .as_str()
        .map(|text| PathBuf::from(text.trim()))
        .ok_or_else(|| UpdateError::InvalidPath {
            key: key.to_owned(),
            value: value.to_string(),
        })
}

/// What an update changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Keys whose value differed from the current state.
    pub changed: Vec<&'static str>,
    /// Result of the base LDIF load, when one ran and succeeded.
    pub base_data: Option<ImportResult>,
    /// Whether the server was restarted.
    pub restarted: bool,
}
