//! Log output formats understood by the daemon's telemetry layer.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the daemon renders `tracing` events on stderr.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One flattened JSON object per event, for log shippers.
    #[default]
    Json,
    /// Single-line human-readable output.
    Compact,
    /// Multi-line output with span context, for interactive debugging.
    Pretty,
}

impl LogFormat {
    /// Returns `true` when the format is meant for machine ingestion.
    #[must_use]
    pub const fn is_structured(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Error returned when a log format name is not recognised.
pub type LogFormatParseError = strum::ParseError;
