use std::fmt;

/// Phase of the supervised server's lifecycle.
///
/// A start walks `Stopped`, `Provisioning` (first run only),
/// `StagingCredentials`, `Starting` and ends in `Running`. A restart passes
/// through `Restarting` and then the stop and start phases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// No server process is running.
    #[default]
    Stopped,
    /// Laying out a fresh install root.
    Provisioning,
    /// Writing pin files.
    StagingCredentials,
    /// Handing the install root to the process boundary.
    Starting,
    /// The server is running.
    Running,
    /// Stopping the server.
    Stopping,
    /// Stopping then starting the server.
    Restarting,
}

impl LifecycleState {
    /// Stable name used in log events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Provisioning => "provisioning",
            Self::StagingCredentials => "staging_credentials",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Restarting => "restarting",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
