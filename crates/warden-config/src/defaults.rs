//! Compiled-in defaults shared by the daemon and its tests.

use std::env;

use camino::Utf8PathBuf;

#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use libc::geteuid;

/// Default plaintext LDAP port.
pub const DEFAULT_LDAP_PORT: u16 = 1389;

/// Default LDAPS (TLS) port.
pub const DEFAULT_LDAPS_PORT: u16 = 1636;

/// Default administration connector port.
pub const DEFAULT_ADMIN_PORT: u16 = 4444;

/// Backend that receives seed and base data imports.
pub const DEFAULT_BACKEND_ID: &str = "userRoot";

/// Store type assumed for key and trust stores when none is configured.
pub const DEFAULT_STORE_TYPE: &str = "JKS";

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Command used to launch the directory server when none is configured.
pub const DEFAULT_SERVER_COMMAND: &str = "start-ds";

/// Milliseconds granted to the directory server to exit after SIGTERM.
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 10_000;

/// Install root used when no data path is configured.
pub fn default_data_path() -> Utf8PathBuf {
    Utf8PathBuf::from("etc/warden/ldap")
}

/// Directory holding the bundled default assets.
pub fn default_resource_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("resources")
}

/// Owned backend identifier used where allocation is required (e.g. serde).
pub fn default_backend_id() -> String {
    DEFAULT_BACKEND_ID.to_owned()
}

/// Owned store type used where allocation is required.
pub fn default_store_type() -> String {
    DEFAULT_STORE_TYPE.to_owned()
}

/// Owned server command used where allocation is required.
pub fn default_server_command() -> String {
    DEFAULT_SERVER_COMMAND.to_owned()
}

/// Default log filter expression used by the daemon.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the daemon.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Directory that receives transient key store pin files.
///
/// Prefers the per-user runtime directory because it is usually a tmpfs that
/// does not survive a reboot, falling back to a uid-scoped temp directory.
pub fn default_pin_dir() -> Utf8PathBuf {
    default_pin_dir_inner()
}

#[cfg(unix)]
fn default_pin_dir_inner() -> Utf8PathBuf {
    if let Some(dir) = runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok()) {
        return dir.join("warden");
    }
    let mut base = fallback_base_directory();
    base.push("warden");
    base.push(format!("uid-{}", unsafe { geteuid() }));
    base
}

#[cfg(not(unix))]
fn default_pin_dir_inner() -> Utf8PathBuf {
    fallback_base_directory().join("warden")
}

fn fallback_base_directory() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(env::temp_dir()).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}
