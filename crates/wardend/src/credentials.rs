//! Pin files handing keystore passwords to the directory server.
//!
//! Pin file names are random per controller, so the files are rewritten on
//! every start rather than only during provisioning.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::keystore::{KeystoreBinding, KeystoreBindings};

const CREDENTIALS_TARGET: &str = "wardend::credentials";

/// Errors raised while writing pin files.
#[derive(Debug, Error)]
pub enum CredentialStagingError {
    /// Removing the previous pin file failed.
    #[error("failed to remove stale pin file '{path}': {source}")]
    Remove {
        /// Pin file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Creating the pin file's directory failed.
    #[error("failed to create pin directory '{path}': {source}")]
    Directory {
        /// Directory path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the pin file failed.
    #[error("failed to write pin file '{path}': {source}")]
    Write {
        /// Pin file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Writes a fresh pin file for every binding.
///
/// Any existing file at a pin path is replaced, so staging twice leaves only
/// the latest password on disk.
///
/// # Errors
///
/// Returns the first [`CredentialStagingError`] encountered.
pub fn stage_pin_files(keystores: &KeystoreBindings) -> Result<(), CredentialStagingError> {
    for binding in keystores.iter() {
        stage_pin_file(binding)?;
    }
    Ok(())
}

fn stage_pin_file(binding: &KeystoreBinding) -> Result<(), CredentialStagingError> {
    let path = binding.pin_path();
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(CredentialStagingError::Remove {
                path: path.to_path_buf(),
                source,
            });
        }
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| CredentialStagingError::Directory {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    write_owner_only(path, binding.password().as_bytes()).map_err(|source| {
        CredentialStagingError::Write {
            path: path.to_path_buf(),
            source,
        }
    })?;
    debug!(
        target: CREDENTIALS_TARGET,
        store = %binding.kind(),
        file = %path.display(),
        "pin file staged"
    );
    Ok(())
}

fn write_owner_only(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    #[cfg(not(unix))]
    tracing::warn!(
        target: CREDENTIALS_TARGET,
        file = %path.display(),
        "pin file permissions cannot be restricted on this platform"
    );
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}
