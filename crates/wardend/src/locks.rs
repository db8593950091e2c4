//! Exclusive, pid-stamped lock files.
//!
//! A lock is a file created with `create_new` holding the owner's pid. A lock
//! whose recorded owner is no longer alive is stale and is replaced. The lock
//! is removed when the [`FileLock`] guard is released or dropped.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use thiserror::Error;
use tracing::{debug, warn};

const LOCKS_TARGET: &str = "wardend::locks";

/// Errors raised while taking or releasing a lock file.
#[derive(Debug, Error)]
pub enum LockError {
    /// A live process holds the lock.
    #[error("lock '{path}' is held by running process {pid}")]
    Held {
        /// Lock file path.
        path: PathBuf,
        /// Owner recorded in the lock.
        pid: u32,
    },
    /// Creating the lock file failed.
    #[error("failed to create lock file '{path}': {source}")]
    Create {
        /// Lock file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Removing the lock file failed.
    #[error("failed to remove lock file '{path}': {source}")]
    Release {
        /// Lock file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Checking whether the recorded owner is alive failed.
    #[error("failed to check lock owner {pid} of '{path}': {source}")]
    Probe {
        /// Lock file path.
        path: PathBuf,
        /// Owner recorded in the lock.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
}

/// Guard over an acquired lock file.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    released: bool,
}

impl FileLock {
    /// Takes the lock at `path`, replacing it when its owner has exited.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Held`] when a live process owns the lock, and
    /// [`LockError::Create`] or [`LockError::Probe`] on I/O failures.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, LockError> {
        let path = path.into();
        create_lock(&path)?;
        debug!(
            target: LOCKS_TARGET,
            file = %path.display(),
            "acquired lock"
        );
        Ok(Self {
            path,
            released: false,
        })
    }

    /// Lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Removes the lock file, reporting failure to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Release`] when the file cannot be removed.
    pub fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        remove_lock(&self.path)
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(error) = remove_lock(&self.path) {
            warn!(
                target: LOCKS_TARGET,
                file = %self.path.display(),
                error = %error,
                "failed to remove lock file"
            );
        }
    }
}

fn create_lock(path: &Path) -> Result<(), LockError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| LockError::Create {
            path: path.to_path_buf(),
            source,
        })?;
    }
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    match options.open(path) {
        Ok(mut file) => {
            writeln!(file, "{}", std::process::id())
                .and_then(|()| file.sync_all())
                .map_err(|source| LockError::Create {
                    path: path.to_path_buf(),
                    source,
                })
        }
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => handle_existing_lock(path),
        Err(source) => Err(LockError::Create {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn handle_existing_lock(path: &Path) -> Result<(), LockError> {
    if let Some(pid) = read_pid(path)
        && pid != 0
        && check_process(path, pid)?
    {
        return Err(LockError::Held {
            path: path.to_path_buf(),
            pid,
        });
    }
    warn!(
        target: LOCKS_TARGET,
        file = %path.display(),
        "lock owner not detected; replacing stale lock"
    );
    remove_lock(path)?;
    create_lock(path)
}

fn read_pid(path: &Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    content.trim().parse::<u32>().ok()
}

fn remove_lock(path: &Path) -> Result<(), LockError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LockError::Release {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn check_process(path: &Path, pid: u32) -> Result<bool, LockError> {
    let Ok(raw) = i32::try_from(pid) else {
        return Ok(false);
    };
    match kill(Pid::from_raw(raw), None) {
        Ok(()) | Err(Errno::EPERM) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(source) => Err(LockError::Probe {
            path: path.to_path_buf(),
            pid,
            source,
        }),
    }
}
