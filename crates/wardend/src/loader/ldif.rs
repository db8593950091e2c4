use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tempfile::NamedTempFile;
use tracing::debug;

use super::{Backend, BackendError, BackendRegistry, ImportConfig, ImportResult, LOADER_TARGET};
use crate::provision::InstallLayout;

const ENTRIES_FILE: &str = "entries.ldif";

/// Backends stored as LDIF files under `db/<id>/`.
///
/// A backend exists once its directory does. Handles are cached so
/// availability survives between lookups.
#[derive(Debug, Default)]
pub struct LdifBackendRegistry {
    backends: Mutex<HashMap<PathBuf, Arc<LdifFileBackend>>>,
}

impl LdifBackendRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackendRegistry for LdifBackendRegistry {
    fn backend(&self, layout: &InstallLayout, id: &str) -> Option<Arc<dyn Backend>> {
        let directory = layout.backend_dir(id);
        if !directory.is_dir() {
            return None;
        }
        let mut backends = self.backends.lock().unwrap_or_else(PoisonError::into_inner);
        let backend = backends
            .entry(directory.clone())
            .or_insert_with(|| Arc::new(LdifFileBackend::new(id, directory)));
        Some(Arc::clone(backend) as Arc<dyn Backend>)
    }
}

/// A backend whose accepted records live in a single LDIF file.
#[derive(Debug)]
pub struct LdifFileBackend {
    id: String,
    directory: PathBuf,
    initialized: Mutex<bool>,
}

impl LdifFileBackend {
    /// Opens the backend stored in `directory`; it starts initialized.
    pub fn new(id: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            directory: directory.into(),
            initialized: Mutex::new(true),
        }
    }

    /// File holding the stored records.
    #[must_use]
    pub fn entries_path(&self) -> PathBuf {
        self.directory.join(ENTRIES_FILE)
    }

    /// Whether the backend is serving requests.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        *self.initialized.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_initialized(&self, value: bool) {
        *self.initialized.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }

    fn storage_error(&self, path: &Path, source: io::Error) -> BackendError {
        BackendError::Storage {
            id: self.id.clone(),
            path: path.to_path_buf(),
            source,
        }
    }

    fn existing_records(&self) -> Result<Vec<String>, BackendError> {
        let path = self.entries_path();
        match fs::read_to_string(&path) {
            Ok(text) => Ok(records(&text)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(self.storage_error(&path, source)),
        }
    }

    fn store(&self, records: &[String]) -> Result<(), BackendError> {
        let path = self.entries_path();
        let mut contents = records.join("\n\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        let write = || -> io::Result<()> {
            let mut file = NamedTempFile::new_in(&self.directory)?;
            file.write_all(contents.as_bytes())?;
            file.as_file().sync_all()?;
            file.persist(&path).map_err(|error| error.error)?;
            Ok(())
        };
        write().map_err(|source| self.storage_error(&path, source))
    }
}

impl Backend for LdifFileBackend {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn finalize(&self) -> Result<(), BackendError> {
        self.set_initialized(false);
        debug!(target: LOADER_TARGET, backend = %self.id, "backend finalized");
        Ok(())
    }

    fn import(
        &self,
        source: &mut dyn Read,
        config: &ImportConfig,
    ) -> Result<ImportResult, BackendError> {
        if self.is_initialized() {
            return Err(BackendError::Online {
                id: self.id.clone(),
            });
        }
        let mut text = String::new();
        source
            .read_to_string(&mut text)
            .map_err(|source| self.storage_error(Path::new("<import source>"), source))?;

        let mut result = ImportResult::default();
        let mut stored = if config.clear_backend {
            Vec::new()
        } else {
            self.existing_records()?
        };
        for record in records(&text) {
            result.entries_read += 1;
            let Some(dn) = distinguished_name(&record) else {
                result.entries_rejected += 1;
                continue;
            };
            if !config.skip_dn_validation && !dn.contains('=') {
                result.entries_rejected += 1;
                continue;
            }
            let existing = stored.iter().position(|entry| {
                distinguished_name(entry).is_some_and(|other| other.eq_ignore_ascii_case(dn))
            });
            match existing {
                Some(index) if config.replace_existing => {
                    if let Some(slot) = stored.get_mut(index) {
                        slot.clone_from(&record);
                    }
                }
                Some(_) => {
                    result.entries_rejected += 1;
                    continue;
                }
                None => stored.push(record),
            }
            result.entries_imported += 1;
        }
        self.store(&stored)?;
        Ok(result)
    }

    fn initialize(&self) -> Result<(), BackendError> {
        if !self.directory.is_dir() {
            return Err(self.storage_error(
                &self.directory,
                io::Error::new(io::ErrorKind::NotFound, "backend directory is missing"),
            ));
        }
        self.set_initialized(true);
        debug!(target: LOADER_TARGET, backend = %self.id, "backend initialized");
        Ok(())
    }
}

/// Splits LDIF text into records, dropping comments and blank separators.
fn records(text: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                records.push(current.join("\n"));
                current.clear();
            }
        } else if !line.starts_with('#') {
            current.push(line);
        }
    }
    if !current.is_empty() {
        records.push(current.join("\n"));
    }
    records
}

fn distinguished_name(record: &str) -> Option<&str> {
    let first = record.lines().next()?;
    let (attribute, value) = first.split_once(':')?;
    attribute
        .eq_ignore_ascii_case("dn")
        .then(|| value.trim())
        .filter(|dn| !dn.is_empty())
}
