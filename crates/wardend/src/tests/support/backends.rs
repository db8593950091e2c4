//! Test double for [`BackendRegistry`] recording every backend call.

use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::loader::{Backend, BackendError, BackendRegistry, ImportConfig, ImportResult};
use crate::provision::InstallLayout;

/// Step of a bulk load a backend can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStep {
    Finalize,
    Import,
    Initialize,
}

/// Backend calls observed during a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    Finalize(String),
    Import {
        id: String,
        contents: String,
        lock_held: bool,
    },
    Initialize(String),
}

#[derive(Debug, Default)]
struct BackendsState {
    known: Vec<String>,
    failures: Vec<(String, BackendStep)>,
    events: Vec<BackendEvent>,
}

/// Registry serving recording backends for a fixed set of identifiers.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackends {
    state: Arc<Mutex<BackendsState>>,
}

impl RecordingBackends {
    /// Registry knowing backend `id`.
    pub fn with_backend(id: &str) -> Self {
        let backends = Self::default();
        backends.state().known.push(id.to_owned());
        backends
    }

    /// Makes `step` of backend `id` fail from now on.
    pub fn fail(&self, id: &str, step: BackendStep) {
        self.state().failures.push((id.to_owned(), step));
    }

    /// Recorded backend calls.
    pub fn events(&self) -> Vec<BackendEvent> {
        self.state().events.clone()
    }

    /// Contents of every import, in call order.
    pub fn imported_contents(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                BackendEvent::Import { contents, .. } => Some(contents),
                _ => None,
            })
            .collect()
    }

    fn state(&self) -> MutexGuard<'_, BackendsState> {
        self.state.lock().expect("backend recorder mutex poisoned")
    }
}

impl BackendRegistry for RecordingBackends {
    fn backend(&self, layout: &InstallLayout, id: &str) -> Option<Arc<dyn Backend>> {
        if !self.state().known.iter().any(|known| known == id) {
            return None;
        }
        Some(Arc::new(RecordingBackend {
            id: id.to_owned(),
            lock_path: layout.backend_lock(id),
            state: Arc::clone(&self.state),
        }))
    }
}

#[derive(Debug)]
struct RecordingBackend {
    id: String,
    lock_path: PathBuf,
    state: Arc<Mutex<BackendsState>>,
}

impl RecordingBackend {
    fn step(&self, step: BackendStep, event: BackendEvent) -> Result<(), BackendError> {
        let mut state = self.state.lock().expect("backend recorder mutex poisoned");
        state.events.push(event);
        let fails = state
            .failures
            .iter()
            .any(|(id, failing)| *id == self.id && *failing == step);
        if fails {
            return Err(BackendError::Failed {
                id: self.id.clone(),
                message: format!("{step:?} failed"),
            });
        }
        Ok(())
    }
}

impl Backend for RecordingBackend {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn finalize(&self) -> Result<(), BackendError> {
        self.step(BackendStep::Finalize, BackendEvent::Finalize(self.id.clone()))
    }

    fn import(
        &self,
        source: &mut dyn Read,
        _config: &ImportConfig,
    ) -> Result<ImportResult, BackendError> {
        let mut contents = String::new();
        source
            .read_to_string(&mut contents)
            .expect("import source readable");
        let records = contents
            .split("\n\n")
            .filter(|record| !record.trim().is_empty())
            .count() as u64;
        self.step(
            BackendStep::Import,
            BackendEvent::Import {
                id: self.id.clone(),
                contents,
                lock_held: self.lock_path.exists(),
            },
        )?;
        Ok(ImportResult {
            entries_read: records,
            entries_imported: records,
            entries_rejected: 0,
        })
    }

    fn initialize(&self) -> Result<(), BackendError> {
        self.step(
            BackendStep::Initialize,
            BackendEvent::Initialize(self.id.clone()),
        )
    }
}
