//! Lookup of bundled default assets across one or more resource sources.
//!
//! Resource paths are relative, `/`-separated and never escape the root of
//! the source that holds them. A resolver searches its sources in
//! registration order, so assets shipped in a fragment directory extend the
//! primary bundle without replacing it.

mod directory;

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use globset::{Glob, GlobMatcher};
use thiserror::Error;
use tracing::debug;
use warden_config::Config;

pub use self::directory::DirectorySource;

pub(crate) const RESOURCES_TARGET: &str = "wardend::resources";

/// A place default assets can be read from.
pub trait ResourceSource: Send + Sync + fmt::Debug {
    /// Name used in resource identifiers and log events.
    fn name(&self) -> &str;

    /// Lists resources under `path` whose file name matches `matcher`.
    ///
    /// A missing directory yields an empty list. Results are ordered by
    /// resource path.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while listing an existing directory.
    fn find(&self, path: &str, matcher: &GlobMatcher, recursive: bool) -> io::Result<Vec<String>>;

    /// Returns `true` when `path` names a readable resource in this source.
    fn contains(&self, path: &str) -> bool;

    /// Opens the resource at `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotFound`] when the source does not hold the
    /// resource, or the error raised while opening it.
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send>>;
}

/// Errors raised while resolving resources.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The search pattern was not a valid glob.
    #[error("invalid resource pattern '{pattern}': {source}")]
    InvalidPattern {
        /// Pattern as supplied.
        pattern: String,
        /// Underlying glob error.
        #[source]
        source: globset::Error,
    },
    /// Listing a source failed.
    #[error("failed to search '{path}' in resource source '{source_name}': {source}")]
    Search {
        /// Source being listed.
        source_name: String,
        /// Directory being listed.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// No source holds the requested resource.
    #[error("resource '{path}' not found")]
    NotFound {
        /// Requested resource path.
        path: String,
    },
    /// Opening a resource failed.
    #[error("failed to open resource '{path}': {source}")]
    Open {
        /// Requested resource path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// A resource found by [`ResourceResolver::resolve`].
#[derive(Debug, Clone)]
pub struct Resource {
    source: Arc<dyn ResourceSource>,
    path: String,
}

impl Resource {
    /// Resource path relative to its source root.
    #[must_use]
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    /// Final path component.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(self.path.as_str())
    }

    /// Source-qualified identifier, stable across calls.
    #[must_use]
    pub fn identifier(&self) -> String {
        format!("{}:{}", self.source.name(), self.path)
    }

    /// Opens the resource; the stream closes when dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Open`] when the source cannot open it.
    pub fn open(&self) -> Result<Box<dyn Read + Send>, ResourceError> {
        self.source
            .open(&self.path)
            .map_err(|source| ResourceError::Open {
                path: self.identifier(),
                source,
            })
    }
}

/// Resolves resource paths and globs across every registered source.
#[derive(Debug, Clone, Default)]
pub struct ResourceResolver {
    sources: Vec<Arc<dyn ResourceSource>>,
}

impl ResourceResolver {
    /// Builds a resolver without sources.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a resolver over the configured resource and fragment directories.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mut resolver = Self::new().with_source(DirectorySource::new(
            "resources",
            config.resource_dir.as_std_path(),
        ));
        if let Some(fragments) = &config.fragment_dir {
            resolver.push(DirectorySource::new("fragments", fragments.as_std_path()));
        }
        resolver
    }

    /// Appends `source` and returns the resolver.
    #[must_use]
    pub fn with_source(mut self, source: impl ResourceSource + 'static) -> Self {
        self.push(source);
        self
    }

    /// Appends `source` after the existing sources.
    pub fn push(&mut self, source: impl ResourceSource + 'static) {
        self.sources.push(Arc::new(source));
    }

    /// Finds every resource under `path` whose file name matches `pattern`.
    ///
    /// Nothing matching yields an empty vector.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidPattern`] for a malformed glob and
    /// [`ResourceError::Search`] when listing a source fails.
    pub fn resolve(
        &self,
        path: &str,
        pattern: &str,
        recursive: bool,
    ) -> Result<Vec<Resource>, ResourceError> {
        let matcher = Glob::new(pattern)
            .map_err(|source| ResourceError::InvalidPattern {
                pattern: pattern.to_owned(),
                source,
            })?
            .compile_matcher();
        let mut resources = Vec::new();
        for source in &self.sources {
            let found = source.find(path, &matcher, recursive).map_err(|error| {
                ResourceError::Search {
                    source_name: source.name().to_owned(),
                    path: path.to_owned(),
                    source: error,
                }
            })?;
            debug!(
                target: RESOURCES_TARGET,
                source = source.name(),
                path,
                pattern,
                matches = found.len(),
                "searched resource source"
            );
            resources.extend(found.into_iter().map(|found_path| Resource {
                source: Arc::clone(source),
                path: found_path,
            }));
        }
        Ok(resources)
    }

    /// Returns the first source's resource at exactly `path`.
    #[must_use]
    pub fn locate(&self, path: &str) -> Option<Resource> {
        self.sources
            .iter()
            .find(|source| source.contains(path))
            .map(|source| Resource {
                source: Arc::clone(source),
                path: normalise(path),
            })
    }

    /// Opens the resource at exactly `path` from the first source holding it.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when no source holds it and
    /// [`ResourceError::Open`] when opening fails.
    pub fn open(&self, path: &str) -> Result<Box<dyn Read + Send>, ResourceError> {
        self.locate(path)
            .ok_or_else(|| ResourceError::NotFound {
                path: path.to_owned(),
            })?
            .open()
    }
}

/// Strips leading and trailing separators from a resource path.
pub(crate) fn normalise(path: &str) -> String {
    path.trim_matches('/').to_owned()
}
