//! First-run provisioning of a server install root.
//!
//! Provisioning lays out the directory skeleton, renders the main
//! configuration from its template and copies the remaining default assets
//! out of the resource bundle. Every file is written through a temporary
//! file that is renamed into place, so an interrupted run never leaves a
//! truncated file behind. Directories already created are not rolled back.

mod copy;
mod files;
mod layout;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::connectors::ConnectorRegistry;
use crate::keystore::KeystoreBindings;
use crate::resources::{ResourceError, ResourceResolver};
use crate::template;

pub use self::copy::{CopySpec, CopyTarget};
pub use self::layout::{InstallLayout, UPGRADE_SCHEMA_VERSION};

pub(crate) const PROVISION_TARGET: &str = "wardend::provision";

/// Bundle path of the main configuration template.
pub const CONFIG_TEMPLATE: &str = "config/config.ldif";
/// Bundle path of the administration backend definition.
pub const ADMIN_BACKEND_RESOURCE: &str = "config/admin-backend.ldif";
/// Bundle path of the build information file.
pub const BUILDINFO_RESOURCE: &str = "config/buildinfo";
/// Bundle directory holding schema files.
pub const SCHEMA_RESOURCE_DIR: &str = "config/schema";
/// Bundle directory holding the upgrade schema.
pub const UPGRADE_RESOURCE_DIR: &str = "config/upgrade";

/// Errors raised while reading a configuration template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// No resource source holds the template.
    #[error("configuration template '{resource}' is missing: {source}")]
    Missing {
        /// Template resource path.
        resource: String,
        /// Underlying resolver error.
        #[source]
        source: ResourceError,
    },
    /// The template could not be read as UTF-8 text.
    #[error("failed to read configuration template '{resource}': {source}")]
    Read {
        /// Template resource path.
        resource: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Errors raised while provisioning an install root.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// A directory could not be created.
    #[error("failed to create directory '{path}': {source}")]
    CreateDirectory {
        /// Directory being created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Rendering the configuration template failed.
    #[error("failed to render '{path}': {source}")]
    Template {
        /// Destination of the rendered configuration.
        path: PathBuf,
        /// Underlying template error.
        #[source]
        source: TemplateError,
    },
    /// An exact copy named a resource no source holds.
    #[error("default resource '{resource}' is missing")]
    MissingResource {
        /// Requested resource path.
        resource: String,
    },
    /// Resolving or opening a resource failed.
    #[error("failed to read default resources: {source}")]
    Resource {
        /// Underlying resolver error.
        #[source]
        source: ResourceError,
    },
    /// Writing a provisioned file failed.
    #[error("failed to write '{path}': {source}")]
    Write {
        /// Destination file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl From<ResourceError> for ProvisioningError {
    fn from(source: ResourceError) -> Self {
        Self::Resource { source }
    }
}

/// Copies and renders default assets into an install root.
#[derive(Debug, Clone)]
pub struct FileProvisioner {
    resources: ResourceResolver,
}

impl FileProvisioner {
    /// Builds a provisioner reading from `resources`.
    #[must_use]
    pub const fn new(resources: ResourceResolver) -> Self {
        Self { resources }
    }

    /// Resolver the provisioner reads from.
    #[must_use]
    pub const fn resources(&self) -> &ResourceResolver {
        &self.resources
    }

    /// Creates every directory of `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::CreateDirectory`] on the first failure.
    pub fn create_directory_tree(&self, layout: &InstallLayout) -> Result<(), ProvisioningError> {
        for directory in layout.directories() {
            create_directory(&directory)?;
        }
        debug!(
            target: PROVISION_TARGET,
            root = %layout.root().display(),
            "created install directory tree"
        );
        Ok(())
    }

    /// Renders the template resource at `resource` into `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::Template`] when the template is missing or
    /// unreadable and [`ProvisioningError::Write`] when writing fails.
    pub fn copy_templated_config(
        &self,
        resource: &str,
        destination: &Path,
        connectors: &ConnectorRegistry,
        keystores: &KeystoreBindings,
    ) -> Result<(), ProvisioningError> {
        let text = self
            .read_template(resource)
            .map_err(|source| ProvisioningError::Template {
                path: destination.to_path_buf(),
                source,
            })?;
        let rendered = template::render(&text, connectors, keystores);
        files::atomic_write(destination, rendered.as_bytes()).map_err(|source| {
            ProvisioningError::Write {
                path: destination.to_path_buf(),
                source,
            }
        })?;
        info!(
            target: PROVISION_TARGET,
            resource,
            file = %destination.display(),
            "rendered configuration template"
        );
        Ok(())
    }

    /// Performs `spec`, returning the number of files written.
    ///
    /// A glob copy stops at the first failing match.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::MissingResource`] when an exact copy names
    /// an absent resource, and resolver or write errors otherwise.
    pub fn copy(&self, spec: &CopySpec) -> Result<usize, ProvisioningError> {
        match spec {
            CopySpec::Exact { from, to } => {
                let resource =
                    self.resources
                        .locate(from)
                        .ok_or_else(|| ProvisioningError::MissingResource {
                            resource: from.clone(),
                        })?;
                let destination = match to {
                    CopyTarget::File(path) => path.clone(),
                    CopyTarget::Directory(directory) => directory.join(resource.file_name()),
                };
                write_resource(&mut *resource.open()?, &destination)?;
                Ok(1)
            }
            CopySpec::DirectoryGlob {
                from_dir,
                pattern,
                to_dir,
            } => {
                let resources = self.resources.resolve(from_dir, pattern, false)?;
                for resource in &resources {
                    let destination = to_dir.join(resource.file_name());
                    write_resource(&mut *resource.open()?, &destination)?;
                }
                debug!(
                    target: PROVISION_TARGET,
                    from = %from_dir,
                    pattern = %pattern,
                    to = %to_dir.display(),
                    copied = resources.len(),
                    "copied matching resources"
                );
                Ok(resources.len())
            }
        }
    }

    /// Writes the complete first-run asset set into `layout`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProvisioningError`] encountered.
    pub fn provision_defaults(
        &self,
        layout: &InstallLayout,
        connectors: &ConnectorRegistry,
        keystores: &KeystoreBindings,
    ) -> Result<(), ProvisioningError> {
        self.create_directory_tree(layout)?;
        self.copy_templated_config(
            CONFIG_TEMPLATE,
            &layout.config_file(),
            connectors,
            keystores,
        )?;
        let copies = [
            CopySpec::file(ADMIN_BACKEND_RESOURCE, layout.admin_backend_file()),
            CopySpec::file(BUILDINFO_RESOURCE, layout.buildinfo_file()),
            CopySpec::glob(SCHEMA_RESOURCE_DIR, "*.ldif", layout.schema_dir()),
            CopySpec::file(
                format!("{UPGRADE_RESOURCE_DIR}/schema.ldif.{UPGRADE_SCHEMA_VERSION}"),
                layout.upgrade_schema_file(),
            ),
        ];
        for spec in &copies {
            self.copy(spec)?;
        }
        info!(
            target: PROVISION_TARGET,
            root = %layout.root().display(),
            "install root provisioned"
        );
        Ok(())
    }

    fn read_template(&self, resource: &str) -> Result<String, TemplateError> {
        let mut stream = self
            .resources
            .open(resource)
            .map_err(|source| TemplateError::Missing {
                resource: resource.to_owned(),
                source,
            })?;
        let mut text = String::new();
        stream
            .read_to_string(&mut text)
            .map_err(|source| TemplateError::Read {
                resource: resource.to_owned(),
                source,
            })?;
        Ok(text)
    }
}

fn create_directory(path: &Path) -> Result<(), ProvisioningError> {
    fs::create_dir_all(path).map_err(|source| ProvisioningError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })
}

fn write_resource(reader: &mut dyn Read, destination: &Path) -> Result<(), ProvisioningError> {
    if let Some(parent) = destination.parent() {
        create_directory(parent)?;
    }
    files::atomic_copy(reader, destination).map_err(|source| ProvisioningError::Write {
        path: destination.to_path_buf(),
        source,
    })?;
    Ok(())
}
