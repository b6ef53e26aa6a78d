// siterestore/src/restore/paths.rs
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::{RestoreError, Result};
use crate::restore::environment::{BootstrapLevel, SiteEnvironment};

pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// One of the restorable parts of a site archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Code,
    Files,
    Database,
}

impl Component {
    /// Restore order. Code lands first so later steps can inspect it.
    pub const ALL: [Component; 3] = [Component::Code, Component::Files, Component::Database];

    /// Location of this component inside an extracted archive.
    pub fn archive_relative_path(self) -> &'static str {
        match self {
            Component::Code => "code",
            Component::Files => "files",
            Component::Database => "database/database.sql",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Component::Code => "code",
            Component::Files => "files",
            Component::Database => "db",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn has_archive_suffix(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.len() > ARCHIVE_SUFFIX.len() && name.ends_with(ARCHIVE_SUFFIX))
}

/// Directory an archive unpacks into: the archive's own directory, named
/// after the file with `.tar.gz` stripped.
pub fn resolve_extract_dir(archive_path: &Path) -> Result<PathBuf> {
    let parent = archive_path.parent().unwrap_or_else(|| Path::new(""));
    resolve_extract_dir_in(archive_path, parent)
}

/// Same as [`resolve_extract_dir`] but rooted under `parent`.
pub fn resolve_extract_dir_in(archive_path: &Path, parent: &Path) -> Result<PathBuf> {
    if !has_archive_suffix(archive_path) {
        return Err(RestoreError::InvalidArchiveName(archive_path.to_path_buf()));
    }
    let file_name = archive_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| RestoreError::InvalidArchiveName(archive_path.to_path_buf()))?;
    let stem = &file_name[..file_name.len() - ARCHIVE_SUFFIX.len()];
    Ok(parent.join(stem))
}

/// An explicit override always wins over the archive layout.
pub fn resolve_component_source(
    component: Component,
    explicit_override: Option<&Path>,
    extract_dir: Option<&Path>,
) -> Result<PathBuf> {
    match (explicit_override, extract_dir) {
        (Some(path), _) => Ok(path.to_path_buf()),
        (None, Some(dir)) => Ok(dir.join(component.archive_relative_path())),
        (None, None) => Err(RestoreError::MissingSource { component }),
    }
}

/// Destination state built up while a restore runs.
#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub extracted_path: Option<PathBuf>,
    destination_path: Option<PathBuf>,
    autodetect_destination: bool,
}

impl Default for ResolvedPaths {
    fn default() -> Self {
        ResolvedPaths {
            extracted_path: None,
            destination_path: None,
            autodetect_destination: true,
        }
    }
}

impl ResolvedPaths {
    pub fn autodetect_destination(&self) -> bool {
        self.autodetect_destination
    }

    pub fn destination_path(&self) -> Option<&Path> {
        self.destination_path.as_deref()
    }

    /// Resolves the site code root once and caches it. An explicit path is
    /// used as given and created when missing; otherwise the site's code
    /// root is asked for.
    pub fn resolve_destination(
        &mut self,
        explicit_override: Option<&Path>,
        environment: &dyn SiteEnvironment,
    ) -> Result<PathBuf> {
        if let Some(cached) = &self.destination_path {
            return Ok(cached.clone());
        }

        let destination = match explicit_override {
            Some(path) => {
                if !path.is_dir() {
                    debug!("Creating destination directory {}", path.display());
                    fs::create_dir_all(path).map_err(|cause| RestoreError::DestinationCreateFailed {
                        path: path.to_path_buf(),
                        cause,
                    })?;
                }
                self.autodetect_destination = false;
                path.to_path_buf()
            }
            None => {
                environment.bootstrap_to(BootstrapLevel::Root)?;
                environment.resolve_code_root()?
            }
        };

        debug!("Destination resolved to {}", destination.display());
        self.destination_path = Some(destination.clone());
        Ok(destination)
    }

    /// Where the public files tree goes. A relative override is joined to
    /// the destination and created if needed. Without one, the path is
    /// autodetected from the site, which is only safe when the destination
    /// itself was autodetected.
    pub fn resolve_files_destination(
        &mut self,
        relative_override: Option<&Path>,
        environment: &dyn SiteEnvironment,
    ) -> Result<PathBuf> {
        match relative_override {
            Some(relative) => {
                let destination = self.resolve_destination(None, environment)?;
                let files_destination = destination.join(relative);
                if !files_destination.is_dir() {
                    fs::create_dir_all(&files_destination).map_err(|cause| {
                        RestoreError::DestinationCreateFailed {
                            path: files_destination.clone(),
                            cause,
                        }
                    })?;
                }
                Ok(files_destination)
            }
            None if self.autodetect_destination => {
                environment.bootstrap_to(BootstrapLevel::Full)?;
                environment.resolve_public_files_real_path()
            }
            None => Err(RestoreError::AmbiguousFilesDestination(
                self.destination_path.clone().unwrap_or_default(),
            )),
        }
    }
}
