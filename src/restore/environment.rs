// siterestore/src/restore/environment.rs
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::config::SiteTarget;
use crate::errors::{RestoreError, Result};

/// How far a site has to be brought up before a question about it can be
/// answered. Each level includes the ones below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootstrapLevel {
    /// The site root is known and exists.
    Root,
    /// Database credentials can be resolved. Needs the root only when the
    /// site has one.
    Configuration,
    /// Everything, including the public files location.
    Full,
}

/// The site being restored into, as far as the restore needs to know it.
pub trait SiteEnvironment {
    fn bootstrap_to(&self, level: BootstrapLevel) -> Result<()>;
    fn resolve_code_root(&self) -> Result<PathBuf>;
    fn resolve_public_files_real_path(&self) -> Result<PathBuf>;
}

/// Site environment backed by a configured local site.
pub struct LocalSiteEnvironment {
    site: SiteTarget,
}

impl LocalSiteEnvironment {
    pub fn new(site: SiteTarget) -> Self {
        LocalSiteEnvironment { site }
    }

    fn root(&self) -> Result<PathBuf> {
        self.site.root.clone().ok_or_else(|| {
            RestoreError::Config(format!(
                "site '{}' has no root configured; set destination_path or a site root",
                self.site.alias
            ))
        })
    }
}

impl SiteEnvironment for LocalSiteEnvironment {
    fn bootstrap_to(&self, level: BootstrapLevel) -> Result<()> {
        debug!("Bootstrapping site '{}' to {:?}", self.site.alias, level);

        // A database URL given directly is enough to reach credentials,
        // even for a site without a root.
        if level != BootstrapLevel::Configuration || self.site.root.is_some() {
            let root = self.root()?;
            if !root.is_dir() {
                return Err(RestoreError::Config(format!(
                    "site root for '{}' is not a directory: {}",
                    self.site.alias,
                    root.display()
                )));
            }
        }

        if level >= BootstrapLevel::Configuration && self.site.database_url.is_none() {
            return Err(RestoreError::Config(format!(
                "site '{}' has no database_url; set it in config.json or TARGET_DATABASE_URL",
                self.site.alias
            )));
        }
        Ok(())
    }

    fn resolve_code_root(&self) -> Result<PathBuf> {
        self.root()
    }

    fn resolve_public_files_real_path(&self) -> Result<PathBuf> {
        let files_path = self.root()?.join(&self.site.public_files_path);
        if !files_path.is_dir() {
            fs::create_dir_all(&files_path).map_err(|cause| RestoreError::DestinationCreateFailed {
                path: files_path.clone(),
                cause,
            })?;
        }
        Ok(fs::canonicalize(&files_path)?)
    }
}
