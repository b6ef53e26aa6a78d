// siterestore/src/restore/cleanup.rs
use chrono::Local;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::{Builder as TempFileBuilder, TempDir};
use tracing::{debug, warn};

use crate::errors::Result;

/// Owns whatever a restore run extracted.
///
/// With a `temp_root` that is a scratch directory created up front. Without
/// one, the archive unpacks next to itself and the guard adopts that
/// directory once extraction succeeds. Dropping the guard removes both.
/// Failures are logged, never returned: by then the caller already has the
/// outcome of the restore itself.
#[derive(Debug, Default)]
pub struct ExtractionGuard {
    scratch: Option<TempDir>,
    extracted: Option<PathBuf>,
}

impl ExtractionGuard {
    /// Creates a fresh scratch directory under `temp_root`. Without a
    /// `temp_root` no directory is created yet.
    pub fn create(temp_root: Option<&Path>) -> Result<Self> {
        let Some(root) = temp_root else {
            return Ok(ExtractionGuard::default());
        };

        let prefix = format!("site-restore-{}-", Local::now().format("%Y-%m-%d_%H_%M_%S"));
        std::fs::create_dir_all(root)?;
        let scratch = TempFileBuilder::new().prefix(&prefix).tempdir_in(root)?;
        debug!("Scratch directory for extraction: {}", scratch.path().display());
        Ok(ExtractionGuard {
            scratch: Some(scratch),
            extracted: None,
        })
    }

    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch.as_ref().map(TempDir::path)
    }

    /// Takes ownership of a directory this run extracted outside the scratch
    /// directory.
    pub fn adopt(&mut self, extracted: PathBuf) {
        debug!("Extraction directory {} will be removed on exit", extracted.display());
        self.extracted = Some(extracted);
    }

    /// Removes everything the guard owns. Safe to call more than once.
    pub fn cleanup(&mut self) {
        if let Some(extracted) = self.extracted.take() {
            match std::fs::remove_dir_all(&extracted) {
                Ok(()) => debug!("Removed extraction directory {}", extracted.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(
                    "Failed to remove extraction directory {}: {}",
                    extracted.display(),
                    e
                ),
            }
        }

        if let Some(scratch) = self.scratch.take() {
            let path = scratch.path().to_path_buf();
            match scratch.close() {
                Ok(()) => debug!("Removed scratch directory {}", path.display()),
                Err(e) => warn!("Failed to remove scratch directory {}: {}", path.display(), e),
            }
        }
    }
}

impl Drop for ExtractionGuard {
    fn drop(&mut self) {
        self.cleanup();
    }
}
