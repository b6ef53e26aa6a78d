// siterestore/src/restore/file_sync.rs
use std::path::{Path, MAIN_SEPARATOR};
use std::process::Command;
use tracing::{debug, info};

use crate::errors::{RestoreError, Result};
use crate::restore::confirm::{require_confirmation, Confirmer};
use crate::utils::find_executable;

/// Result of one directory copy.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub success: bool,
    pub status: String,
    pub stderr: String,
}

/// Recursive, attribute-preserving directory copy.
///
/// Both arguments already end in a path separator, so the *contents* of
/// `source` land directly in `destination`.
pub trait SyncBackend {
    fn copy_tree(&self, source: &str, destination: &str, verbose: bool) -> Result<SyncOutcome>;
}

/// `rsync -az`: archive mode, compressed, never deletes at the destination.
#[derive(Debug, Default)]
pub struct RsyncCommand;

impl SyncBackend for RsyncCommand {
    fn copy_tree(&self, source: &str, destination: &str, verbose: bool) -> Result<SyncOutcome> {
        let rsync_path = find_executable("rsync")?;

        let mut command = Command::new(rsync_path);
        command.arg("-az");
        if verbose {
            command.arg("-v");
        }
        command.arg(source).arg(destination);
        debug!("Running {:?}", command);

        let output = command.output()?;
        if verbose {
            for line in String::from_utf8_lossy(&output.stdout).lines() {
                info!("rsync: {}", line);
            }
        }

        Ok(SyncOutcome {
            success: output.status.success(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Renders a directory path with exactly one trailing separator.
pub fn with_trailing_separator(path: &Path) -> String {
    let rendered = path.to_string_lossy();
    let trimmed = rendered.trim_end_matches(MAIN_SEPARATOR);
    if trimmed.is_empty() {
        // The filesystem root.
        return MAIN_SEPARATOR.to_string();
    }
    format!("{}{}", trimmed, MAIN_SEPARATOR)
}

/// Copies the contents of `source` into `destination` after confirmation.
pub fn sync_directories(
    backend: &dyn SyncBackend,
    confirmer: &dyn Confirmer,
    source: &Path,
    destination: &Path,
    verbose: bool,
) -> Result<()> {
    if !source.is_dir() {
        return Err(RestoreError::SourceNotFound(source.to_path_buf()));
    }
    if !destination.is_dir() {
        return Err(RestoreError::DestinationNotFound(destination.to_path_buf()));
    }

    let from = with_trailing_separator(source);
    let to = with_trailing_separator(destination);

    require_confirmation(
        confirmer,
        &format!("Copy all files from {} to {}? Existing files will be overwritten.", from, to),
    )?;

    info!("Copying {} to {}", from, to);
    let outcome = backend.copy_tree(&from, &to, verbose)?;
    if !outcome.success {
        return Err(RestoreError::SyncFailed {
            from,
            to,
            status: outcome.status,
            stderr: outcome.stderr,
        });
    }

    info!("✓ Copied {} to {}", from, to);
    Ok(())
}
