// siterestore/src/restore/archive.rs
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::{RestoreError, Result};
use crate::restore::paths::{has_archive_suffix, resolve_extract_dir_in};

/// Extracts a `.tar.gz` archive next to itself.
///
/// `/backups/site.tar.gz` unpacks into `/backups/site`.
pub fn extract_archive(archive_path: &Path, overwrite: bool) -> Result<PathBuf> {
    let parent = archive_path.parent().unwrap_or_else(|| Path::new(""));
    extract_archive_into(archive_path, parent, overwrite)
}

/// Extracts a `.tar.gz` archive into a directory named after it under `parent`.
///
/// # Arguments
/// * `archive_path` - Path to the `.tar.gz` archive file.
/// * `parent` - Directory that will hold the extraction directory.
/// * `overwrite` - Replace an existing extraction directory instead of failing.
///
/// # Returns
/// Path to the directory the archive was unpacked into.
pub fn extract_archive_into(archive_path: &Path, parent: &Path, overwrite: bool) -> Result<PathBuf> {
    if !archive_path.exists() {
        return Err(RestoreError::ArchiveNotFound(archive_path.to_path_buf()));
    }
    if !archive_path.is_file() || !has_archive_suffix(archive_path) {
        return Err(RestoreError::InvalidArchiveFormat(archive_path.to_path_buf()));
    }

    let extract_to_dir = resolve_extract_dir_in(archive_path, parent)?;

    if fs::symlink_metadata(&extract_to_dir).is_ok() {
        if !overwrite {
            return Err(RestoreError::ExtractTargetExists(extract_to_dir));
        }
        debug!("Removing existing extraction directory {}", extract_to_dir.display());
        if extract_to_dir.is_dir() {
            fs::remove_dir_all(&extract_to_dir)?;
        } else {
            fs::remove_file(&extract_to_dir)?;
        }
    }

    fs::create_dir_all(&extract_to_dir)?;

    info!(
        "Extracting {} to {}",
        archive_path.display(),
        extract_to_dir.display()
    );

    let archive_file = File::open(archive_path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(archive_file));
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);

    archive
        .unpack(&extract_to_dir)
        .map_err(|cause| RestoreError::Unpack {
            archive: archive_path.to_path_buf(),
            cause,
        })?;

    info!("✓ Archive extracted to {}", extract_to_dir.display());
    Ok(extract_to_dir)
}
