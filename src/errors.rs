use std::path::PathBuf;
use thiserror::Error;

use crate::restore::paths::Component;

#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Site '{0}' is remote. Restoring into a remote site is not supported; run the restore on that host.")]
    UnsupportedRemoteTarget(String),

    #[error("Archive file name must end in .tar.gz: {}", .0.display())]
    InvalidArchiveName(PathBuf),

    #[error("Not a .tar.gz archive file: {}", .0.display())]
    InvalidArchiveFormat(PathBuf),

    #[error("Archive not found: {}", .0.display())]
    ArchiveNotFound(PathBuf),

    #[error("Extraction directory already exists: {} (enable overwrite to replace it)", .0.display())]
    ExtractTargetExists(PathBuf),

    #[error("Failed to unpack archive {}: {cause}", .archive.display())]
    Unpack {
        archive: PathBuf,
        cause: std::io::Error,
    },

    #[error("Cannot read restore input {}: {cause}", .path.display())]
    InputUnreadable {
        path: PathBuf,
        cause: std::io::Error,
    },

    #[error("No source for {component}: pass an archive or directory, or set {component}_source_path")]
    MissingSource { component: Component },

    #[error("Failed to create destination directory {}: {cause}", .path.display())]
    DestinationCreateFailed {
        path: PathBuf,
        cause: std::io::Error,
    },

    #[error("Cannot guess the files destination under explicit destination {}; set files_destination_relative_path", .0.display())]
    AmbiguousFilesDestination(PathBuf),

    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Destination directory not found: {}", .0.display())]
    DestinationNotFound(PathBuf),

    #[error("Sync from {from} to {to} failed ({status}): {stderr}")]
    SyncFailed {
        from: String,
        to: String,
        status: String,
        stderr: String,
    },

    #[error("Database dump not found: {}", .0.display())]
    DumpNotFound(PathBuf),

    #[error("Failed to drop tables in database '{database}': {detail}")]
    DropFailed { database: String, detail: String },

    #[error("Failed to import {} into database '{database}': {detail}", .dump.display())]
    ImportFailed {
        database: String,
        dump: PathBuf,
        detail: String,
    },

    #[error("Aborted by operator: {0}")]
    UserAborted(String),

    #[error("Required tool '{tool}' not found in PATH: {detail}")]
    ToolNotFound { tool: String, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl RestoreError {
    /// True when the operator declined a confirmation prompt.
    pub fn is_user_abort(&self) -> bool {
        matches!(self, RestoreError::UserAborted(_))
    }
}

pub type Result<T> = std::result::Result<T, RestoreError>;
