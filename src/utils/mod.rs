pub mod sequence_reset;

use std::path::PathBuf;
use url::Url;
use which::which;

use crate::errors::{RestoreError, Result};

/// Finds an external tool in the system PATH.
pub fn find_executable(tool: &str) -> Result<PathBuf> {
    which(tool).map_err(|e| RestoreError::ToolNotFound {
        tool: tool.to_string(),
        detail: e.to_string(),
    })
}

/// Connection URL safe for logs: the password is replaced with `***`.
pub fn redact_url(db_url: &str) -> String {
    match Url::parse(db_url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => "<unparseable database url>".to_string(),
    }
}
