// siterestore/src/restore/confirm.rs
use dialoguer::Confirm;
use std::io::{self, IsTerminal};
use tracing::{info, warn};

use crate::errors::{RestoreError, Result};

/// Asks the operator before anything destructive happens.
pub trait Confirmer {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Interactive yes/no prompt on the terminal. Defaults to "no".
pub struct PromptConfirmer;

impl Confirmer for PromptConfirmer {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        if !io::stdin().is_terminal() {
            warn!("Cannot prompt without a terminal, treating as declined: {}", prompt);
            return Ok(false);
        }
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(prompt_error)
    }
}

fn prompt_error(error: dialoguer::Error) -> RestoreError {
    match error {
        dialoguer::Error::IO(cause) => RestoreError::Io(cause),
    }
}

/// Accepts every prompt. Used for scripted restores.
pub struct AssumeYes;

impl Confirmer for AssumeYes {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        info!("{} [auto-confirmed]", prompt);
        Ok(true)
    }
}

/// Fails with `UserAborted` unless the operator agrees.
pub fn require_confirmation(confirmer: &dyn Confirmer, prompt: &str) -> Result<()> {
    if confirmer.confirm(prompt)? {
        Ok(())
    } else {
        Err(RestoreError::UserAborted(prompt.to_string()))
    }
}
