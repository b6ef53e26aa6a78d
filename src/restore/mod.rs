pub(crate) mod archive;
pub(crate) mod cleanup;
pub(crate) mod confirm;
pub(crate) mod db_restore;
pub(crate) mod environment;
pub(crate) mod file_sync;
mod logic;
pub(crate) mod paths;
pub(crate) mod verification;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::Result;
use tracing::info;

use crate::config::RestoreConfig;
use confirm::{AssumeYes, Confirmer, PromptConfirmer};
use db_restore::PostgresDriver;
use environment::LocalSiteEnvironment;
use file_sync::RsyncCommand;
use logic::Collaborators;

/// Public entry point for the restore process. Wires the real site,
/// database, rsync and prompt implementations into the orchestration.
pub async fn run_restore_flow(restore_config: &RestoreConfig) -> Result<()> {
    let environment = LocalSiteEnvironment::new(restore_config.site.clone());
    let database = PostgresDriver::new(
        restore_config.site.database_url.clone(),
        &restore_config.site.table_prefix,
        restore_config.database.clone(),
    );
    let confirmer: &dyn Confirmer = if restore_config.assume_yes {
        &AssumeYes
    } else {
        &PromptConfirmer
    };

    let deps = Collaborators {
        environment: &environment,
        database: &database,
        sync: &RsyncCommand,
        confirmer,
    };

    let summary = logic::perform_restore_orchestration(restore_config, &deps).await?;
    if let Some(destination) = &summary.destination {
        info!("Site code root: {}", destination.display());
    }
    if let Some(files) = &summary.files_destination {
        info!("Public files: {}", files.display());
    }
    Ok(())
}
