// siterestore/src/restore/logic.rs
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::RestoreConfig;
use crate::errors::{RestoreError, Result};
use crate::restore::archive::{extract_archive, extract_archive_into};
use crate::restore::cleanup::ExtractionGuard;
use crate::restore::confirm::Confirmer;
use crate::restore::db_restore::{import_database, DatabaseDriver, TableFilter};
use crate::restore::environment::SiteEnvironment;
use crate::restore::file_sync::{sync_directories, SyncBackend};
use crate::restore::paths::{resolve_component_source, Component, ResolvedPaths};

/// The outside world a restore talks to.
pub struct Collaborators<'a> {
    pub environment: &'a dyn SiteEnvironment,
    pub database: &'a dyn DatabaseDriver,
    pub sync: &'a dyn SyncBackend,
    pub confirmer: &'a dyn Confirmer,
}

/// Mutable state threaded through one restore run.
#[derive(Debug, Default)]
pub struct RestoreContext {
    pub paths: ResolvedPaths,
    pub components: Vec<Component>,
    pub sources: HashMap<Component, PathBuf>,
}

impl RestoreContext {
    fn source(&self, component: Component) -> Result<&Path> {
        self.sources
            .get(&component)
            .map(PathBuf::as_path)
            .ok_or(RestoreError::MissingSource { component })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    pub restored: Vec<Component>,
    pub destination: Option<PathBuf>,
    pub files_destination: Option<PathBuf>,
}

/// Runs a full restore: extraction, then code, files and database in that
/// order. The scratch extraction directory is removed however this returns.
pub async fn perform_restore_orchestration(
    config: &RestoreConfig,
    deps: &Collaborators<'_>,
) -> Result<RestoreSummary> {
    let request = &config.request;

    if config.site.is_remote() {
        return Err(RestoreError::UnsupportedRemoteTarget(config.site.alias.clone()));
    }

    let mut guard = ExtractionGuard::create(request.temp_root.as_deref())?;
    let mut ctx = RestoreContext::default();

    if let Some(input) = &request.input_path {
        ctx.paths.extracted_path = Some(open_input(input, &mut guard, request.overwrite)?);
    }

    ctx.components = request.enabled_components();
    info!(
        "Restoring {} into site '{}'",
        ctx.components
            .iter()
            .map(|c| c.name())
            .collect::<Vec<_>>()
            .join(", "),
        config.site.alias
    );

    // Every requested component needs a source before anything is touched.
    for &component in &ctx.components {
        let source = resolve_component_source(
            component,
            request.source_override(component),
            ctx.paths.extracted_path.as_deref(),
        )?;
        let present = match component {
            Component::Code | Component::Files => source.is_dir(),
            Component::Database => source.is_file(),
        };
        if !present {
            warn!("No {} to restore at {}", component, source.display());
            return Err(RestoreError::MissingSource { component });
        }
        ctx.sources.insert(component, source);
    }

    if let Some(destination) = request.destination_path.as_deref() {
        ctx.paths.resolve_destination(Some(destination), deps.environment)?;
    }

    if ctx.components.contains(&Component::Files)
        && request.files_destination_relative_path.is_none()
        && !ctx.paths.autodetect_destination()
    {
        return Err(RestoreError::AmbiguousFilesDestination(
            ctx.paths.destination_path().map(Path::to_path_buf).unwrap_or_default(),
        ));
    }

    let mut summary = RestoreSummary {
        restored: Vec::new(),
        destination: None,
        files_destination: None,
    };

    if ctx.components.contains(&Component::Code) {
        let destination = ctx.paths.resolve_destination(None, deps.environment)?;
        info!("Restoring code to {}", destination.display());
        sync_directories(
            deps.sync,
            deps.confirmer,
            ctx.source(Component::Code)?,
            &destination,
            request.verbose,
        )?;
        summary.restored.push(Component::Code);
    }

    if ctx.components.contains(&Component::Files) {
        let files_destination = ctx.paths.resolve_files_destination(
            request.files_destination_relative_path.as_deref(),
            deps.environment,
        )?;
        info!("Restoring files to {}", files_destination.display());
        sync_directories(
            deps.sync,
            deps.confirmer,
            ctx.source(Component::Files)?,
            &files_destination,
            request.verbose,
        )?;
        summary.files_destination = Some(files_destination);
        summary.restored.push(Component::Files);
    }

    if ctx.components.contains(&Component::Database) {
        let filter = TableFilter::new(&config.site.table_prefix, &config.database)?;
        import_database(
            deps.database,
            deps.environment,
            deps.confirmer,
            ctx.source(Component::Database)?,
            &filter,
        )
        .await?;
        summary.restored.push(Component::Database);
    }

    summary.destination = ctx.paths.destination_path().map(Path::to_path_buf);
    info!("✅ Restore of site '{}' complete", config.site.alias);

    drop(guard);
    Ok(summary)
}

/// A directory is used as it is. An archive is extracted into the scratch
/// directory when there is one, otherwise next to itself; either way the
/// guard ends up owning the result.
fn open_input(input: &Path, guard: &mut ExtractionGuard, overwrite: bool) -> Result<PathBuf> {
    let metadata = fs::metadata(input).map_err(|cause| RestoreError::InputUnreadable {
        path: input.to_path_buf(),
        cause,
    })?;

    if metadata.is_dir() {
        info!("Using already extracted directory {}", input.display());
        return Ok(input.to_path_buf());
    }

    match guard.scratch_path() {
        Some(scratch) => extract_archive_into(input, scratch, overwrite),
        None => {
            let extracted = extract_archive(input, overwrite)?;
            guard.adopt(extracted.clone());
            Ok(extracted)
        }
    }
}
