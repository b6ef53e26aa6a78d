// siterestore/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::restore::paths::Component;

const DEFAULT_PUBLIC_FILES_PATH: &str = "sites/default/files";

// Structs for deserializing config.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonSiteConfig {
    pub root: Option<PathBuf>,
    pub remote_host: Option<String>,
    pub database_url: Option<String>,
    pub public_files_path: Option<PathBuf>,
    pub table_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JsonRestoreOptions {
    pub code: bool,
    pub files: bool,
    pub db: bool,
    pub code_source_path: Option<PathBuf>,
    pub files_source_path: Option<PathBuf>,
    pub files_destination_relative_path: Option<PathBuf>,
    pub db_source_path: Option<PathBuf>,
    pub destination_path: Option<PathBuf>,
    pub overwrite: bool,
    pub assume_yes: bool,
    pub verbose: bool,
    pub temp_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JsonDatabaseOptions {
    pub skip_tables: Vec<String>,
    pub only_tables: Vec<String>,
    pub reset_sequences: bool,
    pub psql_extra_args: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub archive_path: Option<PathBuf>,
    pub site: Option<String>,
    #[serde(default)]
    pub sites: HashMap<String, JsonSiteConfig>,
    pub restore: Option<JsonRestoreOptions>,
    pub database: Option<JsonDatabaseOptions>,
}

/// Values supplied outside config.json: positional arguments and environment.
#[derive(Debug, Clone, Default)]
pub struct RestoreOverrides {
    pub archive_path: Option<PathBuf>,
    pub site: Option<String>,
    pub database_url: Option<String>,
    pub assume_yes: bool,
}

// Application's internal configuration structs

/// Which components the operator asked for, before defaulting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComponentSelection {
    pub code: bool,
    pub files: bool,
    pub db: bool,
}

impl ComponentSelection {
    /// Components to restore, in the fixed order code, files, database.
    /// No explicit selection means everything.
    pub fn enabled(&self) -> Vec<Component> {
        if !self.code && !self.files && !self.db {
            return Component::ALL.to_vec();
        }
        Component::ALL
            .into_iter()
            .filter(|component| match component {
                Component::Code => self.code,
                Component::Files => self.files,
                Component::Database => self.db,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RestoreRequest {
    pub input_path: Option<PathBuf>,
    pub site: Option<String>,
    pub selection: ComponentSelection,
    pub code_source_path: Option<PathBuf>,
    pub files_source_path: Option<PathBuf>,
    pub db_source_path: Option<PathBuf>,
    pub files_destination_relative_path: Option<PathBuf>,
    pub destination_path: Option<PathBuf>,
    pub overwrite: bool,
    pub verbose: bool,
    pub temp_root: Option<PathBuf>,
}

impl RestoreRequest {
    pub fn enabled_components(&self) -> Vec<Component> {
        self.selection.enabled()
    }

    pub fn source_override(&self, component: Component) -> Option<&Path> {
        match component {
            Component::Code => self.code_source_path.as_deref(),
            Component::Files => self.files_source_path.as_deref(),
            Component::Database => self.db_source_path.as_deref(),
        }
    }
}

/// The site being restored into.
#[derive(Debug, Clone)]
pub struct SiteTarget {
    pub alias: String,
    pub root: Option<PathBuf>,
    pub remote_host: Option<String>,
    pub database_url: Option<String>,
    pub public_files_path: PathBuf,
    pub table_prefix: String,
}

impl SiteTarget {
    /// Target used when no site alias was given. It has no root, so the
    /// destination has to be passed explicitly.
    pub fn anonymous(database_url: Option<String>) -> Self {
        SiteTarget {
            alias: "@none".to_string(),
            root: None,
            remote_host: None,
            database_url,
            public_files_path: PathBuf::from(DEFAULT_PUBLIC_FILES_PATH),
            table_prefix: String::new(),
        }
    }

    pub fn is_remote(&self) -> bool {
        self.remote_host.as_ref().is_some_and(|host| !host.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DatabaseOptions {
    pub skip_tables: Vec<String>,
    pub only_tables: Vec<String>,
    pub reset_sequences: bool,
    pub psql_extra_args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RestoreConfig {
    pub request: RestoreRequest,
    pub site: SiteTarget,
    pub database: DatabaseOptions,
    pub assume_yes: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub config_path: PathBuf,
    pub raw_json_config: RawJsonConfig,
}

impl AppConfig {
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        let raw_json_config: RawJsonConfig = serde_json::from_str(&config_content)
            .with_context(|| {
                format!(
                    "Failed to parse JSON from config file at {}",
                    config_path.display()
                )
            })?;

        Ok(AppConfig {
            config_path: config_path.to_path_buf(),
            raw_json_config,
        })
    }
}

pub fn load_restore_config_from_json(
    raw_config: &RawJsonConfig,
    overrides: &RestoreOverrides,
) -> Result<RestoreConfig> {
    let opts = raw_config.restore.clone().unwrap_or_default();

    let input_path = overrides
        .archive_path
        .clone()
        .or_else(|| raw_config.archive_path.clone())
        .filter(|path| !path.as_os_str().is_empty());

    if let Some(relative) = &opts.files_destination_relative_path {
        if relative.is_absolute() {
            return Err(anyhow::anyhow!(
                "files_destination_relative_path must be relative, got {}",
                relative.display()
            ));
        }
    }

    let site_alias = overrides
        .site
        .clone()
        .or_else(|| raw_config.site.clone())
        .filter(|alias| !alias.trim().is_empty());
    let site = resolve_site_target(raw_config, site_alias.as_deref(), overrides.database_url.clone())?;

    let db_opts = raw_config.database.clone().unwrap_or_default();

    Ok(RestoreConfig {
        request: RestoreRequest {
            input_path,
            site: site_alias,
            selection: ComponentSelection {
                code: opts.code,
                files: opts.files,
                db: opts.db,
            },
            code_source_path: opts.code_source_path,
            files_source_path: opts.files_source_path,
            db_source_path: opts.db_source_path,
            files_destination_relative_path: opts.files_destination_relative_path,
            destination_path: opts.destination_path,
            overwrite: opts.overwrite,
            verbose: opts.verbose,
            temp_root: opts.temp_root,
        },
        site,
        database: DatabaseOptions {
            skip_tables: db_opts.skip_tables,
            only_tables: db_opts.only_tables,
            reset_sequences: db_opts.reset_sequences,
            psql_extra_args: db_opts.psql_extra_args,
        },
        assume_yes: opts.assume_yes || overrides.assume_yes,
    })
}

/// Looks up a site alias in the `sites` table. A database URL from the
/// environment replaces whatever the site declares.
fn resolve_site_target(
    raw_config: &RawJsonConfig,
    alias: Option<&str>,
    database_url_override: Option<String>,
) -> Result<SiteTarget> {
    let Some(alias) = alias else {
        return Ok(SiteTarget::anonymous(database_url_override));
    };

    let site = raw_config.sites.get(alias).with_context(|| {
        let mut known: Vec<&String> = raw_config.sites.keys().collect();
        known.sort();
        format!("Unknown site alias '{}'. Known sites: {:?}", alias, known)
    })?;

    Ok(SiteTarget {
        alias: alias.to_string(),
        root: site.root.clone(),
        remote_host: site.remote_host.clone(),
        database_url: database_url_override.or_else(|| site.database_url.clone()),
        public_files_path: site
            .public_files_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PUBLIC_FILES_PATH)),
        table_prefix: site.table_prefix.clone().unwrap_or_default(),
    })
}

/// Interprets the usual truthy spellings of an environment flag.
pub fn env_flag_is_set(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "y" | "on")
    )
}
