// siterestore/src/restore/db_restore.rs
use async_trait::async_trait;
use regex::Regex;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::path::Path;
use std::process::Command;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::DatabaseOptions;
use crate::errors::{RestoreError, Result};
use crate::restore::confirm::{require_confirmation, Confirmer};
use crate::restore::environment::{BootstrapLevel, SiteEnvironment};
use crate::restore::verification;
use crate::utils::sequence_reset::{quote_ident, reset_all_sequences};
use crate::utils::{find_executable, redact_url};

const DEFAULT_PORT: u16 = 5432;

/// Parsed database connection details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSpec {
    pub url: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database: String,
    pub table_prefix: String,
}

impl ConnectionSpec {
    pub fn parse(db_url: &str, table_prefix: &str) -> Result<Self> {
        let parsed = Url::parse(db_url)
            .map_err(|e| RestoreError::Config(format!("Invalid database URL {}: {}", redact_url(db_url), e)))?;
        let database = parsed.path().trim_start_matches('/').to_string();
        if database.is_empty() {
            return Err(RestoreError::Config(format!(
                "Database name not found in URL path: {}",
                redact_url(db_url)
            )));
        }

        Ok(ConnectionSpec {
            url: db_url.to_string(),
            host: parsed.host_str().unwrap_or("localhost").to_string(),
            port: parsed.port().unwrap_or(DEFAULT_PORT),
            user: parsed.username().to_string(),
            database,
            table_prefix: table_prefix.to_string(),
        })
    }

    pub fn redacted_url(&self) -> String {
        redact_url(&self.url)
    }
}

/// Which existing tables get dropped before the import.
///
/// Patterns match the table name with the site's table prefix removed.
/// With no `only` patterns every prefixed table is a candidate; `skip`
/// patterns always win.
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    prefix: String,
    only: Vec<Regex>,
    skip: Vec<Regex>,
}

impl TableFilter {
    pub fn new(prefix: &str, options: &DatabaseOptions) -> Result<Self> {
        let compile = |patterns: &[String]| -> Result<Vec<Regex>> {
            patterns
                .iter()
                .map(|pattern| {
                    Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
                        RestoreError::Config(format!("Invalid table pattern '{}': {}", pattern, e))
                    })
                })
                .collect()
        };

        Ok(TableFilter {
            prefix: prefix.to_string(),
            only: compile(&options.only_tables)?,
            skip: compile(&options.skip_tables)?,
        })
    }

    pub fn allows(&self, table: &str) -> bool {
        let Some(name) = table.strip_prefix(&self.prefix) else {
            return false;
        };
        if self.skip.iter().any(|re| re.is_match(name)) {
            return false;
        }
        self.only.is_empty() || self.only.iter().any(|re| re.is_match(name))
    }
}

/// The database side of a restore.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    fn connection_spec(&self) -> Result<ConnectionSpec>;

    /// Drops the existing tables the filter selects. Returns how many.
    async fn drop_tables(&self, filter: &TableFilter) -> Result<usize>;

    /// Loads a SQL dump into the (now empty) database.
    async fn import_dump(&self, dump_path: &Path) -> Result<()>;

    /// Runs after a successful import.
    async fn after_import(&self) -> Result<()> {
        Ok(())
    }
}

/// PostgreSQL driver: tables are dropped over `sqlx`, the dump is loaded
/// with `psql`.
pub struct PostgresDriver {
    database_url: Option<String>,
    table_prefix: String,
    options: DatabaseOptions,
}

impl PostgresDriver {
    pub fn new(database_url: Option<String>, table_prefix: &str, options: DatabaseOptions) -> Self {
        PostgresDriver {
            database_url,
            table_prefix: table_prefix.to_string(),
            options,
        }
    }

    async fn connect(&self, spec: &ConnectionSpec) -> Result<Pool<Postgres>> {
        debug!("Connecting to {}", spec.redacted_url());
        Ok(PgPoolOptions::new().max_connections(1).connect(&spec.url).await?)
    }
}

#[async_trait]
impl DatabaseDriver for PostgresDriver {
    fn connection_spec(&self) -> Result<ConnectionSpec> {
        let url = self.database_url.as_deref().ok_or_else(|| {
            RestoreError::Config("No database URL configured for the target site".to_string())
        })?;
        ConnectionSpec::parse(url, &self.table_prefix)
    }

    async fn drop_tables(&self, filter: &TableFilter) -> Result<usize> {
        let spec = self.connection_spec()?;
        let pool = self.connect(&spec).await?;

        let tables = verification::list_public_tables(&pool).await?;
        let mut dropped = 0;
        for table in tables.iter().filter(|table| filter.allows(table)) {
            debug!("Dropping table {}", table);
            sqlx::query(&format!(r#"DROP TABLE IF EXISTS "{}" CASCADE"#, quote_ident(table)))
                .execute(&pool)
                .await?;
            dropped += 1;
        }
        pool.close().await;
        Ok(dropped)
    }

    async fn import_dump(&self, dump_path: &Path) -> Result<()> {
        let spec = self.connection_spec()?;
        let psql_path = find_executable("psql")?;

        let output = Command::new(psql_path)
            .arg("-X") // Do not read psqlrc
            .arg("-q")
            .arg("-v")
            .arg("ON_ERROR_STOP=1")
            .args(&self.options.psql_extra_args)
            .arg("-d")
            .arg(&spec.url)
            .arg("-f")
            .arg(dump_path)
            .output()?;

        if !output.status.success() {
            return Err(RestoreError::ImportFailed {
                database: spec.database,
                dump: dump_path.to_path_buf(),
                detail: format!(
                    "psql exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }

    async fn after_import(&self) -> Result<()> {
        let spec = self.connection_spec()?;
        let pool = self.connect(&spec).await?;
        if self.options.reset_sequences {
            let report = reset_all_sequences(&pool, &spec.database).await?;
            if let Some(summary) = report.failure_summary() {
                warn!("{} in '{}'", summary, spec.database);
            }
        }
        verification::verify_restore(&pool, &spec.database).await?;
        pool.close().await;
        Ok(())
    }
}

/// Replaces the target database with the contents of a SQL dump.
///
/// Tables are dropped before the dump is loaded. If the load then fails the
/// database is left without those tables; there is no rollback.
pub async fn import_database(
    driver: &dyn DatabaseDriver,
    environment: &dyn SiteEnvironment,
    confirmer: &dyn Confirmer,
    dump_path: &Path,
    filter: &TableFilter,
) -> Result<()> {
    if !dump_path.is_file() {
        return Err(RestoreError::DumpNotFound(dump_path.to_path_buf()));
    }

    environment.bootstrap_to(BootstrapLevel::Configuration)?;
    let spec = driver.connection_spec()?;

    let prefix = if spec.table_prefix.is_empty() {
        "(none)"
    } else {
        spec.table_prefix.as_str()
    };
    require_confirmation(
        confirmer,
        &format!(
            "DANGEROUS: drop all tables in database '{}' (user: {}, table prefix: {}, port: {}) and import {}?",
            spec.database,
            spec.user,
            prefix,
            spec.port,
            dump_path.display()
        ),
    )?;

    info!("Dropping existing tables in {}", spec.redacted_url());
    let dropped = driver
        .drop_tables(filter)
        .await
        .map_err(|e| RestoreError::DropFailed {
            database: spec.database.clone(),
            detail: e.to_string(),
        })?;
    info!("✓ Dropped {} tables", dropped);

    info!("Importing {} into '{}'", dump_path.display(), spec.database);
    driver.import_dump(dump_path).await.map_err(|e| match e {
        already @ RestoreError::ImportFailed { .. } => already,
        other => RestoreError::ImportFailed {
            database: spec.database.clone(),
            dump: dump_path.to_path_buf(),
            detail: other.to_string(),
        },
    })?;

    driver.after_import().await?;
    info!("✓ Database '{}' restored from {}", spec.database, dump_path.display());
    Ok(())
}
