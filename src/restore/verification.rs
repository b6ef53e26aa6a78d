// siterestore/src/restore/verification.rs
use sqlx::{Pool, Postgres};
use tracing::{info, warn};

use crate::errors::Result;

/// Lists the tables in the `public` schema.
pub async fn list_public_tables(db_pool: &Pool<Postgres>) -> Result<Vec<String>> {
    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT tablename FROM pg_catalog.pg_tables WHERE schemaname = 'public' ORDER BY tablename",
    )
    .fetch_all(db_pool)
    .await?;
    Ok(tables.into_iter().map(|(name,)| name).collect())
}

/// Basic check after an import: the dump should have produced tables.
/// An empty schema is reported but not treated as an error, since a dump
/// of an empty site is legitimate.
pub async fn verify_restore(db_pool: &Pool<Postgres>, db_name: &str) -> Result<usize> {
    let tables = list_public_tables(db_pool).await?;
    if tables.is_empty() {
        warn!(
            "No tables found in the public schema of '{}' after import. Check the dump.",
            db_name
        );
    } else {
        info!("✓ Database '{}' now has {} tables", db_name, tables.len());
    }
    Ok(tables.len())
}
