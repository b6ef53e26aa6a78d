// siterestore/src/utils/sequence_reset.rs
use sqlx::{Pool, Postgres, Row};
use tracing::{info, warn};

use crate::errors::Result;

/// Summary of a sequence reset pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SequenceResetReport {
    pub reset: usize,
    pub failed: usize,
}

impl SequenceResetReport {
    /// Sequences left behind after the pass, if any failed.
    pub fn failure_summary(&self) -> Option<String> {
        (self.failed > 0).then(|| {
            format!(
                "{} of {} sequences could not be reset; inserts may collide with restored ids",
                self.failed,
                self.reset + self.failed
            )
        })
    }
}

/// Moves every `public` sequence past the largest value already stored in
/// the column that owns it. A dump loaded with explicit ids otherwise leaves
/// sequences behind and the next insert collides.
pub async fn reset_all_sequences(db_pool: &Pool<Postgres>, db_name: &str) -> Result<SequenceResetReport> {
    info!("Resetting sequences for database: {}", db_name);

    let sequences_query = r#"
        SELECT
            seq.relname as sequence_name,
            tab.relname as table_name,
            attr.attname as column_name
        FROM
            pg_class seq
        JOIN
            pg_depend dep ON dep.objid = seq.oid AND dep.deptype IN ('a', 'i')
        JOIN
            pg_class tab ON dep.refobjid = tab.oid
        JOIN
            pg_attribute attr ON dep.refobjid = attr.attrelid AND dep.refobjsubid = attr.attnum
        JOIN
            pg_namespace nsp ON seq.relnamespace = nsp.oid
        WHERE
            seq.relkind = 'S'
            AND tab.relkind = 'r'
            AND nsp.nspname = 'public'
        ORDER BY
            tab.relname, attr.attname
    "#;

    let sequences = sqlx::query_as::<_, (String, String, String)>(sequences_query)
        .fetch_all(db_pool)
        .await?;

    let mut report = SequenceResetReport::default();
    if sequences.is_empty() {
        info!("No sequences found in public schema for database: {}", db_name);
        return Ok(report);
    }

    for (sequence_name, table_name, column_name) in sequences {
        let max_value_query = format!(
            r#"SELECT COALESCE(MAX("{}"), 0)::bigint as max_val FROM "{}""#,
            quote_ident(&column_name),
            quote_ident(&table_name)
        );

        let max_val: i64 = match sqlx::query(&max_value_query).fetch_one(db_pool).await {
            Ok(row) => match row.try_get("max_val") {
                Ok(val) => val,
                Err(e) => {
                    warn!("Failed to read max value for table {}: {}", table_name, e);
                    report.failed += 1;
                    continue;
                }
            },
            Err(e) => {
                warn!("Failed to get max value for table {}: {}", table_name, e);
                report.failed += 1;
                continue;
            }
        };

        let next_val = max_val + 1;
        match sqlx::query("SELECT setval($1::regclass, $2, false)")
            .bind(format!(r#""{}""#, quote_ident(&sequence_name)))
            .bind(next_val)
            .execute(db_pool)
            .await
        {
            Ok(_) => {
                info!(
                    "✓ Reset sequence {} to {} (table: {}, column: {})",
                    sequence_name, next_val, table_name, column_name
                );
                report.reset += 1;
            }
            Err(e) => {
                warn!("Failed to reset sequence {}: {}", sequence_name, e);
                report.failed += 1;
            }
        }
    }

    info!(
        "Sequence reset completed: {} successful, {} errors",
        report.reset, report.failed
    );
    Ok(report)
}

/// Escapes embedded double quotes for use inside a quoted identifier.
pub fn quote_ident(name: &str) -> String {
    name.replace('"', "\"\"")
}
