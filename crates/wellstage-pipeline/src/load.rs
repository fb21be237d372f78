//! Batch writer
//!
//! Full-refresh loads into PostgreSQL staging tables:
//!
//! 1. `TRUNCATE ... RESTART IDENTITY CASCADE` on an autocommit connection
//!    (TRUNCATE is incompatible with an open transaction block on some
//!    backends); truncate failure is fatal and never retried.
//! 2. The batch is partitioned into order-preserving slices; each slice is
//!    one transaction wrapping one multi-row `INSERT ... ON CONFLICT DO
//!    NOTHING`. The duplicate-skip mode is load-bearing: a retried slice
//!    re-sends the exact same rows, which is only safe because conflicting
//!    rows are silently dropped.
//! 3. A failing slice is retried with a fixed delay, then logged and skipped;
//!    it does not abort the table load.
//!
//! One pooled connection serves the whole table load.

use sqlx::{Connection, PgPool};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};
use wellstage_common::{Result, StageError};

use crate::record::RecordBatch;

// ============================================================================
// Batch Writer Constants
// ============================================================================

/// Fixed delay between retry attempts for a failed slice.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Outcome summary of one table load
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub table: String,
    pub total_slices: usize,
    pub slices_committed: usize,
    pub slices_failed: usize,
    pub rows_attempted: usize,
    /// True when the batch was empty and nothing was written
    pub skipped: bool,
}

/// PostgreSQL batch writer
pub struct PgLoader {
    pool: PgPool,
    schema: String,
    retry_delay: Duration,
}

impl PgLoader {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
            retry_delay: RETRY_DELAY,
        }
    }

    /// Shorten the inter-attempt delay (tests)
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Remove all rows from a staging table
    ///
    /// Runs as a single autocommit statement, outside any transaction.
    pub async fn truncate_table(&self, table: &str) -> Result<()> {
        info!(table = %table, "truncating table");
        let sql = format!(
            "TRUNCATE TABLE {}.{} RESTART IDENTITY CASCADE",
            quote_ident(&self.schema),
            quote_ident(table)
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StageError::Database(format!("truncate {} failed: {}", table, e)))?;
        Ok(())
    }

    /// Full-refresh load of one batch into its table
    ///
    /// Clears the table, then writes slices of `batch_size` rows. Per-slice
    /// failures are retried `max_retries` times and then recorded in the
    /// report; only the truncate step and connection acquisition are fatal.
    pub async fn load(
        &self,
        batch: &RecordBatch,
        batch_size: usize,
        max_retries: u32,
    ) -> Result<LoadReport> {
        if batch_size == 0 {
            return Err(StageError::Config("batch size must be > 0".into()));
        }

        let table = batch.table().to_string();
        self.truncate_table(&table).await?;

        if batch.is_empty() {
            info!(table = %table, "no data to load; skipping");
            return Ok(LoadReport {
                table,
                skipped: true,
                ..LoadReport::default()
            });
        }

        let total_rows = batch.len();
        let total_slices = slice_count(total_rows, batch_size);
        info!(
            table = %table,
            rows = total_rows,
            slices = total_slices,
            batch_size = batch_size,
            "loading table"
        );

        let mut report = LoadReport {
            table: table.clone(),
            total_slices,
            rows_attempted: total_rows,
            ..LoadReport::default()
        };

        // One connection for the whole table load.
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| StageError::Database(format!("connection acquire failed: {}", e)))?;

        for (index, slice) in batch.rows().chunks(batch_size).enumerate() {
            let sql = build_insert(&self.schema, &table, batch.columns(), slice);

            let mut attempt = 1;
            loop {
                let result = async {
                    let mut tx = conn.begin().await?;
                    sqlx::query(&sql).execute(&mut *tx).await?;
                    tx.commit().await
                }
                .await;

                match result {
                    Ok(()) => {
                        info!(
                            table = %table,
                            slice = index + 1,
                            slices = total_slices,
                            "slice committed"
                        );
                        report.slices_committed += 1;
                        break;
                    },
                    Err(e) if attempt < max_retries => {
                        warn!(
                            table = %table,
                            slice = index + 1,
                            attempt = attempt,
                            max_retries = max_retries,
                            error = %e,
                            "slice write failed; retrying"
                        );
                        attempt += 1;
                        sleep(self.retry_delay).await;
                    },
                    Err(e) => {
                        error!(
                            table = %table,
                            slice = index + 1,
                            attempt = attempt,
                            error = %e,
                            "slice write failed after all attempts; skipping slice"
                        );
                        report.slices_failed += 1;
                        break;
                    },
                }
            }
        }

        info!(
            table = %table,
            committed = report.slices_committed,
            failed = report.slices_failed,
            "table load finished"
        );
        Ok(report)
    }
}

/// `ceil(rows / batch_size)`
pub fn slice_count(rows: usize, batch_size: usize) -> usize {
    rows.div_ceil(batch_size)
}

/// Double-quote an SQL identifier
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Multi-row duplicate-skipping insert for one slice
fn build_insert(
    schema: &str,
    table: &str,
    columns: &[String],
    rows: &[Vec<crate::record::Value>],
) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "INSERT INTO {}.{} ({}) VALUES ",
        quote_ident(schema),
        quote_ident(table),
        column_list
    );

    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for (j, value) in row.iter().enumerate() {
            if j > 0 {
                sql.push_str(", ");
            }
            value.write_sql_literal(&mut sql);
        }
        sql.push(')');
    }

    sql.push_str(" ON CONFLICT DO NOTHING");
    sql
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::record::Value;

    #[test]
    fn test_slice_count_is_ceiling() {
        assert_eq!(slice_count(1, 5000), 1);
        assert_eq!(slice_count(5000, 5000), 1);
        assert_eq!(slice_count(5001, 5000), 2);
        assert_eq!(slice_count(12_500, 5000), 3);
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("plain"), "\"plain\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_build_insert_shape() {
        let columns = vec!["id".to_string(), "name".to_string()];
        let rows = vec![
            vec![Value::Int(1), Value::Text("North".into())],
            vec![Value::Int(2), Value::Null],
        ];
        let sql = build_insert("public", "stg_pro_count__areatb", &columns, &rows);

        assert_eq!(
            sql,
            "INSERT INTO \"public\".\"stg_pro_count__areatb\" (\"id\", \"name\") \
             VALUES (1, 'North'), (2, NULL) ON CONFLICT DO NOTHING"
        );
    }

    #[test]
    fn test_build_insert_escapes_text() {
        let columns = vec!["note_text".to_string()];
        let rows = vec![vec![Value::Text("it's fine".into())]];
        let sql = build_insert("public", "stg_wiserock__note", &columns, &rows);
        assert!(sql.contains("'it''s fine'"));
    }
}
