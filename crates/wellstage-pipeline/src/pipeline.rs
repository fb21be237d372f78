//! Pipeline orchestrator
//!
//! Drives one run: extract every per-table record set first (so the load
//! order is fully controlled), then walk the resolver's order and
//! transform + load each table that was extracted. Extraction failures are
//! contained per collection/file; any failure inside the load phase fails the
//! run and aborts the remaining tables, because a table left between
//! "cleared" and "loaded" is not a safe state to continue past.

use anyhow::{Context, Result};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::Settings;
use crate::extract::{ApiClient, CsvExtractor};
use crate::load::PgLoader;
use crate::record::RecordBatch;
use crate::{resolver, transform};

/// Which sources feed this run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSelection {
    Files,
    Api,
    All,
}

impl SourceSelection {
    fn includes_files(self) -> bool {
        matches!(self, SourceSelection::Files | SourceSelection::All)
    }

    fn includes_api(self) -> bool {
        matches!(self, SourceSelection::Api | SourceSelection::All)
    }

    /// Whether this selection is expected to feed the given table
    fn feeds(self, api_fed: bool) -> bool {
        if api_fed {
            self.includes_api()
        } else {
            self.includes_files()
        }
    }
}

/// Terminal status of a completed run
///
/// `Degraded` means the run finished but silently dropped data somewhere: a
/// collection fetch ended early, a file was unreadable, or write slices
/// exhausted their retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Clean,
    Degraded,
}

impl RunStatus {
    /// Clean only when no slice and no source dropped data
    pub fn from_counts(slices_failed: usize, sources_dropped: usize) -> Self {
        if slices_failed > 0 || sources_dropped > 0 {
            RunStatus::Degraded
        } else {
            RunStatus::Clean
        }
    }
}

/// Aggregate outcome of one run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub status: RunStatus,
    pub tables_loaded: usize,
    pub tables_skipped: usize,
    pub rows_attempted: usize,
    pub slices_failed: usize,
    /// Collections or files that yielded partial or no data
    pub sources_dropped: usize,
}

/// Orchestrates extract -> transform -> load for one run
pub struct Pipeline {
    settings: Settings,
    catalog: Catalog,
    loader: PgLoader,
}

impl Pipeline {
    pub fn new(settings: Settings, catalog: Catalog, pool: PgPool) -> Self {
        let loader = PgLoader::new(pool, settings.database.schema.clone());
        Self {
            settings,
            catalog,
            loader,
        }
    }

    /// Execute one full-refresh run
    pub async fn run(&self, selection: SourceSelection) -> Result<RunSummary> {
        if self.settings.parallel {
            warn!("USE_PARALLEL is set but parallel execution is not implemented; running sequentially");
        }

        let order =
            resolver::ordered_tables(&self.catalog).context("resolving table load order")?;
        debug!(order = ?order, "load order resolved");

        info!(state = "extracting", "pipeline run started");
        let (mut extracted, sources_dropped) = self.extract(selection).await?;

        info!(state = "loading", tables = extracted.len(), "extraction finished");
        let mut summary = RunSummary {
            status: RunStatus::Clean,
            tables_loaded: 0,
            tables_skipped: 0,
            rows_attempted: 0,
            slices_failed: 0,
            sources_dropped,
        };

        for table in &order {
            let Some(mut batch) = extracted.remove(table) else {
                let api_fed = self
                    .catalog
                    .get(table)
                    .is_some_and(|t| t.endpoint.is_some());
                // a table outside the selected sources is not a skip
                if selection.feeds(api_fed) {
                    warn!(table = %table, "no extracted data for table; skipping");
                    summary.tables_skipped += 1;
                } else {
                    debug!(table = %table, "table not fed by selected sources");
                }
                continue;
            };

            transform::apply(table, &mut batch);

            let descriptor = self.catalog.get(table);
            if descriptor.is_some_and(|d| !d.has_natural_key) {
                warn!(
                    table = %table,
                    "no declared uniqueness constraint; retried slices may accumulate duplicates"
                );
            }

            let batch_size = self
                .catalog
                .batch_size_for(table, self.settings.load.batch_size);

            let report = self
                .loader
                .load(&batch, batch_size, self.settings.load.max_retries)
                .await
                .with_context(|| format!("loading table {} failed", table))?;

            summary.rows_attempted += report.rows_attempted;
            summary.slices_failed += report.slices_failed;
            if report.skipped {
                summary.tables_skipped += 1;
            } else {
                summary.tables_loaded += 1;
            }
        }

        summary.status = RunStatus::from_counts(summary.slices_failed, summary.sources_dropped);

        info!(
            state = "completed",
            status = ?summary.status,
            tables_loaded = summary.tables_loaded,
            tables_skipped = summary.tables_skipped,
            rows_attempted = summary.rows_attempted,
            slices_failed = summary.slices_failed,
            sources_dropped = summary.sources_dropped,
            "pipeline run completed"
        );
        Ok(summary)
    }

    /// Materialize every per-table record set from the selected sources
    ///
    /// Returns the table -> batch mapping plus the number of sources that
    /// yielded partial or no data.
    async fn extract(
        &self,
        selection: SourceSelection,
    ) -> Result<(HashMap<String, RecordBatch>, usize)> {
        let mut extracted: HashMap<String, RecordBatch> = HashMap::new();
        let mut dropped = 0usize;

        if selection.includes_files() {
            let extractor = CsvExtractor::new(&self.settings.data_dir)
                .context("file source unavailable")?;
            let scan = extractor.extract_all().context("CSV extraction failed")?;
            dropped += scan.failed_files;
            extracted.extend(scan.batches);
        }

        if selection.includes_api() {
            self.settings.api.validate()?;
            let mut client =
                ApiClient::new(self.settings.api.clone()).context("building API client")?;

            for (table, endpoint) in self.catalog.api_tables() {
                // authentication failure is fatal; page failures are contained
                // inside fetch_collection and surface as an incomplete outcome
                let outcome = client
                    .fetch_collection(endpoint)
                    .await
                    .with_context(|| format!("fetching collection {}", endpoint))?;

                if !outcome.complete {
                    dropped += 1;
                }
                if outcome.records.is_empty() {
                    debug!(table = %table, "collection returned no records");
                    continue;
                }
                extracted.insert(
                    table.to_string(),
                    RecordBatch::from_json_records(table, &outcome.records),
                );
            }
        }

        Ok((extracted, dropped))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_source_selection() {
        assert!(SourceSelection::All.includes_files());
        assert!(SourceSelection::All.includes_api());
        assert!(SourceSelection::Files.includes_files());
        assert!(!SourceSelection::Files.includes_api());
        assert!(!SourceSelection::Api.includes_files());
        assert!(SourceSelection::Api.includes_api());
    }

    #[test]
    fn test_selection_feeds_only_its_sources() {
        assert!(SourceSelection::All.feeds(true));
        assert!(SourceSelection::All.feeds(false));
        assert!(SourceSelection::Api.feeds(true));
        assert!(!SourceSelection::Api.feeds(false));
        assert!(SourceSelection::Files.feeds(false));
        assert!(!SourceSelection::Files.feeds(true));
    }

    #[test]
    fn test_status_degrades_on_any_dropped_data() {
        assert_eq!(RunStatus::from_counts(0, 0), RunStatus::Clean);
        assert_eq!(RunStatus::from_counts(1, 0), RunStatus::Degraded);
        assert_eq!(RunStatus::from_counts(0, 1), RunStatus::Degraded);
        assert_eq!(RunStatus::from_counts(2, 3), RunStatus::Degraded);
    }
}
