//! CSV directory source
//!
//! One file per staging table: the file stem maps deterministically to a
//! table name through the source-system prefix rule (`ac_property` belongs to
//! Aries, everything else to ProCount). Unreadable files are logged and
//! skipped; a missing data directory is a configuration error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use wellstage_common::{Result, StageError};

use crate::record::{RecordBatch, Value};

/// Extraction result for one directory scan
#[derive(Debug, Default)]
pub struct FileScan {
    /// Table name -> extracted batch
    pub batches: HashMap<String, RecordBatch>,
    /// Files that existed but could not be read
    pub failed_files: usize,
}

/// Reads every `*.csv` file in a directory into record batches
pub struct CsvExtractor {
    data_dir: PathBuf,
}

impl CsvExtractor {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        if !data_dir.is_dir() {
            return Err(StageError::Config(format!(
                "data directory not found: {}",
                data_dir.display()
            )));
        }
        Ok(Self { data_dir })
    }

    /// Staging table name for a CSV file stem
    ///
    /// `ac_property.csv` -> `stg_aries__ac_property`,
    /// `completiontb.csv` -> `stg_pro_count__completiontb`.
    pub fn table_name_for(stem: &str) -> String {
        let source_system = if stem == "ac_property" {
            "aries"
        } else {
            "pro_count"
        };
        format!("stg_{}__{}", source_system, stem)
    }

    /// Read all CSV files, keyed by target table name
    pub fn extract_all(&self) -> Result<FileScan> {
        info!(dir = %self.data_dir.display(), "extracting CSV files");

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.data_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            warn!(dir = %self.data_dir.display(), "no CSV files found");
        }

        let mut scan = FileScan::default();
        for path in paths {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let table = Self::table_name_for(stem);
            match read_csv(&path, &table) {
                Ok(batch) => {
                    info!(file = %path.display(), table = %table, rows = batch.len(), "file read");
                    scan.batches.insert(table, batch);
                },
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping unreadable file");
                    scan.failed_files += 1;
                },
            }
        }

        Ok(scan)
    }
}

/// Read one CSV file into a batch; empty fields become NULL cells
fn read_csv(path: &Path, table: &str) -> Result<RecordBatch> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| StageError::Parse(e.to_string()))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| StageError::Parse(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut batch = RecordBatch::new(table, columns);
    for record in reader.records() {
        let record = record.map_err(|e| StageError::Parse(e.to_string()))?;
        let row = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Value::Null
                } else {
                    Value::Text(field.to_string())
                }
            })
            .collect();
        batch.push_row(row);
    }

    Ok(batch)
}
