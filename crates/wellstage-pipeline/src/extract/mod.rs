//! Record sources
//!
//! Each source materializes per-table [`RecordBatch`](crate::record::RecordBatch)es
//! for the orchestrator. A source failure is contained to the collection or
//! file it occurred in; only the API credential exchange is fatal.

pub mod api;
pub mod files;

pub use api::{ApiClient, FetchOutcome};
pub use files::CsvExtractor;
