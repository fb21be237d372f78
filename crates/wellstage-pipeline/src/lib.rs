//! Wellstage Pipeline Library
//!
//! Full-refresh ETL core: extracts well-production records from CSV exports
//! and a paginated REST API, orders staging tables by their foreign-key
//! references, and bulk-loads PostgreSQL with idempotent batched writes.
//!
//! # Components
//!
//! - [`catalog`]: staging table descriptors and their reference edges
//! - [`resolver`]: topological load order over the reference graph
//! - [`extract`]: CSV directory and paginated API sources
//! - [`transform`]: pure per-batch column transformations
//! - [`load`]: truncate-then-load batch writer with retries
//! - [`pipeline`]: the run orchestrator
//!
//! # Example
//!
//! ```no_run
//! use wellstage_pipeline::catalog::Catalog;
//! use wellstage_pipeline::config::Settings;
//! use wellstage_pipeline::pipeline::{Pipeline, SourceSelection};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pool = settings.database.connect().await?;
//!     let pipeline = Pipeline::new(settings, Catalog::staging(), pool);
//!     let summary = pipeline.run(SourceSelection::All).await?;
//!     tracing::info!(?summary, "run finished");
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod extract;
pub mod load;
pub mod pipeline;
pub mod record;
pub mod resolver;
pub mod transform;
