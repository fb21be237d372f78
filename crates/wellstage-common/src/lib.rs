//! Wellstage Common Library
//!
//! Shared error handling and logging for the Wellstage workspace.
//!
//! # Overview
//!
//! This crate provides the functionality shared by all Wellstage members:
//!
//! - **Error Handling**: The [`StageError`] taxonomy and result alias
//! - **Logging**: Structured tracing setup used by every binary
//!
//! # Example
//!
//! ```no_run
//! use wellstage_common::{Result, StageError};
//!
//! fn check_batch_size(batch_size: usize) -> Result<()> {
//!     if batch_size == 0 {
//!         return Err(StageError::Config("batch size must be > 0".into()));
//!     }
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{Result, StageError};
