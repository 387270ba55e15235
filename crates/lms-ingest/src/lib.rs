//! LMS Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Loads learning-management-system assignment extracts into a keyed
//! DynamoDB table.
//!
//! # Pipeline
//!
//! - **source**: header-keyed CSV rows
//! - **transform**: person filter and field normalization
//! - **writer**: bounded-concurrency upserts
//! - **classify**: store error codes mapped to remediation
//! - **orchestrator**: one-shot run with an exact written count
//!
//! # Example
//!
//! ```no_run
//! use lms_ingest::{DynamoStore, IngestConfig, Ingestor, StoreConfig, TracingReporter};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = DynamoStore::connect(&StoreConfig::from_env()?).await;
//!     let mut ingestor = Ingestor::new(Arc::new(store), IngestConfig::default(), Box::new(TracingReporter));
//!     let summary = ingestor.run_path("assignments.csv").await?;
//!     println!("{} items", summary.items_written);
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod cli;
pub mod config;
pub mod model;
pub mod orchestrator;
pub mod reporter;
pub mod source;
pub mod store;
pub mod transform;
pub mod writer;

pub use classify::{classify, Classification, ErrorClass, StoreErrorCode, UnknownErrorCode};
pub use config::{ConfigError, IngestConfig, StoreConfig};
pub use model::{AssignmentItem, ItemKey, SourceRecord};
pub use orchestrator::{AbortCause, IngestError, IngestSummary, Ingestor, RunState};
pub use reporter::{NoopReporter, Reporter, SpinnerReporter, TracingReporter};
pub use source::{CsvSource, SourceError};
pub use store::{AssignmentStore, DynamoStore, MemoryStore, StoreError};
pub use transform::{build_item, RowBuildError};
pub use writer::{BatchWriter, WriteFailure};
