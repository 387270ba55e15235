//! LMS Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared utilities for the LMS loader workspace.
//!
//! - **Logging**: subscriber setup for console and per-run results files
//! - **Elapsed time**: operator-facing duration formatting
//!
//! # Example
//!
//! ```no_run
//! use lms_common::logging::{init_logging, LogConfig, LogLevel};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::builder().level(LogLevel::Debug).build();
//!     let _guard = init_logging(&config)?;
//!     Ok(())
//! }
//! ```

pub mod elapsed;
pub mod logging;

pub use elapsed::format_elapsed;
