//! Ingestion orchestration
//!
//! An [`Ingestor`] runs exactly once:
//!
//! ```text
//! NotStarted -> Running -> Completed
//!                       -> Aborted
//! ```
//!
//! Rows are read and validated in file order. Valid items go to the
//! [`BatchWriter`]; invalid rows are reported and the run carries on. The
//! first store failure or source failure stops the run, but only after every
//! write already dispatched has completed, so the reported count is the exact
//! number of items the store acknowledged.

use chrono::Local;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use crate::classify::{classify, Classification, UnknownErrorCode};
use crate::config::IngestConfig;
use crate::reporter::Reporter;
use crate::source::{CsvSource, SourceError};
use crate::store::{AssignmentStore, StoreError};
use crate::transform::build_item;
use crate::writer::{BatchWriter, WriteFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
    Aborted,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Aborted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunState::NotStarted => "not started",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Aborted => "aborted",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts for a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Items acknowledged by the store
    pub items_written: u64,
    /// Rows that do not describe a person
    pub rows_skipped: u64,
    /// Rows rejected by validation
    pub rows_failed: u64,
    pub elapsed: Duration,
    pub state: RunState,
}

/// Why a run stopped early
#[derive(Debug, Error)]
pub enum AbortCause {
    #[error("{failure}")]
    Store {
        failure: WriteFailure,
        classification: Classification,
    },

    #[error("{failure}; {source}")]
    UnclassifiedStore {
        failure: WriteFailure,
        #[source]
        source: UnknownErrorCode,
    },

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl AbortCause {
    pub fn from_write(failure: WriteFailure) -> Self {
        match classify(&failure.error) {
            Ok(classification) => AbortCause::Store {
                failure,
                classification,
            },
            Err(source) => AbortCause::UnclassifiedStore { failure, source },
        }
    }

    /// True only for store failures known to be transient
    pub fn is_retry_safe(&self) -> bool {
        match self {
            AbortCause::Store { classification, .. } => classification.is_retry_safe(),
            _ => false,
        }
    }

    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            AbortCause::Store { classification, .. } => Some(classification.remediation),
            _ => None,
        }
    }

    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            AbortCause::Store { failure, .. } | AbortCause::UnclassifiedStore { failure, .. } => {
                Some(&failure.error)
            },
            AbortCause::Source(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Ingestion is {0}; an ingestor can only run once")]
    InvalidState(RunState),

    #[error("Ingestion aborted after {} items: {cause}", .summary.items_written)]
    Aborted {
        summary: IngestSummary,
        #[source]
        cause: AbortCause,
    },
}

impl IngestError {
    /// Summary of the aborted run, if it got as far as starting
    pub fn summary(&self) -> Option<&IngestSummary> {
        match self {
            IngestError::Aborted { summary, .. } => Some(summary),
            IngestError::InvalidState(_) => None,
        }
    }

    pub fn is_retry_safe(&self) -> bool {
        match self {
            IngestError::Aborted { cause, .. } => cause.is_retry_safe(),
            IngestError::InvalidState(_) => false,
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    items_written: u64,
    rows_skipped: u64,
    rows_failed: u64,
}

pub struct Ingestor {
    store: Arc<dyn AssignmentStore>,
    config: IngestConfig,
    reporter: Box<dyn Reporter>,
    state: RunState,
}

impl Ingestor {
    pub fn new(store: Arc<dyn AssignmentStore>, config: IngestConfig, reporter: Box<dyn Reporter>) -> Self {
        Self {
            store,
            config,
            reporter,
            state: RunState::NotStarted,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Open `path` and ingest it. A file that cannot be opened aborts the run.
    pub async fn run_path(&mut self, path: impl AsRef<Path>) -> Result<IngestSummary, IngestError> {
        let path = path.as_ref();
        if self.state != RunState::NotStarted {
            return Err(IngestError::InvalidState(self.state));
        }

        match CsvSource::open(path).await {
            Ok(source) => self.run(source).await,
            Err(err) => {
                let started = self.begin()?;
                self.conclude(started, Tally::default(), Some(AbortCause::Source(err)))
            },
        }
    }

    /// Ingest every row of `source`
    pub async fn run<R>(&mut self, mut source: CsvSource<R>) -> Result<IngestSummary, IngestError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let started = self.begin()?;

        let missing = source.missing_columns();
        if !missing.is_empty() {
            warn!(columns = ?missing, "Source is missing expected columns");
        }

        let store = Arc::clone(&self.store);
        let mut writer = BatchWriter::new(store.as_ref(), self.config.max_in_flight);
        let mut tally = Tally::default();
        let mut cause = None;

        loop {
            if let Some(max_items) = self.config.max_items {
                if writer.dispatched() >= max_items {
                    info!(max_items, "Item limit reached, not reading further rows");
                    break;
                }
            }

            let row = match source.next_record().await {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(err) => {
                    cause = Some(AbortCause::Source(err));
                    break;
                },
            };

            match build_item(&row, Local::now().naive_local()) {
                Ok(Some(item)) => {
                    if let Err(failure) = writer.submit(item).await {
                        cause = Some(AbortCause::from_write(failure));
                        break;
                    }
                    self.reporter.items_confirmed(writer.confirmed());
                },
                Ok(None) => {
                    tally.rows_skipped += 1;
                    self.reporter.row_skipped(&row);
                },
                Err(err) => {
                    tally.rows_failed += 1;
                    self.reporter.row_failed(&err);
                },
            }
        }

        tally.items_written = match writer.finish().await {
            Ok(confirmed) => confirmed,
            Err(failure) => {
                let confirmed = failure.confirmed;
                cause.get_or_insert_with(|| AbortCause::from_write(failure));
                confirmed
            },
        };

        self.conclude(started, tally, cause)
    }

    fn begin(&mut self) -> Result<Instant, IngestError> {
        if self.state != RunState::NotStarted {
            return Err(IngestError::InvalidState(self.state));
        }

        self.state = RunState::Running;
        debug!(config = ?self.config, "Ingestion started");
        Ok(Instant::now())
    }

    fn conclude(
        &mut self,
        started: Instant,
        tally: Tally,
        cause: Option<AbortCause>,
    ) -> Result<IngestSummary, IngestError> {
        self.state = if cause.is_some() {
            RunState::Aborted
        } else {
            RunState::Completed
        };

        let summary = IngestSummary {
            items_written: tally.items_written,
            rows_skipped: tally.rows_skipped,
            rows_failed: tally.rows_failed,
            elapsed: started.elapsed(),
            state: self.state,
        };
        self.reporter.finished(&summary, cause.as_ref());

        match cause {
            None => Ok(summary),
            Some(cause) => Err(IngestError::Aborted { summary, cause }),
        }
    }
}
