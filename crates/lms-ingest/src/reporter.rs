//! Progress and outcome reporting
//!
//! The ingestor calls a [`Reporter`] as rows are processed and once at the
//! end of a run. [`TracingReporter`] writes everything to the log (and so to
//! the results file); [`SpinnerReporter`] adds a terminal spinner on top.

use indicatif::{ProgressBar, ProgressStyle};
use lms_common::format_elapsed;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::model::SourceRecord;
use crate::orchestrator::{AbortCause, IngestSummary};
use crate::transform::RowBuildError;

/// Observer of an ingestion run. Every method defaults to doing nothing.
pub trait Reporter: Send + Sync {
    /// Row skipped because it does not describe a person
    fn row_skipped(&self, _row: &SourceRecord) {}

    /// Row rejected by validation; the run continues
    fn row_failed(&self, _error: &RowBuildError) {}

    /// Running total of items the store has acknowledged
    fn items_confirmed(&self, _confirmed: u64) {}

    /// Called once, after every dispatched write has completed
    fn finished(&self, _summary: &IngestSummary, _cause: Option<&AbortCause>) {}
}

/// Reports nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl Reporter for NoopReporter {}

/// Reports through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn row_skipped(&self, row: &SourceRecord) {
        debug!(line = row.line(), "Skipping non-person row");
    }

    fn row_failed(&self, err: &RowBuildError) {
        error!(
            line = err.row.line(),
            row = ?err.row.fields(),
            "Invalid value while putting item: {}",
            err.cause
        );
    }

    fn finished(&self, summary: &IngestSummary, cause: Option<&AbortCause>) {
        match cause {
            Some(AbortCause::Store {
                failure,
                classification,
            }) => {
                error!(
                    retry_safe = classification.is_retry_safe(),
                    "[{}] {}.\n\tError message: {}",
                    failure.error.code,
                    classification.remediation,
                    failure.error.message
                );
            },
            Some(AbortCause::UnclassifiedStore { failure, source }) => {
                error!(
                    "[{}] {}.\n\tError message: {}",
                    failure.error.code, source, failure.error.message
                );
            },
            Some(AbortCause::Source(err)) => {
                error!("{}", err);
            },
            None => {},
        }

        if summary.rows_failed > 0 {
            info!(rows_failed = summary.rows_failed, "Some rows could not be loaded");
        }
        info!(
            rows_skipped = summary.rows_skipped,
            state = %summary.state,
            "Loaded {} items in {}",
            summary.items_written,
            format_elapsed(summary.elapsed)
        );
    }
}

/// Terminal spinner showing the confirmed count, backed by [`TracingReporter`]
pub struct SpinnerReporter {
    spinner: ProgressBar,
    inner: TracingReporter,
}

impl SpinnerReporter {
    pub fn new(message: &str) -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg} {pos} items")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        Self {
            spinner,
            inner: TracingReporter,
        }
    }
}

impl Reporter for SpinnerReporter {
    fn row_skipped(&self, row: &SourceRecord) {
        self.inner.row_skipped(row);
    }

    fn row_failed(&self, err: &RowBuildError) {
        self.spinner.suspend(|| self.inner.row_failed(err));
    }

    fn items_confirmed(&self, confirmed: u64) {
        self.spinner.set_position(confirmed);
    }

    fn finished(&self, summary: &IngestSummary, cause: Option<&AbortCause>) {
        self.spinner.set_position(summary.items_written);
        if cause.is_some() {
            self.spinner.abandon_with_message("Aborted after");
        } else {
            self.spinner.finish_with_message("Loaded");
        }
        self.inner.finished(summary, cause);
    }
}
