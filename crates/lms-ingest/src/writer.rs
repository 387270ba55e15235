//! Bounded-concurrency batch writer
//!
//! Items are written as they arrive, with at most `max_in_flight` writes
//! outstanding. Every submit first collects the writes that have already
//! completed, and waits for one more only when the window is full, so a
//! failure stops admission at the next item after it is known.
//!
//! After the first failure the writer accepts nothing new. It still waits for
//! every write already dispatched and counts those that succeeded, so the
//! confirmed count is exact even on the failure path.

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{AssignmentItem, ItemKey};
use crate::store::{AssignmentStore, StoreError};

/// Confirmed writes between progress log lines
pub const PROGRESS_INTERVAL: u64 = 100;

/// First rejected write of a batch
#[derive(Debug, Clone, Error)]
#[error("write of item {key} failed after {confirmed} confirmed items: {error}")]
pub struct WriteFailure {
    pub key: ItemKey,
    #[source]
    pub error: StoreError,
    /// Items the store acknowledged before the writer stopped
    pub confirmed: u64,
}

#[derive(Debug)]
struct RejectedWrite {
    key: ItemKey,
    error: StoreError,
}

type PendingWrite<'a> = BoxFuture<'a, Result<(), RejectedWrite>>;

pub struct BatchWriter<'a> {
    store: &'a dyn AssignmentStore,
    max_in_flight: usize,
    in_flight: FuturesUnordered<PendingWrite<'a>>,
    dispatched: u64,
    confirmed: u64,
}

impl<'a> BatchWriter<'a> {
    /// `max_in_flight` below 1 is treated as 1
    pub fn new(store: &'a dyn AssignmentStore, max_in_flight: usize) -> Self {
        Self {
            store,
            max_in_flight: max_in_flight.max(1),
            in_flight: FuturesUnordered::new(),
            dispatched: 0,
            confirmed: 0,
        }
    }

    /// Items acknowledged by the store so far
    pub fn confirmed(&self) -> u64 {
        self.confirmed
    }

    /// Items handed to the store so far, acknowledged or not
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Dispatch one item after collecting finished writes and waiting for
    /// room in the window.
    ///
    /// Returns the first failure seen before dispatch. The item is not
    /// dispatched in that case and the writer must not be used again.
    pub async fn submit(&mut self, item: AssignmentItem) -> Result<(), WriteFailure> {
        if let Some(rejected) = self.drain_ready() {
            return Err(self.abort(rejected).await);
        }

        while self.in_flight.len() >= self.max_in_flight {
            if let Some(rejected) = self.drain_one().await {
                return Err(self.abort(rejected).await);
            }
        }

        let store = self.store;
        self.in_flight.push(
            async move {
                store.upsert(&item).await.map_err(|error| RejectedWrite {
                    key: item.key(),
                    error,
                })
            }
            .boxed(),
        );
        self.dispatched += 1;

        Ok(())
    }

    /// Wait for every outstanding write; returns the confirmed total
    pub async fn finish(mut self) -> Result<u64, WriteFailure> {
        while !self.in_flight.is_empty() {
            if let Some(rejected) = self.drain_one().await {
                return Err(self.abort(rejected).await);
            }
        }

        Ok(self.confirmed)
    }

    /// Collect writes that finish without waiting; `Some` on the first rejection
    fn drain_ready(&mut self) -> Option<RejectedWrite> {
        while let Some(Some(result)) = self.in_flight.next().now_or_never() {
            if let Some(rejected) = self.complete(result) {
                return Some(rejected);
            }
        }
        None
    }

    /// Complete one write; `Some` if the store rejected it
    async fn drain_one(&mut self) -> Option<RejectedWrite> {
        let result = self.in_flight.next().await?;
        self.complete(result)
    }

    fn complete(&mut self, result: Result<(), RejectedWrite>) -> Option<RejectedWrite> {
        match result {
            Ok(()) => {
                self.confirmed += 1;
                if self.confirmed % PROGRESS_INTERVAL == 0 {
                    debug!(confirmed = self.confirmed, "Items written");
                }
                None
            },
            Err(rejected) => Some(rejected),
        }
    }

    async fn abort(&mut self, first: RejectedWrite) -> WriteFailure {
        warn!(
            key = %first.key,
            code = %first.error.code,
            in_flight = self.in_flight.len(),
            "Write rejected, waiting for outstanding writes"
        );

        while let Some(result) = self.in_flight.next().await {
            match result {
                Ok(()) => self.confirmed += 1,
                Err(rejected) => {
                    debug!(key = %rejected.key, error = %rejected.error, "Further write rejected");
                },
            }
        }

        WriteFailure {
            key: first.key,
            error: first.error,
            confirmed: self.confirmed,
        }
    }
}
