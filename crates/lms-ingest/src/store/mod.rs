//! Assignment store interface
//!
//! The pipeline only ever upserts whole items. [`DynamoStore`] talks to
//! DynamoDB; [`MemoryStore`] keeps items in process and can be scripted to
//! fail, which is how the pipeline is exercised without a network.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::AssignmentItem;

pub mod dynamodb;
pub mod memory;

pub use dynamodb::DynamoStore;
pub use memory::MemoryStore;

/// Error returned by the store for a single write
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("[{code}] {message}")]
pub struct StoreError {
    /// Service error code, e.g. `ThrottlingException`
    pub code: String,
    pub message: String,
}

impl StoreError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Keyed upsert target for assignment items.
///
/// Writes are keyed by [`AssignmentItem::key`]; writing the same key twice
/// replaces the earlier item. Implementations must not retry on their own
/// beyond what their transport is configured to do.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn upsert(&self, item: &AssignmentItem) -> Result<(), StoreError>;
}
