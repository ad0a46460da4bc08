//! Persistent store - the repository over live pipeline state
//!
//! Multiple staff terminals mutate the same project concurrently, so every
//! write is a read-modify-write guarded by an expected-revision check, and a
//! packaging run (several batch updates plus inventory and ledger effects)
//! commits as one all-or-nothing transaction.

pub mod serialize;
pub mod sinks;
pub mod sqlite;

pub use sinks::{InventorySink, MovementLedger, UnitCounter};
pub use sqlite::SqliteStore;

use thiserror::Error;

use crate::core::identity::BatchId;
use crate::entities::batch::{Batch, BatchState, Grade};

/// Errors raised by the store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("batch {id} not found")]
    NotFound { id: String },

    #[error("batch {id} was changed by another operator; re-fetch and retry")]
    Conflict { id: String },

    #[error("batch {id} already exists")]
    Duplicate { id: String },

    #[error("failed to encode batch {id}: {source}")]
    Encode {
        id: String,
        source: serde_json::Error,
    },

    #[error("failed to decode batch {id}: {source}")]
    Decode {
        id: String,
        source: serde_json::Error,
    },

    #[error("invalid stored value: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Filter for batch listing
#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    /// Only batches in this state
    pub state: Option<BatchState>,

    /// Only batches of this variety (case-insensitive)
    pub variety: Option<String>,

    /// Exclude closed batches
    pub active: bool,
}

/// Repository interface over batches: get, put, compare-and-swap update
///
/// Derived-batch ids keep their human-legible suffix but may be renumbered
/// by the store on collision; callers read the final id back from the batch.
pub trait BatchRepository {
    /// Insert a brand-new batch
    fn insert(&mut self, batch: &Batch) -> Result<(), StoreError>;

    /// Fetch a batch by id
    fn get(&self, id: &BatchId) -> Result<Batch, StoreError>;

    /// Write a batch guarded by its expected current revision
    ///
    /// On success the batch's revision is bumped past `expected_revision`;
    /// a stale expectation yields [`StoreError::Conflict`] and writes
    /// nothing.
    fn update(&mut self, batch: &mut Batch, expected_revision: u64) -> Result<(), StoreError>;

    /// List batches matching a filter, oldest first
    fn list(&self, filter: &BatchFilter) -> Result<Vec<Batch>, StoreError>;

    /// Batches eligible to contribute to a packaging run, oldest first
    fn ready_batches(&self, variety: &str, grade: Grade) -> Result<Vec<Batch>, StoreError>;
}
