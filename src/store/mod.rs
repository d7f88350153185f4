//! Commitment Stores
//!
//! Where per-round commitments are recorded. Stores are shared between
//! overlapping generation tasks, so every implementation serializes its
//! appends and keys entries by round.
//!
//! Duplicate policy: reject-on-duplicate. The first successful append for a
//! round is kept; later appends for the same round fail with
//! [`StoreError::DuplicateRound`].

pub mod ledger;
pub mod memory;

pub use ledger::{LedgerDocument, LedgerEntry, LedgerStore};
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::commit::Commitment;
use crate::Round;

/// Store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The ledger could not be encoded or decoded.
    #[error("Ledger encoding error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A commitment is already recorded for this round.
    #[error("Round {0} already recorded")]
    DuplicateRound(Round),
}

/// Append-only, round-keyed commitment store.
#[async_trait]
pub trait CommitmentStore: Send + Sync {
    /// Store name for logging.
    fn name(&self) -> &'static str;

    /// Record the commitment for `round`. Ownership moves into the store.
    async fn append(&self, round: Round, commitment: Commitment) -> Result<(), StoreError>;

    /// Rounds recorded so far, ascending.
    async fn rounds(&self) -> Result<Vec<Round>, StoreError>;
}
