//! In-memory commitment store.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CommitmentStore, StoreError};
use crate::commit::Commitment;
use crate::Round;

/// Ordered in-memory store. Used when no ledger file is configured.
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Round, Commitment>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Commitment recorded for `round`, if any.
    pub async fn get(&self, round: Round) -> Option<Commitment> {
        self.entries.read().await.get(&round).cloned()
    }

    /// Number of recorded rounds.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// True when nothing has been recorded.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommitmentStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn append(&self, round: Round, commitment: Commitment) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        match entries.entry(round) {
            Entry::Occupied(_) => Err(StoreError::DuplicateRound(round)),
            Entry::Vacant(slot) => {
                slot.insert(commitment);
                Ok(())
            }
        }
    }

    async fn rounds(&self) -> Result<Vec<Round>, StoreError> {
        Ok(self.entries.read().await.keys().copied().collect())
    }
}
