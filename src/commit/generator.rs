//! Per-Round Generation
//!
//! One call produces at most one commitment for one round:
//!
//! 1. Bail out if the round was already superseded.
//! 2. Derive the commitment (not interruptible).
//! 3. Re-check the token; a superseded round drops its commitment unrecorded.
//! 4. Append to the store.
//!
//! A cancellation that lands while the append is in flight is not observed;
//! the store's round keying keeps that late entry from touching newer rounds.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::point::{CommitmentSource, GenerationError};
use crate::store::{CommitmentStore, StoreError};
use crate::Round;

/// How a round's generation ended.
#[derive(Debug)]
pub enum RoundOutcome {
    /// Commitment appended to the store.
    Committed,
    /// Cancelled before derivation started.
    Cancelled,
    /// Cancelled while deriving; the commitment was discarded.
    Superseded,
    /// Derivation failed.
    GenerationFailed(GenerationError),
    /// The store rejected the append.
    StoreFailed(StoreError),
}

/// Coarse outcome used for round bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// Recorded.
    Committed,
    /// Stopped by cancellation, nothing recorded.
    Cancelled,
    /// Failed, nothing recorded.
    Failed,
}

impl RoundOutcome {
    /// Collapse into an [`OutcomeKind`].
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Committed => OutcomeKind::Committed,
            Self::Cancelled | Self::Superseded => OutcomeKind::Cancelled,
            Self::GenerationFailed(_) | Self::StoreFailed(_) => OutcomeKind::Failed,
        }
    }

    /// True when the commitment reached the store.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// Derives commitments and hands them to the store.
pub struct CommitmentGenerator {
    source: Arc<dyn CommitmentSource>,
    store: Arc<dyn CommitmentStore>,
}

impl CommitmentGenerator {
    /// Create a generator over a source and a store.
    pub fn new(source: Arc<dyn CommitmentSource>, store: Arc<dyn CommitmentStore>) -> Self {
        Self { source, store }
    }

    /// The store commitments are appended to.
    pub fn store(&self) -> &Arc<dyn CommitmentStore> {
        &self.store
    }

    /// Generate and record the commitment for `round`.
    ///
    /// Errors are returned as outcomes; nothing here is fatal to the caller.
    pub async fn generate(&self, round: Round, cancel: &CancellationToken) -> RoundOutcome {
        if cancel.is_cancelled() {
            debug!("Round {} cancelled before derivation", round);
            return RoundOutcome::Cancelled;
        }

        let commitment = match self.source.derive().await {
            Ok(c) => c,
            Err(e) => {
                warn!("Round {} derivation on {} failed: {}", round, self.source.curve(), e);
                return RoundOutcome::GenerationFailed(e);
            }
        };

        if cancel.is_cancelled() {
            debug!("Round {} superseded during derivation, dropping commitment", round);
            return RoundOutcome::Superseded;
        }

        debug!("Round {} commitment H={}", round, commitment.public_hex());

        match self.store.append(round, commitment).await {
            Ok(()) => {
                info!("Round {} committed to {} store", round, self.store.name());
                RoundOutcome::Committed
            }
            Err(e) => {
                error!("Round {} not recorded in {} store: {}", round, self.store.name(), e);
                RoundOutcome::StoreFailed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::commit::testing::{FailingStore, ScriptedSource};
    use crate::commit::Secp256k1Source;
    use crate::store::MemoryStore;

    fn generator_with(
        source: Arc<dyn CommitmentSource>,
    ) -> (CommitmentGenerator, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (CommitmentGenerator::new(source, store.clone()), store)
    }

    #[tokio::test]
    async fn test_generate_commits() {
        let (generator, store) = generator_with(Arc::new(Secp256k1Source::new()));
        let cancel = CancellationToken::new();

        let outcome = generator.generate(1, &cancel).await;

        assert!(outcome.is_committed());
        assert_eq!(store.rounds().await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_produces_nothing() {
        let source = Arc::new(ScriptedSource::instant());
        let (generator, store) = generator_with(source.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = generator.generate(1, &cancel).await;

        assert!(matches!(outcome, RoundOutcome::Cancelled));
        assert_eq!(source.calls(), 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_during_derivation_is_dropped() {
        let source = Arc::new(ScriptedSource::with_delays(vec![Duration::from_secs(5)]));
        let (generator, store) = generator_with(source);
        let generator = Arc::new(generator);
        let cancel = CancellationToken::new();

        let task = {
            let generator = generator.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { generator.generate(3, &cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();

        let outcome = task.await.unwrap();
        assert!(matches!(outcome, RoundOutcome::Superseded));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_generation_failure_is_reported() {
        let (generator, store) = generator_with(Arc::new(ScriptedSource::failing_on(vec![0])));
        let outcome = generator.generate(1, &CancellationToken::new()).await;

        assert!(matches!(outcome, RoundOutcome::GenerationFailed(_)));
        assert_eq!(outcome.kind(), OutcomeKind::Failed);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let generator = CommitmentGenerator::new(
            Arc::new(ScriptedSource::instant()),
            Arc::new(FailingStore),
        );
        let outcome = generator.generate(1, &CancellationToken::new()).await;

        assert!(matches!(outcome, RoundOutcome::StoreFailed(StoreError::Io(_))));
        assert_eq!(outcome.kind(), OutcomeKind::Failed);
    }

    #[tokio::test]
    async fn test_duplicate_round_reported_as_store_failure() {
        let (generator, _store) = generator_with(Arc::new(ScriptedSource::instant()));
        let cancel = CancellationToken::new();

        assert!(generator.generate(2, &cancel).await.is_committed());
        let second = generator.generate(2, &cancel).await;

        assert!(matches!(
            second,
            RoundOutcome::StoreFailed(StoreError::DuplicateRound(2))
        ));
    }
}
