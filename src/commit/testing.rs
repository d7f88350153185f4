//! Test doubles for sources and stores.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::point::{Commitment, CommitmentSource, GenerationError, Secp256k1Source};
use crate::store::{CommitmentStore, StoreError};
use crate::Round;

/// Source whose n-th derivation sleeps for `delays[n]` and optionally fails.
pub struct ScriptedSource {
    inner: Secp256k1Source,
    delays: Vec<Duration>,
    fail_on: Vec<usize>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn instant() -> Self {
        Self::with_delays(Vec::new())
    }

    pub fn with_delays(delays: Vec<Duration>) -> Self {
        Self {
            inner: Secp256k1Source::new(),
            delays,
            fail_on: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(fail_on: Vec<usize>) -> Self {
        Self {
            fail_on,
            ..Self::instant()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommitmentSource for ScriptedSource {
    fn curve(&self) -> &'static str {
        "scripted"
    }

    async fn derive(&self) -> Result<Commitment, GenerationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(call).copied() {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        if self.fail_on.contains(&call) {
            let reason = format!("scripted failure on call {}", call);
            return Err(GenerationError::Entropy(rand::Error::new(reason)));
        }

        self.inner.derive().await
    }
}

/// Store that rejects every append.
pub struct FailingStore;

#[async_trait]
impl CommitmentStore for FailingStore {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn append(&self, _round: Round, _commitment: Commitment) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk unavailable",
        )))
    }

    async fn rounds(&self) -> Result<Vec<Round>, StoreError> {
        Ok(Vec::new())
    }
}
