//! JSON Ledger Store
//!
//! Persists the public half of each round's commitment to a JSON document:
//!
//! ```text
//! {
//!   "curve": "secp256k1",
//!   "base": "0279be66...",
//!   "entries": {
//!     "1": { "round": 1, "commitment": "03ab...", "recorded_at": "..." },
//!     "2": { ... }
//!   }
//! }
//! ```
//!
//! The file is created with an empty ledger when opened for the first time.
//! Every append rewrites the whole document through a temporary file and a
//! rename, so readers never observe a partially written ledger. Secrets are
//! not persisted.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{CommitmentStore, StoreError};
use crate::commit::{Commitment, BASE_POINT_HEX, CURVE_NAME};
use crate::Round;

/// One recorded round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Round number.
    pub round: Round,
    /// Compressed public point, hex.
    pub commitment: String,
    /// When the entry was appended.
    pub recorded_at: DateTime<Utc>,
}

/// Whole ledger file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerDocument {
    /// Curve the points live on.
    pub curve: String,
    /// Base point `G`, hex.
    pub base: String,
    /// Entries keyed by round.
    pub entries: BTreeMap<Round, LedgerEntry>,
}

impl LedgerDocument {
    /// An empty ledger for the beacon's curve.
    pub fn empty() -> Self {
        Self {
            curve: CURVE_NAME.to_string(),
            base: BASE_POINT_HEX.to_string(),
            entries: BTreeMap::new(),
        }
    }
}

/// File-backed ledger.
pub struct LedgerStore {
    path: PathBuf,
    document: Mutex<LedgerDocument>,
}

impl LedgerStore {
    /// Open the ledger at `path`, creating it if missing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let document = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let document: LedgerDocument = serde_json::from_slice(&bytes)?;
                info!(
                    "Loaded ledger {} with {} entries",
                    path.display(),
                    document.entries.len()
                );
                document
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                let document = LedgerDocument::empty();
                write_document(&path, &document).await?;
                info!("Created ledger {}", path.display());
                document
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    /// Ledger file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of all entries in round order.
    pub async fn entries(&self) -> Vec<LedgerEntry> {
        self.document.lock().await.entries.values().cloned().collect()
    }
}

#[async_trait]
impl CommitmentStore for LedgerStore {
    fn name(&self) -> &'static str {
        "ledger"
    }

    async fn append(&self, round: Round, commitment: Commitment) -> Result<(), StoreError> {
        let mut document = self.document.lock().await;
        if document.entries.contains_key(&round) {
            return Err(StoreError::DuplicateRound(round));
        }

        let entry = LedgerEntry {
            round,
            commitment: commitment.public_hex(),
            recorded_at: Utc::now(),
        };
        document.entries.insert(round, entry);

        // Keep memory and disk in step: drop the entry if the write fails.
        if let Err(e) = write_document(&self.path, &document).await {
            document.entries.remove(&round);
            return Err(e);
        }

        debug!("Ledger {} recorded round {}", self.path.display(), round);
        Ok(())
    }

    async fn rounds(&self) -> Result<Vec<Round>, StoreError> {
        Ok(self.document.lock().await.entries.keys().copied().collect())
    }
}

/// Write `document` to `path` via a sibling temp file.
async fn write_document(path: &Path, document: &LedgerDocument) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(document)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
