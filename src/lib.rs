//! # Commit Beacon
//!
//! Periodic commitment generator: every period it draws a fresh secret
//! scalar, derives the matching curve point and appends the pair to a ledger
//! under an increasing round number.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      COMMIT BEACON                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  commit/         - Commitment derivation                    │
//! │  ├── point.rs    - Scalar/point pairs on secp256k1          │
//! │  └── generator.rs- One round: check, derive, append         │
//! │                                                             │
//! │  store/          - Where commitments are recorded           │
//! │  ├── memory.rs   - In-memory ordered store                  │
//! │  └── ledger.rs   - JSON ledger file                         │
//! │                                                             │
//! │  schedule/       - Round scheduling                         │
//! │  ├── state.rs    - Pure round state machine                 │
//! │  └── scheduler.rs- Ticker loop with preemptive cancellation │
//! │                                                             │
//! │  config.rs       - Beacon configuration                     │
//! │  telemetry.rs    - Tracing subscriber setup                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Round Guarantees
//!
//! - The round counter advances by exactly one per tick.
//! - A round whose task is still running when the next tick fires is
//!   superseded: its token is cancelled and the task is abandoned.
//! - Completion reports are matched by round number, so a late report from a
//!   superseded task is discarded.
//! - Stores key entries by round and reject duplicates, so a late write can
//!   never replace a newer round's entry.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod commit;
pub mod config;
pub mod schedule;
pub mod store;
pub mod telemetry;

// Re-export commonly used types
pub use commit::{
    Commitment, CommitmentGenerator, CommitmentSource, GenerationError, RoundOutcome,
    Secp256k1Source,
};
pub use config::{BeaconConfig, ConfigError};
pub use schedule::{RoundScheduler, RoundSummary, SchedulerError, SchedulerPhase};
pub use store::{CommitmentStore, LedgerStore, MemoryStore, StoreError};

/// Round number. Round 0 is never produced; the first round is 1.
pub type Round = u64;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tick period in seconds.
pub const DEFAULT_PERIOD_SECS: u64 = 10;
