//! Commitment Derivation
//!
//! A commitment is a secret scalar `k` and the public point `H = k·G`.
//! Only `H` is disclosed when the commitment is recorded.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  point.rs      - Commitment type and curve source           │
//! │  generator.rs  - Per-round generation with cancellation     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod generator;
pub mod point;

#[cfg(test)]
pub(crate) mod testing;

pub use generator::{CommitmentGenerator, OutcomeKind, RoundOutcome};
pub use point::{
    Commitment, CommitmentSource, GenerationError, Secp256k1Source, BASE_POINT_HEX, CURVE_NAME,
};
