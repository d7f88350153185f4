//! Curve Commitments
//!
//! Derives `(k, k·G)` pairs on secp256k1. The scalar is drawn from the OS
//! entropy source and rejection-sampled into `[1, n)`.

use std::fmt;

use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::{PublicKey, Secp256k1, SecretKey, SignOnly};

/// Curve identifier recorded alongside commitments.
pub const CURVE_NAME: &str = "secp256k1";

/// Compressed SEC1 encoding of the secp256k1 base point `G`.
pub const BASE_POINT_HEX: &str =
    "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

/// Draws that land outside `[1, n)` before giving up.
const MAX_SCALAR_ATTEMPTS: usize = 8;

/// A secret scalar and its public point.
///
/// The secret never appears in `Debug` output or logs.
#[derive(Clone)]
pub struct Commitment {
    secret: SecretKey,
    public: PublicKey,
}

impl Commitment {
    /// Build a commitment from a secret scalar.
    pub fn from_secret(secp: &Secp256k1<SignOnly>, secret: SecretKey) -> Self {
        let public = PublicKey::from_secret_key(secp, &secret);
        Self { secret, public }
    }

    /// The discrete-log secret `k`.
    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    /// The public point `H = k·G`.
    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    /// Compressed public point as lowercase hex.
    pub fn public_hex(&self) -> String {
        hex::encode(self.public.serialize())
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commitment")
            .field("secret", &"<redacted>")
            .field("public", &self.public_hex())
            .finish()
    }
}

/// Errors that can occur while deriving a commitment.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The entropy source could not supply bytes.
    #[error("Entropy source failed: {0}")]
    Entropy(#[from] rand::Error),

    /// Every draw fell outside the scalar field.
    #[error("No valid scalar after {attempts} draws")]
    InvalidScalar {
        /// Number of draws attempted.
        attempts: usize,
    },
}

/// Produces fresh commitments.
///
/// Derivation is treated as one uninterruptible step; callers check for
/// cancellation before and after it.
#[async_trait]
pub trait CommitmentSource: Send + Sync {
    /// Curve name for logging.
    fn curve(&self) -> &'static str;

    /// Derive a fresh commitment.
    async fn derive(&self) -> Result<Commitment, GenerationError>;
}

/// secp256k1 source backed by the OS RNG.
pub struct Secp256k1Source {
    secp: Secp256k1<SignOnly>,
}

impl Secp256k1Source {
    /// Create a new source with its own signing context.
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::signing_only(),
        }
    }

    /// Sample a scalar uniformly from `[1, n)`.
    fn sample_scalar(&self) -> Result<SecretKey, GenerationError> {
        let mut rng = OsRng;
        let mut bytes = [0u8; 32];

        for _ in 0..MAX_SCALAR_ATTEMPTS {
            rng.try_fill_bytes(&mut bytes)?;
            if let Ok(secret) = SecretKey::from_slice(&bytes) {
                return Ok(secret);
            }
        }

        Err(GenerationError::InvalidScalar {
            attempts: MAX_SCALAR_ATTEMPTS,
        })
    }
}

impl Default for Secp256k1Source {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommitmentSource for Secp256k1Source {
    fn curve(&self) -> &'static str {
        CURVE_NAME
    }

    async fn derive(&self) -> Result<Commitment, GenerationError> {
        let secret = self.sample_scalar()?;
        Ok(Commitment::from_secret(&self.secp, secret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(last: u8) -> SecretKey {
        let mut bytes = [0u8; 32];
        bytes[31] = last;
        SecretKey::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_base_point_constant() {
        let secp = Secp256k1::signing_only();
        let g = Commitment::from_secret(&secp, scalar(1));
        assert_eq!(g.public_hex(), BASE_POINT_HEX);
    }

    #[test]
    fn test_public_matches_secret() {
        let secp = Secp256k1::signing_only();
        let c = Commitment::from_secret(&secp, scalar(7));
        let expected = PublicKey::from_secret_key(&secp, &scalar(7));
        assert_eq!(c.public(), &expected);
        assert_eq!(c.secret().secret_bytes(), scalar(7).secret_bytes());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let secp = Secp256k1::signing_only();
        let c = Commitment::from_secret(&secp, scalar(42));
        let shown = format!("{:?}", c);
        assert!(shown.contains("<redacted>"));
        assert!(!shown.contains(&hex::encode(c.secret().secret_bytes())));
    }

    #[tokio::test]
    async fn test_source_derives_distinct_commitments() {
        let source = Secp256k1Source::new();
        let a = source.derive().await.unwrap();
        let b = source.derive().await.unwrap();

        assert_eq!(source.curve(), "secp256k1");
        assert_ne!(a.public(), b.public());
        assert_eq!(a.public_hex().len(), 66);
    }
}
