//! Ed25519 keypair generation.

use ed25519_dalek::SigningKey;
use rand::RngCore;

use super::EncodedPublicKey;

/// Length of an Ed25519 seed (the private key proper).
pub const SEED_LEN: usize = 32;
/// Length of an Ed25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;
/// Length of a Solana secret key (`seed || public_key`).
pub const SECRET_KEY_LEN: usize = SEED_LEN + PUBLIC_KEY_LEN;

/// Failure of the underlying random source.
#[derive(Debug, thiserror::Error)]
#[error("keypair generation failed: {0}")]
pub struct GenerationError(String);

impl GenerationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl From<rand::Error> for GenerationError {
    fn from(err: rand::Error) -> Self {
        Self(err.to_string())
    }
}

/// Represents a Solana keypair (Ed25519 seed + derived public key).
#[derive(Clone, PartialEq, Eq)]
pub struct Keypair {
    /// The private seed bytes (32 bytes)
    seed: [u8; SEED_LEN],
    /// The derived public key (32 bytes)
    public_key: [u8; PUBLIC_KEY_LEN],
}

impl Keypair {
    /// Generates a new random keypair.
    ///
    /// The seed comes from the calling thread's CSPRNG, so concurrent
    /// workers draw from independent streams.
    #[inline]
    pub fn generate() -> Result<Self, GenerationError> {
        let mut seed = [0u8; SEED_LEN];
        rand::thread_rng().try_fill_bytes(&mut seed)?;
        Ok(Self::from_seed(seed))
    }

    /// Derives a keypair from an existing seed.
    pub fn from_seed(seed: [u8; SEED_LEN]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self {
            seed,
            public_key: signing_key.verifying_key().to_bytes(),
        }
    }

    /// Returns the private seed bytes.
    pub fn seed(&self) -> &[u8; SEED_LEN] {
        &self.seed
    }

    /// Returns the public key bytes.
    #[inline]
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public_key
    }

    /// Returns the 64-byte Solana secret key (`seed || public_key`).
    pub fn secret_key_bytes(&self) -> [u8; SECRET_KEY_LEN] {
        let mut bytes = [0u8; SECRET_KEY_LEN];
        bytes[..SEED_LEN].copy_from_slice(&self.seed);
        bytes[SEED_LEN..].copy_from_slice(&self.public_key);
        bytes
    }

    /// Returns the private seed as a hex string.
    pub fn seed_hex(&self) -> String {
        hex::encode(self.seed)
    }

    /// Returns the Base58 text of the public key.
    pub fn encoded_public_key(&self) -> EncodedPublicKey {
        EncodedPublicKey::encode(&self.public_key)
    }
}

// The seed never appears in debug output.
impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.encoded_public_key())
            .finish_non_exhaustive()
    }
}
