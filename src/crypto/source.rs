//! Keypair sources consumed by the search workers.

use super::{EncodedPublicKey, GenerationError, Keypair, PUBLIC_KEY_LEN};

/// Supplies fresh keypairs and the textual form of their public keys.
///
/// Implementations must be safe to call from many worker threads at once
/// without correlating their output.
pub trait KeySource: Send + Sync {
    /// Generates a fresh random keypair.
    fn generate(&self) -> Result<Keypair, GenerationError>;

    /// Encodes public key bytes into their textual form.
    #[inline]
    fn encode(&self, public_key: &[u8; PUBLIC_KEY_LEN]) -> EncodedPublicKey {
        EncodedPublicKey::encode(public_key)
    }
}

/// The default source: Ed25519 keys seeded from the thread-local CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Source;

impl KeySource for Ed25519Source {
    #[inline]
    fn generate(&self) -> Result<Keypair, GenerationError> {
        Keypair::generate()
    }
}
