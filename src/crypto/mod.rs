//! Cryptographic operations for Solana keypair generation.
//!
//! This module provides:
//! - Secure random Ed25519 key generation
//! - Base58 public key encoding
//! - The `KeySource` seam the search engine draws keypairs from

mod encoding;
mod keypair;
mod source;

pub use encoding::{is_base58_char, EncodedPublicKey, BASE58_ALPHABET, MAX_ENCODED_LEN};
pub use keypair::{GenerationError, Keypair, PUBLIC_KEY_LEN, SECRET_KEY_LEN, SEED_LEN};
pub use source::{Ed25519Source, KeySource};
