//! Base58 public key representation.

use std::fmt;

/// The Bitcoin/Solana Base58 alphabet.
pub const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Longest Base58 rendering of a 32-byte public key.
pub const MAX_ENCODED_LEN: usize = 44;

/// Returns true if `c` belongs to the Base58 alphabet.
#[inline]
pub fn is_base58_char(c: char) -> bool {
    // The alphabet is ASCII alphanumerics minus 0, O, I and l.
    c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
}

/// The Base58 text of a public key.
///
/// Always derived from key bytes; there is no way to build one from an
/// arbitrary string outside the crate.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EncodedPublicKey(String);

impl EncodedPublicKey {
    /// Encodes raw public key bytes.
    #[inline]
    pub fn encode(bytes: &[u8]) -> Self {
        Self(bs58::encode(bytes).into_string())
    }

    /// Wraps already-encoded text. Test vectors only.
    #[cfg(test)]
    pub(crate) fn from_encoded(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Returns the encoded text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper, returning the encoded text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for EncodedPublicKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EncodedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncodedPublicKey({})", self.0)
    }
}

impl fmt::Display for EncodedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
