//! Pattern validation and prefix matching.

use std::fmt;

use crate::crypto::{is_base58_char, EncodedPublicKey, MAX_ENCODED_LEN};

const ALPHABET_SIZE: f64 = 58.0;

/// Why a pattern was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("invalid character {ch:?} at position {position}: not in the Base58 alphabet")]
    InvalidCharacter { ch: char, position: usize },

    #[error("pattern is {len} characters long, but an encoded public key has at most {max}")]
    TooLong { len: usize, max: usize },
}

/// A validated prefix pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// The pattern as typed by the caller
    text: String,
    /// Whether matching is case sensitive
    case_sensitive: bool,
}

impl Pattern {
    /// Validates and creates a new pattern.
    ///
    /// In case-insensitive mode a character is accepted when either of its
    /// ASCII cases is in the alphabet, since that case can still match.
    pub fn new(text: impl Into<String>, case_sensitive: bool) -> Result<Self, PatternError> {
        let text = text.into();

        let len = text.chars().count();
        if len > MAX_ENCODED_LEN {
            return Err(PatternError::TooLong {
                len,
                max: MAX_ENCODED_LEN,
            });
        }

        for (position, ch) in text.chars().enumerate() {
            let valid = if case_sensitive {
                is_base58_char(ch)
            } else {
                is_base58_char(ch.to_ascii_lowercase()) || is_base58_char(ch.to_ascii_uppercase())
            };
            if !valid {
                return Err(PatternError::InvalidCharacter { ch, position });
            }
        }

        Ok(Self {
            text,
            case_sensitive,
        })
    }

    /// Returns the pattern string as given.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Compiles the pattern into a predicate over encoded keys.
    pub fn compile(&self) -> Predicate {
        let prefix = if self.case_sensitive {
            self.text.clone()
        } else {
            self.text.to_ascii_lowercase()
        };

        Predicate {
            prefix: prefix.into_bytes().into_boxed_slice(),
            case_sensitive: self.case_sensitive,
        }
    }

    /// Returns the estimated number of attempts to find a match.
    ///
    /// Treats every position as uniform over the alphabet. Base58 renderings
    /// of fixed-size keys skew the leading character, so this is a rough
    /// guide only.
    pub fn estimated_difficulty(&self) -> f64 {
        self.text
            .chars()
            .map(|c| ALPHABET_SIZE / self.matching_chars(c) as f64)
            .product()
    }

    /// Number of alphabet characters that satisfy pattern character `c`.
    fn matching_chars(&self, c: char) -> usize {
        if self.case_sensitive || c.to_ascii_lowercase() == c.to_ascii_uppercase() {
            return 1;
        }
        [c.to_ascii_lowercase(), c.to_ascii_uppercase()]
            .into_iter()
            .filter(|&v| is_base58_char(v))
            .count()
    }

    /// Returns a human-readable difficulty estimate.
    pub fn difficulty_description(&self) -> String {
        let diff = self.estimated_difficulty();
        if diff <= 1_000.0 {
            "Very Easy (< 1 second)".into()
        } else if diff <= 100_000.0 {
            "Easy (seconds)".into()
        } else if diff <= 10_000_000.0 {
            "Medium (minutes)".into()
        } else if diff <= 1_000_000_000.0 {
            "Hard (hours)".into()
        } else {
            "Very Hard (days or more)".into()
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.case_sensitive {
            "case-sensitive"
        } else {
            "case-insensitive"
        };
        write!(f, "{} ({})", self.text, mode)
    }
}

/// A compiled prefix test over encoded public keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    /// Prefix bytes, lowercased when case insensitive
    prefix: Box<[u8]>,
    case_sensitive: bool,
}

impl Predicate {
    /// Tests an encoded public key.
    #[inline]
    pub fn matches(&self, key: &EncodedPublicKey) -> bool {
        self.matches_str(key.as_str())
    }

    /// Tests raw encoded text.
    #[inline]
    pub fn matches_str(&self, key: &str) -> bool {
        let Some(head) = key.as_bytes().get(..self.prefix.len()) else {
            return false;
        };
        if self.case_sensitive {
            head == &*self.prefix
        } else {
            head.eq_ignore_ascii_case(&self.prefix)
        }
    }
}

/// Validates `text` and compiles it in one step.
pub fn compile(text: &str, case_sensitive: bool) -> Result<Predicate, PatternError> {
    Ok(Pattern::new(text, case_sensitive)?.compile())
}
