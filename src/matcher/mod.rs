//! Pattern matching for Base58 public keys.
//!
//! Patterns are validated against the Base58 alphabet up front and compiled
//! into a prefix predicate, case-insensitive unless requested otherwise.

mod pattern;

pub use pattern::{compile, Pattern, PatternError, Predicate};
