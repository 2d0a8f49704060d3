//! # sol_vanity
//!
//! Multi-threaded Solana vanity keypair generator.
//!
//! ## Architecture
//!
//! - `crypto`: Ed25519 key generation and Base58 encoding
//! - `matcher`: Pattern validation and prefix matching
//! - `worker`: Parallel search workers and the coordinator racing them
//! - `report`: Rendering results for callers
//! - `config`: Runtime configuration

pub mod config;
pub mod crypto;
pub mod matcher;
pub mod report;
pub mod worker;

pub use config::{Config, ConfigError, SearchConfig};
pub use crypto::{Ed25519Source, EncodedPublicKey, GenerationError, KeySource, Keypair};
pub use matcher::{Pattern, PatternError, Predicate};
pub use report::Report;
pub use worker::{CancelHandle, SearchCoordinator, SearchError, SearchProgress, SearchResult};
