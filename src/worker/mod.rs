//! Parallel vanity search.
//!
//! This module provides:
//! - CPU workers running the generate-encode-test loop
//! - The coordinator that races them to the first match
//! - Attempt accounting, bounds and cancellation

mod cpu;
mod pool;

pub use cpu::{CpuWorker, WorkerOutcome, WorkerPhase, WorkerReport, WorkerSignal, WorkerState};
pub use pool::{Bound, CancelHandle, SearchCoordinator, SearchError, SearchProgress, SearchResult};
