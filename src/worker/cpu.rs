//! CPU worker running the generate-encode-test loop.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::{debug, warn};

use crate::crypto::{GenerationError, KeySource, Keypair};
use crate::matcher::Predicate;

/// Attempts between progress publications.
const PROGRESS_STRIDE: u64 = 256;

/// Lifecycle of a worker. `Matched`, `Cancelled`, `Exhausted` and `Failed`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Idle,
    Running,
    Matched,
    Cancelled,
    /// The per-worker attempt quota ran out
    Exhausted,
    /// The key source returned an error
    Failed,
}

impl WorkerPhase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, WorkerPhase::Idle | WorkerPhase::Running)
    }
}

/// State shared between one worker and the coordinator.
///
/// The worker is the only writer of `progress`; the coordinator is the only
/// writer of `cancelled`.
#[derive(Debug, Default)]
pub struct WorkerState {
    /// Attempts published so far (a lagging view of the worker's counter)
    progress: AtomicU64,
    /// Set by the coordinator to stop the worker
    cancelled: AtomicBool,
}

impl WorkerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the worker stop at its next iteration.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Returns the last published attempt count.
    pub fn progress(&self) -> u64 {
        self.progress.load(Ordering::Relaxed)
    }

    #[inline]
    fn publish(&self, attempts: u64) {
        self.progress.store(attempts, Ordering::Relaxed);
    }
}

/// Terminal events a worker announces to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerSignal {
    Matched(usize),
    Exhausted(usize),
    Failed(usize),
}

/// How a worker's loop ended.
#[derive(Debug)]
pub enum WorkerOutcome {
    Matched(Keypair),
    Cancelled,
    Exhausted,
    Failed(GenerationError),
}

impl WorkerOutcome {
    pub fn phase(&self) -> WorkerPhase {
        match self {
            WorkerOutcome::Matched(_) => WorkerPhase::Matched,
            WorkerOutcome::Cancelled => WorkerPhase::Cancelled,
            WorkerOutcome::Exhausted => WorkerPhase::Exhausted,
            WorkerOutcome::Failed(_) => WorkerPhase::Failed,
        }
    }
}

/// What a worker hands back when its thread finishes.
#[derive(Debug)]
pub struct WorkerReport {
    pub worker_id: usize,
    /// Frozen attempt counter
    pub attempts: u64,
    pub outcome: WorkerOutcome,
}

/// A CPU worker that generates and tests keypairs.
pub struct CpuWorker<S> {
    /// Worker ID
    id: usize,
    /// Where keypairs come from
    source: Arc<S>,
    /// The compiled pattern
    predicate: Predicate,
    /// Attempt limit for this worker, if any
    quota: Option<u64>,
    /// Progress and cancellation shared with the coordinator
    state: Arc<WorkerState>,
    /// Channel to announce terminal events
    signal_tx: Sender<WorkerSignal>,
    /// Local attempt counter
    attempts: u64,
    phase: WorkerPhase,
}

impl<S: KeySource> CpuWorker<S> {
    /// Creates a new CPU worker.
    pub fn new(
        id: usize,
        source: Arc<S>,
        predicate: Predicate,
        quota: Option<u64>,
        state: Arc<WorkerState>,
        signal_tx: Sender<WorkerSignal>,
    ) -> Self {
        Self {
            id,
            source,
            predicate,
            quota,
            state,
            signal_tx,
            attempts: 0,
            phase: WorkerPhase::Idle,
        }
    }

    /// Runs the worker loop until it reaches a terminal phase.
    ///
    /// Cancellation is checked once per iteration, never mid-generation.
    pub fn run(&mut self) -> WorkerOutcome {
        debug!(worker = self.id, quota = ?self.quota, "worker started");
        self.phase = WorkerPhase::Running;

        let outcome = loop {
            if self.state.is_cancelled() {
                break WorkerOutcome::Cancelled;
            }

            if self.quota.is_some_and(|quota| self.attempts >= quota) {
                self.announce(WorkerSignal::Exhausted(self.id));
                break WorkerOutcome::Exhausted;
            }

            let keypair = match self.source.generate() {
                Ok(keypair) => keypair,
                Err(err) => {
                    warn!(worker = self.id, error = %err, "key source failed");
                    self.announce(WorkerSignal::Failed(self.id));
                    break WorkerOutcome::Failed(err);
                }
            };
            let encoded = self.source.encode(keypair.public_key());
            self.attempts += 1;

            if self.predicate.matches(&encoded) {
                debug!(worker = self.id, attempts = self.attempts, key = %encoded, "match found");
                self.announce(WorkerSignal::Matched(self.id));
                break WorkerOutcome::Matched(keypair);
            }

            if self.attempts % PROGRESS_STRIDE == 0 {
                self.state.publish(self.attempts);
            }
        };

        self.state.publish(self.attempts);
        self.phase = outcome.phase();
        debug!(worker = self.id, phase = ?self.phase, attempts = self.attempts, "worker stopped");
        outcome
    }

    /// Runs the loop and packages the frozen counter with the outcome.
    pub fn run_to_report(mut self) -> WorkerReport {
        let outcome = self.run();
        WorkerReport {
            worker_id: self.id,
            attempts: self.attempts,
            outcome,
        }
    }

    fn announce(&self, signal: WorkerSignal) {
        // The coordinator may already be gone.
        let _ = self.signal_tx.send(signal);
    }

    /// Returns the worker ID.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns the attempts made so far.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn phase(&self) -> WorkerPhase {
        self.phase
    }
}
