//! Search coordination: racing workers to the first match.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, SearchConfig};
use crate::crypto::{Ed25519Source, GenerationError, KeySource, Keypair};
use crate::matcher::{Pattern, PatternError, Predicate};

use super::cpu::{CpuWorker, WorkerOutcome, WorkerReport, WorkerSignal, WorkerState};

/// How often the coordinator wakes to check deadlines and cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Errors that end a search without a result.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] PatternError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("no match after {attempts} attempts ({bound} reached)")]
    SearchExhausted { attempts: u64, bound: Bound },

    #[error("worker {worker_id} failed after {attempts} total attempts: {source}")]
    Generation {
        worker_id: usize,
        attempts: u64,
        #[source]
        source: GenerationError,
    },

    #[error("search cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },

    #[error("failed to start worker {worker_id}: {source}")]
    Spawn {
        worker_id: usize,
        #[source]
        source: io::Error,
    },

    #[error("worker {worker_id} panicked")]
    WorkerPanicked { worker_id: usize },
}

impl SearchError {
    /// Attempts made before the search ended, where known.
    pub fn attempts(&self) -> Option<u64> {
        match self {
            SearchError::SearchExhausted { attempts, .. }
            | SearchError::Generation { attempts, .. }
            | SearchError::Cancelled { attempts } => Some(*attempts),
            SearchError::InvalidPattern(_) => Some(0),
            _ => None,
        }
    }
}

/// Which configured bound stopped a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    MaxAttempts,
    MaxDuration,
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bound::MaxAttempts => write!(f, "max attempts"),
            Bound::MaxDuration => write!(f, "max duration"),
        }
    }
}

/// Result of a successful search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The winning keypair
    pub keypair: Keypair,
    /// Attempts across all workers, including cancelled ones
    pub total_attempts: u64,
    /// Wall-clock time from start to the last worker stopping
    pub elapsed: Duration,
    /// The ID of the worker that found the match
    pub worker_id: usize,
    /// Each worker's frozen attempt counter, indexed by worker ID
    pub worker_attempts: Vec<u64>,
}

impl SearchResult {
    /// Returns the average generation rate (keys per second).
    pub fn keys_per_second(&self) -> f64 {
        let elapsed = self.elapsed.as_secs_f64();
        if elapsed > 0.0 {
            self.total_attempts as f64 / elapsed
        } else {
            0.0
        }
    }
}

/// A snapshot of a running search.
#[derive(Debug, Clone, Copy)]
pub struct SearchProgress {
    /// Attempts published by workers so far (may lag slightly)
    pub attempts: u64,
    pub elapsed: Duration,
    /// Expected attempts for a match
    pub difficulty: f64,
}

impl SearchProgress {
    /// Returns the current generation rate (keys per second).
    pub fn keys_per_second(&self) -> f64 {
        let elapsed = self.elapsed.as_secs_f64();
        if elapsed > 0.0 {
            self.attempts as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Probability that a match would have been found by now.
    pub fn probability(&self) -> f64 {
        if self.difficulty > 0.0 {
            1.0 - (-(self.attempts as f64) / self.difficulty).exp()
        } else {
            1.0
        }
    }
}

/// Lets another thread (e.g. a signal handler) stop one search.
///
/// Each search takes its own handle; a cancel issued before the search
/// starts still applies.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Why the coordinator stopped waiting.
enum Finish {
    Matched(usize),
    Failed(usize),
    Exhausted(Bound),
    Cancelled,
    WorkersLost,
}

/// Runs vanity searches over a key source.
///
/// Holds no per-search state, so one coordinator can serve concurrent
/// searches.
pub struct SearchCoordinator<S = Ed25519Source> {
    source: Arc<S>,
}

impl Default for SearchCoordinator<Ed25519Source> {
    fn default() -> Self {
        Self::new(Ed25519Source)
    }
}

impl<S: KeySource + 'static> SearchCoordinator<S> {
    /// Creates a coordinator drawing keys from `source`.
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    /// Searches for a keypair whose encoded public key starts with `pattern`.
    pub fn search(
        &self,
        pattern: &str,
        config: &SearchConfig,
    ) -> Result<SearchResult, SearchError> {
        self.search_with_progress(pattern, config, &CancelHandle::new(), |_| {})
    }

    /// Like [`search`](Self::search), stopping when `cancel` fires and calling
    /// `on_progress` every `config.progress_interval` while workers run.
    pub fn search_with_progress<F>(
        &self,
        pattern: &str,
        config: &SearchConfig,
        cancel: &CancelHandle,
        mut on_progress: F,
    ) -> Result<SearchResult, SearchError>
    where
        F: FnMut(&SearchProgress),
    {
        config.validate()?;
        let pattern = Pattern::new(pattern, config.case_sensitive)?;
        let predicate = pattern.compile();
        let difficulty = pattern.estimated_difficulty();

        if cancel.is_cancelled() {
            info!(pattern = %pattern, "search cancelled before start");
            return Err(SearchError::Cancelled { attempts: 0 });
        }

        let start = Instant::now();
        let pool = WorkerPool::spawn(&self.source, &predicate, config)?;
        info!(pattern = %pattern, workers = pool.states.len(), "search started");

        let deadline = config.max_duration.map(|d| start + d);
        let mut last_progress = start;
        let mut exhausted = 0;

        let finish = loop {
            let now = Instant::now();
            if deadline.is_some_and(|d| now >= d) {
                break Finish::Exhausted(Bound::MaxDuration);
            }
            if cancel.is_cancelled() {
                break Finish::Cancelled;
            }
            if now.duration_since(last_progress) >= config.progress_interval {
                last_progress = now;
                on_progress(&SearchProgress {
                    attempts: pool.published_attempts(),
                    elapsed: start.elapsed(),
                    difficulty,
                });
            }

            let wait = deadline.map_or(POLL_INTERVAL, |d| {
                POLL_INTERVAL.min(d.saturating_duration_since(now))
            });
            match pool.signal_rx.recv_timeout(wait) {
                Ok(WorkerSignal::Matched(id)) => break Finish::Matched(id),
                Ok(WorkerSignal::Failed(id)) => break Finish::Failed(id),
                Ok(WorkerSignal::Exhausted(id)) => {
                    debug!(worker = id, "worker quota exhausted");
                    exhausted += 1;
                    if exhausted == pool.states.len() {
                        break Finish::Exhausted(Bound::MaxAttempts);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break Finish::WorkersLost,
            }
        };

        let reports = pool.shutdown()?;
        let elapsed = start.elapsed();
        let attempts: u64 = reports.iter().map(|r| r.attempts).sum();

        match finish {
            Finish::Matched(winner) => {
                let worker_attempts = reports.iter().map(|r| r.attempts).collect();
                let keypair = reports
                    .into_iter()
                    .find(|r| r.worker_id == winner)
                    .and_then(|r| match r.outcome {
                        WorkerOutcome::Matched(keypair) => Some(keypair),
                        _ => None,
                    })
                    .ok_or(SearchError::WorkerPanicked { worker_id: winner })?;

                info!(
                    key = %keypair.encoded_public_key(),
                    attempts,
                    worker = winner,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "match found"
                );
                Ok(SearchResult {
                    keypair,
                    total_attempts: attempts,
                    elapsed,
                    worker_id: winner,
                    worker_attempts,
                })
            }
            Finish::Failed(worker_id) => {
                let source = reports
                    .into_iter()
                    .find(|r| r.worker_id == worker_id)
                    .and_then(|r| match r.outcome {
                        WorkerOutcome::Failed(err) => Some(err),
                        _ => None,
                    })
                    .ok_or(SearchError::WorkerPanicked { worker_id })?;
                Err(SearchError::Generation {
                    worker_id,
                    attempts,
                    source,
                })
            }
            Finish::Exhausted(bound) => {
                info!(attempts, %bound, "search exhausted");
                Err(SearchError::SearchExhausted { attempts, bound })
            }
            Finish::Cancelled => {
                info!(attempts, "search cancelled");
                Err(SearchError::Cancelled { attempts })
            }
            // Every sender dropped without a terminal signal.
            Finish::WorkersLost => Err(SearchError::WorkerPanicked { worker_id: 0 }),
        }
    }
}

/// The workers of one search invocation.
struct WorkerPool {
    /// Worker thread handles (Option to allow taking during join)
    handles: Option<Vec<JoinHandle<WorkerReport>>>,
    /// Per-worker progress and cancellation
    states: Vec<Arc<WorkerState>>,
    /// Terminal signals from workers
    signal_rx: Receiver<WorkerSignal>,
}

impl WorkerPool {
    /// Spawns one named thread per worker.
    fn spawn<S: KeySource + 'static>(
        source: &Arc<S>,
        predicate: &Predicate,
        config: &SearchConfig,
    ) -> Result<Self, SearchError> {
        Self::spawn_with(source, predicate, config, |id, worker| {
            thread::Builder::new()
                .name(format!("vanity-worker-{}", id))
                .spawn(move || worker.run_to_report())
        })
    }

    /// Spawns every worker through `spawn_thread`.
    ///
    /// Fails if any worker cannot start; workers already running are
    /// cancelled and joined when the partial pool drops.
    fn spawn_with<S, F>(
        source: &Arc<S>,
        predicate: &Predicate,
        config: &SearchConfig,
        mut spawn_thread: F,
    ) -> Result<Self, SearchError>
    where
        S: KeySource + 'static,
        F: FnMut(usize, CpuWorker<S>) -> io::Result<JoinHandle<WorkerReport>>,
    {
        let num_workers = config.effective_workers();
        // Each worker signals at most once, so sends never block.
        let (signal_tx, signal_rx) = bounded(num_workers);

        let mut pool = Self {
            handles: Some(Vec::with_capacity(num_workers)),
            states: Vec::with_capacity(num_workers),
            signal_rx,
        };

        for id in 0..num_workers {
            let state = Arc::new(WorkerState::new());
            let worker = CpuWorker::new(
                id,
                source.clone(),
                predicate.clone(),
                config.worker_quota(id),
                state.clone(),
                signal_tx.clone(),
            );

            let handle = spawn_thread(id, worker).map_err(|err| {
                warn!(worker = id, error = %err, "failed to spawn worker thread");
                SearchError::Spawn {
                    worker_id: id,
                    source: err,
                }
            })?;
            pool.states.push(state);
            if let Some(handles) = pool.handles.as_mut() {
                handles.push(handle);
            }
        }

        Ok(pool)
    }

    /// Sum of the attempt counts workers have published so far.
    fn published_attempts(&self) -> u64 {
        self.states.iter().map(|s| s.progress()).sum()
    }

    /// Signals all workers to stop.
    fn stop(&self) {
        for state in &self.states {
            state.cancel();
        }
    }

    /// Cancels every worker and collects their reports in ID order.
    fn shutdown(mut self) -> Result<Vec<WorkerReport>, SearchError> {
        self.stop();
        let handles = self.handles.take().unwrap_or_default();

        let mut reports = Vec::with_capacity(handles.len());
        let mut panicked = None;
        for (worker_id, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(report) => reports.push(report),
                Err(_) => {
                    panicked.get_or_insert(worker_id);
                }
            }
        }

        match panicked {
            Some(worker_id) => Err(SearchError::WorkerPanicked { worker_id }),
            None => Ok(reports),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
        // Wait for workers to finish if they haven't been joined
        if let Some(handles) = self.handles.take() {
            for handle in handles {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    /// Counts `generate` calls on top of the real source.
    #[derive(Default)]
    struct CountingSource {
        generated: AtomicU64,
    }

    impl KeySource for CountingSource {
        fn generate(&self) -> Result<Keypair, GenerationError> {
            self.generated.fetch_add(1, Ordering::Relaxed);
            Keypair::generate()
        }
    }

    /// Succeeds `limit` times, then fails forever.
    struct FailingSource {
        remaining: AtomicU64,
    }

    impl KeySource for FailingSource {
        fn generate(&self) -> Result<Keypair, GenerationError> {
            let ok = self
                .remaining
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
                .is_ok();
            if ok {
                Keypair::generate()
            } else {
                Err(GenerationError::new("entropy source unavailable"))
            }
        }
    }

    fn config(workers: usize) -> SearchConfig {
        SearchConfig::default().with_workers(workers)
    }

    #[test]
    fn test_empty_pattern_matches_immediately() {
        let coordinator = SearchCoordinator::new(Ed25519Source);
        let result = coordinator.search("", &config(2)).unwrap();
        assert!(result.total_attempts >= 1);
        assert_eq!(result.worker_attempts.len(), 2);
        assert_eq!(result.worker_attempts.iter().sum::<u64>(), result.total_attempts);
        assert!(result.worker_attempts[result.worker_id] >= 1);
    }

    #[test]
    fn test_invalid_pattern_spawns_nothing() {
        let coordinator = SearchCoordinator::new(CountingSource::default());
        let err = coordinator.search("!!!", &config(4)).unwrap_err();
        assert!(matches!(
            err,
            SearchError::InvalidPattern(PatternError::InvalidCharacter { ch: '!', position: 0 })
        ));
        assert_eq!(coordinator.source.generated.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_invalid_config_spawns_nothing() {
        let coordinator = SearchCoordinator::new(CountingSource::default());
        let err = coordinator.search("a", &config(0)).unwrap_err();
        assert!(matches!(err, SearchError::InvalidConfig(ConfigError::ZeroWorkers)));
        assert_eq!(coordinator.source.generated.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_max_attempts_exhausts() {
        let coordinator = SearchCoordinator::new(Ed25519Source);
        let err = coordinator
            .search("zzzzzzzz", &config(1).with_max_attempts(10))
            .unwrap_err();
        match err {
            SearchError::SearchExhausted { attempts, bound } => {
                assert_eq!(attempts, 10);
                assert_eq!(bound, Bound::MaxAttempts);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_max_attempts_split_across_workers() {
        let coordinator = SearchCoordinator::new(CountingSource::default());
        let err = coordinator
            .search("zzzzzzzz", &config(4).with_max_attempts(10))
            .unwrap_err();
        assert_eq!(err.attempts(), Some(10));
        assert_eq!(coordinator.source.generated.load(Ordering::Relaxed), 10);
    }

    #[test]
    fn test_max_duration_exhausts() {
        let coordinator = SearchCoordinator::new(Ed25519Source);
        let err = coordinator
            .search(
                "zzzzzzzz",
                &config(2).with_max_duration(Duration::from_millis(200)),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            SearchError::SearchExhausted {
                bound: Bound::MaxDuration,
                ..
            }
        ));
    }

    #[test]
    fn test_four_workers_find_two_char_prefix() {
        let coordinator = SearchCoordinator::new(Ed25519Source);
        let result = coordinator.search("ab", &config(4)).unwrap();

        let key = result.keypair.encoded_public_key();
        assert!(key.as_str().to_ascii_lowercase().starts_with("ab"));
        assert_eq!(result.worker_attempts.len(), 4);
        assert!(result.worker_id < 4);
        assert!(result.total_attempts >= 1);
    }

    #[test]
    fn test_cancelled_workers_attempts_are_counted() {
        let coordinator = SearchCoordinator::new(CountingSource::default());
        // Thousands of attempts on average, so every sibling gets to run.
        let result = coordinator.search("abc", &config(4)).unwrap();

        let losers: Vec<u64> = result
            .worker_attempts
            .iter()
            .enumerate()
            .filter(|&(id, _)| id != result.worker_id)
            .map(|(_, &attempts)| attempts)
            .collect();
        assert_eq!(losers.len(), 3);
        assert!(losers.iter().any(|&attempts| attempts > 0));

        // Every generated keypair was tested and counted exactly once.
        let generated = coordinator.source.generated.load(Ordering::Relaxed);
        assert_eq!(result.total_attempts, generated);
    }

    #[test]
    fn test_case_sensitive_search() {
        let coordinator = SearchCoordinator::new(Ed25519Source);
        let result = coordinator.search("A", &config(2).case_sensitive(true)).unwrap();
        assert!(result.keypair.encoded_public_key().as_str().starts_with('A'));
    }

    #[test]
    fn test_generation_failure_aborts_search() {
        let coordinator = SearchCoordinator::new(FailingSource {
            remaining: AtomicU64::new(5),
        });
        let err = coordinator.search("zzzzzzzz", &config(3)).unwrap_err();
        match err {
            SearchError::Generation { attempts, .. } => assert_eq!(attempts, 5),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cancel_handle_stops_search() {
        let coordinator = SearchCoordinator::new(Ed25519Source);
        let cancel = CancelHandle::new();
        let handle = cancel.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            handle.cancel();
        });

        let err = coordinator
            .search_with_progress("zzzzzzzz", &config(2), &cancel, |_| {})
            .unwrap_err();
        canceller.join().unwrap();
        assert!(matches!(err, SearchError::Cancelled { .. }));
    }

    #[test]
    fn test_cancel_before_start() {
        let coordinator = SearchCoordinator::new(CountingSource::default());
        let cancel = CancelHandle::new();
        cancel.cancel();

        let search_config = config(1).with_max_duration(Duration::from_millis(300));
        let err = coordinator
            .search_with_progress("zzzzzzzz", &search_config, &cancel, |_| {})
            .unwrap_err();
        assert!(matches!(err, SearchError::Cancelled { attempts: 0 }));
        assert_eq!(coordinator.source.generated.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_cancel_only_affects_its_own_search() {
        let coordinator = Arc::new(SearchCoordinator::new(Ed25519Source));

        let other = coordinator.clone();
        let bounded_search = thread::spawn(move || {
            let search_config = config(1).with_max_duration(Duration::from_millis(500));
            other.search("zzzzzzzz", &search_config)
        });

        let cancel = CancelHandle::new();
        let handle = cancel.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            handle.cancel();
        });

        let cancelled = coordinator
            .search_with_progress("zzzzzzzz", &config(1), &cancel, |_| {})
            .unwrap_err();
        canceller.join().unwrap();
        assert!(matches!(cancelled, SearchError::Cancelled { .. }));

        let untouched = bounded_search.join().unwrap().unwrap_err();
        assert!(matches!(
            untouched,
            SearchError::SearchExhausted {
                bound: Bound::MaxDuration,
                ..
            }
        ));
    }

    #[test]
    fn test_spawn_failure_is_reported_and_stops_started_workers() {
        let source = Arc::new(CountingSource::default());
        let predicate = crate::matcher::compile("zzzzzzzz", false).unwrap();
        let search_config = config(4).with_max_attempts(1_000_000);

        let outcome = WorkerPool::spawn_with(&source, &predicate, &search_config, |id, worker| {
            if id == 2 {
                return Err(io::Error::new(io::ErrorKind::Other, "thread limit reached"));
            }
            thread::Builder::new().spawn(move || worker.run_to_report())
        });

        match outcome {
            Err(SearchError::Spawn { worker_id, .. }) => assert_eq!(worker_id, 2),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("pool started despite a failed worker"),
        }

        // Workers 0 and 1 were cancelled and joined before the error returned.
        let generated = source.generated.load(Ordering::Relaxed);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(source.generated.load(Ordering::Relaxed), generated);
    }

    #[test]
    fn test_progress_reported() {
        let coordinator = SearchCoordinator::new(Ed25519Source);
        let mut search_config = config(1).with_max_duration(Duration::from_millis(300));
        search_config.progress_interval = Duration::from_millis(50);

        let mut snapshots = Vec::new();
        let err = coordinator
            .search_with_progress("zzzzzzzz", &search_config, &CancelHandle::new(), |p| {
                snapshots.push(*p)
            })
            .unwrap_err();

        assert!(!snapshots.is_empty());
        assert!(snapshots.windows(2).all(|w| w[0].attempts <= w[1].attempts));
        let last = snapshots.last().unwrap();
        assert!(last.attempts <= err.attempts().unwrap());
        assert!(last.probability() < 0.01);
    }
}
