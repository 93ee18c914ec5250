//! Worker pool for asynchronous and outside-UI dispatch.
//!
//! The pool is a thin wrapper over rayon's work-stealing scheduler, sized to
//! the available processor count by default. Every router owns its own pool;
//! there is no process-wide instance.
//!
//! Callers observe a submitted dispatch through a [`DispatchHandle`], which
//! provides a promise-like interface: block with [`wait`](DispatchHandle::wait),
//! bound the wait with [`wait_timeout`](DispatchHandle::wait_timeout), or poll
//! with [`try_outcome`](DispatchHandle::try_outcome).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, TryRecvError, bounded};
use parking_lot::{Condvar, Mutex};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::RouterError;

/// Configuration for the dispatch worker pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads. `None` means use the number of CPU cores.
    pub num_threads: Option<usize>,
    /// Name prefix for worker threads.
    pub thread_name: String,
    /// Stack size for worker threads in bytes.
    pub stack_size: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            thread_name: "griffon-dispatch".to_string(),
            stack_size: None,
        }
    }
}

impl PoolConfig {
    /// Create a configuration with an explicit thread count.
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
            ..Default::default()
        }
    }
}

/// The worker pool servicing `Async` and pooled `OutsideUi` dispatch.
pub(crate) struct DispatchPool {
    pool: ThreadPool,
    submitted: Arc<AtomicU64>,
}

impl DispatchPool {
    pub(crate) fn new(config: PoolConfig) -> Result<Self, RouterError> {
        let mut builder = ThreadPoolBuilder::new()
            .thread_name(move |index| format!("{}-{}", config.thread_name, index));

        if let Some(num_threads) = config.num_threads {
            builder = builder.num_threads(num_threads);
        }

        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let pool = builder
            .build()
            .map_err(|e| RouterError::PoolCreation(e.to_string()))?;

        tracing::debug!(
            target: "griffon_events::pool",
            num_threads = pool.current_num_threads(),
            "dispatch pool created"
        );

        Ok(Self {
            pool,
            submitted: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Number of worker threads in the pool.
    pub(crate) fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Total number of jobs handed to the pool since creation.
    pub(crate) fn submitted_jobs(&self) -> u64 {
        self.submitted.load(Ordering::Acquire)
    }

    /// Run a dispatch job on a worker thread.
    pub(crate) fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.submitted.fetch_add(1, Ordering::AcqRel);
        self.pool.spawn(job);
    }
}

impl std::fmt::Debug for DispatchPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchPool")
            .field("num_threads", &self.num_threads())
            .field("submitted_jobs", &self.submitted_jobs())
            .finish()
    }
}

/// How a single dispatch job finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The job ran its handler batch.
    Completed {
        /// Handlers that were invoked (after filtering).
        invoked: usize,
        /// Handlers whose callbacks returned an error.
        failed: usize,
    },
    /// Publishing was disabled at publish time; nothing ran.
    Disabled,
}

/// Wakeup primitive pairing the completion channel.
///
/// The channel alone cannot block efficiently across threads, so completion
/// is signalled under a mutex/condvar pair in addition to sending the value.
#[derive(Debug)]
struct Wakeup {
    ready: AtomicBool,
    condvar: Condvar,
    mutex: Mutex<()>,
}

impl Wakeup {
    fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            condvar: Condvar::new(),
            mutex: Mutex::new(()),
        }
    }

    fn wake(&self) {
        // Hold the lock while setting ready to avoid a lost-wakeup race.
        let _guard = self.mutex.lock();
        self.ready.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    fn wait(&self) {
        let mut guard = self.mutex.lock();
        while !self.ready.load(Ordering::Acquire) {
            self.condvar.wait(&mut guard);
        }
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut guard = self.mutex.lock();
        if self.ready.load(Ordering::Acquire) {
            return true;
        }
        let result = self.condvar.wait_for(&mut guard, timeout);
        self.ready.load(Ordering::Acquire) || !result.timed_out()
    }
}

/// Completion side of a [`DispatchHandle`], held by the dispatch job.
pub(crate) struct DispatchCompletion {
    sender: crossbeam_channel::Sender<DispatchOutcome>,
    wakeup: Arc<Wakeup>,
}

impl DispatchCompletion {
    pub(crate) fn complete(self, outcome: DispatchOutcome) {
        let _ = self.sender.send(outcome);
        self.wakeup.wake();
    }
}

/// A handle to one submitted dispatch, resolving to its [`DispatchOutcome`].
///
/// Dropping the handle is fine; the dispatch still runs. The handle only
/// observes completion, it cannot cancel the job.
#[derive(Debug)]
pub struct DispatchHandle {
    receiver: Receiver<DispatchOutcome>,
    wakeup: Arc<Wakeup>,
}

impl DispatchHandle {
    /// Create a linked completion/handle pair.
    pub(crate) fn pair() -> (DispatchCompletion, DispatchHandle) {
        let (sender, receiver) = bounded(1);
        let wakeup = Arc::new(Wakeup::new());

        (
            DispatchCompletion {
                sender,
                wakeup: wakeup.clone(),
            },
            DispatchHandle { receiver, wakeup },
        )
    }

    /// Create a handle that is already complete.
    ///
    /// Used for dispatches that ran inline on the caller and for gated
    /// no-op publishes.
    pub(crate) fn ready(outcome: DispatchOutcome) -> DispatchHandle {
        let (completion, handle) = Self::pair();
        completion.complete(outcome);
        handle
    }

    /// Check whether the dispatch has finished.
    pub fn is_finished(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Take the outcome without blocking, if the dispatch has finished.
    pub fn try_outcome(&self) -> Option<DispatchOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the dispatch finishes and return its outcome.
    pub fn wait(self) -> Option<DispatchOutcome> {
        self.wakeup.wait();
        self.receiver.recv().ok()
    }

    /// Block up to `timeout` for the dispatch to finish.
    ///
    /// Returns `None` if the timeout elapsed first.
    pub fn wait_timeout(self, timeout: Duration) -> Option<DispatchOutcome> {
        if self.wakeup.wait_timeout(timeout) {
            self.receiver.recv().ok()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_and_complete() {
        let pool = DispatchPool::new(PoolConfig::with_threads(2)).unwrap();
        let (completion, handle) = DispatchHandle::pair();

        pool.spawn(move || {
            completion.complete(DispatchOutcome::Completed {
                invoked: 3,
                failed: 0,
            });
        });

        assert_eq!(
            handle.wait(),
            Some(DispatchOutcome::Completed {
                invoked: 3,
                failed: 0
            })
        );
        assert_eq!(pool.submitted_jobs(), 1);
    }

    #[test]
    fn test_ready_handle_is_immediately_complete() {
        let handle = DispatchHandle::ready(DispatchOutcome::Disabled);
        assert!(handle.is_finished());
        assert_eq!(handle.try_outcome(), Some(DispatchOutcome::Disabled));
    }

    #[test]
    fn test_wait_timeout_elapses() {
        let (_completion, handle) = DispatchHandle::pair();
        // Never completed: the wait must give up.
        assert_eq!(handle.wait_timeout(Duration::from_millis(10)), None);
    }

    #[test]
    fn test_wait_timeout_completes_in_time() {
        let pool = DispatchPool::new(PoolConfig::with_threads(1)).unwrap();
        let (completion, handle) = DispatchHandle::pair();

        pool.spawn(move || {
            completion.complete(DispatchOutcome::Completed {
                invoked: 0,
                failed: 0,
            });
        });

        assert!(handle.wait_timeout(Duration::from_secs(5)).is_some());
    }

    #[test]
    fn test_default_pool_sizes_to_cpus() {
        let pool = DispatchPool::new(PoolConfig::default()).unwrap();
        assert!(pool.num_threads() >= 1);
    }

    #[test]
    fn test_explicit_thread_count() {
        let pool = DispatchPool::new(PoolConfig::with_threads(3)).unwrap();
        assert_eq!(pool.num_threads(), 3);
    }
}
