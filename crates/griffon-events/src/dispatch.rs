//! Execution-mode strategies and the dispatch loops.
//!
//! Every publish resolves to a *dispatch job*: a closure that snapshots the
//! matching routes, filters and orders them, and invokes the survivors. The
//! caller picks a [`DispatchMode`]; the [`Dispatcher`] decides where the job
//! runs through one uniform submit contract:
//!
//! - `Inline` always runs the job on the calling thread.
//! - `Async` always hands the job to the worker pool.
//! - `OutsideUi` consults the UI-thread oracle: callers already off the UI
//!   thread run the job inline, callers on the UI thread hand it to the pool
//!   so the UI thread never blocks on handler work.
//!
//! # Error policy
//!
//! The two dispatch loops differ deliberately:
//!
//! - [`run_fail_fast`] serves synchronous [`publish`](crate::EventRouter::publish):
//!   the first handler error aborts the remaining batch and is returned to
//!   the caller, who asked for synchronous semantics and can react to it.
//! - [`run_isolated`] serves `Async` and `OutsideUi` dispatch, where no
//!   caller is waiting: each handler failure is forwarded to the router's
//!   error hook and the remaining handlers still run.

use std::sync::Arc;

use crate::error::DispatchError;
use crate::event::Event;
use crate::handler::Handler;
use crate::pool::{DispatchHandle, DispatchOutcome, DispatchPool};
use crate::thread_check::UiThreadOracle;

/// Where a publish should execute, selected by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchMode {
    /// Run on the calling thread, immediately.
    Inline,
    /// Run on the worker pool; the caller never blocks.
    Async,
    /// Run inline if the caller is off the UI thread, otherwise on the pool.
    OutsideUi,
}

/// Shared sink for handler failures during pooled dispatch.
pub type ErrorHook = Arc<dyn Fn(&DispatchError) + Send + Sync>;

/// The default hook logs each failure and moves on.
pub(crate) fn default_error_hook() -> ErrorHook {
    Arc::new(|err| {
        tracing::error!(
            target: "griffon_events::dispatch",
            error = %err,
            "event handler failed during pooled dispatch"
        );
    })
}

/// Where the dispatcher decided a job will run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Placement {
    Caller,
    Pool,
}

/// Owns the execution-mode strategy: worker pool, UI-thread oracle, error hook.
pub(crate) struct Dispatcher {
    pub(crate) pool: DispatchPool,
    pub(crate) oracle: Arc<dyn UiThreadOracle>,
    pub(crate) error_hook: ErrorHook,
}

impl Dispatcher {
    /// Resolve a mode to a placement for the current calling thread.
    pub(crate) fn placement(&self, mode: DispatchMode) -> Placement {
        match mode {
            DispatchMode::Inline => Placement::Caller,
            DispatchMode::Async => Placement::Pool,
            DispatchMode::OutsideUi => {
                if self.oracle.is_ui_thread() {
                    Placement::Pool
                } else {
                    Placement::Caller
                }
            }
        }
    }

    /// Submit a dispatch job under the given mode.
    ///
    /// The uniform contract for all modes: the job runs exactly once, and the
    /// returned handle resolves to its outcome. For caller placement the
    /// handle is already complete when this returns.
    pub(crate) fn submit<F>(&self, mode: DispatchMode, job: F) -> DispatchHandle
    where
        F: FnOnce() -> DispatchOutcome + Send + 'static,
    {
        let placement = self.placement(mode);
        tracing::trace!(
            target: "griffon_events::dispatch",
            ?mode,
            ?placement,
            "submitting dispatch job"
        );

        match placement {
            Placement::Caller => DispatchHandle::ready(job()),
            Placement::Pool => {
                let (completion, handle) = DispatchHandle::pair();
                self.pool.spawn(move || {
                    completion.complete(job());
                });
                handle
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").field("pool", &self.pool).finish()
    }
}

/// Invoke handlers in order, aborting the batch on the first error.
pub(crate) fn run_fail_fast<E: Event>(
    handlers: &[Handler<E>],
    event: &E,
) -> Result<(), DispatchError> {
    for handler in handlers {
        (handler.callback)(event).map_err(|err| {
            DispatchError::new(format!("{:?}", handler.kind), handler.priority, err)
        })?;
    }
    Ok(())
}

/// Invoke handlers in order, routing each failure to the hook and continuing.
pub(crate) fn run_isolated<E: Event>(
    handlers: &[Handler<E>],
    event: &E,
    hook: &ErrorHook,
) -> DispatchOutcome {
    let mut failed = 0;
    for handler in handlers {
        if let Err(err) = (handler.callback)(event) {
            failed += 1;
            let err = DispatchError::new(format!("{:?}", handler.kind), handler.priority, err);
            hook(&err);
        }
    }
    DispatchOutcome::Completed {
        invoked: handlers.len(),
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::handler::HandlerSet;
    use crate::pool::PoolConfig;
    use crate::thread_check::{NoUiThreadOracle, ThreadAffinityOracle};
    use parking_lot::Mutex;

    #[derive(Clone, Debug)]
    struct Tick;

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    struct TickKind;

    impl Event for Tick {
        type Kind = TickKind;

        fn kind(&self) -> TickKind {
            TickKind
        }
    }

    fn dispatcher(oracle: Arc<dyn UiThreadOracle>) -> Dispatcher {
        Dispatcher {
            pool: DispatchPool::new(PoolConfig::with_threads(2)).unwrap(),
            oracle,
            error_hook: default_error_hook(),
        }
    }

    fn recording_set(log: Arc<Mutex<Vec<&'static str>>>) -> Vec<Handler<Tick>> {
        let log_ok = log.clone();
        HandlerSet::<Tick>::builder()
            .on_fallible(TickKind, move |_| {
                log_ok.lock().push("first");
                Err(HandlerError::new("first failed"))
            })
            .on(TickKind, move |_| {
                log.lock().push("second");
            })
            .build()
            .into_handlers()
    }

    #[test]
    fn test_inline_mode_runs_on_caller() {
        let dispatcher = dispatcher(Arc::new(ThreadAffinityOracle::current()));
        assert_eq!(dispatcher.placement(DispatchMode::Inline), Placement::Caller);
    }

    #[test]
    fn test_async_mode_always_pools() {
        let dispatcher = dispatcher(Arc::new(NoUiThreadOracle));
        assert_eq!(dispatcher.placement(DispatchMode::Async), Placement::Pool);
    }

    #[test]
    fn test_outside_ui_pools_from_ui_thread() {
        // Oracle bound to this thread: we *are* the UI thread, so the job
        // must leave it.
        let dispatcher = dispatcher(Arc::new(ThreadAffinityOracle::current()));
        assert_eq!(dispatcher.placement(DispatchMode::OutsideUi), Placement::Pool);
    }

    #[test]
    fn test_outside_ui_inline_off_ui_thread() {
        let dispatcher = dispatcher(Arc::new(NoUiThreadOracle));
        assert_eq!(
            dispatcher.placement(DispatchMode::OutsideUi),
            Placement::Caller
        );
    }

    #[test]
    fn test_submit_caller_placement_completes_synchronously() {
        let dispatcher = dispatcher(Arc::new(NoUiThreadOracle));
        let handle = dispatcher.submit(DispatchMode::Inline, || DispatchOutcome::Completed {
            invoked: 1,
            failed: 0,
        });
        assert!(handle.is_finished());
    }

    #[test]
    fn test_submit_pool_placement_runs_off_caller() {
        let dispatcher = dispatcher(Arc::new(NoUiThreadOracle));
        let caller = std::thread::current().id();

        let handle = dispatcher.submit(DispatchMode::Async, move || {
            assert_ne!(std::thread::current().id(), caller);
            DispatchOutcome::Completed {
                invoked: 0,
                failed: 0,
            }
        });

        assert!(handle.wait().is_some());
    }

    #[test]
    fn test_fail_fast_aborts_batch() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handlers = recording_set(log.clone());

        let result = run_fail_fast(&handlers, &Tick);

        assert!(result.is_err());
        assert_eq!(*log.lock(), vec!["first"]);
    }

    #[test]
    fn test_isolated_continues_past_failures() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handlers = recording_set(log.clone());

        let hooked = Arc::new(Mutex::new(Vec::new()));
        let hooked_clone = hooked.clone();
        let hook: ErrorHook = Arc::new(move |err| {
            hooked_clone.lock().push(err.to_string());
        });

        let outcome = run_isolated(&handlers, &Tick, &hook);

        assert_eq!(*log.lock(), vec!["first", "second"]);
        assert_eq!(
            outcome,
            DispatchOutcome::Completed {
                invoked: 2,
                failed: 1
            }
        );
        assert_eq!(hooked.lock().len(), 1);
        assert!(hooked.lock()[0].contains("first failed"));
    }
}
