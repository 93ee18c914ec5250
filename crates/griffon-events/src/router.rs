//! The event router: subscription table and publish pipeline.
//!
//! [`EventRouter`] keeps a concurrent index from event kind to the routes
//! registered for it. Publishing snapshots the route list for the event's
//! kind (a fresh defensive copy per publish, so handlers may subscribe or
//! unsubscribe mid-dispatch), filters it through each handler's predicates,
//! stable-sorts the survivors by ascending priority, and invokes them in
//! that order on whichever thread the chosen [`DispatchMode`] places the
//! work.
//!
//! All state — the route index, the publishing-enabled flag, the worker
//! pool, the UI-thread oracle, and the error hook — lives on the router
//! instance. Applications build one router at startup and share it by `Arc`;
//! there are no process-wide singletons.

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::dispatch::{self, DispatchMode, Dispatcher, ErrorHook, default_error_hook};
use crate::error::{DispatchError, Result};
use crate::event::{Event, EventMetadata};
use crate::handler::{Handler, HandlerSet};
use crate::pool::{DispatchHandle, DispatchOutcome, DispatchPool, PoolConfig};
use crate::thread_check::{ThreadAffinityOracle, UiThreadOracle};

new_key_type! {
    /// Identity of one subscription, returned by [`EventRouter::subscribe`].
    ///
    /// Membership is by id, not by value: subscribing twice yields two
    /// independent subscriptions, and a given id is never indexed twice
    /// under the same kind.
    pub struct SubscriberId;
}

/// One entry in a kind's route list.
#[derive(Clone)]
struct Route<E: Event> {
    subscriber: SubscriberId,
    handler: Handler<E>,
}

type RouteList<E> = SmallVec<[Route<E>; 4]>;
type RouteTable<E> = DashMap<<E as Event>::Kind, RouteList<E>>;

/// Per-subscriber bookkeeping: which kind lists to clean on unsubscribe.
struct SubscriberRecord<E: Event> {
    kinds: SmallVec<[E::Kind; 4]>,
}

/// Routes events to subscribed handlers.
///
/// See the [crate docs](crate) for the full model. In short:
///
/// - [`subscribe`](Self::subscribe) installs a [`HandlerSet`] and returns a
///   [`SubscriberId`]; [`unsubscribe`](Self::unsubscribe) removes it again.
/// - [`publish`](Self::publish) dispatches synchronously on the caller,
///   [`publish_async`](Self::publish_async) on the worker pool, and
///   [`publish_outside_ui`](Self::publish_outside_ui) anywhere but the UI
///   thread.
/// - [`set_publishing_enabled`](Self::set_publishing_enabled) gates all
///   publish variants at once.
///
/// `EventRouter` is `Send + Sync`; share it with `Arc`.
pub struct EventRouter<E: Event> {
    routes: Arc<RouteTable<E>>,
    subscribers: Mutex<SlotMap<SubscriberId, SubscriberRecord<E>>>,
    publishing: AtomicBool,
    dispatcher: Dispatcher,
}

impl<E: Event> EventRouter<E> {
    /// Create a router with default settings.
    ///
    /// The worker pool is sized to the available processor count, the
    /// UI-thread oracle is bound to the calling thread (create the router on
    /// the UI thread during startup), and handler failures in pooled
    /// dispatch are logged. Use [`builder`](Self::builder) to override any
    /// of these.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Start building a router with custom collaborators.
    pub fn builder() -> EventRouterBuilder<E> {
        EventRouterBuilder {
            pool: PoolConfig::default(),
            oracle: None,
            error_hook: None,
            publishing_enabled: true,
            _marker: PhantomData,
        }
    }

    // ---------------------------------------------------------------------
    // Subscription table
    // ---------------------------------------------------------------------

    /// Install a subscriber's handlers.
    ///
    /// Each handler is appended to the route list of its kind. An empty set
    /// registers nothing and returns an inert id; unsubscribing it later is
    /// harmless.
    pub fn subscribe(&self, handlers: HandlerSet<E>) -> SubscriberId {
        let handlers = handlers.into_handlers();

        let mut kinds: SmallVec<[E::Kind; 4]> = SmallVec::new();
        for handler in &handlers {
            if !kinds.contains(&handler.kind) {
                kinds.push(handler.kind);
            }
        }

        let id = self
            .subscribers
            .lock()
            .insert(SubscriberRecord { kinds: kinds.clone() });

        if handlers.is_empty() {
            tracing::debug!(
                target: "griffon_events::router",
                subscriber = ?id,
                "handler set is empty, nothing registered"
            );
            return id;
        }

        let handler_count = handlers.len();
        for handler in handlers {
            self.routes
                .entry(handler.kind)
                .or_default()
                .push(Route {
                    subscriber: id,
                    handler,
                });
        }

        tracing::debug!(
            target: "griffon_events::router",
            subscriber = ?id,
            handlers = handler_count,
            kinds = ?kinds,
            "subscriber registered"
        );
        id
    }

    /// Install a subscriber's handlers with automatic removal on drop.
    ///
    /// The guard borrows the router, so it cannot outlive it.
    pub fn subscribe_scoped(&self, handlers: HandlerSet<E>) -> SubscriptionGuard<'_, E> {
        SubscriptionGuard {
            router: self,
            id: self.subscribe(handlers),
        }
    }

    /// Remove a subscriber from every kind list it appears in.
    ///
    /// A kind's list is dropped entirely once it empties. Returns `true` if
    /// any route was removed; unsubscribing an unknown or already-removed id
    /// returns `false`.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let record = self.subscribers.lock().remove(id);
        let Some(record) = record else {
            tracing::debug!(
                target: "griffon_events::router",
                subscriber = ?id,
                "unsubscribe of unknown subscriber, no change"
            );
            return false;
        };

        let mut removed = false;
        for kind in &record.kinds {
            let emptied = match self.routes.get_mut(kind) {
                Some(mut entry) => {
                    let before = entry.len();
                    entry.retain(|route| route.subscriber != id);
                    removed |= entry.len() != before;
                    entry.is_empty()
                }
                None => false,
            };
            // The shard lock is released above; a racing subscribe may have
            // appended in between, so re-check emptiness before removing.
            if emptied {
                self.routes.remove_if(kind, |_, routes| routes.is_empty());
            }
        }

        tracing::debug!(
            target: "griffon_events::router",
            subscriber = ?id,
            removed,
            "subscriber removed"
        );
        removed
    }

    /// Number of live subscriptions (including inert ones).
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Number of routes currently registered for a kind.
    pub fn route_count(&self, kind: E::Kind) -> usize {
        self.routes.get(&kind).map(|entry| entry.len()).unwrap_or(0)
    }

    // ---------------------------------------------------------------------
    // Publish pipeline
    // ---------------------------------------------------------------------

    /// Publish an event synchronously on the calling thread.
    ///
    /// Matching handlers run in ascending priority order before this returns.
    /// The first handler error aborts the remaining batch and is returned to
    /// the caller (fail-fast); this deliberately differs from the pooled
    /// variants, which isolate failures per handler — see the
    /// [`dispatch`](crate::dispatch) module docs.
    ///
    /// Returns `Ok(())` without touching the route table when publishing is
    /// disabled.
    #[tracing::instrument(skip_all, target = "griffon_events::router", level = "trace")]
    pub fn publish(&self, event: E) -> std::result::Result<(), DispatchError> {
        if !self.is_publishing_enabled() {
            return Ok(());
        }
        let matched = matching_handlers(&self.routes, &event);
        dispatch::run_fail_fast(&matched, &event)
    }

    /// Publish an event on the worker pool; the caller never blocks.
    ///
    /// Handler failures are forwarded to the router's error hook and do not
    /// stop the remaining handlers. The returned [`DispatchHandle`] resolves
    /// to the dispatch outcome; dropping it is fine.
    ///
    /// When publishing is disabled this returns a completed handle with
    /// [`DispatchOutcome::Disabled`] without submitting any work.
    pub fn publish_async(&self, event: E) -> DispatchHandle {
        self.publish_with(DispatchMode::Async, event)
    }

    /// Publish an event anywhere but the UI thread.
    ///
    /// Callers already off the UI thread dispatch inline; callers on the UI
    /// thread hand the work to the pool so the UI thread never blocks on
    /// handlers. Both paths use the pooled error policy (hook + continue),
    /// so observable behavior does not depend on the calling thread.
    pub fn publish_outside_ui(&self, event: E) -> DispatchHandle {
        self.publish_with(DispatchMode::OutsideUi, event)
    }

    /// Publish under an explicit [`DispatchMode`].
    ///
    /// This is the uniform strategy surface behind
    /// [`publish_async`](Self::publish_async) and
    /// [`publish_outside_ui`](Self::publish_outside_ui). All modes use the
    /// isolate-and-hook error policy, including `Inline`; use
    /// [`publish`](Self::publish) for fail-fast synchronous semantics.
    pub fn publish_with(&self, mode: DispatchMode, event: E) -> DispatchHandle {
        if !self.is_publishing_enabled() {
            tracing::trace!(
                target: "griffon_events::router",
                ?mode,
                "publishing disabled, dropping event"
            );
            return DispatchHandle::ready(DispatchOutcome::Disabled);
        }

        // The route snapshot is taken when the job runs, not when it is
        // submitted, so subscriptions made between submit and execution are
        // honored.
        let routes = Arc::clone(&self.routes);
        let hook = Arc::clone(&self.dispatcher.error_hook);
        self.dispatcher.submit(mode, move || {
            let matched = matching_handlers(&routes, &event);
            dispatch::run_isolated(&matched, &event, &hook)
        })
    }

    // ---------------------------------------------------------------------
    // Enable/disable gate
    // ---------------------------------------------------------------------

    /// Whether publish calls currently dispatch anything.
    pub fn is_publishing_enabled(&self) -> bool {
        self.publishing.load(Ordering::Acquire)
    }

    /// Enable or disable publishing router-wide.
    ///
    /// While disabled every publish variant is a cheap no-op; subscriptions
    /// are unaffected and resume receiving events once re-enabled.
    pub fn set_publishing_enabled(&self, enabled: bool) {
        self.publishing.store(enabled, Ordering::Release);
        tracing::debug!(target: "griffon_events::router", enabled, "publishing gate changed");
    }

    #[cfg(test)]
    pub(crate) fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl<E: Event> std::fmt::Debug for EventRouter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("subscribers", &self.subscriber_count())
            .field("kinds", &self.routes.len())
            .field("publishing", &self.is_publishing_enabled())
            .finish()
    }
}

/// Snapshot, filter, and order the handlers for one publish.
fn matching_handlers<E: Event>(routes: &RouteTable<E>, event: &E) -> Vec<Handler<E>> {
    let kind = event.kind();
    let snapshot: RouteList<E> = routes
        .get(&kind)
        .map(|entry| entry.value().clone())
        .unwrap_or_default();

    let meta = EventMetadata::new(event);
    let mut matched: Vec<Handler<E>> = snapshot
        .into_iter()
        .filter(|route| route.handler.accepts(&meta))
        .map(|route| route.handler)
        .collect();
    // Stable sort: equal priorities keep registration order.
    matched.sort_by_key(|handler| handler.priority);

    tracing::trace!(
        target: "griffon_events::router",
        kind = ?kind,
        handlers = matched.len(),
        "routing publish"
    );
    matched
}

/// RAII subscription that unsubscribes when dropped.
///
/// Created via [`EventRouter::subscribe_scoped`].
#[must_use = "dropping the guard immediately unsubscribes the handlers"]
pub struct SubscriptionGuard<'a, E: Event> {
    router: &'a EventRouter<E>,
    id: SubscriberId,
}

impl<E: Event> SubscriptionGuard<'_, E> {
    /// The underlying subscription id.
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl<E: Event> Drop for SubscriptionGuard<'_, E> {
    fn drop(&mut self) {
        let _ = self.router.unsubscribe(self.id);
    }
}

/// Builder for [`EventRouter`], injecting the external collaborators.
pub struct EventRouterBuilder<E: Event> {
    pool: PoolConfig,
    oracle: Option<Arc<dyn UiThreadOracle>>,
    error_hook: Option<ErrorHook>,
    publishing_enabled: bool,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Event> EventRouterBuilder<E> {
    /// Configure the dispatch worker pool.
    pub fn pool(mut self, config: PoolConfig) -> Self {
        self.pool = config;
        self
    }

    /// Supply the UI-thread oracle.
    ///
    /// Defaults to a [`ThreadAffinityOracle`] bound to the thread
    /// [`build`](Self::build) runs on.
    pub fn ui_oracle(mut self, oracle: impl UiThreadOracle + 'static) -> Self {
        self.oracle = Some(Arc::new(oracle));
        self
    }

    /// Supply the shared error hook for pooled dispatch failures.
    ///
    /// Defaults to logging each failure at `error` level.
    pub fn error_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&DispatchError) + Send + Sync + 'static,
    {
        self.error_hook = Some(Arc::new(hook));
        self
    }

    /// Set the initial state of the publishing gate (enabled by default).
    pub fn publishing_enabled(mut self, enabled: bool) -> Self {
        self.publishing_enabled = enabled;
        self
    }

    /// Build the router.
    ///
    /// Fails only if the worker pool cannot be created.
    pub fn build(self) -> Result<EventRouter<E>> {
        let pool = DispatchPool::new(self.pool)?;
        let oracle = self
            .oracle
            .unwrap_or_else(|| Arc::new(ThreadAffinityOracle::current()));
        let error_hook = self.error_hook.unwrap_or_else(default_error_hook);

        Ok(EventRouter {
            routes: Arc::new(DashMap::new()),
            subscribers: Mutex::new(SlotMap::with_key()),
            publishing: AtomicBool::new(self.publishing_enabled),
            dispatcher: Dispatcher {
                pool,
                oracle,
                error_hook,
            },
        })
    }
}
