//! Handler sets: typed callbacks resolved at registration time.
//!
//! A subscriber does not expose methods for the router to discover; it hands
//! the router a [`HandlerSet`] built once up front. Each entry fixes the
//! event kind it responds to, its priority, and any filters, so dispatch is
//! a plain map lookup with no per-publish resolution work.
//!
//! # Example
//!
//! ```
//! use griffon_events::{Event, HandlerOptions, HandlerSet};
//!
//! # #[derive(Clone, Debug)]
//! # enum AppEvent { Ping(u32) }
//! # #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
//! # enum AppEventKind { Ping }
//! # impl Event for AppEvent {
//! #     type Kind = AppEventKind;
//! #     fn kind(&self) -> AppEventKind { AppEventKind::Ping }
//! # }
//! let handlers = HandlerSet::<AppEvent>::builder()
//!     .on(AppEventKind::Ping, |event| {
//!         println!("ping: {event:?}");
//!     })
//!     .on_with(
//!         AppEventKind::Ping,
//!         HandlerOptions::new()
//!             .priority(10)
//!             .filter(|meta| matches!(meta.event(), AppEvent::Ping(n) if *n > 0)),
//!         |event| println!("positive ping: {event:?}"),
//!     )
//!     .build();
//!
//! assert_eq!(handlers.len(), 2);
//! ```

use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::HandlerError;
use crate::event::{Event, EventMetadata};

/// A handler callback. Invoked with a shared reference to the published event.
pub type Callback<E> = Arc<dyn Fn(&E) -> Result<(), HandlerError> + Send + Sync>;

/// A handler filter. A handler runs only if all of its filters accept the
/// publish's [`EventMetadata`].
pub type Filter<E> = Arc<dyn for<'a> Fn(&EventMetadata<'a, E>) -> bool + Send + Sync>;

/// Default priority for handlers that do not declare one.
pub const DEFAULT_PRIORITY: i32 = 0;

/// One registered handler: kind, priority, filters, callback.
#[derive(Clone)]
pub(crate) struct Handler<E: Event> {
    pub(crate) kind: E::Kind,
    pub(crate) priority: i32,
    pub(crate) filters: SmallVec<[Filter<E>; 1]>,
    pub(crate) callback: Callback<E>,
}

impl<E: Event> Handler<E> {
    /// Whether every filter accepts this publish.
    pub(crate) fn accepts(&self, meta: &EventMetadata<'_, E>) -> bool {
        self.filters.iter().all(|filter| filter(meta))
    }
}

impl<E: Event> std::fmt::Debug for Handler<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("filters", &self.filters.len())
            .finish()
    }
}

/// Per-handler registration options: priority and filters.
pub struct HandlerOptions<E: Event> {
    priority: i32,
    filters: SmallVec<[Filter<E>; 1]>,
}

impl<E: Event> Default for HandlerOptions<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> HandlerOptions<E> {
    /// Options with default priority and no filters.
    pub fn new() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            filters: SmallVec::new(),
        }
    }

    /// Set the handler's priority. Lower values run first within one dispatch.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add a filter. Filters are conjunctive: the handler runs only if all
    /// of them accept the event.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: for<'a> Fn(&EventMetadata<'a, E>) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }
}

/// The handlers one subscriber contributes, built once before subscribing.
///
/// An empty set is valid: subscribing it registers nothing and is the
/// explicit analogue of an object with no handler methods.
pub struct HandlerSet<E: Event> {
    handlers: Vec<Handler<E>>,
}

impl<E: Event> HandlerSet<E> {
    /// Start building a handler set.
    pub fn builder() -> HandlerSetBuilder<E> {
        HandlerSetBuilder {
            handlers: Vec::new(),
        }
    }

    /// Whether this set declares no handlers at all.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Number of handlers in the set.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// The kinds this set declares handlers for, in declaration order.
    /// May contain duplicates if several handlers share a kind.
    pub fn kinds(&self) -> impl Iterator<Item = E::Kind> + '_ {
        self.handlers.iter().map(|h| h.kind)
    }

    pub(crate) fn into_handlers(self) -> Vec<Handler<E>> {
        self.handlers
    }
}

impl<E: Event> std::fmt::Debug for HandlerSet<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerSet")
            .field("handlers", &self.handlers)
            .finish()
    }
}

/// Builder for [`HandlerSet`].
pub struct HandlerSetBuilder<E: Event> {
    handlers: Vec<Handler<E>>,
}

impl<E: Event> HandlerSetBuilder<E> {
    /// Register an infallible handler with default options.
    pub fn on<F>(self, kind: E::Kind, callback: F) -> Self
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.on_with(kind, HandlerOptions::new(), callback)
    }

    /// Register an infallible handler with explicit options.
    pub fn on_with<F>(self, kind: E::Kind, options: HandlerOptions<E>, callback: F) -> Self
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.on_fallible_with(kind, options, move |event| {
            callback(event);
            Ok(())
        })
    }

    /// Register a fallible handler with default options.
    pub fn on_fallible<F>(self, kind: E::Kind, callback: F) -> Self
    where
        F: Fn(&E) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.on_fallible_with(kind, HandlerOptions::new(), callback)
    }

    /// Register a fallible handler with explicit options.
    pub fn on_fallible_with<F>(
        mut self,
        kind: E::Kind,
        options: HandlerOptions<E>,
        callback: F,
    ) -> Self
    where
        F: Fn(&E) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.handlers.push(Handler {
            kind,
            priority: options.priority,
            filters: options.filters,
            callback: Arc::new(callback),
        });
        self
    }

    /// Finish the set.
    pub fn build(self) -> HandlerSet<E> {
        HandlerSet {
            handlers: self.handlers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Clone, Debug)]
    enum TestEvent {
        Ping(u32),
        Pong,
    }

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    enum TestKind {
        Ping,
        Pong,
    }

    impl Event for TestEvent {
        type Kind = TestKind;

        fn kind(&self) -> TestKind {
            match self {
                TestEvent::Ping(_) => TestKind::Ping,
                TestEvent::Pong => TestKind::Pong,
            }
        }
    }

    #[test]
    fn test_empty_set() {
        let set = HandlerSet::<TestEvent>::builder().build();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_kinds_in_declaration_order() {
        let set = HandlerSet::<TestEvent>::builder()
            .on(TestKind::Pong, |_| {})
            .on(TestKind::Ping, |_| {})
            .on(TestKind::Ping, |_| {})
            .build();

        let kinds: Vec<_> = set.kinds().collect();
        assert_eq!(kinds, vec![TestKind::Pong, TestKind::Ping, TestKind::Ping]);
    }

    #[test]
    fn test_default_priority() {
        let set = HandlerSet::<TestEvent>::builder()
            .on(TestKind::Ping, |_| {})
            .build();
        assert_eq!(set.handlers[0].priority, DEFAULT_PRIORITY);
    }

    #[test]
    fn test_options_set_priority() {
        let set = HandlerSet::<TestEvent>::builder()
            .on_with(TestKind::Ping, HandlerOptions::new().priority(-3), |_| {})
            .build();
        assert_eq!(set.handlers[0].priority, -3);
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let set = HandlerSet::<TestEvent>::builder()
            .on_with(
                TestKind::Ping,
                HandlerOptions::new()
                    .filter(|meta| matches!(meta.event(), TestEvent::Ping(n) if *n > 0))
                    .filter(|meta| matches!(meta.event(), TestEvent::Ping(n) if *n < 10)),
                |_| {},
            )
            .build();
        let handler = &set.handlers[0];

        let in_range = TestEvent::Ping(5);
        let too_big = TestEvent::Ping(50);
        assert!(handler.accepts(&EventMetadata::new(&in_range)));
        assert!(!handler.accepts(&EventMetadata::new(&too_big)));
    }

    #[test]
    fn test_fallible_callback_result() {
        let set = HandlerSet::<TestEvent>::builder()
            .on_fallible(TestKind::Ping, |_| Err(HandlerError::new("nope")))
            .build();

        let event = TestEvent::Ping(1);
        let result = (set.handlers[0].callback)(&event);
        assert!(result.is_err());
    }

    #[test]
    fn test_infallible_callback_wrapped_as_ok() {
        let calls = std::sync::Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let set = HandlerSet::<TestEvent>::builder()
            .on(TestKind::Ping, move |_| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        let event = TestEvent::Ping(1);
        assert!((set.handlers[0].callback)(&event).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
