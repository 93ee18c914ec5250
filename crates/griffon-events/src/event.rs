//! Event trait and per-publish metadata.
//!
//! Events are plain application values. The router never inspects an event's
//! payload; it only asks for the event's [`Event::Kind`], the discriminant
//! that routes a publish to the handlers registered for that kind.
//!
//! The intended shape is an application-level enum with a matching
//! field-less kind enum:
//!
//! ```
//! use griffon_events::Event;
//!
//! #[derive(Clone, Debug)]
//! enum AppEvent {
//!     Ping(u32),
//!     Shutdown,
//! }
//!
//! #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
//! enum AppEventKind {
//!     Ping,
//!     Shutdown,
//! }
//!
//! impl Event for AppEvent {
//!     type Kind = AppEventKind;
//!
//!     fn kind(&self) -> AppEventKind {
//!         match self {
//!             AppEvent::Ping(_) => AppEventKind::Ping,
//!             AppEvent::Shutdown => AppEventKind::Shutdown,
//!         }
//!     }
//! }
//! ```

use std::fmt::Debug;
use std::hash::Hash;

/// A value that can be published through an [`EventRouter`](crate::EventRouter).
///
/// Events must be `Clone + Send` because asynchronous dispatch moves a copy
/// of the event onto a worker thread, and one publish may hand the event to
/// several handlers.
pub trait Event: Clone + Send + 'static {
    /// The discriminant used to index handlers.
    ///
    /// Kinds are resolved once at registration time; dispatch is a single
    /// map lookup on `event.kind()`.
    type Kind: Copy + Eq + Hash + Send + Sync + Debug + 'static;

    /// The kind of this particular event value.
    fn kind(&self) -> Self::Kind;
}

/// Immutable view of a published event, handed to handler filters.
///
/// A fresh `EventMetadata` is created for every publish call and borrows the
/// event for the duration of the dispatch. Filters receive it by reference
/// and must not assume anything about which thread they run on.
#[derive(Debug)]
pub struct EventMetadata<'a, E: Event> {
    event: &'a E,
    kind: E::Kind,
}

impl<'a, E: Event> EventMetadata<'a, E> {
    pub(crate) fn new(event: &'a E) -> Self {
        Self {
            event,
            kind: event.kind(),
        }
    }

    /// The event being published.
    pub fn event(&self) -> &E {
        self.event
    }

    /// The event's kind, as resolved at publish time.
    pub fn kind(&self) -> E::Kind {
        self.kind
    }
}
