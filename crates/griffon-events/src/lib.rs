//! Typed application event routing with priority-ordered dispatch.
//!
//! `griffon-events` decouples the parts of a desktop application: publishers
//! hand an event to an [`EventRouter`], and the router invokes every handler
//! subscribed to that event's kind, in ascending priority order, on the
//! thread the caller asked for.
//!
//! # Model
//!
//! - Applications define an event enum implementing [`Event`], whose
//!   [`Kind`](Event::Kind) discriminant indexes the subscription table.
//! - Subscribers build a [`HandlerSet`] of typed closures, each bound to one
//!   kind with an optional priority and filters, and install it with
//!   [`EventRouter::subscribe`].
//! - Publishers pick an execution mode: [`publish`](EventRouter::publish)
//!   runs handlers synchronously on the caller,
//!   [`publish_async`](EventRouter::publish_async) on the router's worker
//!   pool, and [`publish_outside_ui`](EventRouter::publish_outside_ui)
//!   anywhere but the UI thread, as judged by the injected
//!   [`UiThreadOracle`].
//!
//! Each router instance is self-contained: its subscription table, worker
//! pool, publishing gate, and error hook are all per-instance state. Share a
//! router with `Arc`; nothing in this crate is process-global.
//!
//! # Example
//!
//! ```
//! use griffon_events::{Event, EventRouter, HandlerOptions, HandlerSet};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//!
//! #[derive(Clone, Debug)]
//! enum AppEvent {
//!     DocumentSaved { bytes: u64 },
//!     Shutdown,
//! }
//!
//! #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
//! enum AppEventKind {
//!     DocumentSaved,
//!     Shutdown,
//! }
//!
//! impl Event for AppEvent {
//!     type Kind = AppEventKind;
//!
//!     fn kind(&self) -> AppEventKind {
//!         match self {
//!             AppEvent::DocumentSaved { .. } => AppEventKind::DocumentSaved,
//!             AppEvent::Shutdown => AppEventKind::Shutdown,
//!         }
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let router: EventRouter<AppEvent> = EventRouter::new()?;
//! let saves = Arc::new(AtomicU32::new(0));
//!
//! let saves_clone = saves.clone();
//! router.subscribe(
//!     HandlerSet::builder()
//!         .on(AppEventKind::DocumentSaved, move |_| {
//!             saves_clone.fetch_add(1, Ordering::SeqCst);
//!         })
//!         .on_with(
//!             AppEventKind::DocumentSaved,
//!             HandlerOptions::new()
//!                 .priority(10)
//!                 .filter(|meta| {
//!                     matches!(meta.event(), AppEvent::DocumentSaved { bytes } if *bytes > 0)
//!                 }),
//!             |event| println!("saved: {event:?}"),
//!         )
//!         .build(),
//! );
//!
//! router.publish(AppEvent::DocumentSaved { bytes: 42 })?;
//! assert_eq!(saves.load(Ordering::SeqCst), 1);
//!
//! // Asynchronous publish returns a handle resolving to the outcome.
//! let handle = router.publish_async(AppEvent::Shutdown);
//! handle.wait();
//! # Ok(())
//! # }
//! ```
//!
//! # Error handling
//!
//! Handlers may fail with a [`HandlerError`]. Synchronous
//! [`publish`](EventRouter::publish) is fail-fast: the first error aborts
//! the remaining handlers and is returned as a [`DispatchError`]. Pooled
//! dispatch has no caller to return to, so failures there are isolated: each
//! one is forwarded to the router's error hook and the remaining handlers
//! still run. See the [`dispatch`] module docs for the rationale.

pub mod dispatch;
pub mod error;
pub mod event;
pub mod handler;
pub mod logging;
pub mod pool;
pub mod router;
pub mod thread_check;

pub use dispatch::{DispatchMode, ErrorHook};
pub use error::{DispatchError, HandlerError, Result, RouterError};
pub use event::{Event, EventMetadata};
pub use handler::{
    Callback, DEFAULT_PRIORITY, Filter, HandlerOptions, HandlerSet, HandlerSetBuilder,
};
pub use pool::{DispatchHandle, DispatchOutcome, PoolConfig};
pub use router::{EventRouter, EventRouterBuilder, SubscriberId, SubscriptionGuard};
pub use thread_check::{NoUiThreadOracle, ThreadAffinityOracle, UiThreadOracle};
