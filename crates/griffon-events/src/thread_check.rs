//! UI-thread identification for outside-UI dispatch.
//!
//! Desktop toolkits designate a single thread on which widget operations
//! must occur. The router never learns toolkit specifics; it only asks an
//! injected [`UiThreadOracle`] one question: "is the calling thread the UI
//! thread?". The answer decides whether an outside-UI publish may run inline
//! or must be moved to the worker pool.
//!
//! # Usage
//!
//! Create the oracle on the UI thread during application startup and hand it
//! to the router builder:
//!
//! ```
//! use std::sync::Arc;
//! use griffon_events::ThreadAffinityOracle;
//!
//! // On the UI thread, at startup:
//! let oracle = Arc::new(ThreadAffinityOracle::current());
//! assert!(griffon_events::UiThreadOracle::is_ui_thread(&*oracle));
//! ```

use std::thread::ThreadId;

/// Answers whether the calling thread is the designated UI thread.
///
/// Implementations must be cheap; the router consults the oracle on every
/// outside-UI publish. A toolkit binding typically wraps its own notion of
/// the event-loop thread (e.g. the winit event loop or the AWT EDT).
pub trait UiThreadOracle: Send + Sync {
    /// `true` if the current thread is the UI thread.
    fn is_ui_thread(&self) -> bool;
}

static_assertions::assert_obj_safe!(UiThreadOracle);

/// An oracle bound to one specific thread.
///
/// This is the default oracle: [`EventRouter::new`](crate::EventRouter::new)
/// binds it to the thread the router is created on, which in a typical
/// application is the UI thread running startup.
#[derive(Debug, Clone, Copy)]
pub struct ThreadAffinityOracle {
    thread_id: ThreadId,
}

impl ThreadAffinityOracle {
    /// Bind to the current thread.
    #[inline]
    pub fn current() -> Self {
        Self {
            thread_id: std::thread::current().id(),
        }
    }

    /// Bind to an arbitrary thread.
    pub fn for_thread(thread_id: ThreadId) -> Self {
        Self { thread_id }
    }

    /// The thread this oracle is bound to.
    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }
}

impl Default for ThreadAffinityOracle {
    fn default() -> Self {
        Self::current()
    }
}

impl UiThreadOracle for ThreadAffinityOracle {
    #[inline]
    fn is_ui_thread(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }
}

/// An oracle for headless contexts with no UI thread at all.
///
/// Every caller counts as being off the UI thread, so outside-UI publishes
/// always run inline on the caller. Useful in tests and server-side reuse of
/// application modules.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUiThreadOracle;

impl UiThreadOracle for NoUiThreadOracle {
    #[inline]
    fn is_ui_thread(&self) -> bool {
        false
    }
}
