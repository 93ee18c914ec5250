//! Logging integration for the event router.
//!
//! The router is instrumented with the `tracing` crate. To see logs, install
//! a tracing subscriber in your application:
//!
//! ```ignore
//! use tracing_subscriber;
//!
//! fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! Subscribe/unsubscribe changes are logged at `debug`, per-publish routing
//! decisions at `trace`, and handler failures reported through the default
//! error hook at `error`.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem, e.g.
/// `RUST_LOG=griffon_events::router=debug`.
pub mod targets {
    /// Subscription table and publish entry points.
    pub const ROUTER: &str = "griffon_events::router";
    /// Dispatch pipeline and execution-mode selection.
    pub const DISPATCH: &str = "griffon_events::dispatch";
    /// Worker pool lifecycle.
    pub const POOL: &str = "griffon_events::pool";
}
