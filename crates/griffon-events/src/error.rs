//! Error types for the event router.

/// Result type alias for router construction.
pub type Result<T> = std::result::Result<T, RouterError>;

/// Errors raised while building an [`EventRouter`](crate::EventRouter).
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// The dispatch worker pool could not be created.
    #[error("failed to create dispatch pool: {0}")]
    PoolCreation(String),
}

/// An error returned by a handler callback.
///
/// Handlers report failures as values rather than panicking; a panicking
/// handler takes down whichever thread is running the dispatch and is not
/// caught by the router.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HandlerError {
    /// Create a handler error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create a handler error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A handler failure annotated with the route it occurred on.
///
/// This is what synchronous [`publish`](crate::EventRouter::publish) returns
/// and what the router's error hook receives for asynchronous dispatch. The
/// event kind is carried as its `Debug` rendering so the error type stays
/// independent of the event type parameter.
#[derive(Debug, thiserror::Error)]
#[error("handler for {kind} (priority {priority}) failed: {source}")]
pub struct DispatchError {
    kind: String,
    priority: i32,
    #[source]
    source: HandlerError,
}

impl DispatchError {
    pub(crate) fn new(kind: String, priority: i32, source: HandlerError) -> Self {
        Self {
            kind,
            priority,
            source,
        }
    }

    /// `Debug` rendering of the event kind the failing handler was registered for.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Declared priority of the failing handler.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// The underlying handler error.
    pub fn handler_error(&self) -> &HandlerError {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_display() {
        let err = HandlerError::new("database unavailable");
        assert_eq!(err.to_string(), "database unavailable");
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn test_handler_error_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = HandlerError::with_source("flush failed", io);

        assert_eq!(err.message(), "flush failed");
        let source = std::error::Error::source(&err).expect("source should be set");
        assert_eq!(source.to_string(), "disk full");
    }

    #[test]
    fn test_dispatch_error_context() {
        let err = DispatchError::new("Ping".to_string(), 5, HandlerError::new("boom"));

        assert_eq!(err.kind(), "Ping");
        assert_eq!(err.priority(), 5);
        assert!(err.to_string().contains("priority 5"));
        assert!(err.to_string().contains("boom"));
    }
}
