//! Formatter trait and shared trait-object wrapper.
//!
//! Provides the [`FemtoFormatter`] trait implemented by
//! [`JsonLayout`](crate::layout::JsonLayout) alongside helpers for dynamically
//! dispatched formatters shared across threads.

use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::event::LoggingEvent;
use crate::normalize::NormalizationError;

/// Errors raised while formatting a single event.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A member value could not be normalised.
    #[error(transparent)]
    Normalization(#[from] NormalizationError),
    /// The normalised value could not be serialised as JSON.
    #[error("failed to encode event as JSON: {0}")]
    Encode(#[from] serde_json::Error),
    /// The output sink rejected a write.
    #[error("failed to write formatted event")]
    Write(#[from] fmt::Error),
}

/// Trait for formatting log events into strings.
///
/// Implementors must be thread-safe (`Send + Sync`) so formatters can be
/// shared across threads in a logging system.
pub trait FemtoFormatter: Send + Sync {
    /// Format a log event into a string representation.
    fn format(&self, event: &dyn LoggingEvent) -> Result<String, FormatError>;
}

/// Shared formatter trait object.
#[derive(Clone)]
pub struct SharedFormatter {
    inner: Arc<dyn FemtoFormatter + Send + Sync>,
}

impl SharedFormatter {
    /// Create a shared formatter from an owned formatter implementation.
    pub fn new<F>(formatter: F) -> Self
    where
        F: FemtoFormatter + Send + Sync + 'static,
    {
        let inner: Arc<dyn FemtoFormatter + Send + Sync> = Arc::new(formatter);
        Self { inner }
    }

    /// Wrap an existing shared formatter trait object.
    pub fn from_arc(inner: Arc<dyn FemtoFormatter + Send + Sync>) -> Self {
        Self { inner }
    }

    /// Clone the underlying trait object, incrementing the reference count.
    pub fn clone_arc(&self) -> Arc<dyn FemtoFormatter + Send + Sync> {
        Arc::clone(&self.inner)
    }

    /// Format an event using the wrapped formatter instance.
    pub fn format(&self, event: &dyn LoggingEvent) -> Result<String, FormatError> {
        self.inner.format(event)
    }
}

impl fmt::Debug for SharedFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedFormatter(<dyn FemtoFormatter>)")
    }
}

impl FemtoFormatter for SharedFormatter {
    fn format(&self, event: &dyn LoggingEvent) -> Result<String, FormatError> {
        self.inner.format(event)
    }
}

impl FemtoFormatter for Arc<dyn FemtoFormatter + Send + Sync> {
    fn format(&self, event: &dyn LoggingEvent) -> Result<String, FormatError> {
        (**self).format(event)
    }
}

impl FemtoFormatter for Box<dyn FemtoFormatter + Send + Sync> {
    fn format(&self, event: &dyn LoggingEvent) -> Result<String, FormatError> {
        (**self).format(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FemtoLogEvent;
    use crate::level::FemtoLevel;
    use static_assertions::assert_impl_all;

    struct Upper;

    impl FemtoFormatter for Upper {
        fn format(&self, event: &dyn LoggingEvent) -> Result<String, FormatError> {
            Ok(event.rendered_message().to_uppercase())
        }
    }

    #[test]
    fn shared_formatter_is_send_sync() {
        assert_impl_all!(SharedFormatter: Send, Sync);
        assert_impl_all!(Arc<dyn FemtoFormatter + Send + Sync>: Send, Sync);
    }

    #[test]
    fn shared_formatter_delegates() {
        let shared = SharedFormatter::new(Upper);
        let event = FemtoLogEvent::new("core", FemtoLevel::Info, "hello");
        assert_eq!(shared.format(&event).expect("format"), "HELLO");

        let boxed: Box<dyn FemtoFormatter + Send + Sync> = Box::new(shared.clone());
        assert_eq!(boxed.format(&event).expect("format"), "HELLO");
        assert_eq!(
            SharedFormatter::from_arc(shared.clone_arc())
                .format(&event)
                .expect("format"),
            "HELLO"
        );
    }
}
