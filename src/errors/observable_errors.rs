use std::{error, sync::Arc};

use thiserror::Error;

/// Error value carried by a stream's terminal `error` event.
///
/// Any error type can be delivered as long as it is thread safe; the `Arc` lets
/// handlers keep or forward the error without cloning its payload.
pub type StreamError = Arc<dyn error::Error + Send + Sync>;

/// Errors produced by `rxcore` itself.
///
/// `Message` is also a convenient ready-made stream error for producers that have
/// no dedicated error type of their own.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ObservableError {
    /// A producer-defined failure described by a message.
    #[error("{0}")]
    Message(String),

    /// A stream error reached a subscriber that has no error handler while the
    /// [`UnhandledError::Panic`] policy was in effect.
    ///
    /// [`UnhandledError::Panic`]: crate::UnhandledError::Panic
    #[error("unhandled stream error: {source}")]
    Unhandled {
        /// The stream error nobody handled.
        source: StreamError,
    },

    /// No Tokio runtime was available for an asynchronous teardown and a fallback
    /// runtime could not be built.
    #[error("failed to build runtime for asynchronous teardown")]
    TeardownRuntime(#[from] std::io::Error),
}

impl ObservableError {
    /// Creates a [`ObservableError::Message`] error.
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }

    /// Converts this error into a [`StreamError`] ready to be passed to
    /// `Observer::error`.
    #[must_use]
    pub fn into_stream_error(self) -> StreamError {
        Arc::new(self)
    }

    /// Returns a short stable label (snake_case) for use in logs.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Message(_) => "stream_message",
            Self::Unhandled { .. } => "stream_unhandled",
            Self::TeardownRuntime(_) => "teardown_runtime",
        }
    }
}
