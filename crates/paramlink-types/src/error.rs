//! Error type shared by every crate in the workspace.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::schema::FieldSpec;

/// The original error object raised on the foreign side.
pub type ForeignCause = Arc<dyn StdError + Send + Sync + 'static>;

/// Errors produced while converting values or driving notifications.
#[derive(Error, Debug, Clone)]
pub enum BridgeError {
    /// A foreign or local kind with no counterpart on the other side.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// A local field whose rank the foreign model cannot express.
    #[error("field '{field}' has rank {rank}; only ranks 0, 1 and 2 can be encoded")]
    UnsupportedDimensionality { field: String, rank: usize },

    #[error("notification context carries no selector")]
    MissingSelector,

    #[error("field '{0}' is declared but absent")]
    MissingField(String),

    /// A failure reported by the foreign middleware. Displays the foreign
    /// message verbatim and yields the original error from
    /// [`source`](std::error::Error::source).
    #[error(transparent)]
    ForeignOperationFailed(ForeignFailure),

    #[error("stream closed")]
    StreamClosed,

    /// A one-shot request was dropped by the middleware without a response.
    #[error("request dropped before a response was delivered")]
    Disconnected,

    #[error("field '{0}' is not declared in the schema")]
    UnknownField(String),

    #[error("field '{field}' is declared as {expected} but got {found}")]
    TypeMismatch {
        field: String,
        expected: FieldSpec,
        found: FieldSpec,
    },

    #[error("field '{0}' is declared more than once")]
    DuplicateField(String),

    #[error("shape {shape:?} needs {expected} elements but {actual} were given")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },
}

/// A foreign failure: its message plus the original error object.
///
/// The cause is shared, never copied, so callers can recover the exact
/// object the middleware raised.
#[derive(Debug, Clone)]
pub struct ForeignFailure {
    message: String,
    cause: ForeignCause,
}

impl ForeignFailure {
    pub fn new(message: impl Into<String>, cause: ForeignCause) -> Self {
        Self {
            message: message.into(),
            cause,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> &ForeignCause {
        &self.cause
    }
}

impl fmt::Display for ForeignFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for ForeignFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        let cause: &(dyn StdError + 'static) = self.cause.as_ref();
        Some(cause)
    }
}

impl BridgeError {
    /// Wrap a foreign error, keeping `cause` as the causal reference.
    pub fn foreign(message: impl Into<String>, cause: ForeignCause) -> Self {
        BridgeError::ForeignOperationFailed(ForeignFailure::new(message, cause))
    }

    /// The wrapped foreign failure, if this is one.
    pub fn foreign_failure(&self) -> Option<&ForeignFailure> {
        match self {
            BridgeError::ForeignOperationFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("device timed out")]
    struct Timeout;

    #[test]
    fn foreign_failure_keeps_message_and_cause() {
        let cause: ForeignCause = Arc::new(Timeout);
        let err = BridgeError::foreign("device timed out", Arc::clone(&cause));

        assert_eq!(err.to_string(), "device timed out");
        let source = err.source().expect("foreign failures have a source");
        assert!(source.downcast_ref::<Timeout>().is_some());

        let failure = err.foreign_failure().unwrap();
        assert!(Arc::ptr_eq(failure.cause(), &cause));
    }

    #[test]
    fn local_errors_have_no_foreign_failure() {
        assert!(BridgeError::StreamClosed.foreign_failure().is_none());
        assert!(BridgeError::StreamClosed.source().is_none());
    }
}
