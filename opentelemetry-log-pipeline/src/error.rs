//! Errors reported by the log pipeline.
use std::sync::PoisonError;
use std::time::Duration;
use thiserror::Error;

/// Failure carried by a resolved [`AsyncResult`].
///
/// [`AsyncResult`]: crate::AsyncResult
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OTelSdkError {
    /// Shutdown has already been invoked.
    ///
    /// While shutdown is idempotent and calling it multiple times has no
    /// impact, this error suggests that another part of the application is
    /// invoking `shutdown` earlier than intended.
    #[error("Shutdown already invoked")]
    AlreadyShutdown,

    /// Operation timed out before completing.
    ///
    /// The operation may still be running in the background; the timeout
    /// only bounds how long the caller waited.
    #[error("Operation timed out after {} milliseconds", .0.as_millis())]
    Timeout(Duration),

    /// Operation failed. The string describes the cause.
    #[error("Operation failed: {0}")]
    InternalFailure(String),
}

impl<T> From<PoisonError<T>> for OTelSdkError {
    fn from(err: PoisonError<T>) -> Self {
        OTelSdkError::InternalFailure(format!("Mutex poisoned: {err}"))
    }
}

/// The outcome of an operation in the log pipeline.
pub type OTelSdkResult = Result<(), OTelSdkError>;

/// Invalid builder arguments, rejected when the component is built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A setting has a value outside of its allowed range.
    #[error("invalid value for `{name}`: {reason}")]
    InvalidValue {
        /// Name of the offending setting.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A scope name pattern could not be compiled.
    #[error("invalid scope pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The pattern as supplied by the caller.
        pattern: String,
        /// Error reported by the pattern engine.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid_value(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            name,
            reason: reason.into(),
        }
    }
}
