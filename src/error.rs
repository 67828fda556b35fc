use thiserror::Error;

use crate::remote::RemoteError;

/// Failure classes surfaced by the store and the form.
///
/// Every one of these has already been turned into a notification by the time
/// an operation returns it; callers only need it to decide what to do next.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("note not found")]
    NotFound,

    #[error("not signed in")]
    Unauthenticated,

    #[error("{0}")]
    RemoteFailure(String),

    /// Blocked locally; nothing was sent to the remote service.
    #[error("{0}")]
    Validation(String),
}

impl From<RemoteError> for AppError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::NotFound(_) => Self::NotFound,
            RemoteError::Unauthenticated => Self::Unauthenticated,
            other => Self::RemoteFailure(other.to_string()),
        }
    }
}
