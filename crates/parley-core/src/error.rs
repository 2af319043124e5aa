//! Error types shared across the Parley crates.
//!
//! Tool failures are deliberately absent here: they are data
//! ([`crate::tool::ToolFailure`]) carried inside tool results, never errors
//! that abort a request.

use thiserror::Error;

/// Failures of the session store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// An active-session operation was attempted before any `select`.
    #[error("No session selected")]
    SessionNotSelected,

    /// An explicit-id append targeted a session that was never opened.
    #[error("Session '{id}' has not been opened")]
    UnknownSession { id: String },

    /// A buffer lock was poisoned by a panicking writer.
    #[error("Session '{session}' lock poisoned: {reason}")]
    LockPoisoned { session: String, reason: String },
}

impl MemoryError {
    pub fn lock_poisoned(session: impl Into<String>, reason: impl ToString) -> Self {
        MemoryError::LockPoisoned {
            session: session.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failures of the model backend call.
///
/// These are never swallowed: a backend failure fails the whole request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend could not be reached.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with an error status.
    #[error("Backend request failed ({status}): {message}")]
    Request { status: u16, message: String },

    /// The backend answer could not be interpreted.
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    /// The backend did not answer in time.
    #[error("Backend timed out after {0}ms")]
    Timeout(u64),
}

pub type MemoryResult<T> = Result<T, MemoryError>;
pub type BackendResult<T> = Result<T, BackendError>;
