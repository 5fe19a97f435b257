//! Error taxonomy for the coaching core.
//!
//! Remote generation failures are deliberately absent from this enum: they are
//! absorbed into a degraded turn (see [`crate::dialogue::ReplyOutcome`]) and
//! never fail the enclosing operation.

use thiserror::Error;
use uuid::Uuid;

/// Coarse grouping of [`CoachError`] variants, used by transports to pick a
/// status code and by operators to tell bookkeeping bugs from bad input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    StateConflict,
    Internal,
    Storage,
}

#[derive(Debug, Error)]
pub enum CoachError {
    /// Bad input shape or range. Rejected before any state is touched.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("persona not found: {0}")]
    PersonaNotFound(String),

    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("topic not found: {0}")]
    TopicNotFound(String),

    /// A message was sent to a session that has already ended.
    #[error("session {0} is closed")]
    SessionClosed(Uuid),

    /// `end` was called twice on the same session.
    #[error("session {0} has already ended")]
    SessionAlreadyEnded(Uuid),

    /// Our own bookkeeping is broken (index gap, duplicate id, ...).
    /// Never repaired silently.
    #[error("internal invariant violated: {0}")]
    Invariant(String),

    #[error("session store failure: {0}")]
    Storage(#[source] anyhow::Error),
}

impl CoachError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoachError::Validation(_) => ErrorKind::Validation,
            CoachError::PersonaNotFound(_)
            | CoachError::SessionNotFound(_)
            | CoachError::TopicNotFound(_) => ErrorKind::NotFound,
            CoachError::SessionClosed(_) | CoachError::SessionAlreadyEnded(_) => {
                ErrorKind::StateConflict
            }
            CoachError::Invariant(_) => ErrorKind::Internal,
            CoachError::Storage(_) => ErrorKind::Storage,
        }
    }
}

pub type Result<T, E = CoachError> = std::result::Result<T, E>;
