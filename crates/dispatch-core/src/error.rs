use thiserror::Error;
use uuid::Uuid;

use dispatch_domain::{TransitionError, ValidationErrors};

/// The semantic error taxonomy every layer converts into at its
/// boundary. Transport adapters map these to wire codes; nothing below
/// the transport ever sees a wire code.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationErrors),

    #[error("assignment {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// Reserved: no field enforces uniqueness today.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Optimistic-guard loser. The use-case absorbs this with a bounded
    /// retry; it only escapes when the retry budget is exhausted.
    #[error("concurrent modification of assignment {0}")]
    ConflictingWrite(Uuid),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("request cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn internal(msg: impl Into<String>) -> Self {
        ServiceError::Internal(msg.into())
    }
}
