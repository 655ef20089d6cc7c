//! Registration outcome and error types.

use thiserror::Error;

use crate::store::StoreError;

/// Why a registration operation did not apply.
///
/// The first four variants are expected, recoverable domain outcomes returned
/// to the immediate caller. Only [`RegistrationError::Store`] is an
/// infrastructure fault.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The event does not exist.
    #[error("event not found")]
    NotFound,

    /// The participant is already in the attendee set.
    #[error("participant is already registered for this event")]
    AlreadyJoined,

    /// The attendee count already equals capacity.
    #[error("event is at capacity")]
    Full,

    /// The atomic attempt was rejected but a concurrent mutation moved the
    /// record before the diagnostic read. Transient; the caller may retry.
    #[error("registration conflicted with a concurrent update, please retry")]
    Conflict,

    /// The record store itself failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RegistrationError {
    /// Whether the caller may safely retry the same call.
    ///
    /// Only [`RegistrationError::Conflict`] is retryable: the retried join
    /// re-evaluates the same predicate fresh, so retrying is idempotent from
    /// the caller's perspective.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistrationError::Conflict)
    }

    /// Whether this is a domain outcome rather than an infrastructure fault.
    pub fn is_domain(&self) -> bool {
        !matches!(self, RegistrationError::Store(_))
    }
}
