//! The record store contract the engine runs against.

use async_trait::async_trait;
use rsvp_id::{EventId, UserId};
use thiserror::Error;

use crate::record::EventRecord;

/// Infrastructure faults from the record store.
///
/// These are distinct from domain outcomes (not found, full, already joined):
/// a `StoreError` means the store could not answer at all.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or refused the operation.
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// The backend reported a failure executing the operation.
    #[error("record store operation failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// A stored record could not be decoded.
    #[error("corrupt event record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Wrap a backend error.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }
}

/// Atomic record operations over event state.
///
/// Every mutation is a single conditional update: the predicate and the
/// mutation are evaluated as one indivisible step against the current stored
/// record, visible as such to all concurrent operations on the same record.
/// Implementations must not decompose an operation into a read followed by a
/// write.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Atomically add `user` to the attendee set.
    ///
    /// Applies iff the event exists AND `user` is not already an attendee AND
    /// the attendee count is below capacity, all evaluated in the same atomic
    /// step as the mutation. Returns the post-update projection when applied,
    /// `None` when the predicate rejected the update. `None` carries no reason;
    /// callers that need one must perform a separate diagnostic [`read`].
    ///
    /// [`read`]: RecordStore::read
    async fn try_add_attendee(
        &self,
        event: EventId,
        user: UserId,
    ) -> Result<Option<EventRecord>, StoreError>;

    /// Atomically remove `user` from the attendee set if present.
    ///
    /// Idempotent: removing an absent user applies as a no-op. Returns the
    /// post-update projection, or `None` iff the event does not exist.
    async fn remove_attendee(
        &self,
        event: EventId,
        user: UserId,
    ) -> Result<Option<EventRecord>, StoreError>;

    /// Read the current record, if any. Used for diagnostics after a rejected
    /// conditional update; never used to decide success.
    async fn read(&self, event: EventId) -> Result<Option<EventRecord>, StoreError>;
}
