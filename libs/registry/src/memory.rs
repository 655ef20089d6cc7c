//! In-memory record store.
//!
//! The reference implementation of the [`RecordStore`] contract: predicate and
//! mutation are evaluated under a single lock acquisition, which is this
//! store's rendering of the atomic conditional update. Used by tests and by
//! embedders that do not need durability.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rsvp_id::{EventId, UserId};
use thiserror::Error;

use crate::record::EventRecord;
use crate::store::{RecordStore, StoreError};

/// Rejected event-creation input.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("event capacity must be at least 1, got {0}")]
pub struct InvalidCapacity(pub i32);

/// In-memory record store keyed by event id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<EventId, EventRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EventId, EventRecord>> {
        // A poisoned lock only means another test thread panicked mid-update;
        // the map itself is still structurally sound.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a new event with an empty attendee set.
    pub fn create_event(
        &self,
        title: &str,
        capacity: i32,
        creator: UserId,
    ) -> Result<EventRecord, InvalidCapacity> {
        if capacity < 1 {
            return Err(InvalidCapacity(capacity));
        }
        let now = Utc::now();
        let record = EventRecord {
            id: EventId::new(),
            title: title.to_string(),
            capacity,
            attendees: Vec::new(),
            creator,
            created_at: now,
            updated_at: now,
        };
        self.lock().insert(record.id, record.clone());
        Ok(record)
    }

    /// Remove an event entirely. Returns whether it existed.
    pub fn delete_event(&self, event: EventId) -> bool {
        self.lock().remove(&event).is_some()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn try_add_attendee(
        &self,
        event: EventId,
        user: UserId,
    ) -> Result<Option<EventRecord>, StoreError> {
        let mut records = self.lock();
        let Some(record) = records.get_mut(&event) else {
            return Ok(None);
        };
        if record.is_attendee(&user) || record.is_full() {
            return Ok(None);
        }
        record.attendees.push(user);
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn remove_attendee(
        &self,
        event: EventId,
        user: UserId,
    ) -> Result<Option<EventRecord>, StoreError> {
        let mut records = self.lock();
        let Some(record) = records.get_mut(&event) else {
            return Ok(None);
        };
        if let Some(pos) = record.attendees.iter().position(|a| *a == user) {
            record.attendees.remove(pos);
            record.updated_at = Utc::now();
        }
        Ok(Some(record.clone()))
    }

    async fn read(&self, event: EventId) -> Result<Option<EventRecord>, StoreError> {
        Ok(self.lock().get(&event).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_rejects_over_capacity() {
        let store = MemoryStore::new();
        let event = store.create_event("Tiny", 1, UserId::new()).unwrap().id;

        assert!(store
            .try_add_attendee(event, UserId::new())
            .await
            .unwrap()
            .is_some());
        assert!(store
            .try_add_attendee(event, UserId::new())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate_member() {
        let store = MemoryStore::new();
        let event = store.create_event("Dup", 5, UserId::new()).unwrap().id;
        let user = UserId::new();

        assert!(store.try_add_attendee(event, user).await.unwrap().is_some());
        assert!(store.try_add_attendee(event, user).await.unwrap().is_none());

        let record = store.read(event).await.unwrap().unwrap();
        assert_eq!(record.attendee_count(), 1);
    }

    #[tokio::test]
    async fn test_remove_missing_event_is_none() {
        let store = MemoryStore::new();
        let result = store
            .remove_attendee(EventId::new(), UserId::new())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_remove_absent_user_is_noop() {
        let store = MemoryStore::new();
        let event = store.create_event("Noop", 2, UserId::new()).unwrap().id;
        let member = UserId::new();
        store.try_add_attendee(event, member).await.unwrap();

        let record = store
            .remove_attendee(event, UserId::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.attendees, vec![member]);
    }

    #[test]
    fn test_create_event_rejects_non_positive_capacity() {
        let store = MemoryStore::new();
        assert_eq!(
            store.create_event("Bad", 0, UserId::new()).unwrap_err(),
            InvalidCapacity(0)
        );
        assert_eq!(
            store.create_event("Bad", -3, UserId::new()).unwrap_err(),
            InvalidCapacity(-3)
        );
    }
}
