//! The registration engine: join/leave decisions over a record store.

use rsvp_id::{EventId, UserId};
use tracing::debug;

use crate::error::RegistrationError;
use crate::record::EventRecord;
use crate::store::RecordStore;

/// A successful registration change.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Attendee count immediately after the change applied.
    pub attendee_count: usize,
    /// The updated event projection.
    pub event: EventRecord,
}

impl Registration {
    fn from_record(event: EventRecord) -> Self {
        Self {
            attendee_count: event.attendee_count(),
            event,
        }
    }
}

/// The registration engine.
///
/// Stateless apart from its store handle: every call goes to the store, and
/// every race is resolved by the store's atomic conditional update. Under
/// contention no ordering is promised between concurrent joins — when an event
/// has N open slots and N+k joins race, exactly N succeed and which N is
/// store-dependent.
#[derive(Debug, Clone)]
pub struct Registry<S> {
    store: S,
}

impl<S: RecordStore> Registry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Register `user` for `event`.
    ///
    /// Succeeds iff, evaluated atomically by the store: the event exists, the
    /// user is not already an attendee, and the attendee count is below
    /// capacity. On rejection a single diagnostic read classifies the failure;
    /// the classification is advisory only and can lag the rejection under
    /// concurrency, in which case [`RegistrationError::Conflict`] is returned.
    pub async fn join(
        &self,
        event: EventId,
        user: UserId,
    ) -> Result<Registration, RegistrationError> {
        if let Some(record) = self.store.try_add_attendee(event, user).await? {
            debug!(
                event_id = %event,
                user_id = %user,
                attendee_count = record.attendee_count(),
                "join applied"
            );
            return Ok(Registration::from_record(record));
        }

        // The atomic attempt was rejected. Classify with one read-only lookup.
        // State may have moved since the rejection, so this is best-effort.
        let reason = match self.store.read(event).await? {
            None => RegistrationError::NotFound,
            Some(record) if record.is_attendee(&user) => RegistrationError::AlreadyJoined,
            Some(record) if record.is_full() => RegistrationError::Full,
            Some(_) => RegistrationError::Conflict,
        };
        debug!(event_id = %event, user_id = %user, reason = %reason, "join rejected");
        Err(reason)
    }

    /// Unregister `user` from `event`.
    ///
    /// Idempotent: leaving twice, or leaving without ever having joined,
    /// succeeds without changing the attendee set. Fails only with
    /// [`RegistrationError::NotFound`] when the event itself does not exist.
    pub async fn leave(
        &self,
        event: EventId,
        user: UserId,
    ) -> Result<Registration, RegistrationError> {
        match self.store.remove_attendee(event, user).await? {
            Some(record) => {
                debug!(
                    event_id = %event,
                    user_id = %user,
                    attendee_count = record.attendee_count(),
                    "leave applied"
                );
                Ok(Registration::from_record(record))
            }
            None => Err(RegistrationError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::store::{RecordStore, StoreError};
    use async_trait::async_trait;
    use chrono::Utc;
    use rstest::rstest;

    /// A store whose conditional update always rejects while the diagnostic
    /// read keeps showing an open record. Models a concurrent mutation landing
    /// between the atomic attempt and the classification read.
    struct ContendedStore {
        record: EventRecord,
    }

    #[async_trait]
    impl RecordStore for ContendedStore {
        async fn try_add_attendee(
            &self,
            _event: EventId,
            _user: UserId,
        ) -> Result<Option<EventRecord>, StoreError> {
            Ok(None)
        }

        async fn remove_attendee(
            &self,
            _event: EventId,
            _user: UserId,
        ) -> Result<Option<EventRecord>, StoreError> {
            Ok(Some(self.record.clone()))
        }

        async fn read(
            &self,
            _event: EventId,
        ) -> Result<Option<EventRecord>, StoreError> {
            Ok(Some(self.record.clone()))
        }
    }

    fn registry_with_event(capacity: i32) -> (Registry<MemoryStore>, EventId, UserId) {
        let store = MemoryStore::new();
        let creator = UserId::new();
        let record = store.create_event("Launch Party", capacity, creator).unwrap();
        (Registry::new(store), record.id, creator)
    }

    #[tokio::test]
    async fn test_join_succeeds_with_headroom() {
        let (registry, event, _) = registry_with_event(3);
        let user = UserId::new();

        let reg = registry.join(event, user).await.unwrap();
        assert_eq!(reg.attendee_count, 1);
        assert!(reg.event.is_attendee(&user));
    }

    #[tokio::test]
    async fn test_join_missing_event_is_not_found() {
        let registry = Registry::new(MemoryStore::new());
        let err = registry.join(EventId::new(), UserId::new()).await.unwrap_err();
        assert!(matches!(err, RegistrationError::NotFound));
    }

    #[tokio::test]
    async fn test_second_join_is_already_joined() {
        let (registry, event, _) = registry_with_event(3);
        let user = UserId::new();

        registry.join(event, user).await.unwrap();
        let err = registry.join(event, user).await.unwrap_err();
        assert!(matches!(err, RegistrationError::AlreadyJoined));

        let record = registry.store().read(event).await.unwrap().unwrap();
        assert_eq!(record.attendee_count(), 1);
    }

    #[tokio::test]
    async fn test_join_full_event_is_full() {
        let (registry, event, _) = registry_with_event(5);
        for _ in 0..5 {
            registry.join(event, UserId::new()).await.unwrap();
        }

        let err = registry.join(event, UserId::new()).await.unwrap_err();
        assert!(matches!(err, RegistrationError::Full));

        let record = registry.store().read(event).await.unwrap().unwrap();
        assert_eq!(record.attendee_count(), 5);
    }

    #[tokio::test]
    async fn test_rejected_join_with_open_record_is_conflict() {
        let now = Utc::now();
        let record = EventRecord {
            id: EventId::new(),
            title: "Contended".to_string(),
            capacity: 3,
            attendees: vec![UserId::new()],
            creator: UserId::new(),
            created_at: now,
            updated_at: now,
        };
        let event = record.id;
        let registry = Registry::new(ContendedStore { record });

        // The diagnostic read sees a non-member, under-capacity record, so the
        // rejection can only be explained by a concurrent mutation.
        let err = registry.join(event, UserId::new()).await.unwrap_err();
        assert!(matches!(err, RegistrationError::Conflict));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_leave_is_idempotent() {
        let (registry, event, _) = registry_with_event(3);
        let user = UserId::new();

        registry.join(event, user).await.unwrap();
        let first = registry.leave(event, user).await.unwrap();
        assert_eq!(first.attendee_count, 0);

        // Leaving again, and leaving as a user who never joined, both succeed.
        let second = registry.leave(event, user).await.unwrap();
        assert_eq!(second.attendee_count, 0);
        let never_joined = registry.leave(event, UserId::new()).await.unwrap();
        assert_eq!(never_joined.attendee_count, 0);
    }

    #[tokio::test]
    async fn test_leave_missing_event_is_not_found() {
        let registry = Registry::new(MemoryStore::new());
        let err = registry
            .leave(EventId::new(), UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::NotFound));
    }

    #[tokio::test]
    async fn test_join_then_leave_round_trips() {
        let (registry, event, _) = registry_with_event(3);
        let before = registry.store().read(event).await.unwrap().unwrap();

        let user = UserId::new();
        registry.join(event, user).await.unwrap();
        registry.leave(event, user).await.unwrap();

        let after = registry.store().read(event).await.unwrap().unwrap();
        assert_eq!(before.attendees, after.attendees);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(7)]
    #[tokio::test]
    async fn test_sequential_fill_admits_exactly_capacity(#[case] capacity: i32) {
        let (registry, event, _) = registry_with_event(capacity);

        let mut successes = 0;
        for _ in 0..(capacity + 3) {
            match registry.join(event, UserId::new()).await {
                Ok(_) => successes += 1,
                Err(RegistrationError::Full) => {}
                Err(other) => panic!("unexpected outcome: {other}"),
            }
        }

        assert_eq!(successes, capacity);
        let record = registry.store().read(event).await.unwrap().unwrap();
        assert_eq!(record.attendee_count(), capacity as usize);
    }
}
