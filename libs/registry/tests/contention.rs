//! Contention tests: many concurrent joins racing for limited headroom.
//!
//! Which callers win under contention is deliberately unspecified; these tests
//! assert only the counts and the invariants. The failure label observed by a
//! loser may be `Full` or `Conflict`, since the diagnostic read can race other
//! mutations.

use std::collections::HashSet;
use std::sync::Arc;

use rsvp_id::UserId;
use rsvp_registry::{MemoryStore, RecordStore, Registration, RegistrationError, Registry};
use tokio::sync::Barrier;
use tokio::task::JoinSet;

type Outcome = Result<Registration, RegistrationError>;

async fn race_joins(registry: Arc<Registry<MemoryStore>>, event: rsvp_id::EventId, users: Vec<UserId>) -> Vec<Outcome> {
    let barrier = Arc::new(Barrier::new(users.len()));
    let mut tasks = JoinSet::new();
    for user in users {
        let registry = Arc::clone(&registry);
        let barrier = Arc::clone(&barrier);
        tasks.spawn(async move {
            barrier.wait().await;
            registry.join(event, user).await
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        outcomes.push(joined.expect("join task panicked"));
    }
    outcomes
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn two_racers_for_one_slot_admit_exactly_one() {
    let store = MemoryStore::new();
    let event = store.create_event("Single Seat", 1, UserId::new()).unwrap().id;
    let registry = Arc::new(Registry::new(store));

    let p1 = UserId::new();
    let p2 = UserId::new();
    let outcomes = race_joins(Arc::clone(&registry), event, vec![p1, p2]).await;

    let successes = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(successes, 1);
    for outcome in &outcomes {
        if let Err(reason) = outcome {
            assert!(
                matches!(reason, RegistrationError::Full | RegistrationError::Conflict),
                "loser saw unexpected reason: {reason}"
            );
        }
    }

    let record = registry.store().read(event).await.unwrap().unwrap();
    assert_eq!(record.attendee_count(), 1);
    let winner = record.attendees[0];
    assert!(winner == p1 || winner == p2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn burst_admits_exactly_remaining_headroom() {
    let store = MemoryStore::new();
    let record = store.create_event("Popular", 8, UserId::new()).unwrap();
    let event = record.id;

    // Pre-fill three seats, leaving headroom of five.
    for _ in 0..3 {
        store.try_add_attendee(event, UserId::new()).await.unwrap();
    }

    let registry = Arc::new(Registry::new(store));
    let users: Vec<UserId> = (0..20).map(|_| UserId::new()).collect();
    let outcomes = race_joins(Arc::clone(&registry), event, users).await;

    let successes = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(successes, 5, "exactly the headroom must be admitted");

    let record = registry.store().read(event).await.unwrap().unwrap();
    assert_eq!(record.attendee_count(), 8);

    let unique: HashSet<_> = record.attendees.iter().collect();
    assert_eq!(unique.len(), record.attendees.len(), "duplicate attendee");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn repeated_joins_by_one_user_count_once() {
    let store = MemoryStore::new();
    let event = store.create_event("Eager", 10, UserId::new()).unwrap().id;
    let registry = Arc::new(Registry::new(store));

    let user = UserId::new();
    let outcomes = race_joins(Arc::clone(&registry), event, vec![user; 6]).await;

    let successes = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(successes, 1, "only one of the duplicate joins may win");

    let record = registry.store().read(event).await.unwrap().unwrap();
    assert_eq!(record.attendee_count(), 1);
    assert!(record.is_attendee(&user));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn join_leave_storm_preserves_invariants() {
    let store = MemoryStore::new();
    let capacity = 4;
    let event = store
        .create_event("Revolving Door", capacity, UserId::new())
        .unwrap()
        .id;
    let registry = Arc::new(Registry::new(store));

    let mut tasks = JoinSet::new();
    for _ in 0..16 {
        let registry = Arc::clone(&registry);
        tasks.spawn(async move {
            let user = UserId::new();
            for _ in 0..25 {
                let joined = registry.join(event, user).await;
                if let Err(reason) = &joined {
                    assert!(
                        matches!(reason, RegistrationError::Full | RegistrationError::Conflict),
                        "unexpected join outcome: {reason}"
                    );
                }
                if joined.is_ok() {
                    registry.leave(event, user).await.expect("leave failed");
                }
            }
        });
    }
    while let Some(done) = tasks.join_next().await {
        done.expect("storm task panicked");
    }

    let record = registry.store().read(event).await.unwrap().unwrap();
    assert!(record.attendee_count() <= capacity as usize);
    let unique: HashSet<_> = record.attendees.iter().collect();
    assert_eq!(unique.len(), record.attendees.len(), "duplicate attendee");
}
