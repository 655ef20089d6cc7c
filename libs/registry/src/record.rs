//! The event record projection returned to callers.

use chrono::{DateTime, Utc};
use rsvp_id::{EventId, UserId};
use serde::{Deserialize, Serialize};

/// A point-in-time projection of one event record.
///
/// The record store is the single owner of event state; this struct is a copy
/// handed back by store operations and is never written back as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    pub title: String,
    /// Maximum attendee count. Always >= 1.
    pub capacity: i32,
    /// Attendee set: no duplicates, order carries no meaning.
    pub attendees: Vec<UserId>,
    pub creator: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventRecord {
    /// Number of registered attendees.
    pub fn attendee_count(&self) -> usize {
        self.attendees.len()
    }

    /// Whether the attendee set has reached capacity.
    pub fn is_full(&self) -> bool {
        self.attendees.len() >= self.capacity as usize
    }

    /// Whether `user` is currently registered.
    pub fn is_attendee(&self, user: &UserId) -> bool {
        self.attendees.contains(user)
    }

    /// Remaining open slots.
    pub fn remaining(&self) -> usize {
        (self.capacity as usize).saturating_sub(self.attendees.len())
    }
}
