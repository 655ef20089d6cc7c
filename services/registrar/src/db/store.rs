//! Postgres-backed event store.
//!
//! Every mutation here is a single conditional `UPDATE ... WHERE <predicate>
//! RETURNING *`: Postgres evaluates the predicate and applies the mutation as
//! one atomic row update, so no operation ever reads state in one statement
//! and writes it in another. `RETURNING` doubles as the applied/not-applied
//! signal and hands back the post-update projection in the same step.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rsvp_id::{EventId, UserId};
use rsvp_registry::{EventRecord, RecordStore, StoreError};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use super::DbError;

const EVENT_COLUMNS: &str = "event_id, title, capacity, attendees, creator_id, created_at, updated_at";

/// A row from the events table.
#[derive(Debug, Clone)]
struct EventRow {
    event_id: String,
    title: String,
    capacity: i32,
    attendees: Vec<String>,
    creator_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for EventRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            event_id: row.try_get("event_id")?,
            title: row.try_get("title")?,
            capacity: row.try_get("capacity")?,
            attendees: row.try_get("attendees")?,
            creator_id: row.try_get("creator_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl EventRow {
    fn into_record(self) -> Result<EventRecord, String> {
        let id = EventId::parse(&self.event_id).map_err(|e| format!("event_id: {e}"))?;
        let creator = UserId::parse(&self.creator_id).map_err(|e| format!("creator_id: {e}"))?;
        let attendees = self
            .attendees
            .iter()
            .map(|a| UserId::parse(a).map_err(|e| format!("attendee '{a}': {e}")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EventRecord {
            id,
            title: self.title,
            capacity: self.capacity,
            attendees,
            creator,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Input for creating a new event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub capacity: i32,
    pub creator: UserId,
}

/// Event store over the `events` table.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Create a new event store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new event with an empty attendee set.
    ///
    /// Capacity bounds are validated by the caller; the table constraint is
    /// only a backstop.
    pub async fn create_event(&self, event: NewEvent) -> Result<EventRecord, DbError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            INSERT INTO events (event_id, title, capacity, attendees, creator_id)
            VALUES ($1, $2, $3, '{{}}', $4)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(EventId::new().to_string())
        .bind(&event.title)
        .bind(event.capacity)
        .bind(event.creator.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Query)?;

        row.into_record().map_err(DbError::Corrupt)
    }

    /// Fetch the current record, if any.
    pub async fn fetch(&self, event: EventId) -> Result<Option<EventRecord>, DbError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE event_id = $1"
        ))
        .bind(event.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)?;

        row.map(|r| r.into_record().map_err(DbError::Corrupt))
            .transpose()
    }

    /// Change the capacity, conditionally.
    ///
    /// Applies iff `actor` is the creator and the new capacity is not below
    /// the current attendee count, evaluated atomically against the row.
    /// Returns `None` when the predicate rejected the update; callers may
    /// `fetch` to classify why.
    pub async fn set_capacity(
        &self,
        event: EventId,
        actor: UserId,
        capacity: i32,
    ) -> Result<Option<EventRecord>, DbError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            UPDATE events
            SET capacity = $3,
                updated_at = now()
            WHERE event_id = $1
              AND creator_id = $2
              AND cardinality(attendees) <= $3
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event.to_string())
        .bind(actor.to_string())
        .bind(capacity)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)?;

        row.map(|r| r.into_record().map_err(DbError::Corrupt))
            .transpose()
    }

    /// Delete the event, creator-only. Returns whether a row was deleted.
    pub async fn delete_event(&self, event: EventId, actor: UserId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM events WHERE event_id = $1 AND creator_id = $2")
            .bind(event.to_string())
            .bind(actor.to_string())
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RecordStore for PgEventStore {
    async fn try_add_attendee(
        &self,
        event: EventId,
        user: UserId,
    ) -> Result<Option<EventRecord>, StoreError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            UPDATE events
            SET attendees = array_append(attendees, $2),
                updated_at = now()
            WHERE event_id = $1
              AND NOT ($2 = ANY(attendees))
              AND cardinality(attendees) < capacity
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event.to_string())
        .bind(user.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        row.map(|r| r.into_record().map_err(StoreError::Corrupt))
            .transpose()
    }

    async fn remove_attendee(
        &self,
        event: EventId,
        user: UserId,
    ) -> Result<Option<EventRecord>, StoreError> {
        // Applies to the row whenever the event exists; removing an absent
        // user must leave the record observably unchanged, hence the CASE on
        // updated_at.
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            UPDATE events
            SET attendees = array_remove(attendees, $2),
                updated_at = CASE WHEN $2 = ANY(attendees) THEN now() ELSE updated_at END
            WHERE event_id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event.to_string())
        .bind(user.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        row.map(|r| r.into_record().map_err(StoreError::Corrupt))
            .transpose()
    }

    async fn read(&self, event: EventId) -> Result<Option<EventRecord>, StoreError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE event_id = $1"
        ))
        .bind(event.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        row.map(|r| r.into_record().map_err(StoreError::Corrupt))
            .transpose()
    }
}
