//! Application state shared across request handlers.

use std::sync::Arc;

use rsvp_registry::Registry;

use crate::db::{Database, PgEventStore};

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    db: Database,
    registry: Registry<PgEventStore>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Database) -> Self {
        let registry = Registry::new(db.event_store());
        Self {
            inner: Arc::new(AppStateInner { db, registry }),
        }
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    /// Get a reference to the registration engine.
    pub fn registry(&self) -> &Registry<PgEventStore> {
        &self.inner.registry
    }
}
