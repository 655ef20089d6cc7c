//! # rsvp-registry
//!
//! The registration engine for capacity-bounded events.
//!
//! The engine decides whether a join/leave request succeeds while guaranteeing
//! that an event is never overbooked and a participant is never double-counted,
//! under arbitrary concurrent contention. It holds no in-process locks and no
//! cached state: every race is resolved by the record store's atomic
//! conditional-update primitive, expressed by the [`RecordStore`] trait.
//!
//! Backends implement [`RecordStore`]; [`MemoryStore`] is the in-process
//! reference implementation, and the registrar service provides a Postgres one.

mod engine;
mod error;
mod memory;
mod record;
mod store;

pub use engine::{Registration, Registry};
pub use error::RegistrationError;
pub use memory::{InvalidCapacity, MemoryStore};
pub use record::EventRecord;
pub use store::{RecordStore, StoreError};
