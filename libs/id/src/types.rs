//! Typed ID definitions for the RSVP service.
//!
//! Each ID type has a unique prefix that identifies the resource type.
//! IDs are ULID-based for sortability and uniqueness.

use crate::define_id;

// =============================================================================
// Events and Participants
// =============================================================================

define_id!(EventId, "evt");
define_id!(UserId, "usr");

// =============================================================================
// Requests
// =============================================================================

define_id!(RequestId, "req");
