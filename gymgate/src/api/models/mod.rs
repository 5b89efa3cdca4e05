//! API request and response data models.
//!
//! These structures define the public HTTP contract of the service. They are
//! kept separate from the store records so that the wire format and the
//! persisted shape can evolve independently.

pub mod auth;
pub mod users;
