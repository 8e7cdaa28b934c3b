//! Persistence module for login history
//!
//! This module provides the append-only store of located login events
//! that neighbor lookups run against.

pub mod sqlite_store;

#[cfg(test)]
pub(crate) mod testing;

pub use sqlite_store::SqliteEventStore;

use crate::models::LoginRecord;
use thiserror::Error;

/// Errors that can occur during persistence operations
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid data in database: {0}")]
    InvalidData(String),

    #[error("Database lock poisoned")]
    LockPoisoned,
}

/// Trait for login history backends
///
/// For a single user, `append` and the neighbor queries must be
/// linearizable: an append that has returned is visible to every query
/// for that user that starts afterwards. Operations for different users
/// carry no ordering requirement, and `append` must be callable
/// concurrently for different users without blocking each other.
pub trait EventStore: Send + Sync {
    /// Durably record a located login event
    fn append(&self, record: &LoginRecord) -> Result<(), PersistenceError>;

    /// The user's event with the greatest timestamp strictly less than `timestamp`
    ///
    /// Ties on timestamp resolve to the most recently appended event.
    fn nearest_before(
        &self,
        user: &str,
        timestamp: i64,
    ) -> Result<Option<LoginRecord>, PersistenceError>;

    /// The user's event with the smallest timestamp strictly greater than `timestamp`
    ///
    /// Ties on timestamp resolve to the earliest appended event.
    fn nearest_after(
        &self,
        user: &str,
        timestamp: i64,
    ) -> Result<Option<LoginRecord>, PersistenceError>;

    /// Most recent events for a user, newest first
    fn history(&self, user: &str, limit: usize) -> Result<Vec<LoginRecord>, PersistenceError>;

    /// Remove events older than `before_timestamp`, returning how many were deleted
    fn prune_before(&self, before_timestamp: i64) -> Result<usize, PersistenceError>;
}
