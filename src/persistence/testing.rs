//! Event store double that injects failures

use std::time::Duration;

use super::{EventStore, PersistenceError, SqliteEventStore};
use crate::models::LoginRecord;

/// What goes wrong, and where
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    FailAppend,
    FailQueries,
    SlowAppend(Duration),
    SlowQueries(Duration),
    PanicAppend,
}

/// Wraps an in-memory store and misbehaves as configured
pub struct FaultyStore {
    inner: SqliteEventStore,
    fault: Fault,
}

impl FaultyStore {
    pub fn new(fault: Fault) -> Self {
        FaultyStore {
            inner: SqliteEventStore::in_memory().expect("Failed to create in-memory store"),
            fault,
        }
    }

    fn outage() -> PersistenceError {
        PersistenceError::InvalidData("disk on fire at /var/lib/detector.db".to_string())
    }

    fn before_query(&self) -> Result<(), PersistenceError> {
        match self.fault {
            Fault::FailQueries => Err(Self::outage()),
            Fault::SlowQueries(delay) => {
                std::thread::sleep(delay);
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl EventStore for FaultyStore {
    fn append(&self, record: &LoginRecord) -> Result<(), PersistenceError> {
        match self.fault {
            Fault::FailAppend => return Err(Self::outage()),
            Fault::SlowAppend(delay) => std::thread::sleep(delay),
            Fault::PanicAppend => panic!("append worker crashed"),
            _ => {}
        }
        self.inner.append(record)
    }

    fn nearest_before(&self, user: &str, ts: i64) -> Result<Option<LoginRecord>, PersistenceError> {
        self.before_query()?;
        self.inner.nearest_before(user, ts)
    }

    fn nearest_after(&self, user: &str, ts: i64) -> Result<Option<LoginRecord>, PersistenceError> {
        self.before_query()?;
        self.inner.nearest_after(user, ts)
    }

    fn history(&self, user: &str, limit: usize) -> Result<Vec<LoginRecord>, PersistenceError> {
        self.inner.history(user, limit)
    }

    fn prune_before(&self, ts: i64) -> Result<usize, PersistenceError> {
        self.inner.prune_before(ts)
    }
}
