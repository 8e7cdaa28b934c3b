//! SQLite implementation of the EventStore trait

use super::{EventStore, PersistenceError};
use crate::models::{LocationFix, LoginRecord};
use rusqlite::{params, Connection, Row};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

const SELECT_COLUMNS: &str =
    "SELECT username, event_uuid, ip_address, unix_timestamp, lat, lon, radius FROM login_geo_location";

/// How long a connection waits on a conflicting writer before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

enum Backend {
    /// One connection per call; SQLite serialises only conflicting writes
    File(PathBuf),
    /// An in-memory database lives and dies with its single connection
    Memory(Mutex<Connection>),
}

/// SQLite-based login history
///
/// A file-backed store opens a connection per call in WAL mode, so readers
/// never wait on writers and calls for different users do not queue behind
/// a shared lock. Each append commits before it returns, which gives the
/// per-user ordering the service relies on.
pub struct SqliteEventStore {
    backend: Backend,
}

/// Columns of one row, before the IP address is parsed
type RawRow = (String, String, String, i64, f64, f64, f64);

impl SqliteEventStore {
    /// Create a new SQLite event store at the specified path
    ///
    /// Creates the database file and initializes the schema if it doesn't exist.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, PersistenceError> {
        let store = SqliteEventStore {
            backend: Backend::File(db_path.as_ref().to_path_buf()),
        };
        store.with_connection(|conn| {
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
            conn.execute_batch(include_str!("schema.sql"))?;
            Ok(())
        })?;
        Ok(store)
    }

    /// Create an in-memory SQLite database (useful for testing)
    ///
    /// All calls share one connection and run one at a time.
    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(SqliteEventStore {
            backend: Backend::Memory(Mutex::new(conn)),
        })
    }

    fn with_connection<T, F>(&self, work: F) -> Result<T, PersistenceError>
    where
        F: FnOnce(&Connection) -> Result<T, PersistenceError>,
    {
        match &self.backend {
            Backend::File(path) => {
                let conn = Connection::open(path)?;
                conn.busy_timeout(BUSY_TIMEOUT)?;
                work(&conn)
            }
            Backend::Memory(conn) => {
                let conn = conn.lock().map_err(|_| PersistenceError::LockPoisoned)?;
                work(&conn)
            }
        }
    }

    fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ))
    }

    fn into_record(raw: RawRow) -> Result<LoginRecord, PersistenceError> {
        let (username, event_uuid, ip_str, timestamp, lat, lon, radius) = raw;
        let ip_address = IpAddr::from_str(&ip_str)
            .map_err(|_| PersistenceError::InvalidData(format!("Invalid IP address: {}", ip_str)))?;
        Ok(LoginRecord {
            username,
            ip_address,
            event_uuid,
            timestamp,
            location: LocationFix::new(lat, lon, radius),
        })
    }

    fn query_one(
        &self,
        sql: &str,
        user: &str,
        timestamp: i64,
    ) -> Result<Option<LoginRecord>, PersistenceError> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(sql)?;

            match stmt.query_row(params![user, timestamp], Self::read_row) {
                Ok(raw) => Ok(Some(Self::into_record(raw)?)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }
}

impl EventStore for SqliteEventStore {
    fn append(&self, record: &LoginRecord) -> Result<(), PersistenceError> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO login_geo_location
                 (username, event_uuid, ip_address, unix_timestamp, lat, lon, radius)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    record.username,
                    record.event_uuid,
                    record.ip_address.to_string(),
                    record.timestamp,
                    record.location.latitude,
                    record.location.longitude,
                    record.location.accuracy_radius_km
                ],
            )?;
            Ok(())
        })
    }

    fn nearest_before(
        &self,
        user: &str,
        timestamp: i64,
    ) -> Result<Option<LoginRecord>, PersistenceError> {
        self.query_one(
            &format!(
                "{} WHERE username = ? AND unix_timestamp < ?
                 ORDER BY unix_timestamp DESC, id DESC LIMIT 1",
                SELECT_COLUMNS
            ),
            user,
            timestamp,
        )
    }

    fn nearest_after(
        &self,
        user: &str,
        timestamp: i64,
    ) -> Result<Option<LoginRecord>, PersistenceError> {
        self.query_one(
            &format!(
                "{} WHERE username = ? AND unix_timestamp > ?
                 ORDER BY unix_timestamp ASC, id ASC LIMIT 1",
                SELECT_COLUMNS
            ),
            user,
            timestamp,
        )
    }

    fn history(&self, user: &str, limit: usize) -> Result<Vec<LoginRecord>, PersistenceError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE username = ? ORDER BY unix_timestamp DESC, id DESC LIMIT ?",
                SELECT_COLUMNS
            ))?;

            let rows = stmt
                .query_map(params![user, limit], Self::read_row)?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter().map(Self::into_record).collect()
        })
    }

    fn prune_before(&self, before_timestamp: i64) -> Result<usize, PersistenceError> {
        self.with_connection(|conn| {
            let deleted = conn.execute(
                "DELETE FROM login_geo_location WHERE unix_timestamp < ?",
                params![before_timestamp],
            )?;
            Ok(deleted)
        })
    }
}
