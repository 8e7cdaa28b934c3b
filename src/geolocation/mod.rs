//! IP Geolocation module
//!
//! Resolves an IP address to an approximate [`LocationFix`]. The production
//! resolver reads a MaxMind GeoLite2-City database; users must download the
//! database file separately from MaxMind (free with registration).

pub mod static_table;

pub use static_table::StaticResolver;

use maxminddb::{geoip2, Reader};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::models::LocationFix;

/// Errors that can occur during geolocation lookups
#[derive(Error, Debug)]
pub enum GeoError {
    #[error("Failed to read database: {0}")]
    Database(#[from] maxminddb::MaxMindDBError),

    #[error("IP address not found in database")]
    NotFound,

    #[error("Location data missing for IP address")]
    NoLocation,

    #[error("Resolved coordinates out of range: ({0}, {1})")]
    InvalidCoordinates(f64, f64),

    #[error("Database file not found: {0}")]
    FileNotFound(String),

    #[error("Resolver unavailable: {0}")]
    Unavailable(String),
}

impl GeoError {
    /// True when the address itself has no usable location, as opposed to
    /// the resolver failing
    pub fn is_not_found(&self) -> bool {
        matches!(self, GeoError::NotFound | GeoError::NoLocation)
    }
}

/// Maps an IP address to a location fix
///
/// Implementations are called from a blocking worker thread and shared
/// between concurrent evaluations.
pub trait GeoResolver: Send + Sync {
    fn resolve(&self, ip: &IpAddr) -> Result<LocationFix, GeoError>;
}

/// GeoIP lookup using a MaxMind GeoLite2-City database
///
/// # Example
///
/// ```ignore
/// use geovelocity::geolocation::{GeoResolver, MaxMindResolver};
/// use std::net::IpAddr;
/// use std::str::FromStr;
///
/// let resolver = MaxMindResolver::new("GeoLite2-City.mmdb")?;
/// let ip = IpAddr::from_str("8.8.8.8").unwrap();
/// let fix = resolver.resolve(&ip)?;
/// println!("{}, {} (+/- {} km)", fix.latitude, fix.longitude, fix.accuracy_radius_km);
/// ```
pub struct MaxMindResolver {
    reader: Arc<Reader<Vec<u8>>>,
}

impl MaxMindResolver {
    /// Open a MaxMind database file
    ///
    /// # Errors
    ///
    /// Returns an error if the database file cannot be opened or is invalid.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, GeoError> {
        let path = db_path.as_ref();
        if !path.exists() {
            return Err(GeoError::FileNotFound(path.display().to_string()));
        }

        let reader = Reader::open_readfile(path)?;
        log::info!("Opened GeoIP database {}", path.display());
        Ok(MaxMindResolver {
            reader: Arc::new(reader),
        })
    }
}

impl GeoResolver for MaxMindResolver {
    fn resolve(&self, ip: &IpAddr) -> Result<LocationFix, GeoError> {
        let city: geoip2::City = self.reader.lookup(*ip).map_err(|e| match e {
            maxminddb::MaxMindDBError::AddressNotFoundError(_) => GeoError::NotFound,
            other => GeoError::Database(other),
        })?;

        let location = city.location.ok_or(GeoError::NoLocation)?;
        let latitude = location.latitude.ok_or(GeoError::NoLocation)?;
        let longitude = location.longitude.ok_or(GeoError::NoLocation)?;
        // Missing radius means the database makes no claim; treat as exact
        let radius = location.accuracy_radius.unwrap_or(0);

        let fix = LocationFix::new(latitude, longitude, f64::from(radius));
        if !fix.is_valid() {
            return Err(GeoError::InvalidCoordinates(latitude, longitude));
        }
        Ok(fix)
    }
}

impl Clone for MaxMindResolver {
    fn clone(&self) -> Self {
        MaxMindResolver {
            reader: Arc::clone(&self.reader),
        }
    }
}
