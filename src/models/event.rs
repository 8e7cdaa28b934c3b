use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A malformed or missing field in an incoming login event
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError {
            field,
            reason: reason.into(),
        }
    }
}

/// Login event as received on the wire, before validation
///
/// Every field is optional here so that a missing field is reported by
/// name instead of as a generic decoding failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub ip_address: Option<String>,
    pub event_uuid: Option<String>,
    pub unix_timestamp: Option<i64>,
}

impl LoginRequest {
    /// Check every field and produce a validated event
    pub fn validate(&self) -> Result<LoginEvent, ValidationError> {
        let event_uuid = non_empty(&self.event_uuid, "event_uuid")?;
        let username = non_empty(&self.username, "username")?;
        let ip_literal = non_empty(&self.ip_address, "ip_address")?;
        let ip_address = IpAddr::from_str(ip_literal.trim()).map_err(|_| {
            ValidationError::new("ip_address", format!("'{}' is not an IP address", ip_literal))
        })?;

        let timestamp = match self.unix_timestamp {
            None => return Err(ValidationError::new("unix_timestamp", "required")),
            Some(ts) if ts <= 0 => {
                return Err(ValidationError::new("unix_timestamp", "must be greater than zero"))
            }
            Some(ts) => ts,
        };

        Ok(LoginEvent {
            username,
            ip_address,
            event_uuid,
            timestamp,
        })
    }
}

fn non_empty(value: &Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value.as_deref() {
        None => Err(ValidationError::new(field, "required")),
        Some(s) if s.trim().is_empty() => Err(ValidationError::new(field, "must not be empty")),
        Some(s) => Ok(s.to_string()),
    }
}

/// A validated login event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginEvent {
    pub username: String,
    pub ip_address: IpAddr,
    pub event_uuid: String,
    /// Seconds since the Unix epoch, always > 0
    pub timestamp: i64,
}

impl LoginEvent {
    /// Check the invariants an event built without [`LoginRequest::validate`] may break
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.event_uuid.trim().is_empty() {
            return Err(ValidationError::new("event_uuid", "must not be empty"));
        }
        if self.username.trim().is_empty() {
            return Err(ValidationError::new("username", "must not be empty"));
        }
        if self.timestamp <= 0 {
            return Err(ValidationError::new("unix_timestamp", "must be greater than zero"));
        }
        Ok(())
    }
}

/// Approximate position of an IP address
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    /// Uncertainty around the coordinate in km, 0 means exact
    #[serde(rename = "radius")]
    pub accuracy_radius_km: f64,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, accuracy_radius_km: f64) -> Self {
        LocationFix {
            latitude,
            longitude,
            accuracy_radius_km,
        }
    }

    /// A fix with no positional uncertainty
    pub fn exact(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, 0.0)
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && self.accuracy_radius_km.is_finite()
            && self.accuracy_radius_km >= 0.0
    }
}

/// A login event together with its resolved location, as kept by the event store
#[derive(Debug, Clone, PartialEq)]
pub struct LoginRecord {
    pub username: String,
    pub ip_address: IpAddr,
    pub event_uuid: String,
    pub timestamp: i64,
    pub location: LocationFix,
}

impl LoginRecord {
    pub fn new(event: LoginEvent, location: LocationFix) -> Self {
        LoginRecord {
            username: event.username,
            ip_address: event.ip_address,
            event_uuid: event.event_uuid,
            timestamp: event.timestamp,
            location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> LoginRequest {
        LoginRequest {
            username: Some("alice".to_string()),
            ip_address: Some("203.0.113.7".to_string()),
            event_uuid: Some("85ad929a-db03-4bf4-9541-8f728fa12e42".to_string()),
            unix_timestamp: Some(1514764800),
        }
    }

    #[test]
    fn test_valid_request() {
        let event = request().validate().unwrap();
        assert_eq!(event.username, "alice");
        assert_eq!(event.ip_address, IpAddr::from_str("203.0.113.7").unwrap());
        assert_eq!(event.timestamp, 1514764800);
    }

    #[test]
    fn test_ipv6_request() {
        let mut req = request();
        req.ip_address = Some("2001:db8::1".to_string());
        assert!(req.validate().unwrap().ip_address.is_ipv6());
    }

    #[test]
    fn test_missing_fields_are_named() {
        let mut req = request();
        req.event_uuid = None;
        assert_eq!(req.validate().unwrap_err().field, "event_uuid");

        let mut req = request();
        req.username = Some("   ".to_string());
        assert_eq!(req.validate().unwrap_err().field, "username");

        let mut req = request();
        req.ip_address = None;
        assert_eq!(req.validate().unwrap_err().field, "ip_address");

        let mut req = request();
        req.unix_timestamp = None;
        assert_eq!(req.validate().unwrap_err().field, "unix_timestamp");
    }

    #[test]
    fn test_invalid_ip_rejected() {
        let mut req = request();
        req.ip_address = Some("999.1.1.1".to_string());
        let err = req.validate().unwrap_err();
        assert_eq!(err.field, "ip_address");
        assert!(err.reason.contains("999.1.1.1"));
    }

    #[test]
    fn test_non_positive_timestamp_rejected() {
        let mut req = request();
        req.unix_timestamp = Some(0);
        assert_eq!(req.validate().unwrap_err().field, "unix_timestamp");
        req.unix_timestamp = Some(-5);
        assert_eq!(req.validate().unwrap_err().field, "unix_timestamp");
    }

    #[test]
    fn test_event_built_directly_is_checked() {
        let mut event = request().validate().unwrap();
        assert!(event.validate().is_ok());

        event.timestamp = -5;
        assert_eq!(event.validate().unwrap_err().field, "unix_timestamp");

        event.username = String::new();
        assert_eq!(event.validate().unwrap_err().field, "username");

        event.event_uuid = " ".to_string();
        assert_eq!(event.validate().unwrap_err().field, "event_uuid");
    }

    #[test]
    fn test_location_fix_bounds() {
        assert!(LocationFix::new(51.5, -0.12, 10.0).is_valid());
        assert!(!LocationFix::new(91.0, 0.0, 0.0).is_valid());
        assert!(!LocationFix::new(0.0, -181.0, 0.0).is_valid());
        assert!(!LocationFix::new(0.0, 0.0, -1.0).is_valid());
    }
}
