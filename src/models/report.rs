use serde::{Deserialize, Serialize};

use super::event::{LocationFix, LoginRecord};

/// Outcome of comparing the current login with one neighboring login
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionVerdict {
    /// The stored login the speed was derived from
    pub neighbor: LoginRecord,
    /// Great-circle distance plus both accuracy radii, in km
    pub distance_km: f64,
    /// Implied speed in km/h, rounded to the nearest integer
    pub speed_kmh: u64,
    pub suspicious: bool,
}

/// Result of evaluating one login against its neighbors in time
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyResult {
    pub current: LocationFix,
    pub before: Option<TransitionVerdict>,
    pub after: Option<TransitionVerdict>,
}

impl AnomalyResult {
    pub fn suspicious_before(&self) -> bool {
        self.before.as_ref().map_or(false, |v| v.suspicious)
    }

    pub fn suspicious_after(&self) -> bool {
        self.after.as_ref().map_or(false, |v| v.suspicious)
    }

    pub fn is_suspicious(&self) -> bool {
        self.suspicious_before() || self.suspicious_after()
    }
}

/// A neighboring login as rendered in a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborAccess {
    pub lat: f64,
    pub lon: f64,
    pub radius: f64,
    pub ip_address: String,
    pub speed_kmh: u64,
    pub timestamp: i64,
}

impl From<&TransitionVerdict> for NeighborAccess {
    fn from(verdict: &TransitionVerdict) -> Self {
        let location = verdict.neighbor.location;
        NeighborAccess {
            lat: location.latitude,
            lon: location.longitude,
            radius: location.accuracy_radius_km,
            ip_address: verdict.neighbor.ip_address.to_string(),
            speed_kmh: verdict.speed_kmh,
            timestamp: verdict.neighbor.timestamp,
        }
    }
}

/// Wire form of an [`AnomalyResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResponse {
    pub current_geo: LocationFix,
    pub preceding_access: Option<NeighborAccess>,
    pub subsequent_access: Option<NeighborAccess>,
    pub suspicious_before: bool,
    pub suspicious_after: bool,
}

impl From<&AnomalyResult> for AnomalyResponse {
    fn from(result: &AnomalyResult) -> Self {
        AnomalyResponse {
            current_geo: result.current,
            preceding_access: result.before.as_ref().map(NeighborAccess::from),
            subsequent_access: result.after.as_ref().map(NeighborAccess::from),
            suspicious_before: result.suspicious_before(),
            suspicious_after: result.suspicious_after(),
        }
    }
}
