use crate::detection::distance::compensated_distance_km;
use crate::models::{LoginRecord, TransitionVerdict};

/// Default cutoff above which travel between two logins is considered impossible
pub const DEFAULT_MAX_VELOCITY_KMH: f64 = 500.0;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Classifies the transition between a login and one of its neighbors in time
#[derive(Debug, Clone, Copy)]
pub struct VelocityClassifier {
    /// Maximum plausible travel speed in km/h
    max_velocity_kmh: f64,
}

impl VelocityClassifier {
    pub fn new() -> Self {
        Self::with_max_velocity(DEFAULT_MAX_VELOCITY_KMH)
    }

    pub fn with_max_velocity(max_velocity_kmh: f64) -> Self {
        VelocityClassifier { max_velocity_kmh }
    }

    pub fn max_velocity_kmh(&self) -> f64 {
        self.max_velocity_kmh
    }

    /// Derive the implied speed between `current` and `neighbor`
    ///
    /// Returns `None` when there is no neighbor, so a user's first or last
    /// login is never flagged. Elapsed time is the absolute difference of
    /// the two timestamps, which makes the check symmetric for preceding and
    /// subsequent neighbors. Two logins in the same second are treated as
    /// one second apart.
    pub fn classify(
        &self,
        current: &LoginRecord,
        neighbor: Option<&LoginRecord>,
    ) -> Option<TransitionVerdict> {
        let neighbor = neighbor?;

        let distance_km = compensated_distance_km(&current.location, &neighbor.location);
        let elapsed_seconds = current.timestamp.abs_diff(neighbor.timestamp).max(1);
        let elapsed_hours = elapsed_seconds as f64 / SECONDS_PER_HOUR;

        let speed_kmh = (distance_km / elapsed_hours).round().max(0.0) as u64;

        Some(TransitionVerdict {
            neighbor: neighbor.clone(),
            distance_km,
            speed_kmh,
            suspicious: speed_kmh as f64 > self.max_velocity_kmh,
        })
    }
}

impl Default for VelocityClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::distance::EARTH_RADIUS_KM;
    use crate::models::LocationFix;

    fn record(uuid: &str, timestamp: i64, location: LocationFix) -> LoginRecord {
        LoginRecord {
            username: "alice".to_string(),
            ip_address: "192.0.2.10".parse().unwrap(),
            event_uuid: uuid.to_string(),
            timestamp,
            location,
        }
    }

    /// A fix exactly `km` north of `origin` along its meridian
    fn north_of(origin: LocationFix, km: f64) -> LocationFix {
        LocationFix::exact(origin.latitude + (km / EARTH_RADIUS_KM).to_degrees(), origin.longitude)
    }

    #[test]
    fn test_no_neighbor_no_verdict() {
        let classifier = VelocityClassifier::new();
        let current = record("e-1", 1700000000, LocationFix::exact(10.0, 10.0));
        assert!(classifier.classify(&current, None).is_none());
    }

    #[test]
    fn test_plausible_travel() {
        let classifier = VelocityClassifier::new();
        let origin = LocationFix::exact(10.0, 20.0);
        let previous = record("e-1", 1700000000, origin);
        let current = record("e-2", 1700000000 + 3600, north_of(origin, 300.0));

        let verdict = classifier.classify(&current, Some(&previous)).unwrap();
        assert_eq!(verdict.speed_kmh, 300);
        assert!(!verdict.suspicious);
        assert_eq!(verdict.neighbor.event_uuid, "e-1");
    }

    #[test]
    fn test_impossible_travel() {
        let classifier = VelocityClassifier::new();
        let origin = LocationFix::exact(10.0, 20.0);
        let previous = record("e-1", 1700000000, origin);
        let current = record("e-2", 1700000000 + 600, north_of(origin, 300.0));

        let verdict = classifier.classify(&current, Some(&previous)).unwrap();
        assert_eq!(verdict.speed_kmh, 1800);
        assert!(verdict.suspicious);
    }

    #[test]
    fn test_subsequent_neighbor_uses_absolute_elapsed_time() {
        let classifier = VelocityClassifier::new();
        let origin = LocationFix::exact(10.0, 20.0);
        let current = record("e-1", 1700000000, origin);
        let next = record("e-2", 1700000000 + 600, north_of(origin, 300.0));

        let verdict = classifier.classify(&current, Some(&next)).unwrap();
        assert_eq!(verdict.speed_kmh, 1800);
        assert!(verdict.suspicious);
    }

    #[test]
    fn test_simultaneous_logins_count_as_one_second() {
        let classifier = VelocityClassifier::new();
        let london = LocationFix::exact(51.5074, -0.1278);
        let sydney = LocationFix::exact(-33.8688, 151.2093);
        let first = record("e-1", 1700000000, london);
        let second = record("e-2", 1700000000, sydney);

        let verdict = classifier.classify(&second, Some(&first)).unwrap();
        assert_eq!(verdict.speed_kmh, (verdict.distance_km * 3600.0).round() as u64);
        assert!(verdict.speed_kmh > 10_000_000);
        assert!(verdict.suspicious);
    }

    #[test]
    fn test_accuracy_radius_adds_distance() {
        let classifier = VelocityClassifier::new();
        let previous = record("e-1", 1700000000, LocationFix::new(10.0, 20.0, 100.0));
        let current = record("e-2", 1700000000 + 3600, LocationFix::new(10.0, 20.0, 150.0));

        // Same coordinates, but 250 km of combined uncertainty in one hour
        let verdict = classifier.classify(&current, Some(&previous)).unwrap();
        assert_eq!(verdict.speed_kmh, 250);
        assert!(!verdict.suspicious);
    }

    #[test]
    fn test_configurable_threshold() {
        let origin = LocationFix::exact(10.0, 20.0);
        let previous = record("e-1", 1700000000, origin);
        let current = record("e-2", 1700000000 + 3600, north_of(origin, 300.0));

        let strict = VelocityClassifier::with_max_velocity(250.0);
        assert!(strict.classify(&current, Some(&previous)).unwrap().suspicious);

        // Speed equal to the threshold is not suspicious
        let exact = VelocityClassifier::with_max_velocity(300.0);
        assert!(!exact.classify(&current, Some(&previous)).unwrap().suspicious);
    }
}
