//! Great-circle distance between location fixes

use crate::models::LocationFix;

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Calculate the great-circle distance between two fixes using the Haversine formula
/// Returns distance in kilometers, ignoring accuracy radii
pub fn haversine_km(a: &LocationFix, b: &LocationFix) -> f64 {
    let lat1_rad = a.latitude.to_radians();
    let lat2_rad = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);

    // Rounding can push h slightly outside [0, 1], which would make asin return NaN
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Worst-case distance: both points at the far edge of their uncertainty circles
pub fn compensated_distance_km(a: &LocationFix, b: &LocationFix) -> f64 {
    haversine_km(a, b) + a.accuracy_radius_km.max(0.0) + b.accuracy_radius_km.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONDON: LocationFix = LocationFix {
        latitude: 51.5,
        longitude: -0.12,
        accuracy_radius_km: 0.0,
    };
    const NEW_YORK: LocationFix = LocationFix {
        latitude: 40.7,
        longitude: -74.0,
        accuracy_radius_km: 0.0,
    };

    #[test]
    fn test_same_point_is_zero() {
        for &(lat, lon) in &[(0.0, 0.0), (90.0, 180.0), (-90.0, -180.0), (51.5, -0.12), (-33.87, 151.21)] {
            let fix = LocationFix::exact(lat, lon);
            let d = haversine_km(&fix, &fix);
            assert!(!d.is_nan());
            assert_eq!(d, 0.0);
        }
    }

    #[test]
    fn test_london_new_york() {
        let d = haversine_km(&LONDON, &NEW_YORK);
        assert!((d - 5570.0).abs() <= 20.0, "London to New York should be ~5570 km, got {}", d);
    }

    #[test]
    fn test_symmetric() {
        let sydney = LocationFix::new(-33.8688, 151.2093, 50.0);
        assert_eq!(haversine_km(&LONDON, &sydney), haversine_km(&sydney, &LONDON));
        assert_eq!(
            compensated_distance_km(&NEW_YORK, &sydney),
            compensated_distance_km(&sydney, &NEW_YORK)
        );
    }

    #[test]
    fn test_antipodal_points_do_not_overflow() {
        let a = LocationFix::exact(0.0, 0.0);
        let b = LocationFix::exact(0.0, 180.0);
        let d = haversine_km(&a, &b);
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_compensation_adds_both_radii() {
        let a = LocationFix::new(51.5, -0.12, 100.0);
        let b = LocationFix::new(40.7, -74.0, 50.0);
        let raw = haversine_km(&a, &b);
        assert!((compensated_distance_km(&a, &b) - (raw + 150.0)).abs() < 1e-9);

        // A fix compared with itself is only as far as its own uncertainty
        assert_eq!(compensated_distance_km(&a, &a), 200.0);
    }
}
