// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Great-circle distance and geofence evaluation.

use crate::types::Geofence;

/// Mean Earth radius in meters (IUGG).
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Haversine great-circle distance between two coordinates, in meters.
pub fn haversine_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

/// Result of evaluating a coordinate against a geofence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceCheck {
    pub distance_m: f64,
    pub within: bool,
}

/// Evaluate a supplied coordinate against a fence. The distance is always
/// reported so callers can produce an actionable "N meters over" message.
pub fn check(fence: &Geofence, lat: f64, lng: f64) -> GeofenceCheck {
    let distance_m = haversine_m(fence.lat, fence.lng, lat, lng);
    GeofenceCheck {
        distance_m,
        within: distance_m <= fence.radius_m,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_at_same_point() {
        let d = haversine_m(40.7128, -74.0060, 40.7128, -74.0060);
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn known_distance_paris_to_london() {
        // Notre-Dame to Westminster, roughly 340 km.
        let d = haversine_m(48.8530, 2.3499, 51.4994, -0.1245);
        assert!((d - 340_000.0).abs() < 5_000.0, "got {d}");
    }

    #[test]
    fn point_inside_radius_passes() {
        let fence = Geofence {
            lat: 40.7128,
            lng: -74.0060,
            radius_m: 150.0,
        };
        // ~111m north (0.001 degrees of latitude).
        let result = check(&fence, 40.7138, -74.0060);
        assert!(result.within);
        assert!(result.distance_m > 100.0 && result.distance_m < 125.0);
    }

    #[test]
    fn point_outside_radius_reports_distance() {
        let fence = Geofence {
            lat: 40.7128,
            lng: -74.0060,
            radius_m: 50.0,
        };
        let result = check(&fence, 40.7138, -74.0060);
        assert!(!result.within);
        assert!(result.distance_m > fence.radius_m);
    }
}
