use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Mean Earth radius in meters
const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LatLng {
    #[schema(example = 19.4189)]
    pub lat: f64,
    #[schema(example = 72.8181)]
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Great-circle distance between two points in meters (haversine).
///
/// Returns `None` when either point has a non-finite coordinate instead of
/// letting a `NaN` leak into geofence comparisons.
pub fn haversine_meters(p1: LatLng, p2: LatLng) -> Option<f64> {
    if !p1.is_finite() || !p2.is_finite() {
        return None;
    }

    let phi1 = p1.lat.to_radians();
    let phi2 = p2.lat.to_radians();
    let d_phi = (p2.lat - p1.lat).to_radians();
    let d_lambda = (p2.lng - p1.lng).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    Some(EARTH_RADIUS_M * c)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BHAYANDAR: LatLng = LatLng {
        lat: 19.41890950317244,
        lng: 72.8181867996178,
    };
    const BHIWANDI: LatLng = LatLng {
        lat: 19.280002916468632,
        lng: 73.05493116068932,
    };

    #[test]
    fn same_point_is_zero() {
        assert_eq!(haversine_meters(BHAYANDAR, BHAYANDAR), Some(0.0));
    }

    #[test]
    fn distance_is_symmetric() {
        let ab = haversine_meters(BHAYANDAR, BHIWANDI).unwrap();
        let ba = haversine_meters(BHIWANDI, BHAYANDAR).unwrap();
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn known_distance_between_branches() {
        // roughly 29 km apart
        let d = haversine_meters(BHAYANDAR, BHIWANDI).unwrap();
        assert!(d > 28_000.0 && d < 30_000.0, "got {d}");
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = haversine_meters(LatLng::new(0.0, 0.0), LatLng::new(1.0, 0.0)).unwrap();
        assert!((d - 111_194.9).abs() < 1.0, "got {d}");
    }

    #[test]
    fn non_finite_input_is_rejected() {
        assert_eq!(haversine_meters(LatLng::new(f64::NAN, 0.0), BHAYANDAR), None);
        assert_eq!(
            haversine_meters(BHAYANDAR, LatLng::new(0.0, f64::INFINITY)),
            None
        );
    }
}
