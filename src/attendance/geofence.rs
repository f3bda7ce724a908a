use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::utils::geo::{LatLng, haversine_meters};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Campus {
    #[schema(example = "ABS Bhiwandi")]
    pub name: String,
    pub center: LatLng,
}

/// Branch centers and the allowed radius. Deployment configuration, never
/// derived at runtime.
#[derive(Debug, Clone)]
pub struct Geofence {
    branches: HashMap<String, Campus>,
    default_campus: Campus,
    radius_m: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceVerdict {
    pub campus: String,
    /// Raw distance; compare against the radius with this, not the rounded one
    pub distance_m: f64,
    pub radius_m: f64,
}

impl GeofenceVerdict {
    pub fn within(&self) -> bool {
        self.distance_m <= self.radius_m
    }

    pub fn rounded_distance_m(&self) -> f64 {
        self.distance_m.round()
    }
}

impl Geofence {
    pub fn new(branches: HashMap<String, Campus>, default_campus: Campus, radius_m: f64) -> Self {
        Self {
            branches,
            default_campus,
            radius_m,
        }
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Campus for the student's branch, or the default one for unknown or
    /// missing branches. Branch names must match exactly.
    pub fn campus_for(&self, branch: Option<&str>) -> &Campus {
        branch
            .and_then(|b| self.branches.get(b))
            .unwrap_or(&self.default_campus)
    }

    /// `None` when the point has a non-finite coordinate
    pub fn evaluate(&self, branch: Option<&str>, point: LatLng) -> Option<GeofenceVerdict> {
        let campus = self.campus_for(branch);
        let distance_m = haversine_meters(point, campus.center)?;
        Some(GeofenceVerdict {
            campus: campus.name.clone(),
            distance_m,
            radius_m: self.radius_m,
        })
    }
}
