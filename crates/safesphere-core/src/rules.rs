//! Thresholds used when scoring routes.

use serde::{Deserialize, Serialize};

/// Configuration for route safety scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringRules {
    /// Closest zone farther than this scores 100
    pub safe_distance_m: f64,
    /// Closest zone nearer than this scores 0
    pub unsafe_distance_m: f64,
    /// Average travel speed for duration estimates (15 m/s ~ 54 km/h)
    pub average_speed_mps: f64,
    /// How many nearby zones a route assessment reports
    pub max_reported_zones: usize,
    /// Radius around the origin searched for unsafe zones
    pub zone_search_radius_km: f64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            safe_distance_m: 5_000.0,
            unsafe_distance_m: 100.0,
            average_speed_mps: 15.0,
            max_reported_zones: 5,
            zone_search_radius_km: 10.0,
        }
    }
}

impl ScoringRules {
    /// Returns list of validation errors (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !(self.safe_distance_m.is_finite() && self.safe_distance_m > 0.0) {
            errors.push("Safe distance must be positive".to_string());
        }
        if !(self.unsafe_distance_m.is_finite() && self.unsafe_distance_m >= 0.0) {
            errors.push("Unsafe distance cannot be negative".to_string());
        }
        if self.unsafe_distance_m > self.safe_distance_m {
            errors.push(format!(
                "Unsafe distance ({}) must not exceed safe distance ({})",
                self.unsafe_distance_m, self.safe_distance_m
            ));
        }
        if !(self.average_speed_mps.is_finite() && self.average_speed_mps > 0.0) {
            errors.push("Average speed must be positive".to_string());
        }
        if !(self.zone_search_radius_km.is_finite() && self.zone_search_radius_km > 0.0) {
            errors.push("Zone search radius must be positive".to_string());
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
