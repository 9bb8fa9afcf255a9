//! Service configuration from environment.

use safesphere_core::ScoringRules;
use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub db_max_connections: u32,
    /// Radius searched around a route origin for unsafe zones
    pub route_zone_radius_km: f64,
    /// Radius used by "nearby" queries when the caller gives none
    pub default_radius_km: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "data/safesphere.db".to_string(),
            db_max_connections: 5,
            route_zone_radius_km: 10.0,
            default_radius_km: 50.0,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            db_path: env::var("SAFESPHERE_DB_PATH").unwrap_or(defaults.db_path),
            db_max_connections: env::var("SAFESPHERE_DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.db_max_connections),
            route_zone_radius_km: positive_km("SAFESPHERE_ROUTE_ZONE_RADIUS_KM")
                .unwrap_or(defaults.route_zone_radius_km),
            default_radius_km: positive_km("SAFESPHERE_DEFAULT_RADIUS_KM")
                .unwrap_or(defaults.default_radius_km),
        }
    }

    /// Scoring thresholds with the configured zone search radius.
    ///
    /// Falls back to the defaults when the configured values are unusable.
    pub fn scoring_rules(&self) -> ScoringRules {
        let rules = ScoringRules {
            zone_search_radius_km: self.route_zone_radius_km,
            ..ScoringRules::default()
        };
        if !rules.is_valid() {
            warn!(errors = ?rules.validate(), "Invalid scoring rules, using defaults");
            return ScoringRules::default();
        }
        rules
    }
}

fn positive_km(key: &str) -> Option<f64> {
    env::var(key)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|km| km.is_finite() && *km > 0.0)
}
