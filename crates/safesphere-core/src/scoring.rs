//! Route safety scoring.
//!
//! The route itself is the straight pair [origin, destination]; there is no
//! routing engine behind it. The score reflects how close that polyline comes
//! to the nearest known unsafe zone.

use serde::{Deserialize, Serialize};

use crate::proximity::Located;
use crate::rules::ScoringRules;
use crate::spatial::GeoPoint;

/// Result of scoring a route request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteAssessment<Z> {
    pub coordinates: Vec<GeoPoint>,
    pub distance_m: f64,
    pub duration_s: u32,
    /// 0-100, higher is safer
    pub safety_score: f64,
    /// Always 0: no avoidance routing is performed
    pub unsafe_zones_avoided: u32,
    pub nearby_zones: Vec<Z>,
}

/// Score a route from `origin` to `destination` with default rules.
pub fn score_route<Z>(origin: GeoPoint, destination: GeoPoint, zones: &[Z]) -> RouteAssessment<Z>
where
    Z: Located + Clone,
{
    score_route_with_rules(origin, destination, zones, &ScoringRules::default())
}

/// Score a route using configured thresholds.
///
/// `nearby_zones` echoes the first `max_reported_zones` of `zones` in the
/// order given; pass distance-sorted zones to report the closest ones.
pub fn score_route_with_rules<Z>(
    origin: GeoPoint,
    destination: GeoPoint,
    zones: &[Z],
    rules: &ScoringRules,
) -> RouteAssessment<Z>
where
    Z: Located + Clone,
{
    let coordinates = vec![origin, destination];
    let distance_m = origin.distance_to(&destination);
    let safety_score = safety_score(&coordinates, zones, rules);

    RouteAssessment {
        coordinates,
        distance_m,
        duration_s: estimate_duration_secs(distance_m, rules),
        safety_score,
        unsafe_zones_avoided: 0,
        nearby_zones: zones.iter().take(rules.max_reported_zones).cloned().collect(),
    }
}

/// Safety score of a polyline against a set of zones.
///
/// Uses the smallest distance between any route point and any zone center:
/// above `safe_distance_m` scores 100, below `unsafe_distance_m` scores 0, and
/// anything between scales linearly as `d / safe_distance_m * 100`.
pub fn safety_score<Z: Located>(route: &[GeoPoint], zones: &[Z], rules: &ScoringRules) -> f64 {
    let Some(min_distance) = closest_approach_m(route, zones) else {
        return 100.0;
    };

    if min_distance > rules.safe_distance_m {
        return 100.0;
    }
    if min_distance < rules.unsafe_distance_m {
        return 0.0;
    }

    let score = min_distance / rules.safe_distance_m * 100.0;
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}

/// Minimum distance between any route point and any zone center, in meters.
pub fn closest_approach_m<Z: Located>(route: &[GeoPoint], zones: &[Z]) -> Option<f64> {
    route
        .iter()
        .flat_map(|point| {
            zones
                .iter()
                .map(move |zone| point.distance_to(&zone.location()))
        })
        .min_by(|a, b| a.total_cmp(b))
}

/// Travel time at the configured average speed, truncated to whole seconds.
pub fn estimate_duration_secs(distance_m: f64, rules: &ScoringRules) -> u32 {
    if rules.average_speed_mps <= 0.0 || !distance_m.is_finite() {
        return 0;
    }
    (distance_m / rules.average_speed_mps) as u32
}
