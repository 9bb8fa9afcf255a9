use chrono::Utc;
use safesphere_core::{
    find_nearby_async, score_route_with_rules, GeoPoint, Nearby, SafeRoute, UnsafeZone,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{new_id, SafetyService};
use crate::error::{ServiceError, ServiceResult};
use crate::persistence::{safe_routes, unsafe_zones};

/// A freshly planned route and the zones it was scored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedRoute {
    pub route: SafeRoute,
    /// Closest zones around the origin, nearest first
    pub nearby_zones: Vec<Nearby<UnsafeZone>>,
}

impl SafetyService {
    /// Score and store the direct route from `origin` to `destination`.
    ///
    /// Zones are searched around the origin only, within the configured
    /// route zone radius.
    pub async fn plan_safe_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> ServiceResult<PlannedRoute> {
        origin.validate()?;
        destination.validate()?;

        let now = Utc::now();
        let rules = self.config().scoring_rules();
        let pool = self.pool();
        let zones = find_nearby_async(
            origin,
            rules.zone_search_radius_km,
            |bbox| async move { unsafe_zones::fetch_zones_in_box(pool, &bbox).await },
            |zone: &UnsafeZone| zone.is_active(now),
        )
        .await?;

        let assessment = score_route_with_rules(origin, destination, &zones, &rules);
        let route = SafeRoute {
            id: new_id(),
            origin,
            destination,
            coordinates: assessment.coordinates,
            distance_m: assessment.distance_m,
            duration_s: assessment.duration_s,
            safety_score: assessment.safety_score,
            unsafe_zones_avoided: assessment.unsafe_zones_avoided,
            is_active: true,
            created_at: now,
            completed_at: None,
            notes: None,
        };
        safe_routes::insert_route(self.pool(), &route).await?;

        info!(
            route_id = %route.id,
            distance_m = route.distance_m,
            safety_score = route.safety_score,
            zones = zones.len(),
            "Route planned"
        );
        Ok(PlannedRoute {
            route,
            nearby_zones: assessment.nearby_zones,
        })
    }

    pub async fn get_route(&self, route_id: &str) -> ServiceResult<SafeRoute> {
        safe_routes::get_route(self.pool(), route_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("route", route_id))
    }

    pub async fn list_routes(&self, active_only: bool) -> ServiceResult<Vec<SafeRoute>> {
        Ok(safe_routes::list_routes(self.pool(), active_only).await?)
    }

    /// Mark a route completed and return it.
    ///
    /// Completing an already completed route leaves it untouched.
    pub async fn complete_route(&self, route_id: &str) -> ServiceResult<SafeRoute> {
        let now = Utc::now();
        if safe_routes::complete_route(self.pool(), route_id, now).await? {
            info!(route_id, "Route completed");
        }
        self.get_route(route_id).await
    }

    pub async fn delete_route(&self, route_id: &str) -> ServiceResult<()> {
        if !safe_routes::delete_route(self.pool(), route_id).await? {
            return Err(ServiceError::not_found("route", route_id));
        }
        info!(route_id, "Route deleted");
        Ok(())
    }
}
