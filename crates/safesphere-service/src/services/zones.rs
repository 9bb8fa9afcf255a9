use chrono::{DateTime, Utc};
use safesphere_core::{
    filter_by_severity, find_nearby_async, GeoPoint, Nearby, ReportZoneRequest, UnsafeZone,
    ZoneStatus,
};
use tracing::{debug, info};

use super::{new_id, SafetyService};
use crate::error::{ServiceError, ServiceResult};
use crate::persistence::unsafe_zones;

impl SafetyService {
    /// Record a user-reported unsafe zone.
    pub async fn report_zone(&self, request: ReportZoneRequest) -> ServiceResult<UnsafeZone> {
        request.center.validate()?;
        if !request.radius_m.is_finite() || request.radius_m <= 0.0 {
            return Err(ServiceError::BadRequest(format!(
                "zone radius {} must be positive",
                request.radius_m
            )));
        }

        let zone = request.into_zone(new_id(), Utc::now())?;
        unsafe_zones::insert_zone(self.pool(), &zone).await?;

        info!(
            zone_id = %zone.id,
            severity = %zone.severity,
            threat = ?zone.threat_type,
            "Unsafe zone reported"
        );
        Ok(zone)
    }

    /// Add a confirmation to an existing zone and return it.
    pub async fn confirm_zone(&self, zone_id: &str) -> ServiceResult<UnsafeZone> {
        if !unsafe_zones::increment_confirmation(self.pool(), zone_id).await? {
            return Err(ServiceError::not_found("zone", zone_id));
        }
        let zone = unsafe_zones::get_zone(self.pool(), zone_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("zone", zone_id))?;

        debug!(zone_id, confirmations = zone.confirmation_count, "Zone confirmed");
        Ok(zone)
    }

    pub async fn get_zone(&self, zone_id: &str) -> ServiceResult<UnsafeZone> {
        unsafe_zones::get_zone(self.pool(), zone_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("zone", zone_id))
    }

    pub async fn set_zone_status(&self, zone_id: &str, status: ZoneStatus) -> ServiceResult<()> {
        if !unsafe_zones::update_status(self.pool(), zone_id, status).await? {
            return Err(ServiceError::not_found("zone", zone_id));
        }
        info!(zone_id, status = ?status, "Zone status updated");
        Ok(())
    }

    /// Every active, unexpired zone, newest first.
    pub async fn active_zones(&self) -> ServiceResult<Vec<UnsafeZone>> {
        let now = Utc::now();
        let zones = unsafe_zones::load_active_zones(self.pool()).await?;
        Ok(zones.into_iter().filter(|zone| zone.is_active(now)).collect())
    }

    pub async fn delete_zone(&self, zone_id: &str) -> ServiceResult<()> {
        if !unsafe_zones::delete_zone(self.pool(), zone_id).await? {
            return Err(ServiceError::not_found("zone", zone_id));
        }
        info!(zone_id, "Zone deleted");
        Ok(())
    }

    /// Active, unexpired zones within `radius_km`, nearest first.
    pub async fn nearby_zones(
        &self,
        point: GeoPoint,
        radius_km: f64,
        min_severity: Option<&str>,
    ) -> ServiceResult<Vec<Nearby<UnsafeZone>>> {
        let now = Utc::now();
        let pool = self.pool();
        let zones = find_nearby_async(
            point,
            radius_km,
            |bbox| async move { unsafe_zones::fetch_zones_in_box(pool, &bbox).await },
            |zone: &UnsafeZone| zone.is_active(now),
        )
        .await?;

        Ok(filter_by_severity(zones, min_severity))
    }

    /// Zones still marked active whose expiry has passed at `now`.
    ///
    /// Listing only; statuses are not changed.
    pub async fn expired_zones(&self, now: DateTime<Utc>) -> ServiceResult<Vec<UnsafeZone>> {
        let zones = unsafe_zones::load_expiring_active_zones(self.pool()).await?;
        Ok(UnsafeZone::expired_candidates(zones, now))
    }
}
