use chrono::{DateTime, Utc};
use safesphere_core::{filter_by_severity, find_nearby_async, GeoPoint, Nearby, WeatherAlert};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{check_storable, new_id, SafetyService};
use crate::error::{ServiceError, ServiceResult};
use crate::persistence::weather_alerts;

/// A weather alert as seen from a query point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlertView {
    #[serde(flatten)]
    pub alert: WeatherAlert,
    pub distance_km: f64,
    pub minutes_until_expiry: Option<i64>,
}

impl WeatherAlertView {
    fn from_nearby(nearby: Nearby<WeatherAlert>, now: DateTime<Utc>) -> Self {
        let distance_km = nearby.distance_km();
        let alert = nearby.into_inner();
        Self {
            minutes_until_expiry: alert.minutes_until_expiry(now),
            distance_km,
            alert,
        }
    }
}

impl SafetyService {
    /// Store a weather alert.
    ///
    /// An alert whose `external_id` is already stored is not inserted again;
    /// the stored copy is returned instead. An empty `id` is replaced with a
    /// fresh one.
    pub async fn record_weather_alert(&self, mut alert: WeatherAlert) -> ServiceResult<WeatherAlert> {
        alert.location.validate()?;
        check_storable("issued_at", Some(alert.issued_at))?;
        check_storable("expires_at", alert.expires_at)?;

        if let Some(external_id) = alert.external_id.as_deref() {
            if let Some(existing) =
                weather_alerts::get_by_external_id(self.pool(), external_id).await?
            {
                debug!(external_id, alert_id = %existing.id, "Weather alert already recorded");
                return Ok(existing);
            }
        }

        if alert.id.is_empty() {
            alert.id = new_id();
        }
        weather_alerts::insert_alert(self.pool(), &alert).await?;

        info!(
            alert_id = %alert.id,
            location = %alert.location_name,
            severity = %alert.severity,
            "Weather alert recorded"
        );
        Ok(alert)
    }

    /// Active weather alerts within `radius_km`, nearest first.
    pub async fn nearby_weather_alerts(
        &self,
        point: GeoPoint,
        radius_km: f64,
        min_severity: Option<&str>,
    ) -> ServiceResult<Vec<WeatherAlertView>> {
        let now = Utc::now();
        let pool = self.pool();
        let alerts = find_nearby_async(
            point,
            radius_km,
            |bbox| async move { weather_alerts::fetch_alerts_in_box(pool, &bbox).await },
            |alert: &WeatherAlert| alert.is_active(now),
        )
        .await?;

        Ok(filter_by_severity(alerts, min_severity)
            .into_iter()
            .map(|nearby| WeatherAlertView::from_nearby(nearby, now))
            .collect())
    }

    /// Every active, unexpired weather alert, newest first.
    pub async fn active_weather_alerts(&self) -> ServiceResult<Vec<WeatherAlert>> {
        let now = Utc::now();
        let alerts = weather_alerts::load_active_alerts(self.pool()).await?;
        Ok(alerts.into_iter().filter(|alert| alert.is_active(now)).collect())
    }

    pub async fn delete_weather_alert(&self, alert_id: &str) -> ServiceResult<()> {
        if !weather_alerts::delete_alert(self.pool(), alert_id).await? {
            return Err(ServiceError::not_found("weather alert", alert_id));
        }
        info!(alert_id, "Weather alert deleted");
        Ok(())
    }

    /// Clear the active flag on every alert past its expiry.
    pub async fn deactivate_expired_weather(&self, now: DateTime<Utc>) -> ServiceResult<u64> {
        let count = weather_alerts::deactivate_expired(self.pool(), now).await?;
        if count > 0 {
            info!(count, "Deactivated expired weather alerts");
        }
        Ok(count)
    }
}
