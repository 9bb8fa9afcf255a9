use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use safesphere_core::{
    filter_by_severity, find_nearby_async, DisasterAlert, DisasterStatus, GeoPoint, Nearby,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{check_storable, new_id, SafetyService};
use crate::error::{ServiceError, ServiceResult};
use crate::persistence::disaster_alerts;

const RECENT_ALERTS: usize = 10;

/// A disaster alert as seen from a query point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterAlertView {
    #[serde(flatten)]
    pub alert: DisasterAlert,
    pub distance_km: f64,
    /// None when the alert has no affected radius
    pub in_affected_area: Option<bool>,
}

impl From<Nearby<DisasterAlert>> for DisasterAlertView {
    fn from(nearby: Nearby<DisasterAlert>) -> Self {
        let distance_km = nearby.distance_km();
        let alert = nearby.into_inner();
        Self {
            in_affected_area: alert.covers(distance_km),
            distance_km,
            alert,
        }
    }
}

/// Summary of the currently active disaster alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterStatistics {
    pub total_active: usize,
    /// Severe and Extreme alerts
    pub critical: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_severity: BTreeMap<String, usize>,
    /// Newest first
    pub recent: Vec<DisasterAlert>,
}

impl DisasterStatistics {
    pub fn from_alerts(mut alerts: Vec<DisasterAlert>) -> Self {
        alerts.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));

        let mut by_type = BTreeMap::new();
        let mut by_severity = BTreeMap::new();
        for alert in &alerts {
            *by_type.entry(alert.disaster_type.clone()).or_insert(0) += 1;
            *by_severity.entry(alert.severity.to_string()).or_insert(0) += 1;
        }

        Self {
            total_active: alerts.len(),
            critical: alerts.iter().filter(|alert| alert.is_critical()).count(),
            by_type,
            by_severity,
            recent: alerts.into_iter().take(RECENT_ALERTS).collect(),
        }
    }
}

impl SafetyService {
    /// Store a disaster alert. An empty `id` is replaced with a fresh one.
    pub async fn record_disaster_alert(&self, mut alert: DisasterAlert) -> ServiceResult<DisasterAlert> {
        alert.location.validate()?;
        check_storable("issued_at", Some(alert.issued_at))?;
        check_storable("updated_at", alert.updated_at)?;
        check_storable("expires_at", alert.expires_at)?;
        if let Some(radius) = alert.affected_radius_km {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(ServiceError::BadRequest(format!(
                    "affected radius {radius} km must be positive"
                )));
            }
        }

        if alert.id.is_empty() {
            alert.id = new_id();
        }
        disaster_alerts::insert_alert(self.pool(), &alert).await?;

        info!(
            alert_id = %alert.id,
            disaster_type = %alert.disaster_type,
            severity = %alert.severity,
            "Disaster alert recorded"
        );
        Ok(alert)
    }

    pub async fn get_disaster_alert(&self, alert_id: &str) -> ServiceResult<DisasterAlert> {
        disaster_alerts::get_alert(self.pool(), alert_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("disaster alert", alert_id))
    }

    /// Add a confirmation to an alert and return it.
    pub async fn confirm_disaster(&self, alert_id: &str) -> ServiceResult<DisasterAlert> {
        if !disaster_alerts::increment_confirmation(self.pool(), alert_id, Utc::now()).await? {
            return Err(ServiceError::not_found("disaster alert", alert_id));
        }
        let alert = self.get_disaster_alert(alert_id).await?;
        debug!(alert_id, confirmations = alert.confirmation_count, "Disaster confirmed");
        Ok(alert)
    }

    pub async fn set_disaster_status(&self, alert_id: &str, status: DisasterStatus) -> ServiceResult<()> {
        if !disaster_alerts::update_status(self.pool(), alert_id, status, Utc::now()).await? {
            return Err(ServiceError::not_found("disaster alert", alert_id));
        }
        info!(alert_id, status = ?status, "Disaster status updated");
        Ok(())
    }

    /// Every active, unexpired disaster alert, newest first.
    pub async fn active_disaster_alerts(&self) -> ServiceResult<Vec<DisasterAlert>> {
        let now = Utc::now();
        let alerts = disaster_alerts::load_active_alerts(self.pool()).await?;
        Ok(alerts.into_iter().filter(|alert| alert.is_active(now)).collect())
    }

    pub async fn delete_disaster_alert(&self, alert_id: &str) -> ServiceResult<()> {
        if !disaster_alerts::delete_alert(self.pool(), alert_id).await? {
            return Err(ServiceError::not_found("disaster alert", alert_id));
        }
        info!(alert_id, "Disaster alert deleted");
        Ok(())
    }

    /// Active disaster alerts within `radius_km`, nearest first.
    ///
    /// `disaster_type` matches case-insensitively; None or blank keeps every type.
    pub async fn nearby_disaster_alerts(
        &self,
        point: GeoPoint,
        radius_km: f64,
        disaster_type: Option<&str>,
        min_severity: Option<&str>,
    ) -> ServiceResult<Vec<DisasterAlertView>> {
        let now = Utc::now();
        let pool = self.pool();
        let wanted_type = disaster_type.map(str::trim).filter(|t| !t.is_empty());

        let alerts = find_nearby_async(
            point,
            radius_km,
            |bbox| async move { disaster_alerts::fetch_alerts_in_box(pool, &bbox).await },
            |alert: &DisasterAlert| {
                alert.is_active(now)
                    && wanted_type.map_or(true, |t| alert.disaster_type.eq_ignore_ascii_case(t))
            },
        )
        .await?;

        Ok(filter_by_severity(alerts, min_severity)
            .into_iter()
            .map(DisasterAlertView::from)
            .collect())
    }

    pub async fn disaster_statistics(&self) -> ServiceResult<DisasterStatistics> {
        self.disaster_statistics_at(Utc::now()).await
    }

    /// Statistics over alerts active at `now`.
    pub async fn disaster_statistics_at(&self, now: DateTime<Utc>) -> ServiceResult<DisasterStatistics> {
        let alerts: Vec<DisasterAlert> = disaster_alerts::load_active_alerts(self.pool())
            .await?
            .into_iter()
            .filter(|alert| alert.is_active(now))
            .collect();

        Ok(DisasterStatistics::from_alerts(alerts))
    }
}
