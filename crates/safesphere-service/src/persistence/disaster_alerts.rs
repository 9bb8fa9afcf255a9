//! Disaster alert persistence operations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use safesphere_core::{
    BoundingBox, DisasterAlert, DisasterSeverity, DisasterStatus, GeoPoint, SeverityScale,
};
use sqlx::SqlitePool;

use super::db::{from_db_time, from_db_time_opt, to_db_time};

const ALERT_COLUMNS: &str = "id, title, description, disaster_type, affected_area, lat, lng, affected_radius_km, severity, status, issued_at, updated_at, expires_at, external_id, source, confirmation_count, safety_instructions, emergency_contact";

/// Insert a disaster alert.
pub async fn insert_alert(pool: &SqlitePool, alert: &DisasterAlert) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO disaster_alerts (id, title, description, disaster_type, affected_area, lat, lng, affected_radius_km, severity, status, issued_at, updated_at, expires_at, external_id, source, confirmation_count, safety_instructions, emergency_contact)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        "#,
    )
    .bind(&alert.id)
    .bind(&alert.title)
    .bind(&alert.description)
    .bind(&alert.disaster_type)
    .bind(&alert.affected_area)
    .bind(alert.location.lat)
    .bind(alert.location.lng)
    .bind(alert.affected_radius_km)
    .bind(alert.severity.label())
    .bind(format!("{:?}", alert.status))
    .bind(to_db_time(alert.issued_at))
    .bind(alert.updated_at.map(to_db_time))
    .bind(alert.expires_at.map(to_db_time))
    .bind(&alert.external_id)
    .bind(&alert.source)
    .bind(i64::from(alert.confirmation_count))
    .bind(&alert.safety_instructions)
    .bind(&alert.emergency_contact)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load an alert by ID.
pub async fn get_alert(pool: &SqlitePool, id: &str) -> Result<Option<DisasterAlert>> {
    let row = sqlx::query_as::<_, DisasterAlertRow>(&format!(
        "SELECT {ALERT_COLUMNS} FROM disaster_alerts WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(TryInto::try_into).transpose()
}

/// Active-status alerts located inside `bbox`.
pub async fn fetch_alerts_in_box(pool: &SqlitePool, bbox: &BoundingBox) -> Result<Vec<DisasterAlert>> {
    let rows = sqlx::query_as::<_, DisasterAlertRow>(&format!(
        r#"
        SELECT {ALERT_COLUMNS} FROM disaster_alerts
        WHERE status = 'Active'
          AND lat BETWEEN ?1 AND ?2
          AND lng BETWEEN ?3 AND ?4
        "#
    ))
    .bind(bbox.min_lat)
    .bind(bbox.max_lat)
    .bind(bbox.min_lng)
    .bind(bbox.max_lng)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
}

/// All active-status alerts, newest first.
pub async fn load_active_alerts(pool: &SqlitePool) -> Result<Vec<DisasterAlert>> {
    let rows = sqlx::query_as::<_, DisasterAlertRow>(&format!(
        "SELECT {ALERT_COLUMNS} FROM disaster_alerts WHERE status = 'Active' ORDER BY issued_at DESC"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
}

/// Add one confirmation. Returns false if the alert does not exist.
pub async fn increment_confirmation(pool: &SqlitePool, id: &str, now: DateTime<Utc>) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE disaster_alerts SET confirmation_count = confirmation_count + 1, updated_at = ?2 WHERE id = ?1",
    )
    .bind(id)
    .bind(to_db_time(now))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Set an alert's status. Returns false if the alert does not exist.
pub async fn update_status(
    pool: &SqlitePool,
    id: &str,
    status: DisasterStatus,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query("UPDATE disaster_alerts SET status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(format!("{:?}", status))
        .bind(to_db_time(now))
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete an alert. Returns false if it did not exist.
pub async fn delete_alert(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM disaster_alerts WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct DisasterAlertRow {
    id: String,
    title: String,
    description: String,
    disaster_type: String,
    affected_area: String,
    lat: f64,
    lng: f64,
    affected_radius_km: Option<f64>,
    severity: String,
    status: String,
    issued_at: String,
    updated_at: Option<String>,
    expires_at: Option<String>,
    external_id: Option<String>,
    source: Option<String>,
    confirmation_count: i64,
    safety_instructions: Option<String>,
    emergency_contact: Option<String>,
}

impl TryFrom<DisasterAlertRow> for DisasterAlert {
    type Error = anyhow::Error;

    fn try_from(row: DisasterAlertRow) -> Result<Self> {
        let status = DisasterStatus::from_label(&row.status).ok_or_else(|| {
            anyhow::anyhow!("unknown disaster status '{}' on {}", row.status, row.id)
        })?;

        Ok(DisasterAlert {
            location: GeoPoint::new(row.lat, row.lng)?,
            severity: DisasterSeverity::from_label_lenient(&row.severity),
            status,
            issued_at: from_db_time(&row.issued_at)?,
            updated_at: from_db_time_opt(row.updated_at)?,
            expires_at: from_db_time_opt(row.expires_at)?,
            confirmation_count: u32::try_from(row.confirmation_count.max(0)).unwrap_or(u32::MAX),
            id: row.id,
            title: row.title,
            description: row.description,
            disaster_type: row.disaster_type,
            affected_area: row.affected_area,
            affected_radius_km: row.affected_radius_km,
            external_id: row.external_id,
            source: row.source,
            safety_instructions: row.safety_instructions,
            emergency_contact: row.emergency_contact,
        })
    }
}
