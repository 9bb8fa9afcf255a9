//! Weather alert persistence operations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use safesphere_core::{BoundingBox, GeoPoint, SeverityScale, WeatherAlert, WeatherSeverity};
use sqlx::SqlitePool;

use super::db::{from_db_time, from_db_time_opt, to_db_time};

const ALERT_COLUMNS: &str = "id, location_name, lat, lng, condition, description, temperature_c, severity, external_id, issued_at, expires_at, is_active, data_source";

/// Insert a weather alert.
pub async fn insert_alert(pool: &SqlitePool, alert: &WeatherAlert) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO weather_alerts (id, location_name, lat, lng, condition, description, temperature_c, severity, external_id, issued_at, expires_at, is_active, data_source)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&alert.id)
    .bind(&alert.location_name)
    .bind(alert.location.lat)
    .bind(alert.location.lng)
    .bind(&alert.condition)
    .bind(&alert.description)
    .bind(alert.temperature_c)
    .bind(alert.severity.label())
    .bind(&alert.external_id)
    .bind(to_db_time(alert.issued_at))
    .bind(alert.expires_at.map(to_db_time))
    .bind(alert.is_active)
    .bind(&alert.data_source)
    .execute(pool)
    .await?;

    Ok(())
}

/// Look up an alert by its upstream identifier.
pub async fn get_by_external_id(pool: &SqlitePool, external_id: &str) -> Result<Option<WeatherAlert>> {
    let row = sqlx::query_as::<_, WeatherAlertRow>(&format!(
        "SELECT {ALERT_COLUMNS} FROM weather_alerts WHERE external_id = ?1 LIMIT 1"
    ))
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    row.map(TryInto::try_into).transpose()
}

/// Active-flagged alerts located inside `bbox`.
pub async fn fetch_alerts_in_box(pool: &SqlitePool, bbox: &BoundingBox) -> Result<Vec<WeatherAlert>> {
    let rows = sqlx::query_as::<_, WeatherAlertRow>(&format!(
        r#"
        SELECT {ALERT_COLUMNS} FROM weather_alerts
        WHERE is_active = 1
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

/// Every active-flagged alert, newest first.
pub async fn load_active_alerts(pool: &SqlitePool) -> Result<Vec<WeatherAlert>> {
    let rows = sqlx::query_as::<_, WeatherAlertRow>(&format!(
        "SELECT {ALERT_COLUMNS} FROM weather_alerts WHERE is_active = 1 ORDER BY issued_at DESC"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
}

/// Delete an alert. Returns false if it did not exist.
pub async fn delete_alert(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM weather_alerts WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Clear the active flag on alerts whose expiry has passed.
/// Returns the number of alerts deactivated.
pub async fn deactivate_expired(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT id, expires_at FROM weather_alerts WHERE is_active = 1 AND expires_at IS NOT NULL",
    )
    .fetch_all(pool)
    .await?;

    let mut tx = pool.begin().await?;
    let mut deactivated = 0;
    for (id, expires_at) in rows {
        if from_db_time(&expires_at)? <= now {
            sqlx::query("UPDATE weather_alerts SET is_active = 0 WHERE id = ?1")
                .bind(&id)
                .execute(&mut *tx)
                .await?;
            deactivated += 1;
        }
    }
    tx.commit().await?;

    Ok(deactivated)
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct WeatherAlertRow {
    id: String,
    location_name: String,
    lat: f64,
    lng: f64,
    condition: String,
    description: String,
    temperature_c: Option<f64>,
    severity: String,
    external_id: Option<String>,
    issued_at: String,
    expires_at: Option<String>,
    is_active: bool,
    data_source: Option<String>,
}

impl TryFrom<WeatherAlertRow> for WeatherAlert {
    type Error = anyhow::Error;

    fn try_from(row: WeatherAlertRow) -> Result<Self> {
        Ok(WeatherAlert {
            location: GeoPoint::new(row.lat, row.lng)?,
            severity: WeatherSeverity::from_label_lenient(&row.severity),
            issued_at: from_db_time(&row.issued_at)?,
            expires_at: from_db_time_opt(row.expires_at)?,
            id: row.id,
            location_name: row.location_name,
            condition: row.condition,
            description: row.description,
            temperature_c: row.temperature_c,
            external_id: row.external_id,
            is_active: row.is_active,
            data_source: row.data_source,
        })
    }
}
