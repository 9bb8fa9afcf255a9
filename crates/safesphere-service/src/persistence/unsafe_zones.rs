//! Unsafe zone persistence operations.

use anyhow::Result;
use safesphere_core::{
    BoundingBox, GeoPoint, SeverityScale, ThreatType, UnsafeZone, ZoneSeverity, ZoneStatus,
};
use sqlx::SqlitePool;

use super::db::{from_db_time, from_db_time_opt, to_db_time};

const ZONE_COLUMNS: &str = "id, name, description, center_lat, center_lng, radius_m, severity, threat_type, status, created_at, expires_at, reported_by, confirmation_count, additional_info";

/// Insert a new unsafe zone.
pub async fn insert_zone(pool: &SqlitePool, zone: &UnsafeZone) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO unsafe_zones (id, name, description, center_lat, center_lng, radius_m, severity, threat_type, status, created_at, expires_at, reported_by, confirmation_count, additional_info)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(&zone.id)
    .bind(&zone.name)
    .bind(&zone.description)
    .bind(zone.center.lat)
    .bind(zone.center.lng)
    .bind(zone.radius_m)
    .bind(zone.severity.label())
    .bind(format!("{:?}", zone.threat_type))
    .bind(format!("{:?}", zone.status))
    .bind(to_db_time(zone.created_at))
    .bind(zone.expires_at.map(to_db_time))
    .bind(&zone.reported_by)
    .bind(i64::from(zone.confirmation_count))
    .bind(&zone.additional_info)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a zone by ID.
pub async fn get_zone(pool: &SqlitePool, id: &str) -> Result<Option<UnsafeZone>> {
    let row = sqlx::query_as::<_, ZoneRow>(&format!(
        "SELECT {ZONE_COLUMNS} FROM unsafe_zones WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(TryInto::try_into).transpose()
}

/// Active-status zones whose center lies inside `bbox`.
///
/// Coarse candidate fetch for proximity queries; expiry is judged by the caller.
pub async fn fetch_zones_in_box(pool: &SqlitePool, bbox: &BoundingBox) -> Result<Vec<UnsafeZone>> {
    let rows = sqlx::query_as::<_, ZoneRow>(&format!(
        r#"
        SELECT {ZONE_COLUMNS} FROM unsafe_zones
        WHERE status = 'Active'
          AND center_lat BETWEEN ?1 AND ?2
          AND center_lng BETWEEN ?3 AND ?4
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

/// Every active-status zone, newest first.
pub async fn load_active_zones(pool: &SqlitePool) -> Result<Vec<UnsafeZone>> {
    let rows = sqlx::query_as::<_, ZoneRow>(&format!(
        "SELECT {ZONE_COLUMNS} FROM unsafe_zones WHERE status = 'Active' ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
}

/// All zones with an expiry timestamp that are still marked active.
pub async fn load_expiring_active_zones(pool: &SqlitePool) -> Result<Vec<UnsafeZone>> {
    let rows = sqlx::query_as::<_, ZoneRow>(&format!(
        "SELECT {ZONE_COLUMNS} FROM unsafe_zones WHERE status = 'Active' AND expires_at IS NOT NULL"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
}

/// Add one confirmation. Returns false if the zone does not exist.
pub async fn increment_confirmation(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE unsafe_zones SET confirmation_count = confirmation_count + 1 WHERE id = ?1",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Set a zone's status. Returns false if the zone does not exist.
pub async fn update_status(pool: &SqlitePool, id: &str, status: ZoneStatus) -> Result<bool> {
    let result = sqlx::query("UPDATE unsafe_zones SET status = ?2 WHERE id = ?1")
        .bind(id)
        .bind(format!("{:?}", status))
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a zone. Returns false if it did not exist.
pub async fn delete_zone(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM unsafe_zones WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct ZoneRow {
    id: String,
    name: String,
    description: String,
    center_lat: f64,
    center_lng: f64,
    radius_m: f64,
    severity: String,
    threat_type: String,
    status: String,
    created_at: String,
    expires_at: Option<String>,
    reported_by: Option<String>,
    confirmation_count: i64,
    additional_info: Option<String>,
}

impl TryFrom<ZoneRow> for UnsafeZone {
    type Error = anyhow::Error;

    fn try_from(row: ZoneRow) -> Result<Self> {
        let status = ZoneStatus::from_label(&row.status)
            .ok_or_else(|| anyhow::anyhow!("unknown zone status '{}' on {}", row.status, row.id))?;

        Ok(UnsafeZone {
            center: GeoPoint::new(row.center_lat, row.center_lng)?,
            radius_m: row.radius_m,
            severity: ZoneSeverity::from_label_lenient(&row.severity),
            threat_type: ThreatType::from_label_lenient(&row.threat_type),
            status,
            created_at: from_db_time(&row.created_at)?,
            expires_at: from_db_time_opt(row.expires_at)?,
            confirmation_count: u32::try_from(row.confirmation_count.max(0)).unwrap_or(u32::MAX),
            id: row.id,
            name: row.name,
            description: row.description,
            reported_by: row.reported_by,
            additional_info: row.additional_info,
        })
    }
}
