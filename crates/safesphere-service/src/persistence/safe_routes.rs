//! Safe route persistence operations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use safesphere_core::{decode_coordinates, encode_coordinates, GeoPoint, SafeRoute};
use sqlx::SqlitePool;

use super::db::{from_db_time, from_db_time_opt, to_db_time};

const ROUTE_COLUMNS: &str = "id, origin_lat, origin_lng, destination_lat, destination_lng, route_coordinates, distance_m, duration_s, safety_score, unsafe_zones_avoided, is_active, created_at, completed_at, notes";

/// Insert a route. Coordinates are stored in their encoded form.
pub async fn insert_route(pool: &SqlitePool, route: &SafeRoute) -> Result<()> {
    let coordinates = encode_coordinates(&route.coordinates)?;

    sqlx::query(
        r#"
        INSERT INTO safe_routes (id, origin_lat, origin_lng, destination_lat, destination_lng, route_coordinates, distance_m, duration_s, safety_score, unsafe_zones_avoided, is_active, created_at, completed_at, notes)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(&route.id)
    .bind(route.origin.lat)
    .bind(route.origin.lng)
    .bind(route.destination.lat)
    .bind(route.destination.lng)
    .bind(&coordinates)
    .bind(route.distance_m)
    .bind(i64::from(route.duration_s))
    .bind(route.safety_score)
    .bind(i64::from(route.unsafe_zones_avoided))
    .bind(route.is_active)
    .bind(to_db_time(route.created_at))
    .bind(route.completed_at.map(to_db_time))
    .bind(&route.notes)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a route by ID.
pub async fn get_route(pool: &SqlitePool, id: &str) -> Result<Option<SafeRoute>> {
    let row = sqlx::query_as::<_, RouteRow>(&format!(
        "SELECT {ROUTE_COLUMNS} FROM safe_routes WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(TryInto::try_into).transpose()
}

/// Load routes, newest first, optionally only the active ones.
pub async fn list_routes(pool: &SqlitePool, active_only: bool) -> Result<Vec<SafeRoute>> {
    let rows = sqlx::query_as::<_, RouteRow>(&format!(
        "SELECT {ROUTE_COLUMNS} FROM safe_routes WHERE (?1 = 0 OR is_active = 1) ORDER BY created_at DESC"
    ))
    .bind(active_only)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
}

/// Mark an active route completed. Returns false if no active route matched.
pub async fn complete_route(pool: &SqlitePool, id: &str, now: DateTime<Utc>) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE safe_routes SET is_active = 0, completed_at = ?2 WHERE id = ?1 AND is_active = 1",
    )
    .bind(id)
    .bind(to_db_time(now))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a route. Returns false if it did not exist.
pub async fn delete_route(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM safe_routes WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct RouteRow {
    id: String,
    origin_lat: f64,
    origin_lng: f64,
    destination_lat: f64,
    destination_lng: f64,
    route_coordinates: String,
    distance_m: f64,
    duration_s: i64,
    safety_score: f64,
    unsafe_zones_avoided: i64,
    is_active: bool,
    created_at: String,
    completed_at: Option<String>,
    notes: Option<String>,
}

impl TryFrom<RouteRow> for SafeRoute {
    type Error = anyhow::Error;

    fn try_from(row: RouteRow) -> Result<Self> {
        Ok(SafeRoute {
            origin: GeoPoint::new(row.origin_lat, row.origin_lng)?,
            destination: GeoPoint::new(row.destination_lat, row.destination_lng)?,
            coordinates: decode_coordinates(&row.route_coordinates)?,
            distance_m: row.distance_m,
            duration_s: u32::try_from(row.duration_s)?,
            safety_score: row.safety_score,
            unsafe_zones_avoided: u32::try_from(row.unsafe_zones_avoided)?,
            is_active: row.is_active,
            created_at: from_db_time(&row.created_at)?,
            completed_at: from_db_time_opt(row.completed_at)?,
            id: row.id,
            notes: row.notes,
        })
    }
}
