#![allow(dead_code)]

use safesphere_core::{GeoPoint, ReportZoneRequest, ThreatType, ZoneSeverity};
use safesphere_service::{init_database, Config, SafetyService};

/// Lower Manhattan.
pub const ORIGIN: (f64, f64) = (40.7128, -74.0060);

/// Roughly one kilometer of latitude, in degrees.
pub const KM_LAT: f64 = 1.0 / 111.195;

pub async fn service() -> SafetyService {
    let db = init_database(":memory:", 1).await.unwrap();
    SafetyService::new(db, Config::default())
}

pub fn point(lat: f64, lng: f64) -> GeoPoint {
    GeoPoint::new(lat, lng).unwrap()
}

/// A point `km` north of [`ORIGIN`].
pub fn north_of_origin(km: f64) -> GeoPoint {
    point(ORIGIN.0 + km * KM_LAT, ORIGIN.1)
}

pub fn zone_report(name: &str, center: GeoPoint, severity: ZoneSeverity) -> ReportZoneRequest {
    ReportZoneRequest {
        name: name.to_string(),
        description: format!("{name} reported by a passer-by"),
        center,
        radius_m: 250.0,
        severity,
        threat_type: ThreatType::Crime,
        expires_in_hours: None,
        reported_by: Some("tester".to_string()),
        additional_info: None,
    }
}
