//! Core data models for SafeSphere alerts, zones and routes.

use chrono::{DateTime, Datelike, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RequestError;
use crate::proximity::Located;
use crate::severity::{DisasterSeverity, Graded, WeatherSeverity, ZoneSeverity};
use crate::spatial::GeoPoint;

/// Latest year a stored RFC 3339 timestamp can carry.
pub const MAX_TIMESTAMP_YEAR: i32 = 9999;

/// Whether `time` has a four-digit, non-negative year.
pub fn is_storable_time(time: DateTime<Utc>) -> bool {
    (0..=MAX_TIMESTAMP_YEAR).contains(&time.year())
}

/// `now + delta`, or None on overflow or when the result is not storable.
pub fn offset_time(now: DateTime<Utc>, delta: TimeDelta) -> Option<DateTime<Utc>> {
    now.checked_add_signed(delta).filter(|time| is_storable_time(*time))
}

// ========== UNSAFE ZONES ==========

/// A circular area flagged as unsafe, either user-reported or pre-loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsafeZone {
    pub id: String,
    pub name: String,
    pub description: String,
    pub center: GeoPoint,
    /// Radius of the zone in meters
    pub radius_m: f64,
    pub severity: ZoneSeverity,
    pub threat_type: ThreatType,
    pub status: ZoneStatus,
    pub created_at: DateTime<Utc>,
    /// When set, the zone is logically over once this passes
    pub expires_at: Option<DateTime<Utc>>,
    /// Reporter, or None for pre-loaded data
    pub reported_by: Option<String>,
    pub confirmation_count: u32,
    pub additional_info: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreatType {
    Crime,
    Accident,
    Natural,
    Construction,
    #[default]
    Other,
}

impl ThreatType {
    /// Parse a stored label; unrecognized labels become `Other`.
    pub fn from_label_lenient(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "crime" => Self::Crime,
            "accident" => Self::Accident,
            "natural" => Self::Natural,
            "construction" => Self::Construction,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneStatus {
    #[default]
    Active,
    Resolved,
    Expired,
}

impl ZoneStatus {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "resolved" => Some(Self::Resolved),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

impl UnsafeZone {
    /// Whether `expires_at` has passed. Status is left untouched.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Active status and not yet expired.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == ZoneStatus::Active && !self.is_expired(now)
    }

    /// Zones still marked active whose expiry has passed.
    ///
    /// Candidates for an `Expired` transition; nothing here performs it.
    pub fn expired_candidates(zones: Vec<UnsafeZone>, now: DateTime<Utc>) -> Vec<UnsafeZone> {
        zones
            .into_iter()
            .filter(|zone| zone.status == ZoneStatus::Active && zone.is_expired(now))
            .collect()
    }
}

impl Located for UnsafeZone {
    fn location(&self) -> GeoPoint {
        self.center
    }
}

impl Graded for UnsafeZone {
    type Scale = ZoneSeverity;

    fn severity(&self) -> ZoneSeverity {
        self.severity
    }
}

/// Request to report a new unsafe zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportZoneRequest {
    pub name: String,
    pub description: String,
    pub center: GeoPoint,
    #[serde(default = "default_zone_radius_m")]
    pub radius_m: f64,
    #[serde(default = "default_zone_severity")]
    pub severity: ZoneSeverity,
    #[serde(default)]
    pub threat_type: ThreatType,
    /// None for a permanent zone
    #[serde(default)]
    pub expires_in_hours: Option<u32>,
    #[serde(default)]
    pub reported_by: Option<String>,
    #[serde(default)]
    pub additional_info: Option<String>,
}

fn default_zone_radius_m() -> f64 {
    500.0
}

fn default_zone_severity() -> ZoneSeverity {
    ZoneSeverity::Medium
}

impl ReportZoneRequest {
    /// Build the zone this report creates. A report counts as its own first
    /// confirmation.
    pub fn into_zone(self, id: String, now: DateTime<Utc>) -> Result<UnsafeZone, RequestError> {
        let expires_at = match self.expires_in_hours {
            Some(hours) => Some(
                TimeDelta::try_hours(i64::from(hours))
                    .and_then(|delta| offset_time(now, delta))
                    .ok_or(RequestError::ExpiryOutOfRange { hours })?,
            ),
            None => None,
        };

        Ok(UnsafeZone {
            id,
            name: self.name,
            description: self.description,
            center: self.center,
            radius_m: self.radius_m,
            severity: self.severity,
            threat_type: self.threat_type,
            status: ZoneStatus::Active,
            created_at: now,
            expires_at,
            reported_by: self.reported_by,
            confirmation_count: 1,
            additional_info: self.additional_info,
        })
    }
}

// ========== WEATHER ==========

/// A weather alert pinned to a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub id: String,
    pub location_name: String,
    pub location: GeoPoint,
    /// Clear, Rain, Snow, Storm, Fog, ...
    pub condition: String,
    pub description: String,
    pub temperature_c: Option<f64>,
    pub severity: WeatherSeverity,
    /// Upstream identifier used for deduplication
    pub external_id: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub data_source: Option<String>,
}

impl WeatherAlert {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.map_or(true, |expires_at| expires_at > now)
    }

    /// Whole minutes left before expiry, floored at zero.
    pub fn minutes_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at
            .map(|expires_at| (expires_at - now).num_minutes().max(0))
    }
}

impl Located for WeatherAlert {
    fn location(&self) -> GeoPoint {
        self.location
    }
}

impl Graded for WeatherAlert {
    type Scale = WeatherSeverity;

    fn severity(&self) -> WeatherSeverity {
        self.severity
    }
}

// ========== DISASTERS ==========

/// A disaster or emergency alert with an optional affected radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterAlert {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Earthquake, Flood, Fire, Hurricane, ...
    pub disaster_type: String,
    pub affected_area: String,
    pub location: GeoPoint,
    pub affected_radius_km: Option<f64>,
    pub severity: DisasterSeverity,
    pub status: DisasterStatus,
    pub issued_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub external_id: Option<String>,
    pub source: Option<String>,
    pub confirmation_count: u32,
    pub safety_instructions: Option<String>,
    pub emergency_contact: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisasterStatus {
    #[default]
    Active,
    Monitoring,
    Resolved,
}

impl DisasterStatus {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "monitoring" => Some(Self::Monitoring),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

impl DisasterAlert {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == DisasterStatus::Active
            && self.expires_at.map_or(true, |expires_at| expires_at > now)
    }

    /// Whether someone `distance_km` away is inside the affected area.
    /// None when the alert carries no radius.
    pub fn covers(&self, distance_km: f64) -> Option<bool> {
        self.affected_radius_km.map(|radius| distance_km <= radius)
    }

    /// Severe and Extreme alerts.
    pub fn is_critical(&self) -> bool {
        matches!(
            self.severity,
            DisasterSeverity::Severe | DisasterSeverity::Extreme
        )
    }
}

impl Located for DisasterAlert {
    fn location(&self) -> GeoPoint {
        self.location
    }
}

impl Graded for DisasterAlert {
    type Scale = DisasterSeverity;

    fn severity(&self) -> DisasterSeverity {
        self.severity
    }
}

// ========== ROUTES ==========

/// A scored route between two points, stored for later retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeRoute {
    pub id: String,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    /// Route polyline, immutable once created
    pub coordinates: Vec<GeoPoint>,
    pub distance_m: f64,
    pub duration_s: u32,
    /// 0-100, higher is safer
    pub safety_score: f64,
    pub unsafe_zones_avoided: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl SafeRoute {
    /// Mark the route finished. Returns false if it already was.
    pub fn complete(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.completed_at = Some(now);
        true
    }
}

/// Encode a route polyline for storage or transport.
pub fn encode_coordinates(points: &[GeoPoint]) -> serde_json::Result<String> {
    serde_json::to_string(points)
}

/// Decode a polyline produced by [`encode_coordinates`].
pub fn decode_coordinates(encoded: &str) -> serde_json::Result<Vec<GeoPoint>> {
    serde_json::from_str(encoded)
}
