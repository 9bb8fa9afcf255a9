pub mod error;
pub mod models;
pub mod proximity;
pub mod rules;
pub mod scoring;
pub mod severity;
pub mod spatial;

pub use error::{GeoError, ProximityError, RequestError};
pub use models::{
    decode_coordinates, encode_coordinates, is_storable_time, offset_time, DisasterAlert,
    DisasterStatus, ReportZoneRequest, SafeRoute, ThreatType, UnsafeZone, WeatherAlert,
    ZoneStatus,
};
pub use proximity::{find_nearby, find_nearby_async, Located, Nearby, ProximityQuery};
pub use rules::ScoringRules;
pub use scoring::{score_route, score_route_with_rules, RouteAssessment};
pub use severity::{
    filter_by_severity, DisasterSeverity, Graded, SeverityScale, WeatherSeverity, ZoneSeverity,
};
pub use spatial::{haversine_distance, to_radians, BoundingBox, GeoPoint};
