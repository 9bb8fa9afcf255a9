//! Persistence layer for SafeSphere.
//!
//! SQLite-backed storage for unsafe zones, weather and disaster alerts,
//! and planned routes.

pub mod db;
pub mod disaster_alerts;
pub mod safe_routes;
pub mod unsafe_zones;
pub mod weather_alerts;

pub use db::{init_database, Database};
