//! Storage and service operations for SafeSphere.
//!
//! [`SafetyService`] wraps a SQLite [`Database`] and exposes the zone, weather,
//! disaster and route operations built on `safesphere-core`.

pub mod config;
pub mod error;
pub mod persistence;
pub mod services;

pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use persistence::{init_database, Database};
pub use services::{
    DisasterAlertView, DisasterStatistics, PlannedRoute, SafetyService, WeatherAlertView,
};
