//! Safety operations over the persisted zones, alerts and routes.
//!
//! Each submodule adds one group of operations to [`SafetyService`].

mod disasters;
mod routes;
mod weather;
mod zones;

pub use disasters::{DisasterAlertView, DisasterStatistics};
pub use routes::PlannedRoute;
pub use weather::WeatherAlertView;

use chrono::{DateTime, Utc};
use safesphere_core::is_storable_time;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::error::{ServiceError, ServiceResult};
use crate::persistence::Database;

/// Entry point for every safety operation.
#[derive(Clone)]
pub struct SafetyService {
    db: Database,
    config: Config,
}

impl SafetyService {
    pub fn new(db: Database, config: Config) -> Self {
        Self { db, config }
    }

    /// Close the database. Operations after this fail with a storage error.
    pub async fn close(&self) {
        self.db.close().await;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Radius to search when the caller did not pick one.
    pub fn radius_or_default(&self, radius_km: Option<f64>) -> f64 {
        radius_km.unwrap_or(self.config.default_radius_km)
    }

    fn pool(&self) -> &SqlitePool {
        self.db.pool()
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Reject timestamps the database cannot store and read back.
fn check_storable(field: &str, time: Option<DateTime<Utc>>) -> ServiceResult<()> {
    match time {
        Some(time) if !is_storable_time(time) => Err(ServiceError::BadRequest(format!(
            "{field} {time} is outside the years 0000-9999"
        ))),
        _ => Ok(()),
    }
}
