use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Args, Parser, Subcommand};
use safesphere_core::{
    offset_time, DisasterAlert, DisasterSeverity, DisasterStatus, GeoPoint, ReportZoneRequest,
    SeverityScale, ThreatType, WeatherAlert, WeatherSeverity, ZoneSeverity, ZoneStatus,
};
use safesphere_service::{init_database, Config, SafetyService};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "safesphere", author, version, about, long_about = None)]
pub struct Cli {
    /// SQLite database path (overrides SAFESPHERE_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// User-reported unsafe zones
    #[command(subcommand)]
    Zones(ZoneCommand),
    /// Weather alerts
    #[command(subcommand)]
    Weather(WeatherCommand),
    /// Disaster and emergency alerts
    #[command(subcommand)]
    Disasters(DisasterCommand),
    /// Route planning and tracking
    #[command(subcommand)]
    Route(RouteCommand),
}

/// A query point with an optional radius.
#[derive(Args, Debug)]
pub struct Around {
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub lng: f64,

    /// Search radius in km (defaults to SAFESPHERE_DEFAULT_RADIUS_KM)
    #[arg(long)]
    pub radius_km: Option<f64>,

    /// Minimum severity label, e.g. "high"
    #[arg(long)]
    pub min_severity: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ZoneCommand {
    /// Zones near a point, nearest first
    Nearby(Around),
    /// Report a new unsafe zone
    Report {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long, default_value_t = 500.0)]
        radius_m: f64,
        #[arg(long, default_value = "Medium", value_parser = parse_level::<ZoneSeverity>)]
        severity: ZoneSeverity,
        /// Crime, Accident, Natural, Construction or Other
        #[arg(long, default_value = "Other", value_parser = parse_threat)]
        threat: ThreatType,
        #[arg(long)]
        expires_in_hours: Option<u32>,
        #[arg(long)]
        reported_by: Option<String>,
        #[arg(long)]
        info: Option<String>,
    },
    /// Add a confirmation to a zone
    Confirm { id: String },
    /// Set a zone's status
    Status {
        id: String,
        #[arg(value_parser = parse_zone_status)]
        status: ZoneStatus,
    },
    /// List active zones past their expiry
    Expired,
    /// List every active zone, newest first
    List,
    /// Delete a zone
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum WeatherCommand {
    /// Active weather alerts near a point
    Nearby(Around),
    /// Record a weather alert
    Record {
        #[arg(long)]
        location_name: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long)]
        condition: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, allow_hyphen_values = true)]
        temperature_c: Option<f64>,
        #[arg(long, default_value = "Info", value_parser = parse_level::<WeatherSeverity>)]
        severity: WeatherSeverity,
        #[arg(long)]
        expires_in_minutes: Option<i64>,
        /// Upstream identifier; an alert already stored under it is not duplicated
        #[arg(long)]
        external_id: Option<String>,
        #[arg(long)]
        source: Option<String>,
    },
    /// Deactivate alerts past their expiry
    DeactivateExpired,
    /// List every active alert, newest first
    List,
    /// Delete an alert
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum DisasterCommand {
    /// Active disaster alerts near a point
    Nearby {
        #[command(flatten)]
        around: Around,
        /// Only this disaster type (case-insensitive)
        #[arg(long = "type")]
        disaster_type: Option<String>,
    },
    /// Record a disaster alert
    Record {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long = "type")]
        disaster_type: String,
        #[arg(long)]
        area: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long)]
        radius_km: Option<f64>,
        #[arg(long, default_value = "Moderate", value_parser = parse_level::<DisasterSeverity>)]
        severity: DisasterSeverity,
        #[arg(long)]
        expires_in_hours: Option<i64>,
        #[arg(long)]
        instructions: Option<String>,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        external_id: Option<String>,
        #[arg(long)]
        source: Option<String>,
    },
    /// Add a confirmation to an alert
    Confirm { id: String },
    /// Set an alert's status
    Status {
        id: String,
        #[arg(value_parser = parse_disaster_status)]
        status: DisasterStatus,
    },
    /// Summary of active alerts
    Stats,
    /// List every active alert, newest first
    List,
    /// Delete an alert
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum RouteCommand {
    /// Score and store the direct route between two points
    Plan {
        #[arg(long, allow_hyphen_values = true)]
        from_lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        from_lng: f64,
        #[arg(long, allow_hyphen_values = true)]
        to_lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        to_lng: f64,
    },
    /// Show a stored route
    Show { id: String },
    /// List stored routes, newest first
    List {
        /// Only routes not yet completed
        #[arg(long)]
        active: bool,
    },
    /// Mark a route completed
    Complete { id: String },
    /// Delete a route
    Delete { id: String },
}

fn parse_level<S: SeverityScale>(raw: &str) -> Result<S, String> {
    S::from_label(raw).ok_or_else(|| {
        let known: Vec<&str> = S::LEVELS.iter().map(|(_, label, _)| *label).collect();
        format!("unknown severity '{raw}', expected one of {}", known.join(", "))
    })
}

fn parse_threat(raw: &str) -> Result<ThreatType, String> {
    Ok(ThreatType::from_label_lenient(raw))
}

fn parse_zone_status(raw: &str) -> Result<ZoneStatus, String> {
    ZoneStatus::from_label(raw).ok_or_else(|| format!("unknown zone status '{raw}'"))
}

fn parse_disaster_status(raw: &str) -> Result<DisasterStatus, String> {
    DisasterStatus::from_label(raw).ok_or_else(|| format!("unknown disaster status '{raw}'"))
}

/// `now` shifted by an optional command-line offset.
fn expiry_from(
    now: DateTime<Utc>,
    amount: Option<i64>,
    unit: &str,
    to_delta: fn(i64) -> Option<TimeDelta>,
) -> Result<Option<DateTime<Utc>>> {
    amount
        .map(|amount| {
            to_delta(amount)
                .and_then(|delta| offset_time(now, delta))
                .ok_or_else(|| anyhow!("expiry {amount} {unit} from now is out of range"))
        })
        .transpose()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Open the configured database and run one command.
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let db = init_database(&config.db_path, config.db_max_connections).await?;
    let service = SafetyService::new(db, config);

    let result = match cli.command {
        Command::Zones(cmd) => run_zones(&service, cmd).await,
        Command::Weather(cmd) => run_weather(&service, cmd).await,
        Command::Disasters(cmd) => run_disasters(&service, cmd).await,
        Command::Route(cmd) => run_route(&service, cmd).await,
    };
    service.close().await;
    result
}

fn print_deleted(kind: &str, id: &str) -> Result<()> {
    print_json(&serde_json::json!({ "deleted": kind, "id": id }))
}

async fn run_zones(service: &SafetyService, cmd: ZoneCommand) -> Result<()> {
    match cmd {
        ZoneCommand::Nearby(around) => {
            let center = GeoPoint::new(around.lat, around.lng)?;
            let radius_km = service.radius_or_default(around.radius_km);
            let zones = service
                .nearby_zones(center, radius_km, around.min_severity.as_deref())
                .await?;
            print_json(&zones)
        }
        ZoneCommand::Report {
            name,
            description,
            lat,
            lng,
            radius_m,
            severity,
            threat,
            expires_in_hours,
            reported_by,
            info,
        } => {
            let request = ReportZoneRequest {
                name,
                description,
                center: GeoPoint::new(lat, lng)?,
                radius_m,
                severity,
                threat_type: threat,
                expires_in_hours,
                reported_by,
                additional_info: info,
            };
            print_json(&service.report_zone(request).await?)
        }
        ZoneCommand::Confirm { id } => print_json(&service.confirm_zone(&id).await?),
        ZoneCommand::Status { id, status } => {
            service.set_zone_status(&id, status).await?;
            print_json(&service.get_zone(&id).await?)
        }
        ZoneCommand::Expired => print_json(&service.expired_zones(Utc::now()).await?),
        ZoneCommand::List => print_json(&service.active_zones().await?),
        ZoneCommand::Delete { id } => {
            service.delete_zone(&id).await?;
            print_deleted("zone", &id)
        }
    }
}

async fn run_weather(service: &SafetyService, cmd: WeatherCommand) -> Result<()> {
    match cmd {
        WeatherCommand::Nearby(around) => {
            let center = GeoPoint::new(around.lat, around.lng)?;
            let radius_km = service.radius_or_default(around.radius_km);
            let alerts = service
                .nearby_weather_alerts(center, radius_km, around.min_severity.as_deref())
                .await?;
            print_json(&alerts)
        }
        WeatherCommand::Record {
            location_name,
            lat,
            lng,
            condition,
            description,
            temperature_c,
            severity,
            expires_in_minutes,
            external_id,
            source,
        } => {
            let now = Utc::now();
            let expires_at = expiry_from(now, expires_in_minutes, "minutes", TimeDelta::try_minutes)?;
            let alert = WeatherAlert {
                id: String::new(),
                location_name,
                location: GeoPoint::new(lat, lng)?,
                condition,
                description,
                temperature_c,
                severity,
                external_id,
                issued_at: now,
                expires_at,
                is_active: true,
                data_source: source,
            };
            print_json(&service.record_weather_alert(alert).await?)
        }
        WeatherCommand::DeactivateExpired => {
            let count = service.deactivate_expired_weather(Utc::now()).await?;
            print_json(&serde_json::json!({ "deactivated": count }))
        }
        WeatherCommand::List => print_json(&service.active_weather_alerts().await?),
        WeatherCommand::Delete { id } => {
            service.delete_weather_alert(&id).await?;
            print_deleted("weather alert", &id)
        }
    }
}

async fn run_disasters(service: &SafetyService, cmd: DisasterCommand) -> Result<()> {
    match cmd {
        DisasterCommand::Nearby {
            around,
            disaster_type,
        } => {
            let center = GeoPoint::new(around.lat, around.lng)?;
            let radius_km = service.radius_or_default(around.radius_km);
            let alerts = service
                .nearby_disaster_alerts(
                    center,
                    radius_km,
                    disaster_type.as_deref(),
                    around.min_severity.as_deref(),
                )
                .await?;
            print_json(&alerts)
        }
        DisasterCommand::Record {
            title,
            description,
            disaster_type,
            area,
            lat,
            lng,
            radius_km,
            severity,
            expires_in_hours,
            instructions,
            contact,
            external_id,
            source,
        } => {
            let now = Utc::now();
            let expires_at = expiry_from(now, expires_in_hours, "hours", TimeDelta::try_hours)?;
            let alert = DisasterAlert {
                id: String::new(),
                title,
                description,
                disaster_type,
                affected_area: area,
                location: GeoPoint::new(lat, lng)?,
                affected_radius_km: radius_km,
                severity,
                status: DisasterStatus::Active,
                issued_at: now,
                updated_at: None,
                expires_at,
                external_id,
                source,
                confirmation_count: 0,
                safety_instructions: instructions,
                emergency_contact: contact,
            };
            print_json(&service.record_disaster_alert(alert).await?)
        }
        DisasterCommand::Confirm { id } => print_json(&service.confirm_disaster(&id).await?),
        DisasterCommand::Status { id, status } => {
            service.set_disaster_status(&id, status).await?;
            print_json(&service.get_disaster_alert(&id).await?)
        }
        DisasterCommand::Stats => print_json(&service.disaster_statistics().await?),
        DisasterCommand::List => print_json(&service.active_disaster_alerts().await?),
        DisasterCommand::Delete { id } => {
            service.delete_disaster_alert(&id).await?;
            print_deleted("disaster alert", &id)
        }
    }
}

async fn run_route(service: &SafetyService, cmd: RouteCommand) -> Result<()> {
    match cmd {
        RouteCommand::Plan {
            from_lat,
            from_lng,
            to_lat,
            to_lng,
        } => {
            let origin = GeoPoint::new(from_lat, from_lng)?;
            let destination = GeoPoint::new(to_lat, to_lng)?;
            print_json(&service.plan_safe_route(origin, destination).await?)
        }
        RouteCommand::Show { id } => print_json(&service.get_route(&id).await?),
        RouteCommand::List { active } => print_json(&service.list_routes(active).await?),
        RouteCommand::Complete { id } => print_json(&service.complete_route(&id).await?),
        RouteCommand::Delete { id } => {
            service.delete_route(&id).await?;
            print_deleted("route", &id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_zone_report_with_negative_longitude() {
        let cli = Cli::try_parse_from([
            "safesphere", "zones", "report", "--name", "Bridge", "--lat", "40.7", "--lng",
            "-74.0", "--severity", "critical", "--threat", "crime",
        ])
        .unwrap();

        match cli.command {
            Command::Zones(ZoneCommand::Report {
                lng,
                severity,
                threat,
                radius_m,
                ..
            }) => {
                assert_eq!(lng, -74.0);
                assert_eq!(severity, ZoneSeverity::Critical);
                assert_eq!(threat, ThreatType::Crime);
                assert_eq!(radius_m, 500.0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_severity_from_another_scale() {
        let err = Cli::try_parse_from([
            "safesphere", "weather", "record", "--location-name", "Town", "--lat", "1",
            "--lng", "2", "--condition", "Rain", "--severity", "Critical",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("unknown severity"));
    }

    #[test]
    fn global_db_flag_follows_subcommand() {
        let cli = Cli::try_parse_from([
            "safesphere", "disasters", "nearby", "--lat", "34", "--lng", "-118", "--type",
            "Fire", "--db", "/tmp/test.db",
        ])
        .unwrap();
        assert_eq!(cli.db.as_deref(), Some("/tmp/test.db"));
        match cli.command {
            Command::Disasters(DisasterCommand::Nearby {
                around,
                disaster_type,
            }) => {
                assert_eq!(around.radius_km, None);
                assert_eq!(disaster_type.as_deref(), Some("Fire"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn runs_against_an_in_memory_database() {
        let cli = Cli::try_parse_from([
            "safesphere", "--db", ":memory:", "route", "plan", "--from-lat", "40.71",
            "--from-lng", "-74.0", "--to-lat", "40.75", "--to-lng", "-73.98",
        ])
        .unwrap();
        run(cli).await.unwrap();
    }

    #[tokio::test]
    async fn out_of_range_expiry_is_an_error() {
        let cli = Cli::try_parse_from([
            "safesphere", "--db", ":memory:", "weather", "record", "--location-name", "Town",
            "--lat", "1", "--lng", "2", "--condition", "Rain", "--expires-in-minutes",
            "9223372036854775807",
        ])
        .unwrap();
        let err = run(cli).await.unwrap_err();
        assert!(err.to_string().contains("out of range"));

        let cli = Cli::try_parse_from([
            "safesphere", "--db", ":memory:", "disasters", "record", "--title", "Quake",
            "--type", "Earthquake", "--area", "Valley", "--lat", "34", "--lng", "-118",
            "--expires-in-hours", "100000000",
        ])
        .unwrap();
        assert!(run(cli).await.is_err());
    }

    #[test]
    fn expiry_offsets_are_checked() {
        let now = Utc::now();
        let soon = expiry_from(now, Some(90), "minutes", TimeDelta::try_minutes).unwrap();
        assert_eq!(soon, Some(now + TimeDelta::minutes(90)));
        assert_eq!(expiry_from(now, None, "hours", TimeDelta::try_hours).unwrap(), None);
        assert!(expiry_from(now, Some(i64::MIN), "hours", TimeDelta::try_hours).is_err());
    }

    #[tokio::test]
    async fn deleting_a_missing_route_fails() {
        let cli = Cli::try_parse_from([
            "safesphere", "--db", ":memory:", "route", "delete", "no-such-route",
        ])
        .unwrap();
        assert!(run(cli).await.is_err());
    }
}
