//! Error types for geospatial queries.

use thiserror::Error;

/// Rejected query input.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeoError {
    #[error("latitude {0} is outside [-90, 90]")]
    InvalidLatitude(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),

    #[error("radius {0} must be a positive, finite distance")]
    InvalidRadius(f64),
}

/// Failure of a proximity query.
///
/// `Fetch` carries the storage collaborator's own error so callers can tell
/// "could not search" apart from "nothing nearby".
#[derive(Debug, Error)]
pub enum ProximityError<E> {
    #[error("invalid query: {0}")]
    Invalid(#[from] GeoError),

    #[error("candidate fetch failed: {0}")]
    Fetch(E),
}

/// Rejected request fields that are not coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("expiry {hours} hours from now is past the year 9999")]
    ExpiryOutOfRange { hours: u32 },
}
