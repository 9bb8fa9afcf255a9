//! Service-level errors.

use safesphere_core::{GeoError, ProximityError, RequestError};

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    Invalid(#[from] GeoError),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl ServiceError {
    pub(crate) fn not_found(kind: &'static str, id: &str) -> Self {
        ServiceError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<RequestError> for ServiceError {
    fn from(value: RequestError) -> Self {
        ServiceError::BadRequest(value.to_string())
    }
}

impl From<ProximityError<anyhow::Error>> for ServiceError {
    fn from(value: ProximityError<anyhow::Error>) -> Self {
        match value {
            ProximityError::Invalid(err) => ServiceError::Invalid(err),
            ProximityError::Fetch(err) => ServiceError::Storage(err),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
