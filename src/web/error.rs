//! Errors rendered as JSON responses.

use crate::config::ConfigError;
use serde::Serialize;
use std::fmt::{Debug, Display, Formatter};
use warp::http::StatusCode;
use warp::reject::Reject;

/// An error carrying the HTTP status it is answered with.
#[derive(Clone, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub message: String,
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Reject for ApiError {}

impl ApiError {
    pub fn new(status: StatusCode, message: impl ToString) -> Self {
        ApiError {
            status,
            message: message.to_string(),
        }
    }
}

impl From<ConfigError> for ApiError {
    /// Missing configuration is the deployment's fault, not the caller's.
    fn from(err: ConfigError) -> Self {
        ApiError::new(StatusCode::SERVICE_UNAVAILABLE, err)
    }
}

/// Attaches an HTTP status to an error result.
pub trait ResultExt<T> {
    fn with_status(self, status: StatusCode) -> Result<T, anyhow::Error>;

    /// Shorthand for `with_status(StatusCode::BAD_REQUEST)`.
    fn mark_client_error(self) -> Result<T, anyhow::Error>;
}

impl<T> ResultExt<T> for Result<T, anyhow::Error> {
    fn with_status(self, status: StatusCode) -> Result<T, anyhow::Error> {
        self.map_err(|err| {
            let message = format!("{:#}", err);
            err.context(ApiError { status, message })
        })
    }

    fn mark_client_error(self) -> Result<T, anyhow::Error> {
        self.with_status(StatusCode::BAD_REQUEST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attaches_status_codes() {
        let result: anyhow::Result<()> = Err(anyhow::anyhow!("no such bucket"));
        let err = result.mark_client_error().unwrap_err();
        let api_error = err.downcast_ref::<ApiError>().unwrap();

        assert_eq!(api_error.status, StatusCode::BAD_REQUEST);
        assert_eq!(api_error.message, "no such bucket");
    }

    #[test]
    fn missing_configuration_is_unavailable() {
        let api_error = ApiError::from(ConfigError::RequiredServiceMissing {
            candidates: vec!["postgres".to_owned()],
        });

        assert_eq!(api_error.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(api_error.message, "no service bound for any of [postgres]");
    }
}
