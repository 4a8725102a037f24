//! Request pipeline errors and their HTTP mapping.

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every failure the weather pipeline can produce.
///
/// `Clone` so one failed upstream round trip can be handed to every coalesced waiter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WeatherError {
    /// Server-held credential is missing.
    #[error("Server misconfigured: {0}")]
    Configuration(String),

    /// Missing or malformed query parameter.
    #[error("{0}")]
    InvalidRequest(String),

    /// Forward geocoding found no match.
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    /// An upstream call failed, returned a non-success status or an unreadable body.
    #[error("{message}")]
    UpstreamUnavailable { status: Option<u16>, message: String },
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl WeatherError {
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        WeatherError::UpstreamUnavailable {
            status,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WeatherError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WeatherError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            WeatherError::LocationNotFound(_) => StatusCode::NOT_FOUND,
            WeatherError::UpstreamUnavailable { status, .. } => status
                .and_then(|code| StatusCode::from_u16(code).ok())
                .filter(|code| code.is_client_error() || code.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

impl From<QueryRejection> for WeatherError {
    fn from(rejection: QueryRejection) -> Self {
        WeatherError::InvalidRequest(rejection.body_text())
    }
}

impl From<serde_json::Error> for WeatherError {
    fn from(err: serde_json::Error) -> Self {
        WeatherError::upstream(None, format!("JSON parsing failed: {}", err))
    }
}

impl IntoResponse for WeatherError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(%status, "Weather request failed: {}", self);
        } else {
            tracing::warn!(%status, "Weather request rejected: {}", self);
        }

        let body = ErrorResponse {
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            WeatherError::Configuration("OPENWEATHER_API_KEY missing".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            WeatherError::InvalidRequest("Missing query parameter: loc".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WeatherError::LocationNotFound("Atlantis".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_upstream_status_is_mirrored() {
        assert_eq!(
            WeatherError::upstream(Some(401), "Current weather failed: 401").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            WeatherError::upstream(Some(503), "Forecast failed: 503").status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        // Only error statuses are mirrored.
        assert_eq!(
            WeatherError::upstream(Some(204), "odd").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            WeatherError::upstream(None, "connection refused").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = WeatherError::LocationNotFound("Atlantis".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.message, "Location not found: Atlantis");
    }
}
