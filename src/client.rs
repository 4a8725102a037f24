//! Consumer-side call into `GET /api/weather`, for front ends and tools that only need the
//! normalized schema.

use reqwest::Client;
use thiserror::Error;

use crate::error::ErrorResponse;
use crate::forecast::normalize::NormalizedWeather;
use crate::forecast::types::Units;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Weather request failed with status {status}: {message}")]
    Status { status: u16, message: String },
}

/// Fetch weather for a place name or a `"lat,lon"` string.
///
/// Any non-success status is an error carrying the server's message.
pub async fn fetch_weather(
    http: &Client,
    base_url: &str,
    loc: &str,
    units: Units,
) -> Result<NormalizedWeather, ClientError> {
    let url = format!("{}/api/weather", base_url.trim_end_matches('/'));
    let response = http
        .get(&url)
        .query(&[("loc", loc), ("units", units.as_str())])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let message = response
            .json::<ErrorResponse>()
            .await
            .map(|body| body.message)
            .unwrap_or_else(|_| status.to_string());
        return Err(ClientError::Status {
            status: status.as_u16(),
            message,
        });
    }

    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::forecast::fixtures::{current_json, forecast_json, two_day_list};
    use crate::routes::{create_router, AppState};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn spawn_server(upstream: &MockServer) -> String {
        let state = AppState::from_config(Config::for_upstream(&upstream.uri(), Some("k"))).unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_fetch_weather_by_coordinates() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "Santa Monica", "lat": 34.0, "lon": -118.5, "country": "US", "state": "California"}
            ])))
            .mount(&upstream)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_json(0)))
            .mount(&upstream)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json(two_day_list(), 0)))
            .mount(&upstream)
            .await;
        let base_url = spawn_server(&upstream).await;

        let weather = fetch_weather(&Client::new(), &base_url, "34.0,-118.5", Units::Metric)
            .await
            .unwrap();

        assert_eq!(weather.location.name, "Santa Monica");
        assert_eq!(weather.location.lat, 34.0);
        assert_eq!(weather.forecast.days.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_weather_surfaces_server_message() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&upstream)
            .await;
        let base_url = spawn_server(&upstream).await;

        let err = fetch_weather(&Client::new(), &base_url, "Atlantis", Units::Metric)
            .await
            .unwrap_err();

        match err {
            ClientError::Status { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Location not found: Atlantis");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
