use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};

use crate::{
    config::Config,
    error::{ErrorResponse, WeatherError},
    forecast::{normalize::NormalizedWeather, types::Units, WeatherService},
};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub weather: Arc<WeatherService>,
}

impl AppState {
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let weather = Arc::new(WeatherService::from_config(&config)?);
        Ok(Self {
            config: Arc::new(config),
            weather,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub loc: Option<String>,
    pub units: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_weather(
    State(state): State<AppState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<Json<Arc<NormalizedWeather>>, WeatherError> {
    // Malformed query strings still answer with the JSON error body.
    let Query(params) = query?;
    let loc = params
        .loc
        .as_deref()
        .map(str::trim)
        .filter(|loc| !loc.is_empty())
        .ok_or_else(|| WeatherError::InvalidRequest("Missing query parameter: loc".to_string()))?;
    let units = Units::try_from(params.units.as_deref().unwrap_or_default())?;

    let weather = state.weather.weather_for(loc, units).await?;
    Ok(Json(weather))
}

async fn api_not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            message: "Not found".to_string(),
        }),
    )
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/weather", get(get_weather))
        .fallback(api_not_found);

    let mut router = Router::new().nest("/api", api);

    // Built client assets; unknown paths fall back to index.html for client-side routing.
    if let Some(dir) = &state.config.static_dir {
        router = router.fallback_service(
            ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
        );
    }

    router.with_state(state)
}
