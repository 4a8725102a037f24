//! Location resolution: free text or `"lat,lon"` into coordinates and a display name.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::openweather::OpenWeatherClient;
use crate::error::WeatherError;

/// Display name used when reverse geocoding finds nothing.
pub const CURRENT_LOCATION: &str = "Current Location";

static COORDINATES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*$")
        .expect("coordinate pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
    pub region: String,
    pub country: String,
}

/// What a raw `loc` string asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Coordinates { lat: f64, lon: f64 },
    Place(String),
}

impl LocationQuery {
    pub fn parse(input: &str) -> Self {
        if let Some(caps) = COORDINATES.captures(input) {
            // The pattern only admits valid float literals.
            if let (Ok(lat), Ok(lon)) = (caps[1].parse(), caps[2].parse()) {
                return LocationQuery::Coordinates { lat, lon };
            }
        }
        LocationQuery::Place(input.trim().to_string())
    }
}

pub async fn resolve_location(
    client: &OpenWeatherClient,
    input: &str,
) -> Result<ResolvedLocation, WeatherError> {
    match LocationQuery::parse(input) {
        LocationQuery::Coordinates { lat, lon } => reverse_lookup(client, lat, lon).await,
        LocationQuery::Place(query) => forward_lookup(client, &query).await,
    }
}

async fn forward_lookup(
    client: &OpenWeatherClient,
    query: &str,
) -> Result<ResolvedLocation, WeatherError> {
    let best = client
        .geocode_direct(query)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::LocationNotFound(query.to_string()))?;

    tracing::info!(query, name = %best.name, lat = best.lat, lon = best.lon, "Resolved location");

    Ok(ResolvedLocation {
        latitude: best.lat,
        longitude: best.lon,
        display_name: best.name,
        region: best.state.unwrap_or_default(),
        country: best.country,
    })
}

/// A miss here is not an error: coordinates are always a valid place to ask about.
async fn reverse_lookup(
    client: &OpenWeatherClient,
    lat: f64,
    lon: f64,
) -> Result<ResolvedLocation, WeatherError> {
    let found = client.geocode_reverse(lat, lon).await?.into_iter().next();

    let location = match found {
        Some(place) => ResolvedLocation {
            latitude: lat,
            longitude: lon,
            display_name: if place.name.is_empty() {
                CURRENT_LOCATION.to_string()
            } else {
                place.name
            },
            region: place.state.unwrap_or_default(),
            country: place.country,
        },
        None => {
            tracing::warn!(lat, lon, "Reverse geocoding found no match, using placeholder name");
            ResolvedLocation {
                latitude: lat,
                longitude: lon,
                display_name: CURRENT_LOCATION.to_string(),
                region: String::new(),
                country: String::new(),
            }
        }
    };

    Ok(location)
}
