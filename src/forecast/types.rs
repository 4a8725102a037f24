use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::WeatherError;

/// Unit system requested from the upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

impl TryFrom<&str> for Units {
    type Error = WeatherError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "" | "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            _ => Err(WeatherError::InvalidRequest(format!(
                "Unsupported units '{}'. Supported units: metric, imperial",
                value
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub country: String,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentResponse {
    pub dt: i64,
    pub main: MainReadings,
    #[serde(default)]
    pub weather: Vec<ConditionEntry>,
    pub wind: Wind,
    pub clouds: Option<Clouds>,
    pub rain: Option<HashMap<String, f64>>,
    /// Metres; omitted by the upstream for some stations.
    #[serde(default = "default_visibility")]
    pub visibility: f64,
    pub sys: CurrentSys,
    /// Shift in seconds from UTC.
    #[serde(default)]
    pub timezone: i32,
    #[serde(default)]
    pub name: String,
}

fn default_visibility() -> f64 {
    10_000.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentSys {
    pub sunrise: i64,
    pub sunset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionEntry {
    pub id: Option<i32>,
    pub main: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clouds {
    pub all: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    #[serde(default)]
    pub deg: f64,
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast3hResponse {
    #[serde(default)]
    pub list: Vec<Forecast3hItem>,
    pub city: Option<Forecast3hCity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast3hItem {
    pub dt: i64,
    pub main: MainReadings,
    #[serde(default)]
    pub weather: Vec<ConditionEntry>,
    pub wind: Wind,
    /// Probability of precipitation, 0-1.
    #[serde(default)]
    pub pop: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast3hCity {
    #[serde(default)]
    pub timezone: i32,
}
