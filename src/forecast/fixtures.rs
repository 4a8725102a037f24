//! Upstream payload builders shared by the unit and HTTP tests.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use super::location::ResolvedLocation;
use super::normalize::{normalize, NormalizedWeather};
use super::openweather::{UpstreamDocument, UpstreamWeather};
use super::types::Units;

/// 2024-06-01T00:00:00Z
pub const DAY0: i64 = 1_717_200_000;
pub const HOUR: i64 = 3600;

pub fn forecast_item(dt: i64, temp: f64, pop: f64, wind: f64, humidity: f64, main: &str) -> Value {
    json!({
        "dt": dt,
        "main": {"temp": temp, "feels_like": temp - 1.0, "temp_min": temp, "temp_max": temp, "pressure": 1013.0, "humidity": humidity},
        "weather": [{"id": 800, "main": main, "description": main.to_lowercase(), "icon": "01d"}],
        "wind": {"speed": wind, "deg": 90.0},
        "pop": pop
    })
}

pub fn current_json(timezone: i32) -> Value {
    json!({
        "dt": DAY0 + 10 * HOUR,
        "main": {"temp": 21.0, "feels_like": 20.0, "temp_min": 17.0, "temp_max": 24.0, "pressure": 1015.0, "humidity": 55.0},
        "weather": [{"id": 801, "main": "Clouds", "description": "few clouds", "icon": "02d"}],
        "wind": {"speed": 5.0, "deg": 180.0, "gust": 8.0},
        "clouds": {"all": 20.0},
        "rain": {"1h": 1.5},
        "visibility": 10000,
        "sys": {"sunrise": DAY0 + 6 * HOUR, "sunset": DAY0 + 18 * HOUR, "country": "US"},
        "timezone": timezone,
        "name": "Somewhere"
    })
}

pub fn forecast_json(list: Vec<Value>, timezone: i32) -> Value {
    json!({
        "cod": "200",
        "cnt": list.len(),
        "list": list,
        "city": {"name": "Somewhere", "timezone": timezone}
    })
}

/// Sixteen 3-hourly samples spanning 2024-06-01 and 2024-06-02.
pub fn two_day_list() -> Vec<Value> {
    let temps = [
        18.0, 20.0, 22.0, 25.0, 24.0, 21.0, 19.0, 18.5, 19.0, 20.5, 23.0, 24.5, 23.5, 22.0, 20.0,
        19.5,
    ];
    temps
        .iter()
        .enumerate()
        .map(|(i, temp)| forecast_item(DAY0 + i as i64 * 3 * HOUR, *temp, 0.1, 3.0, 60.0, "Clear"))
        .collect()
}

pub fn upstream_weather(list: Vec<Value>, timezone: i32) -> UpstreamWeather {
    let current_raw = current_json(timezone);
    let forecast_raw = forecast_json(list, timezone);
    UpstreamWeather {
        current: UpstreamDocument {
            parsed: serde_json::from_value(current_raw.clone()).unwrap(),
            raw: current_raw,
        },
        forecast: UpstreamDocument {
            parsed: serde_json::from_value(forecast_raw.clone()).unwrap(),
            raw: forecast_raw,
        },
    }
}

pub fn los_angeles() -> ResolvedLocation {
    ResolvedLocation {
        latitude: 34.0522,
        longitude: -118.2437,
        display_name: "Los Angeles".to_string(),
        region: "California".to_string(),
        country: "US".to_string(),
    }
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.timestamp_opt(DAY0 + 10 * HOUR, 0).unwrap()
}

pub fn sample_weather() -> NormalizedWeather {
    normalize(
        &los_angeles(),
        &upstream_weather(two_day_list(), 0),
        Units::Metric,
        fixed_now(),
    )
    .unwrap()
}
