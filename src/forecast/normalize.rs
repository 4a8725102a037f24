//! Reshapes upstream current conditions and the 3-hourly forecast list into the stable
//! `NormalizedWeather` schema served to clients.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::location::ResolvedLocation;
use super::openweather::UpstreamWeather;
use super::types::*;
use crate::error::WeatherError;
use crate::utils::{
    celsius_to_fahrenheit, fahrenheit_to_celsius, format_utc_offset, hpa_to_inhg, meters_to_km,
    meters_to_miles, mm_to_inches, mph_to_kmh, ms_to_kmh, ms_to_mph, probability_to_percent,
    round_to_decimals, wind_direction,
};

/// Number of day buckets kept from the forecast.
pub const MAX_FORECAST_DAYS: usize = 3;

/// The free tier has no UV data.
pub const UV_INDEX_PLACEHOLDER: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub c: f64,
    pub f: f64,
}

impl Temperature {
    pub fn from_upstream(value: f64, units: Units) -> Self {
        match units {
            Units::Metric => Self {
                c: value,
                f: round_to_decimals(celsius_to_fahrenheit(value), 1),
            },
            Units::Imperial => Self {
                c: round_to_decimals(fahrenheit_to_celsius(value), 1),
                f: value,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Speed {
    pub kph: f64,
    pub mph: f64,
}

impl Speed {
    /// Metric upstream speeds are m/s, imperial ones mph.
    pub fn from_upstream(value: f64, units: Units) -> Self {
        match units {
            Units::Metric => Self {
                kph: round_to_decimals(ms_to_kmh(value), 1),
                mph: round_to_decimals(ms_to_mph(value), 1),
            },
            Units::Imperial => Self {
                kph: round_to_decimals(mph_to_kmh(value), 1),
                mph: value,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pressure {
    pub mb: f64,
    #[serde(rename = "in")]
    pub inches: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Precipitation {
    pub mm: f64,
    #[serde(rename = "in")]
    pub inches: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Visibility {
    pub km: f64,
    pub miles: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub text: String,
    pub description: String,
    pub code: Option<i32>,
    pub icon: String,
}

impl Condition {
    fn from_entries(entries: &[ConditionEntry]) -> Self {
        match entries.first() {
            Some(entry) => Self {
                text: entry.main.clone(),
                description: entry.description.clone(),
                code: entry.id,
                icon: entry.icon.clone(),
            },
            None => Self {
                text: "Unknown".to_string(),
                description: String::new(),
                code: None,
                icon: String::new(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInfo {
    pub name: String,
    pub region: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    pub timezone: String,
    pub local_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWind {
    pub speed: Speed,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gust: Option<Speed>,
    pub direction: String,
    pub degree: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConditions {
    pub last_updated: String,
    pub temperature: Temperature,
    pub feels_like: Temperature,
    pub condition: Condition,
    pub wind: CurrentWind,
    pub humidity: f64,
    pub cloud: f64,
    pub pressure: Pressure,
    pub precipitation: Precipitation,
    pub visibility: Visibility,
    pub uv_index: f64,
    pub is_daytime: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyWind {
    pub speed: Speed,
    pub direction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyForecast {
    pub time: String,
    pub temperature: Temperature,
    pub feels_like: Temperature,
    pub wind: HourlyWind,
    pub humidity: f64,
    pub condition: Condition,
    pub chance_of_rain: u8,
    pub is_daytime: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub max_temp: Temperature,
    pub min_temp: Temperature,
    pub avg_temp: Temperature,
    pub condition: Condition,
    pub uv_index: f64,
    pub chance_of_rain: u8,
    pub max_wind: Speed,
    pub avg_humidity: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Astro {
    pub sunrise: String,
    pub sunset: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: String,
    pub summary: DailySummary,
    pub astro: Astro,
    pub hours: Vec<HourlyForecast>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBlock {
    pub days: Vec<DailyForecast>,
}

/// Unmodified upstream payloads for consumers that want unmapped fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPayloads {
    pub current: Value,
    pub forecast: Value,
    pub list: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedWeather {
    pub location: LocationInfo,
    pub current: CurrentConditions,
    pub forecast: ForecastBlock,
    pub raw: RawPayloads,
}

/// Sunrise/sunset of the current day, reused for every bucketed day.
#[derive(Debug, Clone, Copy)]
struct DayLight {
    sunrise: i64,
    sunset: i64,
}

impl DayLight {
    fn is_daytime(&self, dt: i64) -> bool {
        dt >= self.sunrise && dt < self.sunset
    }
}

pub fn normalize(
    location: &ResolvedLocation,
    upstream: &UpstreamWeather,
    units: Units,
    now: DateTime<Utc>,
) -> Result<NormalizedWeather, WeatherError> {
    let current = &upstream.current.parsed;
    let forecast = &upstream.forecast.parsed;

    let offset_secs = forecast
        .city
        .as_ref()
        .map(|city| city.timezone)
        .unwrap_or(current.timezone);
    let offset = match FixedOffset::east_opt(offset_secs) {
        Some(offset) => offset,
        None => {
            tracing::warn!(offset_secs, "Upstream timezone offset out of range, using UTC");
            Utc.fix()
        }
    };
    let daylight = DayLight {
        sunrise: current.sys.sunrise,
        sunset: current.sys.sunset,
    };
    let astro = Astro {
        sunrise: format_clock(current.sys.sunrise, offset)?,
        sunset: format_clock(current.sys.sunset, offset)?,
    };

    let mut days = Vec::with_capacity(MAX_FORECAST_DAYS);
    for (date, items) in bucket_by_day(&forecast.list)? {
        days.push(summarize_day(date, &items, units, offset, daylight, &astro)?);
    }
    if days.is_empty() {
        days.push(synthesize_today(current, units, now, &astro));
    }

    Ok(NormalizedWeather {
        location: LocationInfo {
            name: location.display_name.clone(),
            region: location.region.clone(),
            country: location.country.clone(),
            lat: location.latitude,
            lon: location.longitude,
            timezone: format_utc_offset(offset.local_minus_utc()),
            local_time: now
                .with_timezone(&offset)
                .to_rfc3339_opts(SecondsFormat::Secs, false),
        },
        current: current_conditions(current, units, daylight)?,
        forecast: ForecastBlock { days },
        raw: RawPayloads {
            current: upstream.current.raw.clone(),
            forecast: upstream.forecast.raw.clone(),
            list: upstream
                .forecast
                .raw
                .get("list")
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new())),
        },
    })
}

/// Groups items by UTC calendar date, chronologically, keeping the earliest
/// `MAX_FORECAST_DAYS` dates.
fn bucket_by_day(
    list: &[Forecast3hItem],
) -> Result<Vec<(NaiveDate, Vec<&Forecast3hItem>)>, WeatherError> {
    let mut buckets: BTreeMap<NaiveDate, Vec<&Forecast3hItem>> = BTreeMap::new();
    for item in list {
        let date = utc_timestamp(item.dt)?.date_naive();
        buckets.entry(date).or_default().push(item);
    }

    Ok(buckets
        .into_iter()
        .take(MAX_FORECAST_DAYS)
        .map(|(date, mut items)| {
            items.sort_by_key(|item| item.dt);
            (date, items)
        })
        .collect())
}

fn summarize_day(
    date: NaiveDate,
    items: &[&Forecast3hItem],
    units: Units,
    offset: FixedOffset,
    daylight: DayLight,
    astro: &Astro,
) -> Result<DailyForecast, WeatherError> {
    let mut min_temp = f64::INFINITY;
    let mut max_temp = f64::NEG_INFINITY;
    let mut total_temp = 0.0;
    let mut max_wind: f64 = 0.0;
    let mut total_humidity = 0.0;
    let mut max_pop: u8 = 0;
    let mut hours = Vec::with_capacity(items.len());

    for item in items {
        let temp = item.main.temp;
        min_temp = min_temp.min(temp);
        max_temp = max_temp.max(temp);
        total_temp += temp;
        max_wind = max_wind.max(item.wind.speed);
        total_humidity += item.main.humidity;

        let chance_of_rain = probability_to_percent(item.pop);
        max_pop = max_pop.max(chance_of_rain);

        hours.push(HourlyForecast {
            time: utc_timestamp(item.dt)?.to_rfc3339_opts(SecondsFormat::Millis, true),
            temperature: Temperature::from_upstream(temp, units),
            feels_like: Temperature::from_upstream(item.main.feels_like, units),
            wind: HourlyWind {
                speed: Speed::from_upstream(item.wind.speed, units),
                direction: wind_direction(item.wind.deg).to_string(),
            },
            humidity: item.main.humidity,
            condition: Condition::from_entries(&item.weather),
            chance_of_rain,
            is_daytime: daylight.is_daytime(item.dt),
        });
    }

    let count = items.len() as f64;
    let representative = representative_item(items, offset)?;

    Ok(DailyForecast {
        date: date.format("%Y-%m-%d").to_string(),
        summary: DailySummary {
            max_temp: Temperature::from_upstream(max_temp, units),
            min_temp: Temperature::from_upstream(min_temp, units),
            avg_temp: Temperature::from_upstream(total_temp / count, units),
            condition: Condition::from_entries(&representative.weather),
            uv_index: UV_INDEX_PLACEHOLDER,
            chance_of_rain: max_pop,
            max_wind: Speed::from_upstream(max_wind, units),
            avg_humidity: (total_humidity / count).round().clamp(0.0, 100.0) as u8,
        },
        astro: astro.clone(),
        hours,
    })
}

/// First item whose local hour is 12..=14, otherwise the bucket's first item.
fn representative_item<'a>(
    items: &[&'a Forecast3hItem],
    offset: FixedOffset,
) -> Result<&'a Forecast3hItem, WeatherError> {
    for item in items {
        let hour = utc_timestamp(item.dt)?.with_timezone(&offset).hour();
        if (12..=14).contains(&hour) {
            return Ok(*item);
        }
    }
    items
        .first()
        .copied()
        .ok_or_else(|| WeatherError::upstream(None, "Empty forecast bucket"))
}

fn synthesize_today(
    current: &CurrentResponse,
    units: Units,
    now: DateTime<Utc>,
    astro: &Astro,
) -> DailyForecast {
    DailyForecast {
        date: now.date_naive().format("%Y-%m-%d").to_string(),
        summary: DailySummary {
            max_temp: Temperature::from_upstream(current.main.temp_max, units),
            min_temp: Temperature::from_upstream(current.main.temp_min, units),
            avg_temp: Temperature::from_upstream(current.main.temp, units),
            condition: Condition::from_entries(&current.weather),
            uv_index: UV_INDEX_PLACEHOLDER,
            chance_of_rain: 0,
            max_wind: Speed::from_upstream(current.wind.speed, units),
            avg_humidity: current.main.humidity.round().clamp(0.0, 100.0) as u8,
        },
        astro: astro.clone(),
        hours: Vec::new(),
    }
}

fn current_conditions(
    current: &CurrentResponse,
    units: Units,
    daylight: DayLight,
) -> Result<CurrentConditions, WeatherError> {
    let rain_mm = current
        .rain
        .as_ref()
        .and_then(|rain| rain.get("1h"))
        .copied()
        .unwrap_or(0.0);

    Ok(CurrentConditions {
        last_updated: utc_timestamp(current.dt)?.to_rfc3339_opts(SecondsFormat::Millis, true),
        temperature: Temperature::from_upstream(current.main.temp, units),
        feels_like: Temperature::from_upstream(current.main.feels_like, units),
        condition: Condition::from_entries(&current.weather),
        wind: CurrentWind {
            speed: Speed::from_upstream(current.wind.speed, units),
            gust: current.wind.gust.map(|gust| Speed::from_upstream(gust, units)),
            direction: wind_direction(current.wind.deg).to_string(),
            degree: current.wind.deg,
        },
        humidity: current.main.humidity,
        cloud: current.clouds.as_ref().map(|c| c.all).unwrap_or(0.0),
        pressure: Pressure {
            mb: current.main.pressure,
            inches: round_to_decimals(hpa_to_inhg(current.main.pressure), 2),
        },
        precipitation: Precipitation {
            mm: rain_mm,
            inches: round_to_decimals(mm_to_inches(rain_mm), 2),
        },
        visibility: Visibility {
            km: meters_to_km(current.visibility),
            miles: round_to_decimals(meters_to_miles(current.visibility), 1),
        },
        uv_index: UV_INDEX_PLACEHOLDER,
        is_daytime: daylight.is_daytime(current.dt),
    })
}

fn utc_timestamp(secs: i64) -> Result<DateTime<Utc>, WeatherError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| WeatherError::upstream(None, format!("Invalid upstream timestamp: {}", secs)))
}

fn format_clock(secs: i64, offset: FixedOffset) -> Result<String, WeatherError> {
    Ok(utc_timestamp(secs)?
        .with_timezone(&offset)
        .format("%H:%M")
        .to_string())
}
