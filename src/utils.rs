/// 16-point compass rose, clockwise from north.
const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Convert temperature between Celsius and Fahrenheit
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Convert wind speed between m/s, km/h and mph
pub fn ms_to_kmh(ms: f64) -> f64 {
    ms * 3.6
}

pub fn ms_to_mph(ms: f64) -> f64 {
    ms * 2.237
}

pub fn mph_to_kmh(mph: f64) -> f64 {
    mph * 1.609344
}

/// Convert pressure from hPa (millibars) to inches of mercury
pub fn hpa_to_inhg(hpa: f64) -> f64 {
    hpa * 0.02953
}

pub fn mm_to_inches(mm: f64) -> f64 {
    mm * 0.0393701
}

pub fn meters_to_km(meters: f64) -> f64 {
    meters / 1000.0
}

pub fn meters_to_miles(meters: f64) -> f64 {
    meters / 1609.34
}

/// Round to specified decimal places
pub fn round_to_decimals(value: f64, decimals: u32) -> f64 {
    let multiplier = 10_f64.powi(decimals as i32);
    (value * multiplier).round() / multiplier
}

/// Fractional probability (0-1) to a whole percentage (0-100).
pub fn probability_to_percent(probability: f64) -> u8 {
    (probability * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Compass label for a wind bearing in degrees; wraps past 360.
pub fn wind_direction(degrees: f64) -> &'static str {
    let index = (degrees / 22.5).round() as i64;
    COMPASS_POINTS[index.rem_euclid(16) as usize]
}

/// Format a UTC offset in seconds as `UTC+HH:MM`.
pub fn format_utc_offset(offset_secs: i32) -> String {
    let sign = if offset_secs < 0 { '-' } else { '+' };
    let abs = offset_secs.unsigned_abs();
    format!("UTC{}{:02}:{:02}", sign, abs / 3600, (abs % 3600) / 60)
}

/// Build a cache key from named parameters.
///
/// Pairs are sorted by name and joined as `name:value` with `|`, so the result does not depend
/// on the order the parameters were supplied in.
pub fn cache_key<K, V>(params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: std::fmt::Display,
{
    let mut pairs: Vec<(&str, String)> = params
        .iter()
        .map(|(name, value)| (name.as_ref(), value.to_string()))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    pairs
        .into_iter()
        .map(|(name, value)| format!("{}:{}", name, value))
        .collect::<Vec<_>>()
        .join("|")
}

/// Generate a cache key for normalized weather data
pub fn weather_cache_key(lat: f64, lon: f64, units: &str) -> String {
    cache_key(&[
        ("latitude", lat.to_string()),
        ("longitude", lon.to_string()),
        ("units", units.to_string()),
    ])
}
