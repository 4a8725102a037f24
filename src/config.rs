use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 2 * 60;
pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = 1000;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Missing keys are reported per request, not at startup.
    pub openweather_api_key: Option<String>,
    pub openweather_base_url: String,
    pub openweather_current_path: String,
    pub openweather_forecast3h_path: String,
    pub openweather_geocode_direct_path: String,
    pub openweather_geocode_reverse_path: String,
    pub port: u16,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: u64,
    pub static_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            openweather_api_key: env::var("OPENWEATHER_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            openweather_base_url: env::var("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org".to_string()),
            openweather_current_path: env::var("OPENWEATHER_CURRENT_PATH")
                .unwrap_or_else(|_| "/data/2.5/weather".to_string()),
            openweather_forecast3h_path: env::var("OPENWEATHER_FORECAST3H_PATH")
                .unwrap_or_else(|_| "/data/2.5/forecast".to_string()),
            openweather_geocode_direct_path: env::var("OPENWEATHER_GEOCODE_DIRECT_PATH")
                .unwrap_or_else(|_| "/geo/1.0/direct".to_string()),
            openweather_geocode_reverse_path: env::var("OPENWEATHER_GEOCODE_REVERSE_PATH")
                .unwrap_or_else(|_| "/geo/1.0/reverse".to_string()),
            port: env::var("SERVER_PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .filter(|port| *port != 0)
                .unwrap_or(DEFAULT_PORT),
            cache_ttl_secs: parse_or("CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?,
            cache_max_entries: parse_or("CACHE_MAX_ENTRIES", DEFAULT_CACHE_MAX_ENTRIES)?,
            static_dir: env::var("STATIC_DIR").ok().map(PathBuf::from),
        })
    }

    /// Config pointed at an arbitrary upstream origin, used by tests and local stubs.
    pub fn for_upstream(base_url: &str, api_key: Option<&str>) -> Self {
        Config {
            openweather_api_key: api_key.map(str::to_string),
            openweather_base_url: base_url.trim_end_matches('/').to_string(),
            openweather_current_path: "/data/2.5/weather".to_string(),
            openweather_forecast3h_path: "/data/2.5/forecast".to_string(),
            openweather_geocode_direct_path: "/geo/1.0/direct".to_string(),
            openweather_geocode_reverse_path: "/geo/1.0/reverse".to_string(),
            port: DEFAULT_PORT,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            static_dir: None,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn parse_or(name: &str, default: u64) -> anyhow::Result<u64> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a non-negative integer, got {:?}", name, value)),
        Err(_) => Ok(default),
    }
}
