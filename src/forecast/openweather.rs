use super::types::*;
use crate::config::Config;
use crate::error::WeatherError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// A decoded upstream payload together with the untouched JSON it came from.
#[derive(Debug, Clone)]
pub struct UpstreamDocument<T> {
    pub parsed: T,
    pub raw: Value,
}

/// Current conditions and the 3-hourly forecast for one coordinate pair.
#[derive(Debug, Clone)]
pub struct UpstreamWeather {
    pub current: UpstreamDocument<CurrentResponse>,
    pub forecast: UpstreamDocument<Forecast3hResponse>,
}

pub struct OpenWeatherClient {
    client: Client,
    config: Config,
}

impl OpenWeatherClient {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("WeatherProxy/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, config })
    }

    /// Fails with a configuration error when no credential is configured.
    pub fn api_key(&self) -> Result<&str, WeatherError> {
        self.config
            .openweather_api_key
            .as_deref()
            .ok_or_else(|| WeatherError::Configuration("OPENWEATHER_API_KEY missing".to_string()))
    }

    pub async fn geocode_direct(&self, query: &str) -> Result<Vec<GeocodeResponse>, WeatherError> {
        let url = format!(
            "{}{}",
            self.config.openweather_base_url, self.config.openweather_geocode_direct_path
        );

        let response = self
            .make_request("Geocoding", &url, &[("q", query), ("limit", "1")])
            .await?;

        Ok(serde_json::from_value(response)?)
    }

    pub async fn geocode_reverse(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<Vec<GeocodeResponse>, WeatherError> {
        let url = format!(
            "{}{}",
            self.config.openweather_base_url, self.config.openweather_geocode_reverse_path
        );

        let response = self
            .make_request(
                "Reverse geocoding",
                &url,
                &[
                    ("lat", &lat.to_string()),
                    ("lon", &lon.to_string()),
                    ("limit", "1"),
                ],
            )
            .await?;

        Ok(serde_json::from_value(response)?)
    }

    pub async fn get_current(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
    ) -> Result<UpstreamDocument<CurrentResponse>, WeatherError> {
        let url = format!(
            "{}{}",
            self.config.openweather_base_url, self.config.openweather_current_path
        );
        self.fetch_document("Current weather", &url, lat, lon, units)
            .await
    }

    pub async fn get_forecast3h(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
    ) -> Result<UpstreamDocument<Forecast3hResponse>, WeatherError> {
        let url = format!(
            "{}{}",
            self.config.openweather_base_url, self.config.openweather_forecast3h_path
        );
        self.fetch_document("Forecast", &url, lat, lon, units).await
    }

    /// Issues the current-conditions and forecast calls together; both must succeed.
    pub async fn fetch_weather(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
    ) -> Result<UpstreamWeather, WeatherError> {
        let (current, forecast) = tokio::try_join!(
            self.get_current(lat, lon, units),
            self.get_forecast3h(lat, lon, units),
        )?;

        Ok(UpstreamWeather { current, forecast })
    }

    async fn fetch_document<T: DeserializeOwned>(
        &self,
        label: &str,
        url: &str,
        lat: f64,
        lon: f64,
        units: Units,
    ) -> Result<UpstreamDocument<T>, WeatherError> {
        let raw = self
            .make_request(
                label,
                url,
                &[
                    ("lat", &lat.to_string()),
                    ("lon", &lon.to_string()),
                    ("units", units.as_str()),
                ],
            )
            .await?;

        let parsed = serde_json::from_value(raw.clone()).map_err(|e| {
            WeatherError::upstream(None, format!("{} returned an unexpected body: {}", label, e))
        })?;

        Ok(UpstreamDocument { parsed, raw })
    }

    /// Single GET against the upstream. No retry: callers surface the failure directly.
    async fn make_request(
        &self,
        label: &str,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, WeatherError> {
        let api_key = self.api_key()?;
        tracing::debug!(%url, ?params, "{} request", label);

        let response = self
            .client
            .get(url)
            .query(params)
            .query(&[("appid", api_key)])
            .send()
            .await
            .map_err(|e| WeatherError::upstream(None, format!("{} failed: {}", label, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %error_text, "{} rejected by upstream", label);
            return Err(WeatherError::upstream(
                Some(status.as_u16()),
                format!("{} failed: {}", label, status.as_u16()),
            ));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| WeatherError::upstream(None, format!("{} returned invalid JSON: {}", label, e)))
    }
}
