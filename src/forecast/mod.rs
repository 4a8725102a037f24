pub mod cache;
pub mod location;
pub mod normalize;
pub mod openweather;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

use std::sync::Arc;

use crate::config::Config;
use crate::error::WeatherError;
use crate::utils::weather_cache_key;
use cache::{Clock, SystemClock, WeatherCache};
use location::resolve_location;
use normalize::{normalize, NormalizedWeather};
use openweather::OpenWeatherClient;
use types::Units;

/// Resolve, cache-check, fetch and normalize, in that order.
pub struct WeatherService {
    client: OpenWeatherClient,
    cache: WeatherCache,
    clock: Arc<dyn Clock>,
}

impl WeatherService {
    pub fn new(client: OpenWeatherClient, cache: WeatherCache, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            cache,
            clock,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = OpenWeatherClient::new(config.clone())?;
        let cache = WeatherCache::in_memory(config.cache_max_entries, config.cache_ttl());
        Ok(Self::new(client, cache, Arc::new(SystemClock)))
    }

    pub async fn weather_for(
        &self,
        loc: &str,
        units: Units,
    ) -> Result<Arc<NormalizedWeather>, WeatherError> {
        // Fail on a missing credential before any lookup.
        self.client.api_key()?;

        let location = resolve_location(&self.client, loc).await?;
        let key = weather_cache_key(location.latitude, location.longitude, units.as_str());

        self.cache
            .get_or_fetch(&key, || async {
                let upstream = self
                    .client
                    .fetch_weather(location.latitude, location.longitude, units)
                    .await?;
                normalize(&location, &upstream, units, self.clock.now())
            })
            .await
    }
}
