use crate::{
    Config,
    client::openweather::OpenWeatherClient,
    error::WeatherError,
    model::{CurrentWeather, ForecastDay, PlaceCandidate},
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// Read-only access to a remote weather service.
///
/// Implementations keep no session state; every call is a single attempt.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    /// Present conditions for `city`, in metric units.
    async fn fetch_current(&self, city: &str) -> Result<CurrentWeather, WeatherError>;

    /// One midday sample per forecast day, oldest first.
    async fn fetch_forecast(&self, city: &str) -> Result<Vec<ForecastDay>, WeatherError>;

    /// Up to `limit` geocoding matches for `query`, in upstream order.
    ///
    /// Callers must not pass an empty query.
    async fn suggest_places(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PlaceCandidate>, WeatherError>;
}

/// Construct the OpenWeather client from config.
pub fn client_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherClient>> {
    let api_key = config.resolve_api_key()?;
    let client = OpenWeatherClient::new(api_key, &config.api.base_url, config.request_timeout())?;

    Ok(Arc::new(client))
}
