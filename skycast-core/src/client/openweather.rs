use anyhow::Context;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use reqwest::{Client, Request};
use serde::Deserialize;
use std::{collections::HashSet, time::Duration};

use crate::{
    error::WeatherError,
    model::{CurrentWeather, ForecastDay, PlaceCandidate},
};

use super::WeatherClient;

const FORECAST_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MIDDAY_HOUR: u32 = 12;

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path` with `query`; the API key is appended to every request.
    fn request(&self, path: &str, query: &[(&str, &str)]) -> Result<Request, WeatherError> {
        Ok(self
            .http
            .get(self.url(path))
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .build()?)
    }

    fn current_request(&self, city: &str) -> Result<Request, WeatherError> {
        self.request("/data/2.5/weather", &[("q", city), ("units", "metric")])
    }

    fn forecast_request(&self, city: &str) -> Result<Request, WeatherError> {
        self.request("/data/2.5/forecast", &[("q", city), ("units", "metric")])
    }

    fn places_request(&self, query: &str, limit: usize) -> Result<Request, WeatherError> {
        let limit = limit.to_string();
        self.request("/geo/1.0/direct", &[("q", query), ("limit", limit.as_str())])
    }

    /// Single attempt; returns the status code and raw body.
    async fn send(&self, request: Request) -> Result<(u16, String), WeatherError> {
        let res = self.http.execute(request).await?;

        let status = res.status().as_u16();
        let body = res.text().await?;

        Ok((status, body))
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn fetch_current(&self, city: &str) -> Result<CurrentWeather, WeatherError> {
        let (status, body) = self.send(self.current_request(city)?).await?;

        parse_current(city, status, &body)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn fetch_forecast(&self, city: &str) -> Result<Vec<ForecastDay>, WeatherError> {
        let (status, body) = self.send(self.forecast_request(city)?).await?;

        parse_forecast(status, &body)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn suggest_places(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PlaceCandidate>, WeatherError> {
        let (status, body) = self.send(self.places_request(query, limit)?).await?;

        parse_places(status, &body, limit)
    }
}

/// Fields OpenWeather embeds in every JSON body, including error bodies.
#[derive(Debug, Default, Deserialize)]
struct OwEnvelope {
    cod: Option<serde_json::Value>,
    message: Option<serde_json::Value>,
}

impl OwEnvelope {
    /// `cod` arrives as a number for current weather and as a string elsewhere.
    fn code(&self) -> Option<u16> {
        match self.cod.as_ref()? {
            serde_json::Value::Number(n) => n.as_u64().and_then(|c| u16::try_from(c).ok()),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn message(&self) -> Option<String> {
        match self.message.as_ref()? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    #[serde(default)]
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt_txt: String,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    #[serde(default)]
    list: Vec<OwForecastEntry>,
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn parse_current(city: &str, status: u16, body: &str) -> Result<CurrentWeather, WeatherError> {
    let envelope: OwEnvelope = serde_json::from_str(body).unwrap_or_default();
    let code = envelope.code().unwrap_or(status);

    if !is_success(status) || code != 200 {
        let status = if is_success(status) { code } else { status };
        return Err(WeatherError::NotFound {
            city: city.to_string(),
            status,
            message: envelope.message().unwrap_or_else(|| truncate_body(body)),
        });
    }

    let parsed: OwCurrentResponse = serde_json::from_str(body).map_err(|e| {
        WeatherError::network(format!("Failed to parse OpenWeather current JSON: {e}"))
    })?;

    let (condition, description, icon) = parsed
        .weather
        .first()
        .map(|w| (w.main.clone(), w.description.clone(), w.icon.clone()))
        .unwrap_or_else(|| ("Unknown".to_string(), "Unknown".to_string(), String::new()));

    Ok(CurrentWeather {
        name: parsed.name,
        temperature_c: parsed.main.temp,
        humidity_pct: parsed.main.humidity,
        description,
        condition,
        icon,
    })
}

fn parse_forecast(status: u16, body: &str) -> Result<Vec<ForecastDay>, WeatherError> {
    if !is_success(status) {
        return Err(WeatherError::network(format!(
            "OpenWeather forecast request failed with status {}: {}",
            status,
            truncate_body(body),
        )));
    }

    let parsed: OwForecastResponse = serde_json::from_str(body).map_err(|e| {
        WeatherError::network(format!("Failed to parse OpenWeather forecast JSON: {e}"))
    })?;

    Ok(select_midday(&parsed.list))
}

/// Keep the 12:00:00 entry of each date, in timeline order.
///
/// Dates without a midday entry are left out; the first midday entry wins if a
/// date repeats.
fn select_midday(entries: &[OwForecastEntry]) -> Vec<ForecastDay> {
    let mut seen: HashSet<NaiveDate> = HashSet::new();

    entries
        .iter()
        .filter_map(|entry| {
            let at = NaiveDateTime::parse_from_str(&entry.dt_txt, FORECAST_TIME_FORMAT).ok()?;
            let is_midday = at.hour() == MIDDAY_HOUR && at.minute() == 0 && at.second() == 0;
            if !is_midday || !seen.insert(at.date()) {
                return None;
            }

            let weather = entry.weather.first();
            Some(ForecastDay {
                date: at.date(),
                temperature_c: entry.main.temp,
                icon: weather.map(|w| w.icon.clone()).unwrap_or_default(),
                summary: weather
                    .map(|w| w.main.clone())
                    .unwrap_or_else(|| "Unknown".to_string()),
                description: weather.map(|w| w.description.clone()).unwrap_or_default(),
            })
        })
        .collect()
}

fn parse_places(status: u16, body: &str, limit: usize) -> Result<Vec<PlaceCandidate>, WeatherError> {
    if !is_success(status) {
        return Err(WeatherError::network(format!(
            "OpenWeather geocoding request failed with status {}: {}",
            status,
            truncate_body(body),
        )));
    }

    let mut places: Vec<PlaceCandidate> = serde_json::from_str(body).map_err(|e| {
        WeatherError::network(format!("Failed to parse OpenWeather geocoding JSON: {e}"))
    })?;
    places.truncate(limit);

    Ok(places)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
