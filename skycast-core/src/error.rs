use std::time::Duration;

use thiserror::Error;

/// Failures reported by a [`WeatherClient`](crate::client::WeatherClient).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WeatherError {
    /// Upstream answered, but did not recognise the city (or refused the request).
    #[error("City '{city}' not found (status {status}): {message}")]
    NotFound {
        city: String,
        status: u16,
        message: String,
    },

    /// Transport failure, timeout or an unreadable response body.
    #[error("Network error: {0}")]
    Network(String),
}

impl WeatherError {
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    pub fn timeout(after: Duration) -> Self {
        Self::Network(format!("request timed out after {}s", after.as_secs_f32()))
    }

    /// Text suitable for showing to the person who submitted the search.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            WeatherError::NotFound { .. } => "City not found or error fetching data".to_string(),
            WeatherError::Network(_) => "Failed to fetch weather data".to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, WeatherError::NotFound { .. })
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        WeatherError::network(err.to_string())
    }
}
