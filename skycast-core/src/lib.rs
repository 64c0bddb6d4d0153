//! Core library for the `skycast` weather search.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weather service client (current conditions, daily forecast, city suggestions)
//! - The search session controller (debounced suggestions, ordered weather fetches)
//! - Persistence of the last searched city
//!
//! It is used by `skycast-cli`, but can also back any other front-end that feeds it
//! input events and renders [`SessionState`].

pub mod client;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod model;
pub mod store;

pub use client::{WeatherClient, client_from_config, openweather::OpenWeatherClient};
pub use config::Config;
pub use controller::{
    ControllerSettings, Outcome, SearchController, SessionState, Stale, SuggestionPhase,
    WeatherPhase,
};
pub use error::WeatherError;
pub use model::{CurrentWeather, ForecastDay, PlaceCandidate};
pub use store::{FileStore, KeyValueStore, LAST_CITY_KEY, MemoryStore};
