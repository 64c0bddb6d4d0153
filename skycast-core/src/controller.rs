//! Search session: debounced city suggestions and the weather fetch flow.
//!
//! The controller is the only owner of [`SessionState`]. Network calls and the
//! debounce timer run as spawned tasks that report back over a channel; each
//! report is applied by [`SearchController::process_next`] in one uninterrupted
//! step, after checking it still belongs to the latest input:
//!
//! - suggestion results must match the current query and suggestion epoch
//!   (bumped by every keystroke and every dismissal);
//! - weather results must carry the most recently issued submission number.
//!
//! Anything else is dropped as stale. In-flight requests are never cancelled.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    client::WeatherClient,
    config::Config,
    debounce::DebounceTimer,
    error::WeatherError,
    model::{CurrentWeather, ForecastDay, PlaceCandidate},
    store::{KeyValueStore, LAST_CITY_KEY},
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SuggestionPhase {
    #[default]
    Idle,
    /// Debounce timer armed for `query`.
    Pending { query: String },
    /// Lookup for `query` sent, not yet answered.
    InFlight { query: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeatherPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// Everything a front-end needs to render the search screen.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub query: String,
    pub suggestions: Vec<PlaceCandidate>,
    pub suggestion_phase: SuggestionPhase,
    pub current: Option<CurrentWeather>,
    pub forecast: Vec<ForecastDay>,
    pub weather_phase: WeatherPhase,
    pub loading: bool,
    /// User-visible message from the last failed weather fetch.
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub debounce: Duration,
    pub suggestion_limit: usize,
    /// Upper bound for every client call.
    pub request_timeout: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            suggestion_limit: 5,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            debounce: config.debounce(),
            suggestion_limit: config.search.suggestion_limit,
            request_timeout: config.request_timeout(),
        }
    }
}

/// Which kind of report was dropped because newer input superseded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stale {
    Timer,
    Suggestions { query: String },
    Weather { seq: u64 },
}

/// What applying one completion did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    SuggestionLookupStarted { query: String },
    SuggestionsUpdated { query: String, count: usize },
    SuggestionsFailed { query: String },
    CurrentLoaded { seq: u64, name: String },
    ForecastLoaded { seq: u64, days: usize },
    ForecastUnavailable { seq: u64 },
    WeatherFailed { seq: u64, error: WeatherError },
    Discarded(Stale),
}

#[derive(Debug)]
enum Completion {
    TimerElapsed {
        epoch: u64,
        query: String,
    },
    Suggestions {
        epoch: u64,
        query: String,
        result: Result<Vec<PlaceCandidate>, WeatherError>,
    },
    Current {
        seq: u64,
        city: String,
        result: Result<CurrentWeather, WeatherError>,
    },
    Forecast {
        seq: u64,
        result: Result<Vec<ForecastDay>, WeatherError>,
    },
}

pub struct SearchController {
    client: Arc<dyn WeatherClient>,
    store: Arc<dyn KeyValueStore>,
    settings: ControllerSettings,
    state: SessionState,
    timer: DebounceTimer,
    suggest_epoch: u64,
    weather_seq: u64,
    requests_in_flight: usize,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl std::fmt::Debug for SearchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchController")
            .field("state", &self.state)
            .field("suggest_epoch", &self.suggest_epoch)
            .field("weather_seq", &self.weather_seq)
            .field("requests_in_flight", &self.requests_in_flight)
            .finish_non_exhaustive()
    }
}

impl SearchController {
    pub fn new(
        client: Arc<dyn WeatherClient>,
        store: Arc<dyn KeyValueStore>,
        settings: ControllerSettings,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            client,
            store,
            settings,
            state: SessionState::default(),
            timer: DebounceTimer::new(),
            suggest_epoch: 0,
            weather_seq: 0,
            requests_in_flight: 0,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// True while a debounce timer is armed or a request has not reported back.
    pub fn has_pending_work(&self) -> bool {
        self.timer.is_armed() || self.requests_in_flight > 0
    }

    /// Replay the persisted city, if any. Returns the submission number.
    pub fn restore_last_city(&mut self) -> Option<u64> {
        let city = match self.store.get(LAST_CITY_KEY) {
            Ok(Some(city)) if !city.trim().is_empty() => city,
            Ok(_) => return None,
            Err(err) => {
                warn!("Failed to read last city: {err:#}");
                return None;
            }
        };

        debug!(city = %city, "restoring last searched city");
        self.state.query = city.clone();
        self.start_weather_flow(city.trim())
    }

    /// Text input changed: restart the debounce, or clear suggestions on empty text.
    pub fn on_query_changed(&mut self, text: &str) {
        self.state.query = text.to_string();
        self.timer.cancel();
        self.suggest_epoch += 1;

        if text.trim().is_empty() {
            self.state.suggestions.clear();
            self.state.suggestion_phase = SuggestionPhase::Idle;
            return;
        }

        let epoch = self.suggest_epoch;
        let query = text.to_string();
        let tx = self.tx.clone();
        let captured = query.clone();
        self.timer.arm(self.settings.debounce, epoch, move || {
            let _ = tx.send(Completion::TimerElapsed {
                epoch,
                query: captured,
            });
        });

        self.state.suggestion_phase = SuggestionPhase::Pending { query };
    }

    /// Explicit search for the current query. `None` if the query is blank.
    pub fn submit(&mut self) -> Option<u64> {
        let city = self.state.query.trim().to_string();
        self.start_weather_flow(&city)
    }

    /// Pick a suggestion: it becomes the query and is searched right away.
    pub fn select_suggestion(&mut self, candidate: &PlaceCandidate) -> Option<u64> {
        let city = candidate.display_name();
        self.state.query = city.clone();
        self.start_weather_flow(&city)
    }

    /// Wait for the next completion and apply it.
    ///
    /// Returns `None` only if the channel is closed, which cannot happen while
    /// the controller is alive.
    pub async fn process_next(&mut self) -> Option<Outcome> {
        let completion = self.rx.recv().await?;
        Some(self.apply(completion))
    }

    /// Apply completions until nothing is pending.
    pub async fn settle(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while self.has_pending_work() {
            match self.process_next().await {
                Some(outcome) => outcomes.push(outcome),
                None => break,
            }
        }
        outcomes
    }

    fn dismiss_suggestions(&mut self) {
        self.timer.cancel();
        self.suggest_epoch += 1;
        self.state.suggestions.clear();
        self.state.suggestion_phase = SuggestionPhase::Idle;
    }

    fn start_weather_flow(&mut self, city: &str) -> Option<u64> {
        if city.is_empty() {
            return None;
        }

        self.dismiss_suggestions();

        self.weather_seq += 1;
        let seq = self.weather_seq;

        self.state.weather_phase = WeatherPhase::Loading;
        self.state.loading = true;
        self.state.error = None;

        let client = self.client.clone();
        let city = city.to_string();
        let request_city = city.clone();
        self.spawn_request(
            async move { client.fetch_current(&request_city).await },
            move |result| Completion::Current { seq, city, result },
        );

        Some(seq)
    }

    fn spawn_request<T, Fut, W>(&mut self, request: Fut, wrap: W)
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, WeatherError>> + Send + 'static,
        W: FnOnce(Result<T, WeatherError>) -> Completion + Send + 'static,
    {
        let tx = self.tx.clone();
        let timeout = self.settings.request_timeout;
        self.requests_in_flight += 1;

        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, request).await {
                Ok(result) => result,
                Err(_) => Err(WeatherError::timeout(timeout)),
            };
            let _ = tx.send(wrap(result));
        });
    }

    fn apply(&mut self, completion: Completion) -> Outcome {
        match completion {
            Completion::TimerElapsed { epoch, query } => self.on_timer_elapsed(epoch, query),
            Completion::Suggestions {
                epoch,
                query,
                result,
            } => {
                self.requests_in_flight = self.requests_in_flight.saturating_sub(1);
                self.on_suggestions(epoch, query, result)
            }
            Completion::Current { seq, city, result } => {
                self.requests_in_flight = self.requests_in_flight.saturating_sub(1);
                self.on_current(seq, city, result)
            }
            Completion::Forecast { seq, result } => {
                self.requests_in_flight = self.requests_in_flight.saturating_sub(1);
                self.on_forecast(seq, result)
            }
        }
    }

    fn on_timer_elapsed(&mut self, epoch: u64, query: String) -> Outcome {
        if epoch != self.suggest_epoch || !self.timer.complete(epoch) {
            return Outcome::Discarded(Stale::Timer);
        }

        self.state.suggestion_phase = SuggestionPhase::InFlight {
            query: query.clone(),
        };

        let client = self.client.clone();
        let limit = self.settings.suggestion_limit;
        let lookup = query.trim().to_string();
        let captured = query.clone();
        self.spawn_request(
            async move { client.suggest_places(&lookup, limit).await },
            move |result| Completion::Suggestions {
                epoch,
                query: captured,
                result,
            },
        );

        Outcome::SuggestionLookupStarted { query }
    }

    fn on_suggestions(
        &mut self,
        epoch: u64,
        query: String,
        result: Result<Vec<PlaceCandidate>, WeatherError>,
    ) -> Outcome {
        if epoch != self.suggest_epoch || self.state.query != query {
            debug!(query = %query, "discarding stale suggestions");
            return Outcome::Discarded(Stale::Suggestions { query });
        }

        self.state.suggestion_phase = SuggestionPhase::Idle;

        match result {
            Ok(places) => {
                let count = places.len();
                self.state.suggestions = places;
                Outcome::SuggestionsUpdated { query, count }
            }
            Err(err) => {
                debug!(query = %query, "suggestion lookup failed: {err}");
                self.state.suggestions.clear();
                Outcome::SuggestionsFailed { query }
            }
        }
    }

    fn on_current(
        &mut self,
        seq: u64,
        city: String,
        result: Result<CurrentWeather, WeatherError>,
    ) -> Outcome {
        if seq != self.weather_seq {
            debug!(seq, latest = self.weather_seq, "discarding stale current weather");
            return Outcome::Discarded(Stale::Weather { seq });
        }

        match result {
            Ok(weather) => {
                info!(seq, city = %city, name = %weather.name, "current weather loaded");
                let name = weather.name.clone();
                self.state.current = Some(weather);
                self.state.forecast.clear();

                if let Err(err) = self.store.set(LAST_CITY_KEY, &city) {
                    warn!("Failed to persist last city '{city}': {err:#}");
                }

                let client = self.client.clone();
                self.spawn_request(
                    async move { client.fetch_forecast(&city).await },
                    move |result| Completion::Forecast { seq, result },
                );

                Outcome::CurrentLoaded { seq, name }
            }
            Err(error) => {
                info!(seq, city = %city, "weather fetch failed: {error}");
                self.state.current = None;
                self.state.forecast.clear();
                self.state.error = Some(error.user_message());
                self.state.weather_phase = WeatherPhase::Failed;
                self.state.loading = false;

                Outcome::WeatherFailed { seq, error }
            }
        }
    }

    fn on_forecast(&mut self, seq: u64, result: Result<Vec<ForecastDay>, WeatherError>) -> Outcome {
        if seq != self.weather_seq {
            debug!(seq, latest = self.weather_seq, "discarding stale forecast");
            return Outcome::Discarded(Stale::Weather { seq });
        }

        self.state.weather_phase = WeatherPhase::Loaded;
        self.state.loading = false;

        match result {
            Ok(days) => {
                let count = days.len();
                self.state.forecast = days;
                Outcome::ForecastLoaded { seq, days: count }
            }
            Err(err) => {
                warn!(seq, "forecast unavailable: {err}");
                self.state.forecast.clear();
                Outcome::ForecastUnavailable { seq }
            }
        }
    }
}
