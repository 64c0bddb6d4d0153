use std::{fmt, sync::Arc};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use inquire::{InquireError, Password, Select, Text};
use skycast_core::{
    Config, ControllerSettings, FileStore, KeyValueStore, MemoryStore, PlaceCandidate,
    SearchController, WeatherPhase, client_from_config,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skycast", version, about = "Current weather, 5-day forecast and city search")]
pub struct Cli {
    /// Print debug logs (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Neither replay nor remember the last searched city.
    #[arg(long, global = true)]
    pub no_persist: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeatherMap API key.
    Configure {
        /// Key to store; prompted for when omitted.
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Show current weather and forecast for a city.
    Show {
        /// City name; defaults to the last successful search.
        city: Option<String>,
    },

    /// List city suggestions for partial input.
    Suggest {
        /// Partial city name.
        text: String,
    },

    /// Interactive search with autocomplete.
    Search,
}

/// Entry in the suggestion picker.
enum Choice {
    Place(PlaceCandidate),
    AsTyped(String),
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::Place(place) => write!(f, "{place}"),
            Choice::AsTyped(text) => write!(f, "Search \"{text}\" as typed"),
        }
    }
}

impl Cli {
    pub fn init_tracing(&self) {
        let default_level = if self.verbose { "debug" } else { "warn" };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure { api_key } => configure(api_key).await,
            Command::Show { city } => {
                let mut controller = build_controller(self.no_persist)?;
                show(&mut controller, city).await
            }
            Command::Suggest { text } => {
                let mut controller = build_controller(self.no_persist)?;
                suggest(&mut controller, &text).await
            }
            Command::Search => {
                let mut controller = build_controller(self.no_persist)?;
                search(&mut controller).await
            }
        }
    }
}

fn build_controller(no_persist: bool) -> Result<SearchController> {
    let config = Config::load()?;
    let client = client_from_config(&config)?;

    let store: Arc<dyn KeyValueStore> = if no_persist {
        Arc::new(MemoryStore::new())
    } else {
        let store = FileStore::open_default()?;
        debug!(path = %store.path().display(), "using state file");
        Arc::new(store)
    };

    Ok(SearchController::new(client, store, ControllerSettings::from(&config)))
}

/// Run a blocking inquire prompt off the async workers. `None` if the user cancelled.
async fn prompt<T, F>(ask: F) -> Result<Option<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, InquireError> + Send + 'static,
{
    match tokio::task::spawn_blocking(ask).await.context("Prompt task failed")? {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(err) => Err(err).context("Failed to read input"),
    }
}

async fn configure(api_key: Option<String>) -> Result<()> {
    let mut config = Config::load()?;

    let api_key = match api_key {
        Some(key) => key,
        None => prompt(|| {
            Password::new("OpenWeatherMap API key:")
                .without_confirmation()
                .prompt()
        })
        .await?
        .ok_or_else(|| anyhow!("Configuration cancelled"))?,
    };

    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    config.set_api_key(api_key.trim().to_string());
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(controller: &mut SearchController, city: Option<String>) -> Result<()> {
    let submitted = match city {
        Some(city) => {
            controller.on_query_changed(&city);
            controller.submit()
        }
        None => controller.restore_last_city(),
    };

    if submitted.is_none() {
        bail!("No city given and no previous search found.\nHint: run `skycast show <CITY>`.");
    }

    controller.settle().await;
    finish(controller)
}

async fn suggest(controller: &mut SearchController, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        bail!("Nothing to look up: suggestion text is empty");
    }

    controller.on_query_changed(text);
    controller.settle().await;

    print!("{}", output::render_suggestions(&controller.state().suggestions));
    Ok(())
}

async fn search(controller: &mut SearchController) -> Result<()> {
    if controller.restore_last_city().is_some() {
        controller.settle().await;
        print!("{}", output::render_weather(controller.state()));
    }

    loop {
        let initial = controller.state().query.clone();
        let Some(text) = prompt(move || {
            Text::new("City:")
                .with_initial_value(&initial)
                .with_help_message("empty input quits")
                .prompt()
        })
        .await?
        else {
            break;
        };

        if text.trim().is_empty() {
            break;
        }

        controller.on_query_changed(&text);
        controller.settle().await;

        let suggestions = controller.state().suggestions.clone();
        if suggestions.is_empty() {
            controller.submit();
        } else {
            let mut choices: Vec<Choice> = suggestions.into_iter().map(Choice::Place).collect();
            choices.push(Choice::AsTyped(text.trim().to_string()));

            match prompt(move || Select::new("Did you mean:", choices).prompt()).await? {
                Some(Choice::Place(place)) => controller.select_suggestion(&place),
                Some(Choice::AsTyped(_)) => controller.submit(),
                None => continue,
            };
        }

        controller.settle().await;
        print!("{}", output::render_weather(controller.state()));
    }

    Ok(())
}

fn finish(controller: &SearchController) -> Result<()> {
    let state = controller.state();
    if state.weather_phase == WeatherPhase::Failed {
        let message = state.error.clone().unwrap_or_else(|| "Weather lookup failed".to_string());
        return Err(anyhow!(message));
    }

    print!("{}", output::render_weather(state));
    Ok(())
}
