use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio::sync::{broadcast, watch};
use weather_core::{
    CityRepository, CityUpdate, Config, ConfiguredLocation, Envelope, LocationConfig,
    LocationData, LocationProvider, SqliteCityStore, Units, WeatherService,
    provider::{client_from_config, openweather::DAILY_ONLY},
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    /// Unit system for this run: standard, metric or imperial.
    #[arg(long, global = true)]
    pub units: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the API key, units and location.
    Configure,

    /// Show current weather. Uses the configured location when no coordinates are given.
    Now {
        #[command(flatten)]
        coords: Coords,
    },

    /// Show the daily forecast.
    Forecast {
        #[command(flatten)]
        coords: Coords,

        /// Comma-separated parts of the forecast to leave out.
        #[arg(long, default_value = DAILY_ONLY)]
        exclude: String,
    },

    /// Print the current location.
    Locate,

    /// Search and manage saved cities.
    Cities {
        #[command(subcommand)]
        command: CitiesCommand,
    },
}

#[derive(Debug, Clone, clap::Args)]
pub struct Coords {
    #[arg(long, allow_hyphen_values = true, requires = "lon")]
    pub lat: Option<String>,

    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    pub lon: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum CitiesCommand {
    /// List cities whose name starts with the given text.
    Search { prefix: String },

    /// Mark a city as saved.
    Save { id: i64 },

    /// Clear a city's saved mark.
    Unsave { id: i64 },

    /// List saved cities.
    Saved,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;
        let units = match self.units.as_deref() {
            Some(units) => Units::try_from(units)?,
            None => config.units,
        };

        match self.command {
            Command::Configure => configure(config)?,
            Command::Now { coords } => {
                let service = build_service(&config, units).await?;
                let (lat, lon) = resolve(&service, coords).await?;
                let rx = service.current_weather().subscribe();
                service.fetch_current_weather(lat, lon);
                let snapshot = await_terminal(rx).await?;
                println!("{}", render::snapshot(&snapshot, units));
            }
            Command::Forecast { coords, exclude } => {
                let service = build_service(&config, units).await?;
                let (lat, lon) = resolve(&service, coords).await?;
                let rx = service.forecast().subscribe();
                service.fetch_forecast(lat, lon, exclude);
                let forecast = await_terminal(rx).await?;
                println!("{}", render::forecast(&forecast, units));
            }
            Command::Locate => {
                let service = build_service(&config, units).await?;
                let location = locate(&service).await?;
                println!("{:.4}, {:.4}", location.latitude, location.longitude);
            }
            Command::Cities { command } => {
                let store = open_store(&config).await?;
                cities(&store, command).await?;
            }
        }

        Ok(())
    }
}

async fn build_service(config: &Config, units: Units) -> anyhow::Result<WeatherService> {
    // A one-shot run never changes units; the last value stays readable.
    let (_, units) = watch::channel(units);
    let weather = client_from_config(config, units)?;
    let location = LocationProvider::new(ConfiguredLocation::new(config.location.clone()));
    let store = open_store(config).await?;

    Ok(WeatherService::new(
        Arc::new(weather),
        Arc::new(location),
        Arc::new(store),
    ))
}

/// The city commands only touch the local database, so they need no API key.
async fn open_store(config: &Config) -> anyhow::Result<SqliteCityStore> {
    let db_path = config.database_path()?;
    SqliteCityStore::open(&db_path)
        .await
        .with_context(|| format!("Failed to open city database: {}", db_path.display()))
}

async fn cities(store: &SqliteCityStore, command: CitiesCommand) -> anyhow::Result<()> {
    match command {
        CitiesCommand::Search { prefix } => {
            let found = store.search(&prefix).await?;
            println!("{}", render::cities(&found));
        }
        CitiesCommand::Save { id } => {
            set_saved(store, CityUpdate::saved(id)).await?;
            println!("Saved city {id}");
        }
        CitiesCommand::Unsave { id } => {
            set_saved(store, CityUpdate::unsaved(id)).await?;
            println!("Removed city {id} from saved cities");
        }
        CitiesCommand::Saved => {
            let saved = store.saved(true).await?;
            println!("{}", render::cities(&saved));
        }
    }

    Ok(())
}

async fn set_saved(store: &SqliteCityStore, update: CityUpdate) -> anyhow::Result<()> {
    let rows = store.update_saved(update).await?;
    if rows == 0 {
        bail!(
            "No city with id {}.\nHint: run `weather cities search <name>` to find its id.",
            update.id
        );
    }
    Ok(())
}

/// Explicit coordinates win; otherwise ask the location source.
async fn resolve(service: &WeatherService, coords: Coords) -> anyhow::Result<(String, String)> {
    match (coords.lat, coords.lon) {
        (Some(lat), Some(lon)) => Ok((lat, lon)),
        _ => Ok(locate(service).await?.query_pair()),
    }
}

async fn locate(service: &WeatherService) -> anyhow::Result<LocationData> {
    let mut found = service.location().subscribe();
    let mut failed = service.location_failure().subscribe();
    service.fetch_current_location();

    tokio::select! {
        location = found.recv() => Ok(location?),
        message = failed.recv() => bail!(
            "{}\nHint: run `weather configure` to set a location, or pass --lat and --lon.",
            message?
        ),
    }
}

async fn await_terminal<T: Clone>(mut rx: broadcast::Receiver<Envelope<T>>) -> anyhow::Result<T> {
    loop {
        let envelope = rx.recv().await?;
        if !envelope.is_terminal() {
            tracing::debug!("request in flight");
            continue;
        }
        if let Some(message) = envelope.message() {
            bail!("{message}");
        }
        return envelope
            .data()
            .cloned()
            .context("Request finished without a payload");
    }
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    config.set_api_key(api_key.trim().to_string());

    let current = Units::all().iter().position(|u| *u == config.units).unwrap_or(0);
    config.units = inquire::Select::new("Units:", Units::all().to_vec())
        .with_starting_cursor(current)
        .prompt()
        .context("Failed to read unit system")?;

    let enabled = inquire::Confirm::new("Allow location lookups?")
        .with_default(config.location.enabled)
        .prompt()
        .context("Failed to read location permission")?;

    config.location = if enabled {
        LocationConfig {
            enabled,
            latitude: inquire::CustomType::<f64>::new("Latitude:").prompt_skippable()?,
            longitude: inquire::CustomType::<f64>::new("Longitude:").prompt_skippable()?,
        }
    } else {
        LocationConfig::default()
    };

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());

    Ok(())
}
