//! Mediates between the weather provider, the location source, the city store
//! and whatever renders the results.
//!
//! Every fetch publishes `Loading` on its channel before the request is
//! scheduled, then exactly one terminal envelope from the spawned task.
//! Concurrent fetches on the same channel are neither de-duplicated nor
//! cancelled; the last task to finish wins.

use futures::stream::BoxStream;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::{
    envelope::{Envelope, Observable},
    error::{Result, WeatherError},
    location::LocationSource,
    model::{City, CityUpdate, ForecastSet, LocationData, WeatherSnapshot},
    provider::WeatherSource,
    store::CityRepository,
};

#[derive(Debug, Default)]
struct Channels {
    current_weather: Observable<Envelope<WeatherSnapshot>>,
    forecast: Observable<Envelope<ForecastSet>>,
    location: Observable<LocationData>,
    location_failure: Observable<String>,
}

#[derive(Debug, Clone)]
pub struct WeatherService {
    weather: Arc<dyn WeatherSource>,
    location: Arc<dyn LocationSource>,
    cities: Arc<dyn CityRepository>,
    channels: Arc<Channels>,
}

impl WeatherService {
    pub fn new(
        weather: Arc<dyn WeatherSource>,
        location: Arc<dyn LocationSource>,
        cities: Arc<dyn CityRepository>,
    ) -> Self {
        Self {
            weather,
            location,
            cities,
            channels: Arc::default(),
        }
    }

    pub fn current_weather(&self) -> &Observable<Envelope<WeatherSnapshot>> {
        &self.channels.current_weather
    }

    pub fn forecast(&self) -> &Observable<Envelope<ForecastSet>> {
        &self.channels.forecast
    }

    pub fn location(&self) -> &Observable<LocationData> {
        &self.channels.location
    }

    pub fn location_failure(&self) -> &Observable<String> {
        &self.channels.location_failure
    }

    pub fn fetch_current_weather(
        &self,
        lat: impl Into<String>,
        lon: impl Into<String>,
    ) -> JoinHandle<()> {
        let (lat, lon) = (lat.into(), lon.into());
        let weather = self.weather.clone();
        let channels = self.channels.clone();

        channels.current_weather.publish(Envelope::Loading);
        tokio::spawn(async move {
            let result = weather.current_weather(&lat, &lon).await;
            channels.current_weather.publish(into_envelope(result, "current weather"));
        })
    }

    pub fn fetch_forecast(
        &self,
        lat: impl Into<String>,
        lon: impl Into<String>,
        exclude: impl Into<String>,
    ) -> JoinHandle<()> {
        let (lat, lon, exclude) = (lat.into(), lon.into(), exclude.into());
        let weather = self.weather.clone();
        let channels = self.channels.clone();

        channels.forecast.publish(Envelope::Loading);
        tokio::spawn(async move {
            let result = weather.forecast(&lat, &lon, &exclude).await;
            if let Ok(forecast) = &result {
                tracing::debug!(days = forecast.daily.len(), "forecast fetched");
            }
            channels.forecast.publish(into_envelope(result, "forecast"));
        })
    }

    /// Success lands on `location()`, failure messages on `location_failure()`.
    pub fn fetch_current_location(&self) -> JoinHandle<()> {
        let location = self.location.clone();
        let channels = self.channels.clone();

        tokio::spawn(async move {
            match location.current_location().await {
                Ok(data) => channels.location.publish(data),
                Err(err) => {
                    tracing::warn!(error = %err, "location lookup failed");
                    channels.location_failure.publish(err.user_message());
                }
            }
        })
    }

    /// Fire-and-forget: storage failures are logged, never surfaced.
    pub fn mark_city_saved(&self, city_id: i64) -> JoinHandle<()> {
        self.update_saved_city(CityUpdate::saved(city_id))
    }

    pub fn update_saved_city(&self, update: CityUpdate) -> JoinHandle<()> {
        let cities = self.cities.clone();

        tokio::spawn(async move {
            match cities.update_saved(update).await {
                Ok(rows) => tracing::info!(city_id = update.id, rows, "updated saved city"),
                Err(err) => {
                    tracing::error!(city_id = update.id, error = %err, "error updating city db")
                }
            }
        })
    }

    pub async fn search_cities(&self, key: &str) -> Result<Vec<City>> {
        self.cities.search(key).await
    }

    pub fn saved_cities(&self, saved: bool) -> BoxStream<'static, Result<Vec<City>>> {
        self.cities.watch_saved(saved)
    }
}

fn into_envelope<T>(result: Result<T>, what: &str) -> Envelope<T> {
    match result {
        Ok(data) => Envelope::Success(data),
        Err(err) => error_envelope(&err, what),
    }
}

fn error_envelope<T>(err: &WeatherError, what: &str) -> Envelope<T> {
    let message = err.user_message();
    if err.is_network() {
        tracing::warn!(error = ?err, "{what} request could not reach the server");
    } else {
        tracing::error!(error = ?err, "{what} request failed: {message}");
    }
    Envelope::error(None, message)
}
