use crate::{
    Config,
    error::Result,
    model::{ForecastSet, WeatherSnapshot},
    provider::openweather::OpenWeatherClient,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt::Debug, sync::Arc};
use tokio::sync::watch;

pub mod openweather;

/// Unit system requested from the provider via the `units` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Standard,
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Standard => "standard",
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    pub const fn all() -> &'static [Units] {
        &[Units::Standard, Units::Metric, Units::Imperial]
    }

    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            Units::Standard => "K",
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }

    pub fn speed_suffix(&self) -> &'static str {
        match self {
            Units::Imperial => "mph",
            _ => "m/s",
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Units {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "standard" => Ok(Units::Standard),
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported: standard, metric, imperial."
            )),
        }
    }
}

/// Read-only weather provider.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn current_weather(&self, lat: &str, lon: &str) -> Result<WeatherSnapshot>;

    async fn forecast(&self, lat: &str, lon: &str, exclude: &str) -> Result<ForecastSet>;
}

/// Hook applied to every outgoing request before it is executed.
pub trait RequestTransform: Send + Sync + Debug {
    fn apply(&self, request: &mut reqwest::Request);
}

/// Appends the fixed `appid` and `units` query parameters.
#[derive(Debug, Clone)]
pub struct QueryParameters {
    api_key: String,
    units: watch::Receiver<Units>,
}

impl QueryParameters {
    pub fn new(api_key: String, units: watch::Receiver<Units>) -> Self {
        Self { api_key, units }
    }
}

impl RequestTransform for QueryParameters {
    fn apply(&self, request: &mut reqwest::Request) {
        let units = *self.units.borrow();
        request
            .url_mut()
            .query_pairs_mut()
            .append_pair("appid", &self.api_key)
            .append_pair("units", units.as_str());
    }
}

/// Construct the OpenWeather client from config; `units` is the live unit preference.
pub fn client_from_config(
    config: &Config,
    units: watch::Receiver<Units>,
) -> anyhow::Result<OpenWeatherClient> {
    let api_key = config.api_key()?;
    let transform = Arc::new(QueryParameters::new(api_key.to_owned(), units));

    OpenWeatherClient::new(&config.base_url, transform)
}
