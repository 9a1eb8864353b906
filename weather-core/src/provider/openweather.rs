use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::{
    error::{Result, WeatherError},
    model::{ForecastSet, WeatherSnapshot},
};

use super::{RequestTransform, WeatherSource};

/// `exclude` value used by the forecast screen: daily entries only.
pub const DAILY_ONLY: &str = "current,minutely,hourly";

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    base_url: String,
    http: Client,
    transform: Arc<dyn RequestTransform>,
}

impl OpenWeatherClient {
    pub fn new(base_url: &str, transform: Arc<dyn RequestTransform>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("weather-hub/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(http, base_url, transform))
    }

    pub fn with_client(http: Client, base_url: &str, transform: Arc<dyn RequestTransform>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            transform,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        what: &'static str,
    ) -> Result<T> {
        let url = format!("{}/{endpoint}", self.base_url);

        let mut request = self
            .http
            .get(&url)
            .query(query)
            .build()
            .map_err(|e| WeatherError::unknown(e.to_string()))?;
        self.transform.apply(&mut request);

        tracing::debug!(endpoint, "requesting OpenWeather {what}");

        let res = self
            .http
            .execute(request)
            .await
            .map_err(WeatherError::from_transport)?;

        let status = res.status();
        let body = res.text().await.map_err(WeatherError::from_body_read)?;

        if !status.is_success() {
            tracing::warn!(%status, endpoint, "OpenWeather {what} request failed");
            return Err(WeatherError::Http {
                status,
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| WeatherError::Decode { what, source })
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn current_weather(&self, lat: &str, lon: &str) -> Result<WeatherSnapshot> {
        self.get("weather", &[("lat", lat), ("lon", lon)], "current weather").await
    }

    async fn forecast(&self, lat: &str, lon: &str, exclude: &str) -> Result<ForecastSet> {
        self.get("onecall", &[("lat", lat), ("lon", lon), ("exclude", exclude)], "forecast")
            .await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
