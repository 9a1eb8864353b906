//! Core library for the weather hub.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather client and its request hook
//! - The saved-cities store and the location source
//! - `WeatherService`, which turns all of the above into observable envelopes
//!
//! It is used by `weather-cli`, but can also be reused by other front-ends.

pub mod config;
pub mod envelope;
pub mod error;
pub mod location;
pub mod model;
pub mod provider;
pub mod service;
pub mod store;

pub use config::{Config, LocationConfig};
pub use envelope::{Envelope, Observable};
pub use error::WeatherError;
pub use location::{ConfiguredLocation, LocationProvider, LocationSource};
pub use model::{City, CityUpdate, ForecastSet, LocationData, WeatherSnapshot};
pub use provider::{Units, WeatherSource};
pub use service::WeatherService;
pub use store::{CityRepository, SqliteCityStore};
