use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the `city_bd` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct City {
    pub id: i64,
    pub name: String,
    /// Tri-state: `None` until the user first touches the city.
    pub saved: Option<bool>,
}

/// Partial patch for a single city, keyed by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CityUpdate {
    pub id: i64,
    pub saved: Option<bool>,
}

impl CityUpdate {
    pub fn saved(id: i64) -> Self {
        Self {
            id,
            saved: Some(true),
        }
    }

    pub fn unsaved(id: i64) -> Self {
        Self {
            id,
            saved: Some(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationData {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Coordinates in the string form the remote client expects.
    pub fn query_pair(&self) -> (String, String) {
        (self.latitude.to_string(), self.longitude.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: i64,
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: i64,
    pub humidity: u8,
    #[serde(default)]
    pub sea_level: Option<i64>,
    #[serde(default)]
    pub grnd_level: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    #[serde(default)]
    pub deg: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clouds {
    pub all: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sys {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub sunrise: i64,
    #[serde(default)]
    pub sunset: i64,
}

/// Current conditions as returned by the `weather` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub coord: Coord,
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub base: Option<String>,
    pub main: MainReadings,
    #[serde(default)]
    pub visibility: Option<i64>,
    pub wind: Wind,
    pub clouds: Clouds,
    pub dt: i64,
    pub sys: Sys,
    #[serde(default)]
    pub timezone: i64,
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub cod: i64,
}

impl WeatherSnapshot {
    pub fn condition(&self) -> Option<&Condition> {
        self.weather.first()
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        unix_to_utc(self.dt)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTemperature {
    pub day: f64,
    pub min: f64,
    pub max: f64,
    pub night: f64,
    pub eve: f64,
    pub morn: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeelsLike {
    pub day: f64,
    pub night: f64,
    pub eve: f64,
    pub morn: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub dt: i64,
    pub sunrise: i64,
    pub sunset: i64,
    pub temp: DailyTemperature,
    pub feels_like: FeelsLike,
    pub pressure: i64,
    pub humidity: u8,
    #[serde(default)]
    pub dew_point: f64,
    pub wind_speed: f64,
    #[serde(default)]
    pub wind_deg: i64,
    pub weather: Vec<Condition>,
    pub clouds: u8,
    #[serde(default)]
    pub pop: f64,
    #[serde(default)]
    pub rain: Option<f64>,
    #[serde(default)]
    pub uvi: f64,
}

impl DailyForecast {
    pub fn condition(&self) -> Option<&Condition> {
        self.weather.first()
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        unix_to_utc(self.dt)
    }
}

/// Multi-day forecast as returned by the `onecall` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSet {
    pub lat: f64,
    pub lon: f64,
    pub timezone: String,
    #[serde(default)]
    pub timezone_offset: i64,
    #[serde(default)]
    pub daily: Vec<DailyForecast>,
}

pub(crate) fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_renders_query_strings() {
        let (lat, lon) = LocationData::new(10.0, 20.5).query_pair();
        assert_eq!(lat, "10");
        assert_eq!(lon, "20.5");
    }

    #[test]
    fn city_update_helpers() {
        let saved = CityUpdate::saved(7);
        assert_eq!((saved.id, saved.saved), (7, Some(true)));

        let unsaved = CityUpdate::unsaved(7);
        assert_eq!((unsaved.id, unsaved.saved), (7, Some(false)));
    }

    #[test]
    fn unix_timestamps_convert_to_utc() {
        let dt = unix_to_utc(1_638_422_400).expect("valid timestamp");
        assert_eq!(dt.to_rfc3339(), "2021-12-02T05:20:00+00:00");
    }
}
