//! Integration tests for `WeatherService` with in-process fakes.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{StreamExt, stream::BoxStream};
use serde_json::json;
use tokio::sync::broadcast;
use weather_core::{
    City, CityRepository, CityUpdate, ConfiguredLocation, Envelope, ForecastSet, LocationConfig,
    LocationData, LocationProvider, LocationSource, SqliteCityStore, WeatherError, WeatherService,
    WeatherSnapshot, WeatherSource,
    error::Result,
    store::SeedCity,
};

#[derive(Debug, Clone, Copy)]
enum Behaviour {
    Succeed,
    NetworkDown,
    Unauthorized,
}

#[derive(Debug)]
struct FakeWeather(Behaviour);

impl FakeWeather {
    fn fail<T>(&self) -> Result<T> {
        match self.0 {
            Behaviour::NetworkDown => Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )
            .into()),
            Behaviour::Unauthorized => Err(WeatherError::Http {
                status: reqwest::StatusCode::UNAUTHORIZED,
                body: "Invalid API key".into(),
            }),
            Behaviour::Succeed => unreachable!(),
        }
    }
}

#[async_trait]
impl WeatherSource for FakeWeather {
    async fn current_weather(&self, lat: &str, lon: &str) -> Result<WeatherSnapshot> {
        match self.0 {
            Behaviour::Succeed => Ok(snapshot(lat.parse().unwrap(), lon.parse().unwrap())),
            _ => self.fail(),
        }
    }

    async fn forecast(&self, lat: &str, lon: &str, _exclude: &str) -> Result<ForecastSet> {
        match self.0 {
            Behaviour::Succeed => Ok(forecast(lat.parse().unwrap(), lon.parse().unwrap())),
            _ => self.fail(),
        }
    }
}

#[derive(Debug)]
struct FixedLocation(Option<LocationData>);

#[async_trait]
impl LocationSource for FixedLocation {
    async fn current_location(&self) -> Result<LocationData> {
        self.0.ok_or_else(|| WeatherError::Location("Location error".into()))
    }
}

/// Repository whose every write fails.
#[derive(Debug)]
struct BrokenStore;

#[async_trait]
impl CityRepository for BrokenStore {
    async fn search(&self, _key: &str) -> Result<Vec<City>> {
        Err(sqlx::Error::PoolClosed.into())
    }

    async fn saved(&self, _saved: bool) -> Result<Vec<City>> {
        Err(sqlx::Error::PoolClosed.into())
    }

    fn watch_saved(&self, _saved: bool) -> BoxStream<'static, Result<Vec<City>>> {
        futures::stream::empty().boxed()
    }

    async fn update_saved(&self, _update: CityUpdate) -> Result<u64> {
        Err(sqlx::Error::PoolClosed.into())
    }

    async fn delete(&self, _city: &City) -> Result<u64> {
        Err(sqlx::Error::PoolClosed.into())
    }
}

fn snapshot(lat: f64, lon: f64) -> WeatherSnapshot {
    serde_json::from_value(json!({
        "coord": {"lat": lat, "lon": lon},
        "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
        "base": "stations",
        "main": {"temp": 25.0, "feels_like": 25.0, "temp_min": 20.0, "temp_max": 30.0,
                 "pressure": 1013, "humidity": 50, "sea_level": 0, "grnd_level": 0},
        "visibility": 10000,
        "wind": {"speed": 0.0, "deg": 0},
        "clouds": {"all": 0},
        "dt": 1234567890,
        "sys": {"country": "TC", "sunrise": 0, "sunset": 0},
        "timezone": 3600,
        "id": 1,
        "name": "Test City",
        "cod": 200
    }))
    .unwrap()
}

fn forecast(lat: f64, lon: f64) -> ForecastSet {
    serde_json::from_value(json!({
        "lat": lat,
        "lon": lon,
        "timezone": "Africa/Johannesburg",
        "timezone_offset": 0,
        "daily": [{
            "dt": 1638422400, "sunrise": 1638402000, "sunset": 1638445200,
            "temp": {"day": 21.0, "min": 15.0, "max": 22.0,
                     "night": 14.0, "eve": 19.0, "morn": 16.0},
            "feels_like": {"day": 20.0, "night": 14.0, "eve": 18.0, "morn": 16.0},
            "pressure": 1012, "humidity": 75, "dew_point": 15.5,
            "wind_speed": 5.0, "wind_deg": 180,
            "weather": [{"id": 800, "main": "Clear", "description": "Clear sky", "icon": "01d"}],
            "clouds": 10, "pop": 0.1, "rain": 0.0, "uvi": 3.0
        }]
    }))
    .unwrap()
}

async fn seeded_store() -> Arc<SqliteCityStore> {
    let store = SqliteCityStore::in_memory().await.unwrap();
    let cities = [(1, "Cape Town"), (2, "Cairo"), (3, "Casablanca")]
        .into_iter()
        .map(|(id, name)| SeedCity {
            id,
            name: name.into(),
        })
        .collect::<Vec<_>>();
    store.seed_if_empty(&cities).await.unwrap();
    Arc::new(store)
}

fn service_with(
    weather: Behaviour,
    location: Arc<dyn LocationSource>,
    cities: Arc<dyn CityRepository>,
) -> WeatherService {
    WeatherService::new(Arc::new(FakeWeather(weather)), location, cities)
}

async fn service(weather: Behaviour) -> WeatherService {
    service_with(weather, Arc::new(FixedLocation(None)), seeded_store().await)
}

fn drain<T: Clone>(rx: &mut broadcast::Receiver<T>) -> Vec<T> {
    let mut seen = Vec::new();
    while let Ok(value) = rx.try_recv() {
        seen.push(value);
    }
    seen
}

#[tokio::test]
async fn current_weather_success_is_loading_then_success() {
    let service = service(Behaviour::Succeed).await;
    let mut rx = service.current_weather().subscribe();

    service.fetch_current_weather("10.0", "20.0").await.unwrap();

    assert_eq!(
        drain(&mut rx),
        vec![Envelope::Loading, Envelope::Success(snapshot(10.0, 20.0))]
    );
    assert_eq!(service.current_weather().latest(), Some(Envelope::Success(snapshot(10.0, 20.0))));
}

#[tokio::test]
async fn current_weather_network_failure() {
    let service = service(Behaviour::NetworkDown).await;
    let mut rx = service.current_weather().subscribe();

    service.fetch_current_weather("10.0", "20.0").await.unwrap();

    assert_eq!(drain(&mut rx), vec![Envelope::Loading, Envelope::error(None, "Network Failure")]);
}

#[tokio::test]
async fn current_weather_http_error_carries_body() {
    let service = service(Behaviour::Unauthorized).await;
    let mut rx = service.current_weather().subscribe();

    service.fetch_current_weather("10.0", "20.0").await.unwrap();

    assert_eq!(
        drain(&mut rx),
        vec![Envelope::Loading, Envelope::error(None, "Error: Invalid API key")]
    );
}

#[tokio::test]
async fn forecast_success_is_loading_then_success() {
    let service = service(Behaviour::Succeed).await;
    let mut rx = service.forecast().subscribe();

    service.fetch_forecast("10.0", "20.0", "hourly,daily").await.unwrap();

    assert_eq!(drain(&mut rx), vec![Envelope::Loading, Envelope::Success(forecast(10.0, 20.0))]);
}

#[tokio::test]
async fn forecast_network_failure() {
    let service = service(Behaviour::NetworkDown).await;
    let mut rx = service.forecast().subscribe();
    let mut current = service.current_weather().subscribe();

    service.fetch_forecast("10.0", "20.0", "hourly,daily").await.unwrap();

    assert_eq!(drain(&mut rx), vec![Envelope::Loading, Envelope::error(None, "Network Failure")]);
    assert!(drain(&mut current).is_empty());
}

#[tokio::test]
async fn repeated_fetches_each_publish_their_own_states() {
    let service = service(Behaviour::Succeed).await;
    let mut rx = service.current_weather().subscribe();

    let first = service.fetch_current_weather("1.0", "2.0");
    let second = service.fetch_current_weather("3.0", "4.0");
    first.await.unwrap();
    second.await.unwrap();

    let seen = drain(&mut rx);
    assert_eq!(seen.len(), 4);
    assert!(seen[0].is_loading());
    assert_eq!(seen.iter().filter(|e| e.is_loading()).count(), 2);
    assert!(seen.contains(&Envelope::Success(snapshot(1.0, 2.0))));
    assert!(seen.contains(&Envelope::Success(snapshot(3.0, 4.0))));
}

#[tokio::test]
async fn location_success_goes_to_location_channel() {
    let data = LocationData::new(10.0, 20.0);
    let service =
        service_with(Behaviour::Succeed, Arc::new(FixedLocation(Some(data))), seeded_store().await);
    let mut ok = service.location().subscribe();
    let mut failed = service.location_failure().subscribe();

    service.fetch_current_location().await.unwrap();

    assert_eq!(drain(&mut ok), vec![data]);
    assert!(drain(&mut failed).is_empty());
}

#[tokio::test]
async fn location_failure_goes_to_failure_channel() {
    let service = service(Behaviour::Succeed).await;
    let mut ok = service.location().subscribe();
    let mut failed = service.location_failure().subscribe();

    service.fetch_current_location().await.unwrap();

    assert_eq!(drain(&mut failed), vec!["Location error".to_string()]);
    assert!(drain(&mut ok).is_empty());
}

#[tokio::test]
async fn permission_and_missing_fix_report_distinct_messages() {
    let denied = service_with(
        Behaviour::Succeed,
        Arc::new(LocationProvider::new(ConfiguredLocation::default())),
        seeded_store().await,
    );
    let no_fix = service_with(
        Behaviour::Succeed,
        Arc::new(LocationProvider::new(ConfiguredLocation::new(LocationConfig {
            enabled: true,
            ..LocationConfig::default()
        }))),
        seeded_store().await,
    );

    denied.fetch_current_location().await.unwrap();
    no_fix.fetch_current_location().await.unwrap();

    let denied_msg = denied.location_failure().latest().unwrap();
    let no_fix_msg = no_fix.location_failure().latest().unwrap();
    assert_eq!(denied_msg, "Location permission not granted");
    assert_eq!(no_fix_msg, "No location data available");
}

#[tokio::test]
async fn marked_city_shows_up_in_saved_cities() {
    let service = service(Behaviour::Succeed).await;
    let mut saved = service.saved_cities(true);
    assert!(saved.next().await.unwrap().unwrap().is_empty());

    service.mark_city_saved(2).await.unwrap();

    let rows = saved.next().await.unwrap().unwrap();
    assert_eq!(
        rows,
        vec![City {
            id: 2,
            name: "Cairo".into(),
            saved: Some(true),
        }]
    );
}

#[tokio::test]
async fn save_failures_are_not_surfaced() {
    let service = service_with(
        Behaviour::Succeed,
        Arc::new(FixedLocation(None)),
        Arc::new(BrokenStore),
    );
    let mut rx = service.current_weather().subscribe();

    service.mark_city_saved(7).await.unwrap();

    assert!(drain(&mut rx).is_empty());
    assert!(service.location_failure().latest().is_none());
}

#[tokio::test]
async fn search_errors_propagate() {
    let service = service_with(
        Behaviour::Succeed,
        Arc::new(FixedLocation(None)),
        Arc::new(BrokenStore),
    );

    let err = service.search_cities("Ca").await.unwrap_err();
    assert!(matches!(err, WeatherError::Storage(_)));
}

#[tokio::test]
async fn search_returns_prefix_matches() {
    let service = service(Behaviour::Succeed).await;

    let names: Vec<String> =
        service.search_cities("Ca").await.unwrap().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["Cairo", "Cape Town", "Casablanca"]);
    assert_eq!(service.search_cities("Cas").await.unwrap().len(), 1);
}
