//! Human-friendly formatting of fetched payloads.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use weather_core::{City, ForecastSet, Units, WeatherSnapshot};

pub fn snapshot(snapshot: &WeatherSnapshot, units: Units) -> String {
    let t = units.temperature_suffix();
    let condition = snapshot
        .condition()
        .map(|c| c.description.clone())
        .unwrap_or_else(|| "Unknown".to_string());
    let place = match &snapshot.sys.country {
        Some(country) => format!("{}, {country}", snapshot.name),
        None => snapshot.name.clone(),
    };
    let observed = snapshot
        .observed_at()
        .map(|dt| local(dt, snapshot.timezone).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut out = format!("{place} (city id {})\n", snapshot.id);
    out.push_str(&format!("  {condition}, observed {observed}\n"));
    out.push_str(&format!(
        "  Temperature: {:.1}{t} (feels like {:.1}{t}, min {:.1}{t}, max {:.1}{t})\n",
        snapshot.main.temp,
        snapshot.main.feels_like,
        snapshot.main.temp_min,
        snapshot.main.temp_max
    ));
    out.push_str(&format!(
        "  Humidity: {}%  Pressure: {} hPa  Clouds: {}%\n",
        snapshot.main.humidity, snapshot.main.pressure, snapshot.clouds.all
    ));
    out.push_str(&format!(
        "  Wind: {:.1} {} from {}°",
        snapshot.wind.speed,
        units.speed_suffix(),
        snapshot.wind.deg
    ));
    out
}

pub fn forecast(forecast: &ForecastSet, units: Units) -> String {
    let t = units.temperature_suffix();
    let mut out = format!(
        "Forecast for {:.2}, {:.2} ({})\n",
        forecast.lat, forecast.lon, forecast.timezone
    );

    if forecast.daily.is_empty() {
        out.push_str("  No daily entries returned.");
        return out;
    }

    for day in &forecast.daily {
        let date = day
            .date()
            .map(|dt| local(dt, forecast.timezone_offset).format("%a %d %b").to_string())
            .unwrap_or_else(|| "-".to_string());
        let condition = day.condition().map(|c| c.description.as_str()).unwrap_or("Unknown");
        out.push_str(&format!(
            "  {date}: {condition}, {:.0}{t} / {:.0}{t}, feels like {:.0}{t}, ",
            day.temp.max, day.temp.min, day.feels_like.day,
        ));
        out.push_str(&format!(
            "humidity {}%, wind {:.1} {}\n",
            day.humidity,
            day.wind_speed,
            units.speed_suffix(),
        ));
    }

    out.trim_end().to_string()
}

pub fn cities(cities: &[City]) -> String {
    if cities.is_empty() {
        return "No cities found.".to_string();
    }

    cities
        .iter()
        .map(|city| {
            let mark = if city.saved == Some(true) { "*" } else { " " };
            format!("{mark} {:>8}  {}", city.id, city.name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn local(dt: DateTime<Utc>, offset_secs: i64) -> DateTime<FixedOffset> {
    let offset = i32::try_from(offset_secs)
        .ok()
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix());
    dt.with_timezone(&offset)
}
