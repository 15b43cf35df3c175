//! Weather assistant backed by Open-Meteo, which needs no API key.

mod client;
mod codes;
pub mod tools;

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::Deserialize;
use thiserror::Error;

pub use client::{CurrentWeather, DailyForecast, Location, OpenMeteoClient};
pub use codes::{Conditions, describe};

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("location '{0}' not found")]
    LocationNotFound(String),
    #[error("weather service request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected weather service response: {0}")]
    UnexpectedResponse(String),
}

/// Unit system for temperatures and wind speeds.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Celsius and km/h.
    #[default]
    Metric,
    /// Fahrenheit and mph.
    Imperial,
}

impl Units {
    fn temperature_unit(self) -> &'static str {
        match self {
            Units::Metric => "celsius",
            Units::Imperial => "fahrenheit",
        }
    }

    fn wind_speed_unit(self) -> &'static str {
        match self {
            Units::Metric => "kmh",
            Units::Imperial => "mph",
        }
    }

    pub fn temperature_symbol(self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }

    pub fn speed_symbol(self) -> &'static str {
        match self {
            Units::Metric => "km/h",
            Units::Imperial => "mph",
        }
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            other => Err(format!("unknown units '{other}'")),
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        })
    }
}

pub fn format_current(
    location: &Location,
    weather: &CurrentWeather,
    units: Units,
) -> String {
    let t = units.temperature_symbol();
    let conditions = describe(weather.weather_code);
    format!(
        "Weather in {}:\n\
         - Temperature: {}{t}\n\
         - Feels like: {}{t}\n\
         - Conditions: {}\n\
         - Humidity: {}%\n\
         - Wind Speed: {} {}\n\
         - Cloud Coverage: {}%\n\
         - Precipitation: {} mm\n\
         - Last Updated: {}\n",
        location.display_name(),
        weather.temperature,
        weather.feels_like,
        capitalize(conditions.description),
        weather.humidity,
        weather.wind_speed,
        units.speed_symbol(),
        weather.clouds,
        weather.precipitation,
        weather.time,
    )
}

pub fn format_forecast(
    location: &Location,
    days: &[DailyForecast],
    units: Units,
) -> String {
    let t = units.temperature_symbol();
    let mut lines = vec![format!(
        "7-Day Weather Forecast for {}:\n",
        location.display_name()
    )];
    for day in days {
        let conditions = describe(day.weather_code);
        lines.push(format!(
            "{}: {} - {}, Temp: {:.1}-{:.1}{t}, Precipitation: {:.1}mm, \
             Rain chance: {:.0}%, Wind: {:.1} {}",
            day.date,
            conditions.main,
            conditions.description,
            day.temp_min,
            day.temp_max,
            day.precipitation,
            day.precipitation_probability,
            day.wind_speed,
            units.speed_symbol(),
        ));
    }
    lines.join("\n")
}

/// The free API has no alerts feed, so this is a fixed notice.
pub fn alerts_notice(location: &str) -> String {
    format!(
        "Weather alerts are not currently available for {location} in the \
         free API tier. No severe weather warnings detected through standard \
         monitoring."
    )
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
