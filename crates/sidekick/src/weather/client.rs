use std::time::Duration;

use serde::Deserialize;

use super::{Units, WeatherError};

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const TIMEOUT: Duration = Duration::from_secs(10);
const FORECAST_DAYS: usize = 7;

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,\
precipitation,weather_code,cloud_cover,wind_speed_10m,wind_direction_10m";
const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,\
apparent_temperature_max,apparent_temperature_min,precipitation_sum,\
precipitation_probability_max,weather_code,wind_speed_10m_max";

/// A geocoded place.
#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    pub name: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}

impl Location {
    /// `"Paris, France"`, or just the name when the country is unknown.
    pub fn display_name(&self) -> String {
        if self.country.is_empty() {
            self.name.clone()
        } else {
            format!("{}, {}", self.name, self.country)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CurrentWeather {
    pub time: String,
    #[serde(rename = "temperature_2m")]
    pub temperature: f64,
    #[serde(rename = "apparent_temperature")]
    pub feels_like: f64,
    #[serde(rename = "relative_humidity_2m")]
    pub humidity: f64,
    #[serde(default)]
    pub precipitation: f64,
    #[serde(default)]
    pub weather_code: i64,
    #[serde(rename = "cloud_cover")]
    pub clouds: f64,
    #[serde(rename = "wind_speed_10m")]
    pub wind_speed: f64,
    #[serde(rename = "wind_direction_10m")]
    pub wind_direction: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DailyForecast {
    pub date: String,
    pub temp_max: f64,
    pub temp_min: f64,
    pub feels_like_max: f64,
    pub feels_like_min: f64,
    pub weather_code: i64,
    pub precipitation: f64,
    pub precipitation_probability: f64,
    pub wind_speed: f64,
}

#[derive(Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    country: String,
    timezone: Option<String>,
}

#[derive(Deserialize)]
struct CurrentResponse {
    current: CurrentWeather,
}

#[derive(Deserialize)]
struct DailyResponse {
    daily: DailySeries,
}

/// Open-Meteo returns daily values as parallel arrays. Values can be
/// `null` for days the model does not cover.
#[derive(Deserialize)]
struct DailySeries {
    time: Vec<String>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    apparent_temperature_max: Vec<Option<f64>>,
    apparent_temperature_min: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_probability_max: Vec<Option<f64>>,
    weather_code: Vec<Option<i64>>,
    wind_speed_10m_max: Vec<Option<f64>>,
}

impl DailySeries {
    fn into_forecasts(self) -> Result<Vec<DailyForecast>, WeatherError> {
        let days = self.time.len();
        let series = [
            ("temperature_2m_max", self.temperature_2m_max.len()),
            ("temperature_2m_min", self.temperature_2m_min.len()),
            ("apparent_temperature_max", self.apparent_temperature_max.len()),
            ("apparent_temperature_min", self.apparent_temperature_min.len()),
            ("precipitation_sum", self.precipitation_sum.len()),
            ("weather_code", self.weather_code.len()),
            ("wind_speed_10m_max", self.wind_speed_10m_max.len()),
        ];
        if let Some((name, _)) = series.iter().find(|(_, len)| *len != days) {
            return Err(WeatherError::UnexpectedResponse(format!(
                "daily series `{name}` does not have {days} values"
            )));
        }

        fn value(series: &[Option<f64>], i: usize) -> f64 {
            series.get(i).copied().flatten().unwrap_or(0.0)
        }
        Ok(self
            .time
            .iter()
            .enumerate()
            .take(FORECAST_DAYS)
            .map(|(i, date)| DailyForecast {
                date: date.clone(),
                temp_max: value(&self.temperature_2m_max, i),
                temp_min: value(&self.temperature_2m_min, i),
                feels_like_max: value(&self.apparent_temperature_max, i),
                feels_like_min: value(&self.apparent_temperature_min, i),
                weather_code: self.weather_code[i].unwrap_or(-1),
                precipitation: value(&self.precipitation_sum, i),
                precipitation_probability: value(
                    &self.precipitation_probability_max,
                    i,
                ),
                wind_speed: value(&self.wind_speed_10m_max, i),
            })
            .collect())
    }
}

/// Client for the free Open-Meteo geocoding and forecast APIs.
#[derive(Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
}

impl OpenMeteoClient {
    pub fn new() -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder().timeout(TIMEOUT).build()?;
        Ok(Self { client })
    }

    pub async fn locate(&self, name: &str) -> Result<Location, WeatherError> {
        let body = self
            .client
            .get(GEOCODING_URL)
            .query(&[
                ("name", name),
                ("count", "1"),
                ("language", "en"),
                ("format", "json"),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_location(name, &body)
    }

    pub async fn current(
        &self,
        location: &Location,
        units: Units,
    ) -> Result<CurrentWeather, WeatherError> {
        let body = self
            .forecast_request(location, units)
            .query(&[("current", CURRENT_FIELDS)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let response: CurrentResponse = parse_json(&body)?;
        Ok(response.current)
    }

    pub async fn forecast(
        &self,
        location: &Location,
        units: Units,
    ) -> Result<Vec<DailyForecast>, WeatherError> {
        let days = FORECAST_DAYS.to_string();
        let body = self
            .forecast_request(location, units)
            .query(&[("daily", DAILY_FIELDS), ("forecast_days", days.as_str())])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_forecast(&body)
    }

    fn forecast_request(
        &self,
        location: &Location,
        units: Units,
    ) -> reqwest::RequestBuilder {
        self.client.get(FORECAST_URL).query(&[
            ("latitude", location.latitude.to_string()),
            ("longitude", location.longitude.to_string()),
            ("temperature_unit", units.temperature_unit().to_owned()),
            ("wind_speed_unit", units.wind_speed_unit().to_owned()),
            ("timezone", location.timezone.clone()),
        ])
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(
    body: &str,
) -> Result<T, WeatherError> {
    serde_json::from_str(body)
        .map_err(|err| WeatherError::UnexpectedResponse(err.to_string()))
}

fn parse_location(query: &str, body: &str) -> Result<Location, WeatherError> {
    let response: GeocodingResponse = parse_json(body)?;
    let first = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::LocationNotFound(query.to_owned()))?;
    Ok(Location {
        name: first.name,
        country: first.country,
        latitude: first.latitude,
        longitude: first.longitude,
        timezone: first.timezone.unwrap_or_else(|| "UTC".to_owned()),
    })
}

fn parse_forecast(body: &str) -> Result<Vec<DailyForecast>, WeatherError> {
    let response: DailyResponse = parse_json(body)?;
    response.daily.into_forecasts()
}
