//! Weather tools backed by WeatherAPI.
//!
//! - `get_current_weather`: current conditions for a city
//! - `get_weather_forecast`: forecast for 1 to 3 days
//!
//! Raw API payloads are normalized into compact, stable shapes before being
//! handed back to the model.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::Error;
use crate::Result;
use super::Tool;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Forecast length bounds accepted by the API plan we target.
const MIN_FORECAST_DAYS: i64 = 1;
const MAX_FORECAST_DAYS: i64 = 3;

/// Location block shared by both responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub name: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub localtime: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub location: LocationInfo,
    pub temperature_c: Option<f64>,
    pub temperature_f: Option<f64>,
    pub feels_like_c: Option<f64>,
    pub feels_like_f: Option<f64>,
    pub humidity: Option<i64>,
    pub condition: Option<String>,
    pub wind_kph: Option<f64>,
    pub wind_mph: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: Option<String>,
    pub condition: Option<String>,
    pub max_temp_c: Option<f64>,
    pub min_temp_c: Option<f64>,
    pub max_temp_f: Option<f64>,
    pub min_temp_f: Option<f64>,
    pub avg_humidity: Option<f64>,
    pub chance_of_rain: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub location: LocationInfo,
    pub days: Vec<ForecastDay>,
}

/// Thin WeatherAPI HTTP client shared by the weather tools.
#[derive(Clone)]
pub struct WeatherApi {
    api_key: String,
    base_url: String,
    client: Client,
}

impl WeatherApi {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Tool(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// GET `<base>/<endpoint>` with the API key attached.
    pub async fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        if self.api_key.is_empty() {
            return Err(Error::Tool("WEATHERAPI_KEY is not set.".to_string()));
        }

        let url = format!("{}/{}", self.base_url, endpoint);
        // Only the caller's params are logged; the key is added afterwards.
        info!(%url, params = ?params, "WeatherAPI request");

        let mut query: Vec<(&str, String)> = vec![("key", self.api_key.clone())];
        query.extend(params.iter().cloned());

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::Tool(format!("Weather API request failed: {e}")))?;

        let status = response.status();
        info!(status = status.as_u16(), "WeatherAPI response");

        let body = response
            .text()
            .await
            .map_err(|e| Error::Tool(format!("Weather API request failed: {e}")))?;

        if status != StatusCode::OK {
            let message = api_error_message(&body);
            return Err(Error::Tool(format!(
                "Weather API error ({}): {}",
                status.as_u16(),
                message
            )));
        }

        serde_json::from_str(&body)
            .map_err(|_| Error::Tool("Weather API returned non-JSON response".to_string()))
    }
}

/// Pull the most useful error text out of a failed WeatherAPI response.
fn api_error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|payload| {
        payload
            .pointer("/error/message")
            .and_then(Value::as_str)
            .or_else(|| payload.get("message").and_then(Value::as_str))
            .map(str::to_string)
    });

    match from_json {
        Some(message) if !message.is_empty() => message,
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => "Unknown error".to_string(),
    }
}

fn str_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

fn f64_at(value: &Value, pointer: &str) -> Option<f64> {
    value.pointer(pointer).and_then(Value::as_f64)
}

fn i64_at(value: &Value, pointer: &str) -> Option<i64> {
    let v = value.pointer(pointer)?;
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
}

fn normalize_location(data: &Value) -> LocationInfo {
    LocationInfo {
        name: str_at(data, "/location/name"),
        region: str_at(data, "/location/region"),
        country: str_at(data, "/location/country"),
        localtime: str_at(data, "/location/localtime"),
    }
}

/// Normalize a `current.json` payload.
pub fn normalize_current(data: &Value) -> CurrentWeather {
    CurrentWeather {
        location: normalize_location(data),
        temperature_c: f64_at(data, "/current/temp_c"),
        temperature_f: f64_at(data, "/current/temp_f"),
        feels_like_c: f64_at(data, "/current/feelslike_c"),
        feels_like_f: f64_at(data, "/current/feelslike_f"),
        humidity: i64_at(data, "/current/humidity"),
        condition: str_at(data, "/current/condition/text"),
        wind_kph: f64_at(data, "/current/wind_kph"),
        wind_mph: f64_at(data, "/current/wind_mph"),
    }
}

/// Normalize a `forecast.json` payload.
pub fn normalize_forecast(data: &Value) -> Forecast {
    let days = data
        .pointer("/forecast/forecastday")
        .and_then(Value::as_array)
        .map(|days| {
            days.iter()
                .map(|day| ForecastDay {
                    date: str_at(day, "/date"),
                    condition: str_at(day, "/day/condition/text"),
                    max_temp_c: f64_at(day, "/day/maxtemp_c"),
                    min_temp_c: f64_at(day, "/day/mintemp_c"),
                    max_temp_f: f64_at(day, "/day/maxtemp_f"),
                    min_temp_f: f64_at(day, "/day/mintemp_f"),
                    avg_humidity: f64_at(day, "/day/avghumidity"),
                    chance_of_rain: i64_at(day, "/day/daily_chance_of_rain"),
                })
                .collect()
        })
        .unwrap_or_default();

    Forecast {
        location: normalize_location(data),
        days,
    }
}

/// Clamp the requested number of forecast days into the supported range.
///
/// Accepts integers, floats and numeric strings; anything else means the default.
pub fn clamp_days(days: Option<&Value>) -> i64 {
    let requested = match days {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    requested
        .unwrap_or(MAX_FORECAST_DAYS)
        .clamp(MIN_FORECAST_DAYS, MAX_FORECAST_DAYS)
}

fn required_location(params: &Value) -> Result<String> {
    params
        .get("location")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::Tool("Missing 'location' parameter".to_string()))
}

fn location_schema() -> Value {
    json!({
        "type": "string",
        "description": "City name, e.g. Boston, MA"
    })
}

/// Current weather tool
pub struct WeatherTool {
    api: WeatherApi,
}

impl WeatherTool {
    pub fn new(api: WeatherApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str { "get_current_weather" }
    fn description(&self) -> &str { "Get the current weather for a city." }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": location_schema()
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let location = required_location(&params)?;
        info!(%location, "Current weather requested");

        let data = self
            .api
            .request("current.json", &[("q", location), ("aqi", "no".to_string())])
            .await?;

        let normalized = normalize_current(&data);
        debug!(condition = ?normalized.condition, "Current weather normalized");
        Ok(serde_json::to_value(normalized)?)
    }
}

/// Forecast tool (1-3 days)
pub struct ForecastTool {
    api: WeatherApi,
}

impl ForecastTool {
    pub fn new(api: WeatherApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for ForecastTool {
    fn name(&self) -> &str { "get_weather_forecast" }
    fn description(&self) -> &str { "Get a weather forecast for up to 3 days for a city." }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": location_schema(),
                "days": {
                    "type": "integer",
                    "description": "Number of days for forecast (1-3).",
                    "minimum": MIN_FORECAST_DAYS,
                    "maximum": MAX_FORECAST_DAYS
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let location = required_location(&params)?;
        let days = clamp_days(params.get("days"));
        info!(%location, days, "Forecast requested");

        let data = self
            .api
            .request(
                "forecast.json",
                &[
                    ("q", location),
                    ("days", days.to_string()),
                    ("aqi", "no".to_string()),
                    ("alerts", "no".to_string()),
                ],
            )
            .await?;

        let normalized = normalize_forecast(&data);
        debug!(days = normalized.days.len(), "Forecast normalized");
        Ok(serde_json::to_value(normalized)?)
    }
}
