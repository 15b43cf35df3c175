use std::sync::Arc;

use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use sidekick_core::tool::{Error as ToolError, Tool, ToolRegistry, ToolResult};

use super::{
    OpenMeteoClient, Units, WeatherError, alerts_notice, format_current,
    format_forecast,
};

/// Registers the weather tools.
pub fn registry(client: OpenMeteoClient, default_units: Units) -> ToolRegistry {
    let client = Arc::new(client);
    ToolRegistry::new()
        .with_tool(CurrentWeatherTool::new(Arc::clone(&client), default_units))
        .with_tool(ForecastTool::new(client, default_units))
        .with_tool(WeatherAlertsTool::new())
}

#[derive(Deserialize, JsonSchema)]
pub struct WeatherInput {
    #[schemars(description = "City name, e.g. \"London\" or \"New York\".")]
    location: String,
    #[schemars(description = "\"metric\" for Celsius or \"imperial\" for Fahrenheit.")]
    units: Option<Units>,
}

fn weather_error(err: WeatherError) -> ToolError {
    let base = match err {
        WeatherError::LocationNotFound(_) => ToolError::invalid_input(),
        _ => ToolError::execution_error(),
    };
    base.with_reason(err.to_string())
}

pub struct CurrentWeatherTool {
    client: Arc<OpenMeteoClient>,
    default_units: Units,
    parameter_schema: Value,
}

impl CurrentWeatherTool {
    pub fn new(client: Arc<OpenMeteoClient>, default_units: Units) -> Self {
        Self {
            client,
            default_units,
            parameter_schema: schema_for!(WeatherInput).to_value(),
        }
    }
}

impl Tool for CurrentWeatherTool {
    type Input = WeatherInput;

    fn name(&self) -> &str {
        "get_current_weather"
    }

    fn description(&self) -> &str {
        "Get current weather for a location: temperature, conditions, humidity, wind speed and more."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: WeatherInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = Arc::clone(&self.client);
        let units = input.units.unwrap_or(self.default_units);
        async move {
            let location =
                client.locate(&input.location).await.map_err(weather_error)?;
            let current = client
                .current(&location, units)
                .await
                .map_err(weather_error)?;
            Ok(format_current(&location, &current, units))
        }
    }
}

pub struct ForecastTool {
    client: Arc<OpenMeteoClient>,
    default_units: Units,
    parameter_schema: Value,
}

impl ForecastTool {
    pub fn new(client: Arc<OpenMeteoClient>, default_units: Units) -> Self {
        Self {
            client,
            default_units,
            parameter_schema: schema_for!(WeatherInput).to_value(),
        }
    }
}

impl Tool for ForecastTool {
    type Input = WeatherInput;

    fn name(&self) -> &str {
        "get_forecast"
    }

    fn description(&self) -> &str {
        "Get the 7-day forecast for a location: daily temperatures, conditions and precipitation."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: WeatherInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = Arc::clone(&self.client);
        let units = input.units.unwrap_or(self.default_units);
        async move {
            let location =
                client.locate(&input.location).await.map_err(weather_error)?;
            let days = client
                .forecast(&location, units)
                .await
                .map_err(weather_error)?;
            Ok(format_forecast(&location, &days, units))
        }
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct AlertsInput {
    #[schemars(description = "City name.")]
    location: String,
}

pub struct WeatherAlertsTool {
    parameter_schema: Value,
}

impl WeatherAlertsTool {
    pub fn new() -> Self {
        Self {
            parameter_schema: schema_for!(AlertsInput).to_value(),
        }
    }
}

impl Default for WeatherAlertsTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for WeatherAlertsTool {
    type Input = AlertsInput;

    fn name(&self) -> &str {
        "get_weather_alerts"
    }

    fn description(&self) -> &str {
        "Get weather alerts and warnings for a location."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: AlertsInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        async move { Ok(alerts_notice(&input.location)) }
    }
}
