//! Weather lookup backed by a forecast table

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::protocol::ToolDefinition;
use crate::server::{ProviderFault, ToolProvider};
use crate::types::ContentBlock;

pub const TOOL_NAME: &str = "get-weather";

/// One city's forecast
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub condition: String,
    pub high_c: i32,
    pub low_c: i32,
}

impl Forecast {
    pub fn new(condition: impl Into<String>, high_c: i32, low_c: i32) -> Self {
        Self {
            condition: condition.into(),
            high_c,
            low_c,
        }
    }
}

/// Answers `get-weather` for the cities in its table.
///
/// Lookups ignore case; the reply uses the city name as stored.
#[derive(Debug, Clone, Default)]
pub struct WeatherProvider {
    forecasts: HashMap<String, (String, Forecast)>,
}

impl WeatherProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table covering the cities used by the sample questions
    pub fn demo() -> Self {
        Self::new()
            .with_forecast("Tokyo", Forecast::new("cloudy", 22, 15))
            .with_forecast("Osaka", Forecast::new("sunny", 24, 16))
            .with_forecast("Aomori", Forecast::new("light rain", 14, 7))
            .with_forecast("Chiba", Forecast::new("sunny with a light breeze", 21, 14))
            .with_forecast("Sapporo", Forecast::new("snow", 2, -5))
    }

    pub fn with_forecast(mut self, city: impl Into<String>, forecast: Forecast) -> Self {
        let city = city.into();
        self.forecasts
            .insert(city.to_lowercase(), (city, forecast));
        self
    }

    fn report(&self, city: &str) -> Option<String> {
        self.forecasts.get(&city.trim().to_lowercase()).map(|(name, f)| {
            format!(
                "Weather in {}: {}, high {}°C, low {}°C",
                name, f.condition, f.high_c, f.low_c
            )
        })
    }
}

#[async_trait]
impl ToolProvider for WeatherProvider {
    fn name(&self) -> &str {
        "weather"
    }

    async fn list_tools(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition::new(
            TOOL_NAME,
            "Returns today's weather forecast for a city",
            json!({
                "type": "object",
                "properties": {
                    "city": {"type": "string", "description": "City name, e.g. Osaka"}
                },
                "required": ["city"],
                "additionalProperties": false
            }),
        )]
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Vec<ContentBlock>, ProviderFault> {
        if name != TOOL_NAME {
            return Err(ProviderFault::UnknownTool(name.to_string()));
        }

        let city = arguments
            .get("city")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderFault::execution("missing city"))?;

        self.report(city)
            .map(|text| vec![ContentBlock::text(text)])
            .ok_or_else(|| ProviderFault::execution(format!("No forecast available for {city}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city(name: &str) -> Map<String, Value> {
        let mut args = Map::new();
        args.insert("city".into(), Value::String(name.into()));
        args
    }

    #[tokio::test]
    async fn known_city_ignores_case() {
        let content = WeatherProvider::demo()
            .call_tool(TOOL_NAME, city("osaka"))
            .await
            .unwrap();
        assert_eq!(
            content[0].as_text(),
            Some("Weather in Osaka: sunny, high 24°C, low 16°C")
        );
    }

    #[tokio::test]
    async fn unknown_city_is_a_fault() {
        let err = WeatherProvider::demo()
            .call_tool(TOOL_NAME, city("Atlantis"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProviderFault::Execution("No forecast available for Atlantis".into())
        );
    }

    #[tokio::test]
    async fn schema_requires_city() {
        let tools = WeatherProvider::new().list_tools().await;
        assert_eq!(tools[0].input_schema["required"], json!(["city"]));
    }
}
