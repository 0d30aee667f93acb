//! Current weather lookup via the Open-Meteo forecast API.

use rmcp::{
    handler::server::tool::schema_for_type,
    model::{CallToolResult, Content, Tool, ToolAnnotations},
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domains::tools::context::ToolContext;
use crate::domains::tools::error::ToolError;
use crate::domains::tools::registry::ToolDefinition;

/// Fields requested from the forecast API.
const CURRENT_FIELDS: &str = "temperature_2m,weather_code";

/// Parameters for the weather tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetWeatherParams {
    /// Latitude of the location.
    #[schemars(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    /// Longitude of the location.
    #[schemars(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

/// Weather tool - current conditions for a coordinate.
pub struct GetWeatherTool;

impl GetWeatherTool {
    pub const NAME: &'static str = "get_weather";

    pub const DESCRIPTION: &'static str =
        "Get the current temperature and weather code for a latitude/longitude.";

    #[instrument(skip_all, fields(lat = params.latitude, lon = params.longitude))]
    pub async fn execute(params: GetWeatherParams, ctx: &ToolContext) -> Result<CallToolResult, ToolError> {
        info!(
            "Getting weather for: {}, {}",
            params.latitude, params.longitude
        );

        let response = ctx
            .http
            .get(&ctx.weather_api_url)
            .query(&[
                ("latitude", params.latitude.to_string()),
                ("longitude", params.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!("Weather request failed: {}", e);
                ToolError::execution_failed(format!("Error fetching weather: {}", e))
            })?;

        let data: serde_json::Value = response.json().await.map_err(|e| {
            warn!("Weather response could not be decoded: {}", e);
            ToolError::execution_failed(format!("Error fetching weather: {}", e))
        })?;

        let text = serde_json::to_string_pretty(&data).map_err(|e| ToolError::internal(e.to_string()))?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: schema_for_type::<GetWeatherParams>().into(),
            annotations: Some(ToolAnnotations {
                title: Some("Get Weather Forecast".into()),
                read_only_hint: Some(true),
                destructive_hint: None,
                idempotent_hint: None,
                open_world_hint: Some(true),
            }),
            output_schema: None,
            icons: None,
            meta: None,
            title: Some("Get Weather Forecast".into()),
        }
    }

    pub fn definition(ctx: Arc<ToolContext>) -> Result<ToolDefinition, ToolError> {
        ToolDefinition::new(Self::to_tool(), move |params: GetWeatherParams| {
            let ctx = ctx.clone();
            async move { Self::execute(params, &ctx).await }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::documents::{ArtifactStore, Renderers};
    use crate::domains::tools::definitions::common::test_support::{fake_forecast_api, first_text};
    use crate::domains::tools::validation::InputSchema;
    use serde_json::json;

    fn context(url: String) -> ToolContext {
        ToolContext::new(ArtifactStore::new("exports", None, 3001), Renderers::default(), url).unwrap()
    }

    #[tokio::test]
    async fn test_fetches_current_weather() {
        let base = fake_forecast_api().await;
        let ctx = context(format!("{}/v1/forecast", base));

        let params = GetWeatherParams {
            latitude: 41.9,
            longitude: 12.5,
        };
        let result = GetWeatherTool::execute(params, &ctx).await.unwrap();
        assert!(!result.is_error.unwrap_or(false));

        let body: serde_json::Value = serde_json::from_str(first_text(&result)).unwrap();
        assert_eq!(body["latitude"], json!(41.9));
        assert_eq!(body["current"]["temperature_2m"], json!(21.5));
        assert_eq!(body["requested"], json!("temperature_2m,weather_code"));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_execution_error() {
        let base = fake_forecast_api().await;
        let ctx = context(format!("{}/broken/v1/forecast", base));

        let params = GetWeatherParams {
            latitude: 0.0,
            longitude: 0.0,
        };
        let err = GetWeatherTool::execute(params, &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed(ref m) if m.contains("Error fetching weather")));
    }

    #[test]
    fn test_schema_rejects_out_of_range_coordinates() {
        let tool = GetWeatherTool::to_tool();
        let schema = InputSchema::compile(GetWeatherTool::NAME, &tool.input_schema).unwrap();
        let violations = schema
            .validate(&json!({ "latitude": 95.0, "longitude": 10.0 }))
            .unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "latitude");

        assert!(schema.validate(&json!({ "latitude": -90, "longitude": 180 })).is_ok());
    }
}
