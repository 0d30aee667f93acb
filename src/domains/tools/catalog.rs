//! Tool catalog - which tools each application registers.
//!
//! The registry is built once at startup for the selected profile and is
//! read-only afterwards.

use std::sync::Arc;

use tracing::info;

use crate::core::config::AppProfile;

use super::context::ToolContext;
use super::definitions::{
    GeneratePdfReportTool, GenerateSlidesTool, GenerateSpreadsheetTool, GetWeatherTool,
    SearchDestinationsTool,
};
use super::error::ToolError;
use super::registry::{ToolDefinition, ToolRegistry};

/// Definitions served by `profile`.
pub fn definitions_for(
    profile: AppProfile,
    ctx: Arc<ToolContext>,
) -> Result<Vec<ToolDefinition>, ToolError> {
    let definitions = match profile {
        AppProfile::Excellere => vec![GenerateSpreadsheetTool::definition(ctx)?],
        AppProfile::MyPdf => vec![
            GeneratePdfReportTool::definition(ctx.clone())?,
            GenerateSlidesTool::definition(ctx)?,
        ],
        AppProfile::Voyage => vec![
            SearchDestinationsTool::definition()?,
            GetWeatherTool::definition(ctx)?,
        ],
    };
    Ok(definitions)
}

/// Build the registry for `profile`.
pub fn build_registry(profile: AppProfile, ctx: Arc<ToolContext>) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    for definition in definitions_for(profile, ctx)? {
        registry.register(definition)?;
    }
    info!(
        "Registered {} tool(s) for '{}': {}",
        registry.len(),
        profile,
        registry.tool_names().join(", ")
    );
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::documents::{ArtifactStore, Renderers};
    use crate::domains::tools::ToolExecutor;
    use crate::domains::tools::definitions::common::test_support::fake_forecast_api;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    fn context(dir: &TempDir, weather_api_url: String) -> Arc<ToolContext> {
        let store = ArtifactStore::new(dir.path(), None, 3000);
        Arc::new(ToolContext::new(store, Renderers::default(), weather_api_url).unwrap())
    }

    fn minimal_input(tool: &str) -> Value {
        match tool {
            "generate_spreadsheet" => json!({ "sheets": [] }),
            "generate_pdf_report" => json!({ "title": "Q3", "sections": [] }),
            "generate_pptx_slides" => json!({ "title": "Kickoff", "slides": [] }),
            "search_destinations" => json!({ "query": "beach" }),
            "get_weather" => json!({ "latitude": 48.85, "longitude": 2.35 }),
            other => panic!("no minimal input for {}", other),
        }
    }

    #[test]
    fn test_profiles_register_expected_tools() {
        let dir = TempDir::new().unwrap();
        let names = |profile: AppProfile| {
            let ctx = context(&dir, "http://127.0.0.1:9/".into());
            build_registry(profile, ctx)
                .unwrap()
                .tool_names()
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        };

        assert_eq!(names(AppProfile::Excellere), vec!["generate_spreadsheet"]);
        assert_eq!(
            names(AppProfile::MyPdf),
            vec!["generate_pdf_report", "generate_pptx_slides"]
        );
        assert_eq!(
            names(AppProfile::Voyage),
            vec!["get_weather", "search_destinations"]
        );
    }

    #[tokio::test]
    async fn test_minimal_input_succeeds_for_every_tool() {
        let dir = TempDir::new().unwrap();
        let base = fake_forecast_api().await;
        let ctx = context(&dir, format!("{}/v1/forecast", base));

        for profile in AppProfile::ALL {
            let executor = ToolExecutor::new(build_registry(profile, ctx.clone()).unwrap());
            let names: Vec<String> = executor
                .registry()
                .tool_names()
                .into_iter()
                .map(String::from)
                .collect();

            for name in names {
                let result = assert_ok!(executor.execute(&name, minimal_input(&name)).await);
                assert_eq!(
                    result.is_error,
                    Some(false),
                    "{} returned an error result: {:?}",
                    name,
                    result.content
                );
            }
        }
    }

    #[tokio::test]
    async fn test_missing_required_field_is_rejected() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, "http://127.0.0.1:9/".into());
        let executor = ToolExecutor::new(build_registry(AppProfile::Excellere, ctx).unwrap());

        let err = assert_err!(
            executor
                .execute("generate_spreadsheet", json!({ "filename": "x" }))
                .await
        );
        assert!(matches!(err, ToolError::Validation { .. }));
        assert_eq!(err.violations()[0].path, "sheets");

        // Nothing was rendered.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_tools_of_other_profiles_are_unknown() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, "http://127.0.0.1:9/".into());
        let executor = ToolExecutor::new(build_registry(AppProfile::Voyage, ctx).unwrap());

        let err = assert_err!(
            executor
                .execute("generate_spreadsheet", json!({ "sheets": [] }))
                .await
        );
        assert!(matches!(err, ToolError::NotFound(_)));
    }
}
