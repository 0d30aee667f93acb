//! Slide deck generation tool.

use rmcp::{
    handler::server::tool::schema_for_type,
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domains::documents::{SlideDeck, SlideSpec};
use crate::domains::tools::context::ToolContext;
use crate::domains::tools::definitions::common::{GeneratedFile, artifact_result};
use crate::domains::tools::error::ToolError;
use crate::domains::tools::registry::ToolDefinition;

/// Parameters for the slides tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GenerateSlidesParams {
    /// Presentation title, shown on the opening slide.
    pub title: String,

    /// Name for the file (without extension).
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Content slides following the title slide.
    pub slides: Vec<SlideSpec>,
}

fn default_filename() -> String {
    "slides".to_string()
}

/// Slides tool - generates `.pptx` presentations.
pub struct GenerateSlidesTool;

impl GenerateSlidesTool {
    pub const NAME: &'static str = "generate_pptx_slides";

    pub const DESCRIPTION: &'static str = "Generate a PowerPoint presentation (.pptx) with a title slide, content slides and speaker notes. Returns a download link.";

    #[instrument(skip_all, fields(title = %params.title))]
    pub async fn execute(
        params: GenerateSlidesParams,
        ctx: &ToolContext,
    ) -> Result<CallToolResult, ToolError> {
        info!(
            "Slides tool called: '{}' ({} slide(s))",
            params.title,
            params.slides.len()
        );

        let deck = SlideDeck {
            title: params.title,
            slides: params.slides,
        };
        let artifact = ctx
            .artifacts
            .render_and_store(ctx.renderers.slides.clone(), deck, &params.filename)
            .await
            .map_err(|e| {
                warn!("Slide generation failed: {}", e);
                ToolError::execution_failed(format!("Failed to generate slides: {}", e))
            })?;

        Ok(artifact_result(
            format!(
                "Presentation generated successfully!\nDownload link: {}",
                artifact.download_url
            ),
            &artifact,
        ))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: schema_for_type::<GenerateSlidesParams>().into(),
            annotations: None,
            output_schema: Some(schema_for_type::<GeneratedFile>().into()),
            icons: None,
            meta: None,
            title: None,
        }
    }

    pub fn definition(ctx: Arc<ToolContext>) -> Result<ToolDefinition, ToolError> {
        ToolDefinition::new(Self::to_tool(), move |params: GenerateSlidesParams| {
            let ctx = ctx.clone();
            async move { Self::execute(params, &ctx).await }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::definitions::common::test_support::context_in;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_generate_slides() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = context_in(temp_dir.path());

        let params: GenerateSlidesParams = serde_json::from_value(json!({
            "title": "Kickoff",
            "filename": "kickoff.pptx",
            "slides": [{ "title": "Goals", "content": "Ship it", "notes": "Smile" }]
        }))
        .unwrap();

        let result = GenerateSlidesTool::execute(params, &ctx).await.unwrap();
        assert_eq!(result.is_error, Some(false));

        let structured = result.structured_content.unwrap();
        let filename = structured["filename"].as_str().unwrap();
        assert!(filename.ends_with("_kickoff.pptx"));
        assert!(!filename.ends_with(".pptx.pptx"));
        assert!(temp_dir.path().join(filename).exists());
    }
}
