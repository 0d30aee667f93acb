//! PDF report generation tool.

use rmcp::{
    handler::server::tool::schema_for_type,
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domains::documents::{ReportDocument, ReportSection};
use crate::domains::tools::context::ToolContext;
use crate::domains::tools::definitions::common::{GeneratedFile, artifact_result};
use crate::domains::tools::error::ToolError;
use crate::domains::tools::registry::ToolDefinition;

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the PDF report tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GeneratePdfReportParams {
    /// Main title of the report.
    pub title: String,

    /// Optional subtitle shown under the title.
    #[serde(default)]
    pub subtitle: Option<String>,

    /// Name for the file (without extension).
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Report sections, in order.
    pub sections: Vec<ReportSection>,
}

fn default_filename() -> String {
    "report".to_string()
}

impl GeneratePdfReportParams {
    /// Split into the requested file name and the report to render.
    pub fn into_document(self) -> (String, ReportDocument) {
        (
            self.filename,
            ReportDocument {
                title: self.title,
                subtitle: self.subtitle,
                sections: self.sections,
            },
        )
    }
}

// ============================================================================
// Tool Definition
// ============================================================================

/// PDF report tool - generates paginated `.pdf` reports.
pub struct GeneratePdfReportTool;

impl GeneratePdfReportTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "generate_pdf_report";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Generate a professional PDF report with a title, sections, bullet lists and tables. Returns a download link.";

    /// Execute the tool logic.
    #[instrument(skip_all, fields(title = %params.title))]
    pub async fn execute(
        params: GeneratePdfReportParams,
        ctx: &ToolContext,
    ) -> Result<CallToolResult, ToolError> {
        info!(
            "PDF report tool called: '{}' ({} section(s))",
            params.title,
            params.sections.len()
        );

        let (filename, document) = params.into_document();
        let artifact = ctx
            .artifacts
            .render_and_store(ctx.renderers.report.clone(), document, &filename)
            .await
            .map_err(|e| {
                warn!("PDF generation failed: {}", e);
                ToolError::execution_failed(format!("Failed to generate PDF: {}", e))
            })?;

        Ok(artifact_result(
            format!(
                "PDF report generated successfully!\nDownload link: {}",
                artifact.download_url
            ),
            &artifact,
        ))
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: schema_for_type::<GeneratePdfReportParams>().into(),
            annotations: None,
            output_schema: Some(schema_for_type::<GeneratedFile>().into()),
            icons: None,
            meta: None,
            title: None,
        }
    }

    /// Bind the tool to the shared context.
    pub fn definition(ctx: Arc<ToolContext>) -> Result<ToolDefinition, ToolError> {
        ToolDefinition::new(Self::to_tool(), move |params: GeneratePdfReportParams| {
            let ctx = ctx.clone();
            async move { Self::execute(params, &ctx).await }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::definitions::common::test_support::{context_in, first_text};
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_generate_report() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = context_in(temp_dir.path());

        let params: GeneratePdfReportParams = serde_json::from_value(json!({
            "title": "Annual Review",
            "subtitle": "2025",
            "sections": [
                { "heading": "Intro", "content": "Hello" },
                { "content": "Highlights", "type": "list", "data": ["a", "b"] }
            ]
        }))
        .unwrap();

        let result = GeneratePdfReportTool::execute(params, &ctx).await.unwrap();
        assert_eq!(result.is_error, Some(false));
        assert!(first_text(&result).contains("/exports/"));

        let structured = result.structured_content.unwrap();
        let filename = structured["filename"].as_str().unwrap();
        assert!(filename.ends_with("_report.pdf"));

        let bytes = std::fs::read(temp_dir.path().join(filename)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_section_type_defaults_to_text() {
        let params: GeneratePdfReportParams = serde_json::from_value(json!({
            "title": "T",
            "sections": [{ "content": "c" }]
        }))
        .unwrap();
        assert_eq!(params.filename, "report");
        assert_eq!(
            params.sections[0].kind,
            crate::domains::documents::SectionKind::Text
        );
    }
}
