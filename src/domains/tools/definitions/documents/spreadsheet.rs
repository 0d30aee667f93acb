//! Spreadsheet generation tool.
//!
//! Builds an Excel workbook from sheet descriptions and stores it in the
//! exports directory.

use rmcp::{
    handler::server::tool::schema_for_type,
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domains::documents::{HeaderStyle, SheetSpec, SpreadsheetDocument};
use crate::domains::tools::context::ToolContext;
use crate::domains::tools::definitions::common::{GeneratedFile, artifact_result};
use crate::domains::tools::error::ToolError;
use crate::domains::tools::registry::ToolDefinition;

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the spreadsheet tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GenerateSpreadsheetParams {
    /// Name for the file (without extension).
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Worksheets to create, in order.
    pub sheets: Vec<SheetSpec>,
}

fn default_filename() -> String {
    "spreadsheet".to_string()
}

impl GenerateSpreadsheetParams {
    /// Split into the requested file name and the workbook to render.
    pub fn into_document(self, header_style: HeaderStyle) -> (String, SpreadsheetDocument) {
        (
            self.filename,
            SpreadsheetDocument {
                sheets: self.sheets,
                header_style,
            },
        )
    }
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Spreadsheet tool - generates `.xlsx` workbooks.
pub struct GenerateSpreadsheetTool;

impl GenerateSpreadsheetTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "generate_spreadsheet";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Generate an Excel spreadsheet (.xlsx) with multiple sheets, data, and styling. Returns a download link.";

    /// Execute the tool logic.
    #[instrument(skip_all, fields(filename = %params.filename))]
    pub async fn execute(
        params: GenerateSpreadsheetParams,
        ctx: &ToolContext,
    ) -> Result<CallToolResult, ToolError> {
        info!(
            "Spreadsheet tool called: '{}' ({} sheet(s))",
            params.filename,
            params.sheets.len()
        );

        let (filename, document) = params.into_document(HeaderStyle::Plain);
        let artifact = ctx
            .artifacts
            .render_and_store(ctx.renderers.spreadsheet.clone(), document, &filename)
            .await
            .map_err(|e| {
                warn!("Spreadsheet generation failed: {}", e);
                ToolError::execution_failed(format!("Failed to generate spreadsheet: {}", e))
            })?;

        Ok(artifact_result(
            format!(
                "Spreadsheet generated successfully!\nDownload link: {}",
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
            input_schema: schema_for_type::<GenerateSpreadsheetParams>().into(),
            annotations: None,
            output_schema: Some(schema_for_type::<GeneratedFile>().into()),
            icons: None,
            meta: None,
            title: None,
        }
    }

    /// Bind the tool to the shared context.
    pub fn definition(ctx: Arc<ToolContext>) -> Result<ToolDefinition, ToolError> {
        ToolDefinition::new(Self::to_tool(), move |params: GenerateSpreadsheetParams| {
            let ctx = ctx.clone();
            async move { Self::execute(params, &ctx).await }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
