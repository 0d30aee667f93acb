//! Helpers shared by the tool definitions.

use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::Serialize;

use crate::domains::documents::Artifact;

/// Structured output of the document tools.
#[derive(Debug, Serialize, JsonSchema)]
pub struct GeneratedFile {
    /// Stored file name, prefixed with a random token.
    pub filename: String,
    /// Absolute URL the file can be downloaded from.
    pub download_url: String,
}

/// Success result for a generated file: a human-readable message plus
/// [`GeneratedFile`] as structured content.
pub fn artifact_result(message: String, artifact: &Artifact) -> CallToolResult {
    let output = GeneratedFile {
        filename: artifact.filename.clone(),
        download_url: artifact.download_url.clone(),
    };
    CallToolResult {
        content: vec![Content::text(message)],
        structured_content: serde_json::to_value(&output).ok(),
        is_error: Some(false),
        meta: None,
    }
}
