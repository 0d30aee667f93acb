//! REST shortcut used by the companion UI.
//!
//! `POST /api/generate` takes the same body as the application's document tool
//! and answers with the download link directly instead of going through a
//! session.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::http::AppState;
use crate::core::config::RestShortcut;
use crate::domains::documents::{Artifact, HeaderStyle, RenderError};
use crate::domains::tools::definitions::{
    GeneratePdfReportParams, GeneratePdfReportTool, GenerateSpreadsheetParams,
    GenerateSpreadsheetTool,
};
use crate::domains::tools::{FieldViolation, ToolError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    success: bool,
    filename: String,
    download_url: String,
}

fn failure(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "success": false, "error": error.into() })),
    )
        .into_response()
}

/// Generate the application's document and return its download link.
#[instrument(skip_all)]
pub(super) async fn handle_generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let server = &state.server;
    let Some(shortcut) = server.profile().rest_shortcut() else {
        return failure(
            StatusCode::NOT_FOUND,
            format!("'{}' has no document generator", server.profile()),
        );
    };

    let input: Value = match serde_json::from_slice(&body) {
        Ok(input) => input,
        Err(e) => return failure(StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", e)),
    };

    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok());
    let base_url = server.artifacts().base_url_for_request(host, proto);

    let stored = match shortcut {
        RestShortcut::Spreadsheet => {
            let params: GenerateSpreadsheetParams =
                match decode(&state, GenerateSpreadsheetTool::NAME, input) {
                    Ok(params) => params,
                    Err(e) => return failure(StatusCode::BAD_REQUEST, e.to_string()),
                };
            info!("REST spreadsheet request: '{}'", params.filename);
            let (filename, document) = params.into_document(HeaderStyle::Branded);
            let renderer = server.context().renderers.spreadsheet.clone();
            server
                .artifacts()
                .render_and_store_at(renderer, document, &filename, &base_url)
                .await
        }
        RestShortcut::PdfReport => {
            let params: GeneratePdfReportParams =
                match decode(&state, GeneratePdfReportTool::NAME, input) {
                    Ok(params) => params,
                    Err(e) => return failure(StatusCode::BAD_REQUEST, e.to_string()),
                };
            info!("REST report request: '{}'", params.filename);
            let (filename, document) = params.into_document();
            let renderer = server.context().renderers.report.clone();
            server
                .artifacts()
                .render_and_store_at(renderer, document, &filename, &base_url)
                .await
        }
    };

    respond(stored)
}

/// Validate against the tool's schema, then decode.
fn decode<P: DeserializeOwned>(state: &AppState, tool: &str, input: Value) -> Result<P, ToolError> {
    let definition = state.server.executor().registry().lookup(tool)?;
    definition.validate(&input)?;
    serde_json::from_value(input)
        .map_err(|e| ToolError::validation(tool, vec![FieldViolation::new("", e.to_string())]))
}

fn respond(stored: Result<Artifact, RenderError>) -> Response {
    match stored {
        Ok(artifact) => Json(GenerateResponse {
            success: true,
            filename: artifact.filename,
            download_url: artifact.download_url,
        })
        .into_response(),
        Err(e) => {
            warn!("REST generation failed: {}", e);
            let status = match &e {
                RenderError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            failure(status, e.to_string())
        }
    }
}
