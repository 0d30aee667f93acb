//! HTTP transport implementation.
//!
//! MCP over HTTP with server-sent events:
//!
//! - `GET /sse` opens a session. The first event (`endpoint`) tells the client
//!   where to post its messages; every answer arrives later as a `message`
//!   event on the same stream.
//! - `POST /messages?sessionId=<id>` accepts one JSON-RPC message and answers
//!   `202 Accepted` once it is queued on that session.
//!
//! Alongside the protocol endpoints the router serves the exports directory,
//! the REST generation shortcut, a health check and optionally a UI.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use std::convert::Infallible;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument, warn};

use super::config::HttpConfig;
use super::protocol::{CallToolParams, JsonRpcRequest, JsonRpcResponse};
use super::rest::handle_generate;
use super::session::{ChannelError, InvocationRequest, OutboundFrame, SessionId};
use super::{TransportError, TransportResult};
use crate::core::McpServer;
use crate::domains::documents::EXPORTS_ROUTE;

/// Path of the event stream endpoint.
pub const SSE_PATH: &str = "/sse";

/// Path clients post their messages to.
pub const MESSAGES_PATH: &str = "/messages";

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// The MCP server instance.
    pub(super) server: McpServer,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        self.config.address()
    }

    /// Run the HTTP transport until Ctrl-C or SIGTERM.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let addr = self.address();

        server
            .artifacts()
            .ensure_dir()
            .await
            .map_err(|e| TransportError::init(format!("exports directory: {}", e)))?;

        let sessions = server.sessions().clone();
        let app = router(server, self.config.enable_cors);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!("Ready - listening on {} (MCP over SSE, CORS {})", addr, cors_status);
        info!("  → Events:   GET {}", SSE_PATH);
        info!("  → Messages: POST {}?sessionId=<id>", MESSAGES_PATH);
        info!("  → Exports:  GET {}/<file>", EXPORTS_ROUTE);
        info!("  → Health:   GET /health");

        let shutdown_sessions = sessions.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                // Open streams never end by themselves; close them so the
                // server can drain.
                shutdown_sessions.close_all();
            })
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        sessions.close_all();
        Ok(())
    }
}

/// Build the router for `server`.
pub fn router(server: McpServer, enable_cors: bool) -> Router {
    let ui_dir = server.config().ui.dir.clone();
    let exports = ServeDir::new(server.artifacts().dir());
    let state = AppState { server };

    let mut app = Router::new()
        .route(SSE_PATH, get(handle_sse))
        .route(MESSAGES_PATH, post(handle_message))
        .route("/api/generate", post(handle_generate))
        .route("/health", get(health_check))
        .nest_service(EXPORTS_ROUTE, exports);

    app = match ui_dir {
        Some(dir) => {
            let index = dir.join("index.html");
            app.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)))
        }
        None => app.route("/", get(root_handler)),
    };

    let mut app = app.with_state(state).layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

/// Root handler - provides API info.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    let server = &state.server;
    Json(json!({
        "name": server.name(),
        "version": server.version(),
        "app": server.profile(),
        "transport": "SSE",
        "endpoints": {
            "sse": SSE_PATH,
            "messages": MESSAGES_PATH,
            "exports": EXPORTS_ROUTE,
            "health": "/health"
        },
        "protocol": "JSON-RPC 2.0",
        "tools": server.executor().registry().tool_names()
    }))
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

// ============================================================================
// Event stream
// ============================================================================

/// Open a session and stream its frames.
async fn handle_sse(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = state.server.sessions().open_session();
    info!("Client connected on session {}", stream.id());

    let events = stream.map(|frame| {
        let event = match frame {
            OutboundFrame::Endpoint(id) => Event::default()
                .event("endpoint")
                .data(format!("{}?sessionId={}", MESSAGES_PATH, id)),
            OutboundFrame::Message(message) => {
                debug!("Sending frame: {}", message);
                Event::default().event("message").data(message.to_string())
            }
        };
        Ok(event)
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

// ============================================================================
// Message endpoint
// ============================================================================

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Accept one JSON-RPC message for a session.
#[instrument(skip_all, fields(session, method))]
async fn handle_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Response {
    let Some(session) = query.session_id.map(SessionId::from) else {
        return session_not_found("missing sessionId");
    };
    tracing::Span::current().record("session", session.as_str());

    if !state.server.sessions().contains(&session) {
        warn!("Message for unknown session {}", session);
        return session_not_found(&format!("Session not found: {}", session));
    }

    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            return reject(
                &state,
                &session,
                JsonRpcResponse::parse_error(format!("Parse error: {}", e)),
            );
        }
    };

    let request: JsonRpcRequest = match serde_json::from_value(value.clone()) {
        Ok(request) => request,
        Err(e) => {
            let id = value.get("id").cloned().filter(|id| !id.is_null());
            return reject(
                &state,
                &session,
                JsonRpcResponse::invalid_request(id, format!("Invalid request: {}", e)),
            );
        }
    };

    tracing::Span::current().record("method", request.method.as_str());
    process_request(&state, &session, request)
}

/// Route a parsed message.
fn process_request(state: &AppState, session: &SessionId, request: JsonRpcRequest) -> Response {
    if request.jsonrpc != "2.0" {
        return reject(
            state,
            session,
            JsonRpcResponse::invalid_request(request.id, "Invalid Request: jsonrpc must be \"2.0\""),
        );
    }

    if request.is_notification() {
        handle_notification(&request);
        return accepted();
    }

    let server = &state.server;
    info!("Received JSON-RPC request: {}", request.method);

    match request.method.as_str() {
        "initialize" => {
            let requested = request
                .params
                .as_ref()
                .and_then(|p| p.get("protocolVersion"))
                .and_then(Value::as_str);
            let result = server.initialize_result(requested);
            deliver(state, session, JsonRpcResponse::success(request.id, result))
        }

        "ping" => deliver(state, session, JsonRpcResponse::success(request.id, json!({}))),

        "tools/list" => {
            let result = match serde_json::to_value(server.list_tools()) {
                Ok(tools) => JsonRpcResponse::success(request.id, json!({ "tools": tools })),
                Err(e) => JsonRpcResponse::internal_error(request.id, e.to_string()),
            };
            deliver(state, session, result)
        }

        "tools/call" => handle_tools_call(state, session, request),

        _ => {
            warn!("Unknown method: {}", request.method);
            reject(
                state,
                session,
                JsonRpcResponse::method_not_found(request.id, &request.method),
            )
        }
    }
}

/// Validate a tool call and queue it on the session.
fn handle_tools_call(state: &AppState, session: &SessionId, request: JsonRpcRequest) -> Response {
    let params: CallToolParams = match request
        .params
        .map(serde_json::from_value::<CallToolParams>)
        .transpose()
    {
        Ok(Some(params)) => params,
        Ok(None) => {
            return reject(
                state,
                session,
                JsonRpcResponse::invalid_params(request.id, "Missing params"),
            );
        }
        Err(e) => {
            return reject(
                state,
                session,
                JsonRpcResponse::invalid_params(request.id, format!("Invalid params: {}", e)),
            );
        }
    };

    info!("Calling tool '{}' on session {}", params.name, session);
    let invocation = InvocationRequest {
        request_id: request.id.clone(),
        tool_name: params.name,
        arguments: params.arguments.unwrap_or(Value::Null),
    };

    match state.server.sessions().dispatch(session, invocation) {
        Ok(()) => accepted(),
        Err(ChannelError::Tool(e)) => {
            reject(state, session, JsonRpcResponse::from_tool_error(request.id, &e))
        }
        Err(e) => channel_error(e),
    }
}

/// Notifications (no response).
fn handle_notification(request: &JsonRpcRequest) {
    match request.method.as_str() {
        "notifications/initialized" => info!("Client sent initialized notification"),
        method => debug!("Received notification: {}", method),
    }
}

/// Queue a response on the session and acknowledge the message.
fn deliver(state: &AppState, session: &SessionId, response: JsonRpcResponse) -> Response {
    match state.server.sessions().reply(session, response) {
        Ok(()) => accepted(),
        Err(e) => channel_error(e),
    }
}

/// Answer a structurally broken message with `400`, and also queue the error on
/// the stream so the client's pending request completes.
fn reject(state: &AppState, session: &SessionId, response: JsonRpcResponse) -> Response {
    if let Some(error) = &response.error {
        warn!("Rejected message on session {}: {}", session, error.message);
    }
    if let Err(e) = state.server.sessions().reply(session, response.clone()) {
        debug!("Could not queue error on session {}: {}", session, e);
    }
    (StatusCode::BAD_REQUEST, Json(response)).into_response()
}

fn accepted() -> Response {
    (StatusCode::ACCEPTED, "Accepted").into_response()
}

fn session_not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
}

fn channel_error(err: ChannelError) -> Response {
    match err {
        ChannelError::SessionNotFound(_) => session_not_found(&err.to_string()),
        ChannelError::QueueFull(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
        ChannelError::Tool(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
