//! Tool Executor - validates input and runs tool handlers.
//!
//! Execution is split in two steps so the transport can report structural
//! problems synchronously while queueing the actual work:
//!
//! 1. [`ToolExecutor::prepare`] looks the tool up, validates the raw input
//!    against its schema and binds it to the handler. Unknown tools and
//!    invalid input fail here, before any handler code runs.
//! 2. [`PreparedCall::run`] drives the handler. Handler errors, panics and
//!    timeouts are turned into error-flagged `CallToolResult`s; this step
//!    never fails.

use futures::FutureExt;
use rmcp::model::{CallToolResult, Content};
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::error::ToolError;
use super::registry::{ToolFuture, ToolRegistry};

/// Default upper bound on a single handler run.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs tools from a read-only registry.
#[derive(Debug)]
pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolExecutor {
    /// Create an executor over a fully populated registry.
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Set the per-call handler timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Look up and validate a call without running it.
    pub fn prepare(&self, name: &str, raw_input: Value) -> Result<PreparedCall, ToolError> {
        let definition = self.registry.lookup(name).inspect_err(|_| {
            warn!("Unknown tool requested: {}", name);
        })?;

        // A call without arguments is treated as an empty object.
        let input = if raw_input.is_null() {
            Value::Object(Default::default())
        } else {
            raw_input
        };

        definition.validate(&input).inspect_err(|err| {
            warn!("{}", err);
        })?;

        let future = definition.bind(input)?;

        Ok(PreparedCall {
            tool_name: name.to_string(),
            future,
            timeout: self.timeout,
        })
    }

    /// Validate and run a call in one go.
    ///
    /// Only structural failures (unknown tool, invalid input) are returned as
    /// `Err`; anything that goes wrong inside the handler is reported through
    /// the result's `is_error` flag.
    pub async fn execute(&self, name: &str, raw_input: Value) -> Result<CallToolResult, ToolError> {
        Ok(self.prepare(name, raw_input)?.run().await)
    }
}

/// A validated call bound to its handler, ready to run.
pub struct PreparedCall {
    tool_name: String,
    future: ToolFuture,
    timeout: Duration,
}

impl PreparedCall {
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Run the handler, converting every failure into an error result.
    #[instrument(skip_all, fields(tool = %self.tool_name))]
    pub async fn run(self) -> CallToolResult {
        let guarded = AssertUnwindSafe(self.future).catch_unwind();

        match tokio::time::timeout(self.timeout, guarded).await {
            Ok(Ok(Ok(result))) => {
                info!(
                    "Tool '{}' finished (is_error: {})",
                    self.tool_name,
                    result.is_error.unwrap_or(false)
                );
                result
            }
            Ok(Ok(Err(e))) => {
                warn!("Tool '{}' failed: {}", self.tool_name, e);
                error_result(&e)
            }
            Ok(Err(panic)) => {
                let reason = panic_message(panic.as_ref());
                warn!("Tool '{}' panicked: {}", self.tool_name, reason);
                error_result(&ToolError::internal(format!("handler panicked: {}", reason)))
            }
            Err(_) => {
                warn!(
                    "Tool '{}' timed out after {:?}",
                    self.tool_name, self.timeout
                );
                error_result(&ToolError::Timeout)
            }
        }
    }
}

impl std::fmt::Debug for PreparedCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedCall")
            .field("tool_name", &self.tool_name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn error_result(err: &ToolError) -> CallToolResult {
    CallToolResult::error(vec![Content::text(format!("Error: {}", err))])
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
