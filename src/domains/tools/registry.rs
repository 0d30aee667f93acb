//! Tool Registry - central registration and lookup for all tools.
//!
//! This module provides:
//! - `ToolDefinition`: tool metadata (name, description, input schema) bound
//!   to a handler
//! - `ToolRegistry`: the set of definitions, filled once at startup and
//!   read-only afterwards

use futures::FutureExt;
use futures::future::BoxFuture;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::{FieldViolation, ToolError};
use super::validation::InputSchema;

/// Future returned by a bound tool handler.
pub type ToolFuture = BoxFuture<'static, Result<CallToolResult, ToolError>>;

/// Decodes validated input into the handler's parameter type and binds it.
///
/// Binding never runs handler code: the returned future does nothing until
/// polled, so a decode failure cannot leave side effects behind.
type BindFn = dyn Fn(Value) -> Result<ToolFuture, ToolError> + Send + Sync;

// ============================================================================
// Tool Definition
// ============================================================================

/// A registered tool: metadata plus the handler that implements it.
#[derive(Clone)]
pub struct ToolDefinition {
    tool: Tool,
    schema: Arc<InputSchema>,
    bind: Arc<BindFn>,
}

impl ToolDefinition {
    /// Create a definition from tool metadata and a typed async handler.
    ///
    /// The input schema is compiled here; a schema that does not compile is
    /// an error. The handler receives input that already passed validation,
    /// decoded into `P` (so serde defaults for optional fields apply).
    pub fn new<P, F, Fut>(tool: Tool, handler: F) -> Result<Self, ToolError>
    where
        P: DeserializeOwned + Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallToolResult, ToolError>> + Send + 'static,
    {
        let name = tool.name.to_string();
        let schema = InputSchema::compile(&name, &tool.input_schema)?;
        let bind = move |input: Value| -> Result<ToolFuture, ToolError> {
            let params: P = serde_json::from_value(input).map_err(|e| {
                ToolError::validation(name.clone(), vec![FieldViolation::new("", e.to_string())])
            })?;
            Ok(handler(params).boxed())
        };

        Ok(Self {
            tool,
            schema: Arc::new(schema),
            bind: Arc::new(bind),
        })
    }

    /// The tool name.
    pub fn name(&self) -> &str {
        &self.tool.name
    }

    /// The tool metadata as advertised to clients.
    pub fn tool(&self) -> &Tool {
        &self.tool
    }

    /// The JSON schema input must satisfy.
    pub fn input_schema(&self) -> &JsonObject {
        &self.tool.input_schema
    }

    /// Check `input` against the compiled schema, collecting every violation.
    pub fn validate(&self, input: &Value) -> Result<(), ToolError> {
        self.schema
            .validate(input)
            .map_err(|violations| ToolError::validation(self.name(), violations))
    }

    /// Decode validated input and bind it to the handler.
    pub(crate) fn bind(&self, input: Value) -> Result<ToolFuture, ToolError> {
        (self.bind)(input)
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.tool.name)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tool Registry
// ============================================================================

/// Tool registry - manages all available tools.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDefinition>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Fails if a tool with the same name already exists.
    pub fn register(&mut self, definition: ToolDefinition) -> Result<(), ToolError> {
        let name = definition.name().to_string();
        if self.tools.contains_key(&name) {
            warn!("Rejected duplicate tool registration: {}", name);
            return Err(ToolError::duplicate(name));
        }
        debug!("Registered tool: {}", name);
        self.tools.insert(name, definition);
        Ok(())
    }

    /// Look up a tool by name.
    pub fn lookup(&self, name: &str) -> Result<&ToolDefinition, ToolError> {
        self.tools
            .get(name)
            .ok_or_else(|| ToolError::not_found(name))
    }

    /// Get all tool names, sorted.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Get all tools as Tool models (metadata).
    pub fn tools(&self) -> Vec<Tool> {
        self.tools.values().map(|d| d.tool.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::handler::server::tool::schema_for_type;
    use rmcp::model::Content;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct EchoParams {
        text: String,
    }

    fn echo_tool(name: &'static str) -> ToolDefinition {
        let tool = Tool {
            name: name.into(),
            description: Some("Echo the input text".into()),
            input_schema: schema_for_type::<EchoParams>().into(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        };
        ToolDefinition::new(tool, |params: EchoParams| async move {
            Ok(CallToolResult::success(vec![Content::text(params.text)]))
        })
        .unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("echo")).unwrap();

        let definition = registry.lookup("echo").unwrap();
        assert_eq!(definition.name(), "echo");
        assert!(definition.input_schema().contains_key("properties"));
        assert_eq!(registry.tool_names(), vec!["echo"]);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("echo")).unwrap();

        let err = registry.register(echo_tool("echo")).unwrap_err();
        assert!(matches!(err, ToolError::Duplicate(ref n) if n == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_unknown() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("echo")).unwrap();

        let err = registry.lookup("missing").unwrap_err();
        assert!(matches!(err, ToolError::NotFound(ref n) if n == "missing"));
        assert!(registry.lookup("echo").is_ok());
    }

    #[test]
    fn test_tools_sorted_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("zeta")).unwrap();
        registry.register(echo_tool("alpha")).unwrap();

        let names: Vec<_> = registry.tools().iter().map(|t| t.name.to_string()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_validate_reports_field_path() {
        let definition = echo_tool("echo");
        assert!(definition.validate(&serde_json::json!({ "text": "hi" })).is_ok());

        let err = definition.validate(&serde_json::json!({})).unwrap_err();
        assert!(matches!(err, ToolError::Validation { ref tool, .. } if tool == "echo"));
        assert_eq!(err.violations(), &[FieldViolation::new("text", "is required")]);
    }

    #[test]
    fn test_uncompilable_schema_is_rejected() {
        let mut tool = echo_tool("echo").tool().clone();
        let mut schema = tool.input_schema.as_ref().clone();
        schema.insert("type".into(), serde_json::json!(42));
        tool.input_schema = Arc::new(schema);

        let result = ToolDefinition::new(tool, |params: EchoParams| async move {
            Ok(CallToolResult::success(vec![Content::text(params.text)]))
        });
        assert!(matches!(result, Err(ToolError::Internal(_))));
    }

    #[tokio::test]
    async fn test_bind_decodes_params() {
        let definition = echo_tool("echo");
        let future = definition
            .bind(serde_json::json!({ "text": "hello" }))
            .unwrap();
        let result = future.await.unwrap();
        let text = match &result.content[0].raw {
            rmcp::model::RawContent::Text(t) => t.text.clone(),
            _ => panic!("Expected text content"),
        };
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_bind_rejects_undecodable_input() {
        let definition = echo_tool("echo");
        let err = match definition.bind(serde_json::json!({ "text": 5 })) {
            Ok(_) => panic!("bind should fail"),
            Err(e) => e,
        };
        assert!(matches!(err, ToolError::Validation { .. }));
    }
}
