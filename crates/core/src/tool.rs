//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what give the assistant the ability to act: do arithmetic, read
//! the clock, recall stored memories, call out to other services.
//!
//! A tool describes itself (id, purpose, JSON schemas, examples) so it can be
//! advertised to the model either as a native tool definition or through the
//! inline `<tools>` protocol, and it executes against a JSON input.

use async_trait::async_trait;
use jsonschema::{Draft, JSONSchema};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ToolError;
use crate::provider::ToolDefinition;

fn generated_id() -> String {
    Uuid::new_v4().to_string()
}

/// Models often emit integer correlation ids; keep them as their decimal text.
fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(id) => Ok(id),
        serde_json::Value::Number(id) => Ok(id.to_string()),
        serde_json::Value::Null => Ok(generated_id()),
        other => Err(de::Error::custom(format!(
            "invalid tool request id {other}, expected a string or number"
        ))),
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// A request to execute a tool, either parsed from an inline `<tools>` block
/// or produced by a provider's native tool calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    /// Correlation ID. Generated when the model leaves it out.
    #[serde(default = "generated_id", alias = "Id", deserialize_with = "lenient_id")]
    pub id: String,

    /// Id of the tool to run. Empty when the model forgot to name one.
    #[serde(default, alias = "Tool")]
    pub tool: String,

    /// Input for the tool
    #[serde(default = "empty_object", alias = "Parameters")]
    pub parameters: serde_json::Value,
}

impl ToolInvocationRequest {
    pub fn new(tool: impl Into<String>, parameters: serde_json::Value) -> Self {
        Self {
            id: generated_id(),
            tool: tool.into(),
            parameters,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// The outcome of one tool invocation. Exactly one is produced per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The invocation ID this result is for
    pub id: String,

    /// The tool that ran (or was asked for)
    pub tool: String,

    /// Whether the tool executed successfully
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Serialized JSON output of the tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl ToolResult {
    pub fn success(id: impl Into<String>, tool: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool: tool.into(),
            success: true,
            error: None,
            result: Some(result.into()),
        }
    }

    pub fn failure(id: impl Into<String>, tool: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool: tool.into(),
            success: false,
            error: Some(error.into()),
            result: None,
        }
    }
}

/// Lifecycle state of a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolState {
    Running,
    Completed,
    Failed,
}

/// Progress notification for one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolStatusUpdate {
    pub invocation_id: String,
    pub tool_id: String,
    pub state: ToolState,
    pub message: String,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// Callback receiving tool status updates. Scoped to a single dispatch.
pub type StatusReporter = Arc<dyn Fn(ToolStatusUpdate) + Send + Sync>;

/// Per-invocation context handed to [`Tool::exec`].
#[derive(Clone, Default)]
pub struct ToolContext {
    pub invocation_id: String,
    pub tool_id: String,
    status: Option<StatusReporter>,
}

impl ToolContext {
    pub fn new(
        invocation_id: impl Into<String>,
        tool_id: impl Into<String>,
        status: Option<StatusReporter>,
    ) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            tool_id: tool_id.into(),
            status,
        }
    }

    /// Emit a status update for this invocation. No-op without a reporter.
    pub fn report(&self, state: ToolState, message: impl Into<String>) {
        self.report_with_data(state, message, serde_json::Map::new());
    }

    pub fn report_with_data(
        &self,
        state: ToolState,
        message: impl Into<String>,
        data: serde_json::Map<String, serde_json::Value>,
    ) {
        if let Some(status) = &self.status {
            status(ToolStatusUpdate {
                invocation_id: self.invocation_id.clone(),
                tool_id: self.tool_id.clone(),
                state,
                message: message.into(),
                data,
            });
        }
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("invocation_id", &self.invocation_id)
            .field("tool_id", &self.tool_id)
            .field("has_status", &self.status.is_some())
            .finish()
    }
}

/// A worked input/output pair shown to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExample {
    pub description: String,
    pub input: serde_json::Value,
    pub output: serde_json::Value,
}

impl ToolExample {
    pub fn new(description: impl Into<String>, input: serde_json::Value, output: serde_json::Value) -> Self {
        Self {
            description: description.into(),
            input,
            output,
        }
    }
}

/// The core Tool trait.
///
/// Tools are registered in the [`ToolRegistry`] and dispatched by the tool
/// processor. `exec` receives already-validated input.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique id of this tool (e.g., "arithmetic").
    fn id(&self) -> &str;

    /// One-line summary of when to use the tool.
    fn purpose(&self) -> &str;

    /// Longer description of what the tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's input. `Null` disables validation.
    fn parameters_schema(&self) -> serde_json::Value;

    /// JSON Schema describing this tool's output.
    fn results_schema(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    fn examples(&self) -> Vec<ToolExample> {
        Vec::new()
    }

    /// Execute the tool with the given input.
    async fn exec(
        &self,
        input: serde_json::Value,
        ctx: &ToolContext,
    ) -> std::result::Result<serde_json::Value, ToolError>;

    /// Validate `input` against [`Tool::parameters_schema`].
    fn validate_input(&self, input: &serde_json::Value) -> std::result::Result<(), ToolError> {
        let schema = self.parameters_schema();
        if schema.is_null() {
            return Ok(());
        }

        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .map_err(|e| ToolError::Validation(format!("invalid schema for {}: {e}", self.id())))?;

        if let Err(errors) = compiled.validate(input) {
            let messages: Vec<String> = errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{path}: {e}")
                    }
                })
                .collect();
            return Err(ToolError::Validation(messages.join(", ")));
        }
        Ok(())
    }

    /// The help text returned for `<tool_help tool_id="..."/>`.
    fn instructions(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id(),
            "purpose": self.purpose(),
            "description": self.description(),
            "parameters": self.parameters_schema(),
            "results": self.results_schema(),
            "examples": self.examples(),
        })
    }

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.id().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Deserialize tool input into a typed struct.
pub fn parse_input<T: DeserializeOwned>(input: serde_json::Value) -> std::result::Result<T, ToolError> {
    serde_json::from_value(input).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Serialize a typed tool output.
pub fn to_output<T: Serialize>(output: &T) -> std::result::Result<serde_json::Value, ToolError> {
    serde_json::to_value(output).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// A registry of available tools, keyed by id.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same id.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let id = tool.id().to_string();
        self.tools.insert(id, tool);
    }

    /// Get a tool by id.
    pub fn get(&self, id: &str) -> Option<&dyn Tool> {
        self.tools.get(id).map(|t| t.as_ref())
    }

    /// All tool definitions, sorted by name so prompts are stable.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Sorted tool ids.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
