//! Tool pipeline: extract `<tools>` requests, validate, dispatch concurrently.
//!
//! Every dispatched request yields exactly one [`ToolResult`], in the same
//! order as the requests. Unknown tools, schema violations, tool errors and
//! panics all become failed results rather than errors.

use convoy_core::error::{ToolError, ToolParseError};
use convoy_core::tool::{
    StatusReporter, ToolContext, ToolInvocationRequest, ToolRegistry, ToolResult, ToolState,
};
use futures::FutureExt;
use futures::future::join_all;
use regex_lite::Regex;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

use crate::json_extract::extract_json;

static TOOLS_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<tools>([\s\S]*?)</tools>").expect("valid tools pattern"));

static HELP_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<tool_help tool_id="([\s\S]*?)"/>"#).expect("valid tool help pattern")
});

/// Id and tool name of the result returned when a dispatch has no requests.
pub const NO_TOOLS_REQUESTED: &str = "no_tools_requested";

pub struct ToolProcessor {
    tools: Arc<ToolRegistry>,
}

impl ToolProcessor {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Whether `text` carries an inline tool request.
    pub fn has_tool_request(text: &str) -> bool {
        text.contains("<tools>")
    }

    /// Whether `text` asks for help on a tool.
    pub fn has_help_request(text: &str) -> bool {
        text.contains("<tool_help tool_id")
    }

    /// Parse every `<tools>…</tools>` block in `text` into invocation requests.
    ///
    /// A block may hold an array of requests or a single request object.
    pub fn extract_requests(&self, text: &str) -> Result<Vec<ToolInvocationRequest>, ToolParseError> {
        let mut requests = Vec::new();
        let mut found = false;

        for caps in TOOLS_BLOCK.captures_iter(text) {
            found = true;
            let block = caps.get(1).map_or("", |m| m.as_str());

            let (value, stage) = extract_json(block)
                .map_err(|e| ToolParseError::new(format!("Error parsing JSON: {e}"), block))?;
            debug!(?stage, "Parsed tools block");

            let parsed = if value.is_object() {
                serde_json::from_value::<ToolInvocationRequest>(value).map(|r| vec![r])
            } else {
                serde_json::from_value::<Vec<ToolInvocationRequest>>(value)
            }
            .map_err(|e| ToolParseError::new(format!("Error extracting tools: {e}"), block))?;

            for request in &parsed {
                if request.tool.is_empty() {
                    warn!(invocation_id = %request.id, "Tool request without a tool id");
                }
            }
            requests.extend(parsed);
        }

        if !found {
            return Err(ToolParseError::new("No valid tools block(s) found in input", text));
        }
        Ok(requests)
    }

    /// Run all `requests` concurrently and collect one result per request.
    pub async fn process(
        &self,
        requests: Vec<ToolInvocationRequest>,
        status: Option<StatusReporter>,
    ) -> Vec<ToolResult> {
        if requests.is_empty() {
            return vec![ToolResult::failure(
                NO_TOOLS_REQUESTED,
                NO_TOOLS_REQUESTED,
                "No tools were requested",
            )];
        }

        debug!(count = requests.len(), "Dispatching tool requests");
        let dispatches = requests
            .into_iter()
            .map(|request| self.dispatch_guarded(request, status.clone()));
        join_all(dispatches).await
    }

    /// Extract requests from `text` and run them.
    pub async fn extract_and_process(
        &self,
        text: &str,
        status: Option<StatusReporter>,
    ) -> Result<Vec<ToolResult>, ToolParseError> {
        let requests = self.extract_requests(text)?;
        Ok(self.process(requests, status).await)
    }

    /// Answer every `<tool_help tool_id="…"/>` marker in `text`.
    pub fn process_help(&self, text: &str) -> String {
        let entries: Vec<String> = HELP_MARKER
            .captures_iter(text)
            .map(|caps| {
                let id = caps.get(1).map_or("", |m| m.as_str());
                let help = match self.tools.get(id) {
                    Some(tool) => tool.instructions(),
                    None => Value::String(format!(
                        "I'm sorry, I couldn't find the tool you requested help with ({id})."
                    )),
                };
                serde_json::json!({ "tool": id, "help": help }).to_string()
            })
            .collect();

        format!("<tool_help_results>\n{}\n</tool_help_results>", entries.join("\n"))
    }

    async fn dispatch_guarded(
        &self,
        request: ToolInvocationRequest,
        status: Option<StatusReporter>,
    ) -> ToolResult {
        let id = request.id.clone();
        let tool = request.tool.clone();
        let ctx = ToolContext::new(&id, &tool, status);

        match AssertUnwindSafe(self.dispatch(request, &ctx)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                warn!(tool = %tool, invocation_id = %id, reason = %reason, "Tool panicked");
                let error = format!("Tool {tool} failed to execute: panicked: {reason}");
                ctx.report(ToolState::Failed, format!("Failed to execute: panicked: {reason}"));
                ToolResult::failure(id, tool, error)
            }
        }
    }

    async fn dispatch(&self, request: ToolInvocationRequest, ctx: &ToolContext) -> ToolResult {
        let ToolInvocationRequest { id, tool: tool_id, parameters } = request;

        if tool_id.is_empty() {
            let error = "A tool request is missing a tool ID";
            ctx.report(ToolState::Failed, error);
            return ToolResult::failure(id, tool_id, error);
        }

        let Some(tool) = self.tools.get(&tool_id) else {
            let error = format!("I'm sorry, I couldn't find the tool you requested ({tool_id}).");
            warn!(tool = %tool_id, "Unknown tool requested");
            ctx.report(ToolState::Failed, error.clone());
            return ToolResult::failure(id, tool_id, error);
        };

        ctx.report(ToolState::Running, "Requesting tool");
        debug!(tool = %tool_id, invocation_id = %id, "Running tool");

        let outcome = match tool.validate_input(&parameters) {
            Ok(()) => tool.exec(parameters, ctx).await,
            Err(e) => Err(e),
        };

        let output = outcome.and_then(|value| {
            serde_json::to_string(&value)
                .map(|text| (value, text))
                .map_err(|e| ToolError::InvalidArguments(e.to_string()))
        });

        match output {
            Ok((value, text)) => {
                let mut data = serde_json::Map::new();
                data.insert("result".into(), value);
                ctx.report_with_data(ToolState::Completed, "Finished running", data);
                ToolResult::success(id, tool_id, text)
            }
            Err(e) => {
                warn!(tool = %tool_id, error = %e, "Tool failed");
                ctx.report(ToolState::Failed, format!("Failed to execute: {e}"));
                ToolResult::failure(id, &tool_id, format!("Tool {tool_id} failed to execute: {e}"))
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use convoy_core::tool::{Tool, ToolStatusUpdate};
    use convoy_tools::ArithmeticTool;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Sleeps for `ms` before answering so completion order differs from request order.
    struct SleepTool;

    #[async_trait]
    impl Tool for SleepTool {
        fn id(&self) -> &str {
            "sleep"
        }
        fn purpose(&self) -> &str {
            "Wait"
        }
        fn description(&self) -> &str {
            "Waits and echoes the delay"
        }
        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": { "ms": { "type": "integer" } },
                "required": ["ms"]
            })
        }
        async fn exec(&self, input: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
            let ms = input["ms"].as_u64().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(json!({ "slept": ms }))
        }
    }

    struct PanicTool;

    #[async_trait]
    impl Tool for PanicTool {
        fn id(&self) -> &str {
            "panic"
        }
        fn purpose(&self) -> &str {
            "Crash"
        }
        fn description(&self) -> &str {
            "Always panics"
        }
        fn parameters_schema(&self) -> Value {
            Value::Null
        }
        async fn exec(&self, _input: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
            panic!("boom");
        }
    }

    fn processor() -> ToolProcessor {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(ArithmeticTool));
        registry.register(Box::new(SleepTool));
        registry.register(Box::new(PanicTool));
        ToolProcessor::new(Arc::new(registry))
    }

    fn recorder() -> (StatusReporter, Arc<Mutex<Vec<ToolStatusUpdate>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter: StatusReporter = Arc::new(move |u| sink.lock().unwrap().push(u));
        (reporter, seen)
    }

    #[test]
    fn extracts_array_object_and_multiple_blocks() {
        let p = processor();
        let text = r#"<tools>[{"tool":"arithmetic","id":"a","parameters":{"operation":"add","a":1,"b":2}}]</tools>
            then <tools>{"Tool":"clock","Id":"b","Parameters":{}}</tools>"#;
        let requests = p.extract_requests(text).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].id, "a");
        assert_eq!(requests[1].tool, "clock");
    }

    #[test]
    fn extracts_fenced_json_inside_block() {
        let p = processor();
        let text = "<tools>\n```json\n[{\"tool\":\"clock\"}]\n```\n</tools>";
        let requests = p.extract_requests(text).unwrap();
        assert_eq!(requests[0].tool, "clock");
        assert!(!requests[0].id.is_empty());
    }

    #[test]
    fn numeric_ids_are_accepted_as_text() {
        let p = processor();
        let text = r#"<tools>[{"tool":"arithmetic","id":1,"parameters":{}},{"tool":"clock","id":null}]</tools>"#;
        let requests = p.extract_requests(text).unwrap();
        assert_eq!(requests[0].id, "1");
        assert!(!requests[1].id.is_empty());

        let err = p.extract_requests(r#"<tools>[{"tool":"clock","id":{"n":1}}]</tools>"#).unwrap_err();
        assert!(err.message.starts_with("Error extracting tools:"));
    }

    #[test]
    fn missing_block_reports_whole_input() {
        let err = processor().extract_requests("just prose").unwrap_err();
        assert_eq!(err.message, "No valid tools block(s) found in input");
        assert_eq!(err.block, "just prose");
    }

    #[test]
    fn invalid_json_reports_block() {
        let err = processor().extract_requests("<tools>invalid json</tools>").unwrap_err();
        assert_eq!(err.message, "Error parsing JSON: No JSON found");
        assert_eq!(err.block, "invalid json");
    }

    #[test]
    fn wrong_shape_is_extraction_error() {
        let err = processor().extract_requests("<tools>[1, 2]</tools>").unwrap_err();
        assert!(err.message.starts_with("Error extracting tools:"));
    }

    #[tokio::test]
    async fn results_follow_request_order() {
        let p = processor();
        let requests = vec![
            ToolInvocationRequest::new("sleep", json!({"ms": 30})).with_id("slow"),
            ToolInvocationRequest::new("sleep", json!({"ms": 1})).with_id("fast"),
            ToolInvocationRequest::new("arithmetic", json!({"operation": "multiply", "a": 6, "b": 7}))
                .with_id("math"),
        ];

        let results = p.process(requests, None).await;

        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["slow", "fast", "math"]);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(results[2].result.as_deref(), Some(r#"{"result":42.0}"#));
    }

    #[tokio::test]
    async fn unknown_tool_fails_with_status() {
        let (reporter, seen) = recorder();
        let results = processor()
            .process(vec![ToolInvocationRequest::new("weather", json!({}))], Some(reporter))
            .await;

        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("(weather)"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].state, ToolState::Failed);
    }

    #[tokio::test]
    async fn missing_tool_id_fails() {
        let results = processor()
            .process(vec![ToolInvocationRequest::new("", json!({}))], None)
            .await;
        assert_eq!(results[0].error.as_deref(), Some("A tool request is missing a tool ID"));
    }

    #[tokio::test]
    async fn schema_violation_is_a_failed_result() {
        let (reporter, seen) = recorder();
        let results = processor()
            .process(
                vec![ToolInvocationRequest::new("arithmetic", json!({"operation": "add", "a": "x", "b": 1}))],
                Some(reporter),
            )
            .await;

        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().starts_with("Tool arithmetic failed to execute:"));

        let states: Vec<ToolState> = seen.lock().unwrap().iter().map(|u| u.state).collect();
        assert_eq!(states, vec![ToolState::Running, ToolState::Failed]);
    }

    #[tokio::test]
    async fn success_reports_running_then_completed_with_result() {
        let (reporter, seen) = recorder();
        processor()
            .process(
                vec![ToolInvocationRequest::new("arithmetic", json!({"operation": "add", "a": 3, "b": 4}))],
                Some(reporter),
            )
            .await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].message, "Requesting tool");
        assert_eq!(seen[1].state, ToolState::Completed);
        assert_eq!(seen[1].data["result"], json!({"result": 7.0}));
    }

    #[tokio::test]
    async fn panicking_tool_becomes_failure() {
        let results = processor()
            .process(
                vec![
                    ToolInvocationRequest::new("panic", json!({})),
                    ToolInvocationRequest::new("sleep", json!({"ms": 0})),
                ],
                None,
            )
            .await;

        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("boom"));
        assert!(results[1].success);
    }

    #[tokio::test]
    async fn empty_request_list_yields_sentinel() {
        let results = processor().process(Vec::new(), None).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, NO_TOOLS_REQUESTED);
        assert_eq!(results[0].error.as_deref(), Some("No tools were requested"));
    }

    #[tokio::test]
    async fn extract_and_process_combines_both_steps() {
        let results = processor()
            .extract_and_process(
                r#"<tools>[{"tool":"arithmetic","parameters":{"operation":"subtract","a":9,"b":4}}]</tools>"#,
                None,
            )
            .await
            .unwrap();
        assert_eq!(results[0].result.as_deref(), Some(r#"{"result":5.0}"#));
    }

    #[test]
    fn help_for_known_and_unknown_tools() {
        let help = processor().process_help(r#"<tool_help tool_id="arithmetic"/> <tool_help tool_id="nope"/>"#);
        assert!(help.starts_with("<tool_help_results>\n"));
        assert!(help.ends_with("\n</tool_help_results>"));

        let lines: Vec<&str> = help.lines().collect();
        assert_eq!(lines.len(), 4);
        let known: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(known["tool"], "arithmetic");
        assert_eq!(known["help"]["id"], "arithmetic");
        let unknown: Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(
            unknown["help"],
            "I'm sorry, I couldn't find the tool you requested help with (nope)."
        );
    }

    #[test]
    fn trigger_detection() {
        assert!(ToolProcessor::has_tool_request("x <tools>[]</tools>"));
        assert!(ToolProcessor::has_help_request(r#"<tool_help tool_id="clock"/>"#));
        assert!(!ToolProcessor::has_tool_request("tools"));
    }
}
