//! Arithmetic tool: applies one binary operation to two numbers.

use async_trait::async_trait;
use convoy_core::error::ToolError;
use convoy_core::tool::{parse_input, to_output, Tool, ToolContext, ToolExample};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Deserialize)]
struct ArithmeticInput {
    operation: Operation,
    a: f64,
    b: f64,
}

#[derive(Debug, Serialize)]
struct ArithmeticOutput {
    result: f64,
}

fn apply(input: &ArithmeticInput) -> Result<f64, ToolError> {
    let result = match input.operation {
        Operation::Add => input.a + input.b,
        Operation::Subtract => input.a - input.b,
        Operation::Multiply => input.a * input.b,
        Operation::Divide => {
            if input.b == 0.0 {
                return Err(ToolError::ExecutionFailed {
                    tool_name: "arithmetic".into(),
                    reason: "Division by zero".into(),
                });
            }
            input.a / input.b
        }
    };

    if !result.is_finite() {
        return Err(ToolError::ExecutionFailed {
            tool_name: "arithmetic".into(),
            reason: "Result is not a finite number".into(),
        });
    }
    Ok(result)
}

pub struct ArithmeticTool;

#[async_trait]
impl Tool for ArithmeticTool {
    fn id(&self) -> &str {
        "arithmetic"
    }

    fn purpose(&self) -> &str {
        "Exact arithmetic on two numbers"
    }

    fn description(&self) -> &str {
        "Add, subtract, multiply or divide two numbers. Use this instead of doing math in your head."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["add", "subtract", "multiply", "divide"]
                },
                "a": { "type": "number", "description": "Left operand" },
                "b": { "type": "number", "description": "Right operand" }
            },
            "required": ["operation", "a", "b"]
        })
    }

    fn results_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": { "result": { "type": "number" } }
        })
    }

    fn examples(&self) -> Vec<ToolExample> {
        vec![ToolExample::new(
            "What is 12 divided by 4?",
            json!({"operation": "divide", "a": 12, "b": 4}),
            json!({"result": 3.0}),
        )]
    }

    async fn exec(&self, input: serde_json::Value, _ctx: &ToolContext) -> Result<serde_json::Value, ToolError> {
        let input: ArithmeticInput = parse_input(input)?;
        let result = apply(&input)?;
        to_output(&ArithmeticOutput { result })
    }
}
