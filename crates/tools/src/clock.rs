//! Clock tool: current date and time, optionally at a fixed UTC offset.

use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use convoy_core::error::ToolError;
use convoy_core::tool::{parse_input, to_output, Tool, ToolContext};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Default, Deserialize)]
struct ClockInput {
    #[serde(default)]
    offset_minutes: i32,
}

#[derive(Debug, Serialize)]
struct ClockOutput {
    iso8601: String,
    date: String,
    time: String,
    weekday: String,
    unix: i64,
}

pub struct ClockTool;

#[async_trait]
impl Tool for ClockTool {
    fn id(&self) -> &str {
        "clock"
    }

    fn purpose(&self) -> &str {
        "Current date and time"
    }

    fn description(&self) -> &str {
        "Get the current date, time and weekday. Pass offset_minutes to shift from UTC (e.g. 120 for UTC+2)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "offset_minutes": {
                    "type": "integer",
                    "minimum": -1440,
                    "maximum": 1440,
                    "description": "Minutes east of UTC (default 0)"
                }
            }
        })
    }

    async fn exec(&self, input: serde_json::Value, _ctx: &ToolContext) -> Result<serde_json::Value, ToolError> {
        let input: ClockInput = if input.is_null() {
            ClockInput::default()
        } else {
            parse_input(input)?
        };

        let offset = FixedOffset::east_opt(input.offset_minutes * 60).ok_or_else(|| {
            ToolError::InvalidArguments(format!("offset_minutes out of range: {}", input.offset_minutes))
        })?;
        let now = Utc::now().with_timezone(&offset);

        to_output(&ClockOutput {
            iso8601: now.to_rfc3339(),
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H:%M:%S").to_string(),
            weekday: now.format("%A").to_string(),
            unix: now.timestamp(),
        })
    }
}
