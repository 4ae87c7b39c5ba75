//! System prompt assembly.
//!
//! The prompt is a sequence of tagged sections. Optional sections are left out
//! entirely rather than rendered empty:
//!
//! 1. `<core_instructions>`: who the assistant is and the ground rules
//! 2. `<useful_info>`: labelled facts such as the current date
//! 3. `<available_tools>` + `<tool_instructions>`: only for the inline protocol
//! 4. `<memory_instructions>` + stored memories: only with a memory store
//! 5. `<assistant_instructions>` and `<persona>`: only when configured

use chrono::{DateTime, Local};
use convoy_core::provider::ToolDefinition;

/// A labelled fact shown to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoBit {
    pub label: String,
    pub value: String,
}

impl InfoBit {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Inputs for [`build_system_prompt`].
#[derive(Debug, Clone, Default)]
pub struct SystemPromptContext {
    pub assistant_name: String,
    pub useful_info: Vec<InfoBit>,
    /// Tools described in the prompt. Leave empty for providers with native
    /// tool calling, which receive definitions on the request instead.
    pub inline_tools: Vec<ToolDefinition>,
    /// Rendered `<memories>` envelope. `None` means no memory store is attached.
    pub memories: Option<String>,
    pub instructions: Option<String>,
    pub persona: Option<String>,
}

impl SystemPromptContext {
    pub fn new(assistant_name: impl Into<String>) -> Self {
        Self {
            assistant_name: assistant_name.into(),
            useful_info: current_time_info(Local::now()),
            ..Self::default()
        }
    }

    pub fn with_inline_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.inline_tools = tools;
        self
    }

    pub fn with_memories(mut self, memories: impl Into<String>) -> Self {
        self.memories = Some(memories.into());
        self
    }

    pub fn with_instructions(mut self, instructions: Option<String>) -> Self {
        self.instructions = instructions.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_persona(mut self, persona: Option<String>) -> Self {
        self.persona = persona.filter(|s| !s.trim().is_empty());
        self
    }
}

/// Date and time facts for `<useful_info>`.
pub fn current_time_info(now: DateTime<Local>) -> Vec<InfoBit> {
    vec![
        InfoBit::new("Current date", now.format("%A, %B %-d, %Y").to_string()),
        InfoBit::new("Current time", now.format("%H:%M %Z").to_string()),
    ]
}

pub fn build_system_prompt(ctx: &SystemPromptContext) -> String {
    let mut sections = vec![core_instructions(&ctx.assistant_name)];

    if !ctx.useful_info.is_empty() {
        let lines: Vec<String> = ctx
            .useful_info
            .iter()
            .map(|bit| format!("    {}: {}", bit.label, bit.value))
            .collect();
        sections.push(format!("<useful_info>\n{}\n</useful_info>", lines.join("\n")));
    }

    if !ctx.inline_tools.is_empty() {
        sections.push(render_tool_catalogue(&ctx.inline_tools));
        sections.push(TOOL_INSTRUCTIONS.to_string());
    }

    if let Some(memories) = &ctx.memories {
        sections.push(MEMORY_INSTRUCTIONS.to_string());
        if !memories.is_empty() {
            sections.push(memories.clone());
        }
    }

    if let Some(instructions) = &ctx.instructions {
        sections.push(format!(
            "<assistant_instructions>\n    {}\n</assistant_instructions>",
            instructions.trim()
        ));
    }

    if let Some(persona) = &ctx.persona {
        sections.push(format!("<persona>\n    {}\n</persona>", persona.trim()));
    }

    sections.join("\n\n")
}

fn core_instructions(name: &str) -> String {
    format!(
        "<core_instructions>
    You are {name}, an expert AI assistant helping the user with a specific task.
    XML-like tags structure the data in this conversation, for example <rules></rules> or <tools></tools>.
    Useful facts are listed between <useful_info></useful_info> tags.

    Always follow these rules:
    <rules>
        * Use today's date for anything date-related.
        * Complete every task you are given as well as you can.
        * Follow the instructions you are given.
        * Answer only the question asked and do only the task given.
        * Respect any formatting requirements such as word counts, JSON structure or style.
        * Base your response on the context provided together with the instructions.
        * When examples are available, use them to see how the task should be done.
        * Stay in your persona when responding.
    </rules>
</core_instructions>"
    )
}

fn render_tool_catalogue(tools: &[ToolDefinition]) -> String {
    let mut out = String::from("<available_tools>\n    You have access to the following tools:\n");
    for tool in tools {
        out.push_str(&format!(
            "    * {}: {}\n      Parameters:\n      {}\n",
            tool.name, tool.description, tool.parameters
        ));
    }
    out.push_str("</available_tools>");
    out
}

const TOOL_INSTRUCTIONS: &str = r#"<tool_instructions>
    To use a tool, reply with its id and parameters as a JSON array between <tools> and </tools> tags:

    <tools>
    [
        {
            "tool": "tool_id",
            "parameters": {
                "param1": "value1"
            }
        }
    ]
    </tools>

    Each result comes back to you inside <tool_result></tool_result> tags.
    To learn how a tool works before using it, reply with <tool_help tool_id="tool_id"/>.

    Rules for tools:
    * Do not invent parameters. Ask for help on a tool if you are unsure how to call it.
    * The JSON must be between the <tools> and </tools> tags or the tool will not run.
    * If no <tool_result> comes back, the call was malformed. Fix the format and try again.
    * Only include fields described in the tool's parameters schema.
    * Do not put comments in the JSON.
    * When calling a tool, reply with only the tools block and no commentary.
    * Never send a truncated JSON document.
</tool_instructions>"#;

const MEMORY_INSTRUCTIONS: &str = "<memory_instructions>
    I can store memories for you when something is worth remembering.
    To store one, write it between <memory></memory> tags, for example:
    <memory>The user likes chocolate ice cream.</memory>
    Exactly the text between the tags is stored.
    Stored memories are shown to you between <memories></memories> tags.
    Always take stored memories into account when responding.
    Do not repeat back a memory you have already been given.
</memory_instructions>";
