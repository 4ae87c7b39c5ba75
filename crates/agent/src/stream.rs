//! Streaming model calls.
//!
//! [`StreamAccumulator`] folds provider [`StreamEvent`]s into a
//! [`CompletionResponse`], reassembling tool calls from their argument
//! fragments. [`stream_complete`] drives a provider stream through it and
//! forwards progress to a [`StreamHandler`].

use convoy_core::error::ProviderError;
use convoy_core::provider::{
    CompletionRequest, CompletionResponse, Provider, StreamEvent, StreamHandler, Usage,
};
use convoy_core::tool::ToolInvocationRequest;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Default)]
struct PendingCall {
    id: String,
    name: String,
    arguments: String,
}

/// What a single event contributed.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulated {
    Token(String),
    ToolRequest(ToolInvocationRequest),
    End,
}

#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    pending: BTreeMap<usize, PendingCall>,
    completed: Vec<ToolInvocationRequest>,
    usage: Option<Usage>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Tool calls are only surfaced once their stop event arrives.
    pub fn apply(&mut self, event: StreamEvent) -> Option<Accumulated> {
        match event {
            StreamEvent::TextDelta { text } => {
                if text.is_empty() {
                    return None;
                }
                self.text.push_str(&text);
                Some(Accumulated::Token(text))
            }
            StreamEvent::ToolCallStart { index, id, name } => {
                self.pending.insert(
                    index,
                    PendingCall {
                        id,
                        name,
                        arguments: String::new(),
                    },
                );
                None
            }
            StreamEvent::ToolCallDelta {
                index,
                partial_json,
            } => {
                match self.pending.get_mut(&index) {
                    Some(call) => call.arguments.push_str(&partial_json),
                    None => warn!(index, "Argument fragment for unknown tool call"),
                }
                None
            }
            StreamEvent::ToolCallStop { index } => {
                let Some(call) = self.pending.remove(&index) else {
                    warn!(index, "Stop for unknown tool call");
                    return None;
                };
                let request = finish_call(call);
                self.completed.push(request.clone());
                Some(Accumulated::ToolRequest(request))
            }
            StreamEvent::End { usage } => {
                self.usage = usage;
                Some(Accumulated::End)
            }
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Build the final response. Calls that never stopped are dropped.
    pub fn finish(self, model: impl Into<String>) -> CompletionResponse {
        for (index, call) in &self.pending {
            warn!(index, tool = %call.name, "Dropping unfinished tool call");
        }

        CompletionResponse {
            model: model.into(),
            blocks: if self.text.is_empty() {
                Vec::new()
            } else {
                vec![self.text]
            },
            tool_requests: self.completed,
            usage: self.usage,
        }
    }
}

fn finish_call(call: PendingCall) -> ToolInvocationRequest {
    let parameters = if call.arguments.trim().is_empty() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        match serde_json::from_str(&call.arguments) {
            Ok(value) => value,
            Err(e) => {
                // Kept as a string so schema validation reports it to the model.
                warn!(tool = %call.name, error = %e, "Unparseable tool arguments");
                serde_json::Value::String(call.arguments)
            }
        }
    };

    let id = if call.id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        call.id
    };

    ToolInvocationRequest {
        id,
        tool: call.name,
        parameters,
    }
}

/// How a streamed call ended.
#[derive(Debug, Clone)]
pub enum StreamOutcome {
    Completed(CompletionResponse),
    Cancelled,
}

/// Run `request` as a stream, reporting progress to `handler`.
///
/// Cancellation is checked between events. A cancelled stream reports
/// [`ProviderError::Cancelled`] to the handler and returns
/// [`StreamOutcome::Cancelled`]. A stream only completes on an `End` event;
/// a channel that closes before it is [`ProviderError::StreamInterrupted`].
pub async fn stream_complete(
    provider: &dyn Provider,
    request: CompletionRequest,
    handler: &dyn StreamHandler,
    cancel: &CancellationToken,
) -> Result<StreamOutcome, ProviderError> {
    let model = request.model.clone();

    let mut events = match provider.stream(request).await {
        Ok(events) => events,
        Err(e) => {
            handler.on_error(&e).await;
            return Err(e);
        }
    };

    let mut acc = StreamAccumulator::new();
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(provider = provider.name(), "Stream cancelled");
                handler.on_error(&ProviderError::Cancelled).await;
                return Ok(StreamOutcome::Cancelled);
            }
            next = events.recv() => next,
        };

        let event = match next {
            None => {
                let e = ProviderError::StreamInterrupted("stream closed before end of response".into());
                warn!(provider = provider.name(), "Stream closed without an end event");
                handler.on_error(&e).await;
                return Err(e);
            }
            Some(Ok(event)) => event,
            Some(Err(e)) => {
                handler.on_error(&e).await;
                return Err(e);
            }
        };

        match acc.apply(event) {
            Some(Accumulated::Token(text)) => handler.on_token(&text).await,
            Some(Accumulated::ToolRequest(request)) => handler.on_tool_request(&request).await,
            Some(Accumulated::End) => break,
            None => {}
        }
    }

    let response = acc.finish(model);
    handler.on_complete(&response).await;
    Ok(StreamOutcome::Completed(response))
}
