//! Token filter that hides control markup from a streaming sink.
//!
//! While tokens stream in, `<tools>…</tools>`, `<memory>…</memory>` and
//! `<tool_help …/>` spans must not reach the user. The buffer holds back only
//! the trailing text that could still turn into a start marker, swallows
//! complete spans and forwards the rest as word-sized pieces.

use async_trait::async_trait;
use convoy_core::error::ProviderError;
use convoy_core::provider::{CompletionResponse, StreamHandler};
use convoy_core::tool::ToolInvocationRequest;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// A start marker and the stop marker that closes its span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPair {
    pub start: String,
    pub stop: String,
}

impl MarkerPair {
    pub fn new(start: impl Into<String>, stop: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            stop: stop.into(),
        }
    }
}

pub fn default_markers() -> Vec<MarkerPair> {
    vec![
        MarkerPair::new("<tools>", "</tools>"),
        MarkerPair::new("<memory>", "</memory>"),
        MarkerPair::new("<tool_help", "/>"),
    ]
}

#[derive(Debug)]
pub struct ResponseBuffer {
    markers: Vec<MarkerPair>,
    pending: String,
    /// Index into `markers` of the span currently being swallowed.
    open_span: Option<usize>,
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new(default_markers())
    }
}

impl ResponseBuffer {
    pub fn new(markers: Vec<MarkerPair>) -> Self {
        Self {
            markers,
            pending: String::new(),
            open_span: None,
        }
    }

    /// Feed one token and return the pieces that are safe to show.
    pub fn push(&mut self, token: &str) -> Vec<String> {
        self.pending.push_str(token);
        let mut prose = String::new();

        loop {
            if let Some(index) = self.open_span {
                let stop = &self.markers[index].stop;
                match self.pending.find(stop.as_str()) {
                    Some(at) => {
                        self.pending.drain(..at + stop.len());
                        self.open_span = None;
                    }
                    None => {
                        let keep = partial_suffix_len(&self.pending, std::slice::from_ref(stop));
                        self.pending.drain(..self.pending.len() - keep);
                        break;
                    }
                }
                continue;
            }

            let earliest = self
                .markers
                .iter()
                .enumerate()
                .filter_map(|(i, m)| self.pending.find(m.start.as_str()).map(|at| (at, i)))
                .min();

            match earliest {
                Some((at, index)) => {
                    prose.push_str(&self.pending[..at]);
                    self.pending.drain(..at + self.markers[index].start.len());
                    self.open_span = Some(index);
                }
                None => {
                    let starts: Vec<String> = self.markers.iter().map(|m| m.start.clone()).collect();
                    let keep = partial_suffix_len(&self.pending, &starts);
                    let cut = self.pending.len() - keep;
                    prose.push_str(&self.pending[..cut]);
                    self.pending.drain(..cut);
                    break;
                }
            }
        }

        word_pieces(&prose)
    }

    /// Flush held-back prose at the end of a stream.
    ///
    /// An unterminated control span is discarded.
    pub fn finish(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.pending);
        if let Some(index) = self.open_span.take() {
            debug!(marker = %self.markers[index].start, "Discarding unterminated span");
            return Vec::new();
        }
        word_pieces(&rest)
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of any marker.
fn partial_suffix_len(text: &str, markers: &[String]) -> usize {
    let longest = markers.iter().map(|m| m.len()).max().unwrap_or(0);
    let upper = longest.saturating_sub(1).min(text.len());

    (1..=upper)
        .rev()
        .filter(|&k| text.is_char_boundary(text.len() - k))
        .find(|&k| {
            let tail = &text[text.len() - k..];
            markers.iter().any(|m| m.starts_with(tail))
        })
        .unwrap_or(0)
}

fn word_pieces(text: &str) -> Vec<String> {
    text.split_inclusive(char::is_whitespace)
        .map(str::to_string)
        .collect()
}

/// A [`StreamHandler`] that runs tokens through a [`ResponseBuffer`] before
/// handing them to `inner`.
pub struct FilteredHandler {
    inner: Arc<dyn StreamHandler>,
    buffer: Mutex<ResponseBuffer>,
}

impl FilteredHandler {
    pub fn new(inner: Arc<dyn StreamHandler>) -> Self {
        Self::with_buffer(inner, ResponseBuffer::default())
    }

    pub fn with_buffer(inner: Arc<dyn StreamHandler>, buffer: ResponseBuffer) -> Self {
        Self {
            inner,
            buffer: Mutex::new(buffer),
        }
    }

    async fn flush(&self) {
        let pieces = self.buffer.lock().await.finish();
        for piece in pieces {
            self.inner.on_token(&piece).await;
        }
    }
}

#[async_trait]
impl StreamHandler for FilteredHandler {
    async fn on_token(&self, token: &str) {
        let pieces = self.buffer.lock().await.push(token);
        for piece in pieces {
            self.inner.on_token(&piece).await;
        }
    }

    async fn on_tool_request(&self, request: &ToolInvocationRequest) {
        self.inner.on_tool_request(request).await;
    }

    async fn on_complete(&self, response: &CompletionResponse) {
        self.flush().await;
        self.inner.on_complete(response).await;
    }

    async fn on_error(&self, error: &ProviderError) {
        self.flush().await;
        self.inner.on_error(error).await;
    }
}
