//! Memory side-channel: `<memory>…</memory>` spans in model output.
//!
//! The spans are annotations, not content. They are stored and stripped before
//! the text is shown, appended to the thread or scanned for tool triggers.

use convoy_core::error::MemoryError;
use convoy_core::memory::{Memory, MemoryStore};
use regex_lite::Regex;
use std::sync::{Arc, LazyLock};
use tracing::debug;

static MEMORY_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<memory>(.*?)</memory>").expect("valid memory pattern"));

pub struct MemoryProcessor {
    store: Arc<dyn MemoryStore>,
}

impl MemoryProcessor {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }

    /// Whether `text` contains anything to extract.
    pub fn should_process(text: &str) -> bool {
        text.contains("<memory>")
    }

    /// Store every memory body and return `text` with all spans removed.
    ///
    /// Bodies are stored trimmed. A span whose body is empty or only
    /// whitespace is still removed from the returned text, but nothing is
    /// stored for it.
    pub async fn extract_memories(&self, text: &str) -> Result<String, MemoryError> {
        let mut stored = 0usize;
        for caps in MEMORY_SPAN.captures_iter(text) {
            let body = caps.get(1).map_or("", |m| m.as_str()).trim();
            if body.is_empty() {
                continue;
            }
            self.store.store(Memory::new(body)).await?;
            stored += 1;
        }

        if stored > 0 {
            debug!(count = stored, store = self.store.name(), "Stored memories from response");
        }

        Ok(MEMORY_SPAN.replace_all(text, "").into_owned())
    }

    /// All stored memories in a `<memories>` envelope, or `""` if there are none.
    pub async fn fetch_memories(&self) -> Result<String, MemoryError> {
        let memories = self.store.all().await?;
        Ok(render_memories(&memories))
    }
}

pub(crate) fn render_memories(memories: &[Memory]) -> String {
    if memories.is_empty() {
        return String::new();
    }

    let mut out = String::from("<memories>\n");
    for memory in memories {
        out.push_str("<memory>");
        out.push_str(&memory.content);
        out.push_str("</memory>\n");
    }
    out.push_str("</memories>");
    out
}
