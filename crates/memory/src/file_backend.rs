//! File-based memory store: persistent JSON-lines storage.
//!
//! Each line is a JSON-encoded `Memory`.
//!
//! Storage location: `~/.convoy/memory/memories.jsonl`

use async_trait::async_trait;
use convoy_core::error::MemoryError;
use convoy_core::memory::{Memory, MemoryStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::recall::keyword_recall;

/// A file-backed memory store using JSONL (one JSON object per line).
///
/// Entries are loaded into memory on creation and flushed to disk on every
/// mutation (store, clear). This gives fast reads with durable writes.
pub struct FileMemoryStore {
    path: PathBuf,
    entries: Arc<RwLock<Vec<Memory>>>,
}

impl FileMemoryStore {
    /// Create a new file-based store at the given path.
    ///
    /// If the file exists, entries are loaded from it.
    /// If the file does not exist, starts empty (file created on first write).
    pub fn new(path: PathBuf) -> Self {
        let entries = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = entries.len(), "File memory store loaded");
        Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// Default path: `~/.convoy/memory/memories.jsonl`
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".convoy")
            .join("memory")
            .join("memories.jsonl")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Vec<Memory> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Vec::new(), // not created yet
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<Memory>(line) {
                Ok(memory) => Some(memory),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted memory entry");
                    None
                }
            })
            .collect()
    }

    /// Rewrite the whole file from `entries`.
    async fn flush(&self, entries: &[Memory]) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                MemoryError::Storage(format!("Failed to create memory directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for memory in entries {
            let line = serde_json::to_string(memory)
                .map_err(|e| MemoryError::Storage(format!("Failed to serialize memory: {e}")))?;
            content.push_str(&line);
            content.push('\n');
        }

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to write memory file: {e}")))
    }
}

#[async_trait]
impl MemoryStore for FileMemoryStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn store(&self, memory: Memory) -> Result<(), MemoryError> {
        let mut entries = self.entries.write().await;
        entries.push(memory);
        self.flush(&entries).await
    }

    async fn all(&self) -> Result<Vec<Memory>, MemoryError> {
        Ok(self.entries.read().await.clone())
    }

    async fn recall(&self, prompt: &str) -> Result<Vec<Memory>, MemoryError> {
        let entries = self.entries.read().await;
        Ok(keyword_recall(&entries, prompt))
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        let mut entries = self.entries.write().await;
        entries.clear();
        self.flush(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_path() -> PathBuf {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        drop(tmp); // store creates the file on first write
        path
    }

    #[tokio::test]
    async fn store_persists_across_reload() {
        let path = temp_path();

        let mem = FileMemoryStore::new(path.clone());
        mem.store(Memory::new("Rust is great")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Rust is great"));

        let reloaded = FileMemoryStore::new(path);
        let all = reloaded.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content, "Rust is great");
    }

    #[tokio::test]
    async fn recall_finds_by_keyword() {
        let mem = FileMemoryStore::new(temp_path());
        mem.store(Memory::new("The user prefers Rust")).await.unwrap();
        mem.store(Memory::new("Python is also good")).await.unwrap();
        mem.store(Memory::new("Rust has great performance")).await.unwrap();

        let results = mem.recall("rust").await.unwrap();
        assert_eq!(results.len(), 2);
        for r in &results {
            assert!(r.content.to_lowercase().contains("rust"));
        }
    }

    #[tokio::test]
    async fn clear_persists() {
        let path = temp_path();
        let mem = FileMemoryStore::new(path.clone());
        mem.store(Memory::new("Entry 1")).await.unwrap();
        mem.store(Memory::new("Entry 2")).await.unwrap();
        mem.clear().await.unwrap();

        let reloaded = FileMemoryStore::new(path);
        assert!(reloaded.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("memories.jsonl");
        let mem = FileMemoryStore::new(path.clone());
        mem.store(Memory::new("deep")).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn handles_corrupted_lines() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, r#"{{"content":"valid","created_at":"2026-01-01T00:00:00Z"}}"#).unwrap();
        writeln!(tmp, "this is not json").unwrap();
        writeln!(tmp, r#"{{"content":"also valid","created_at":"2026-01-01T00:00:00Z"}}"#).unwrap();

        let mem = FileMemoryStore::new(tmp.path().to_path_buf());
        assert_eq!(mem.all().await.unwrap().len(), 2);
    }
}
