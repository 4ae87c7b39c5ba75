//! Error types for the Convoy domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Convoy operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Memory / history errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Conversation control ---
    /// The conversation recursed past its configured depth bound. Never retried.
    #[error("Max depth ({max_depth}) reached")]
    DepthExceeded { max_depth: usize },

    /// The caller cancelled a streaming request before it finished.
    #[error("Request cancelled")]
    Cancelled,

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unknown provider error: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// Whether the failure is transient and worth another attempt.
    ///
    /// Rate limits, network hiccups, timeouts and 5xx responses qualify.
    /// Authentication, bad requests and cancellation never do.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network(_) | Self::Timeout(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500 || *status_code == 429,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

/// A malformed `<tools>` block.
///
/// Carries the offending raw block alongside the message so a bad model turn
/// can be diagnosed. "No tools block at all" is also reported this way, with
/// the whole input as the block.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ToolParseError {
    pub message: String,
    pub block: String,
}

impl ToolParseError {
    pub fn new(message: impl Into<String>, block: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            block: block.into(),
        }
    }
}
