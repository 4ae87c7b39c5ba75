//! A provider wrapper that applies a [`RetryPolicy`] to every call.

use async_trait::async_trait;
use convoy_core::error::ProviderError;
use convoy_core::provider::*;
use std::sync::Arc;
use tracing::debug;

use crate::retry::RetryPolicy;

/// Retries `complete`, opening a stream and `list_models` on the inner
/// provider. Once a stream is open, mid-stream failures are not retried.
pub struct RetryingProvider {
    inner: Arc<dyn Provider>,
    policy: RetryPolicy<ProviderError>,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn Provider>, policy: RetryPolicy<ProviderError>) -> Self {
        Self { inner, policy }
    }

    /// Wrap with [`RetryPolicy::transient`].
    pub fn transient(inner: Arc<dyn Provider>) -> Self {
        Self::new(inner, RetryPolicy::transient())
    }

    pub fn policy(&self) -> &RetryPolicy<ProviderError> {
        &self.policy
    }
}

#[async_trait]
impl Provider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn supports_native_tools(&self) -> bool {
        self.inner.supports_native_tools()
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError> {
        debug!(provider = self.inner.name(), "Retrying provider: complete");
        self.policy
            .execute("complete", || self.inner.complete(request.clone()))
            .await
    }

    async fn stream(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<EventStream, ProviderError> {
        debug!(provider = self.inner.name(), "Retrying provider: stream");
        self.policy
            .execute("stream", || self.inner.stream(request.clone()))
            .await
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        self.policy
            .execute("list_models", || self.inner.list_models())
            .await
    }
}
