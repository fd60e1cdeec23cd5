//! Provider fallback: an ordered chain with per-provider timeouts.
//!
//! When a provider fails (timeout, rate limit, error), the next provider in
//! the chain is tried. The last error is returned if every entry fails.
//!
//! Every attempt is logged inside a `fallback` span carrying the chain name
//! and the flow the request belongs to.

use async_trait::async_trait;
use curalink_core::error::ProviderError;
use curalink_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, info, info_span, warn};

/// A provider that wraps an ordered list of providers and falls back on failure.
pub struct FallbackProvider {
    name: String,
    chain: Vec<FallbackEntry>,
}

struct FallbackEntry {
    provider: Arc<dyn Provider>,
    timeout: Duration,
}

impl FallbackEntry {
    /// One bounded call; running out of time becomes [`ProviderError::Timeout`].
    async fn call(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "Provider '{}' timed out after {}ms",
                self.provider.name(),
                self.timeout.as_millis()
            ))),
        }
    }
}

impl FallbackProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }

    /// Add a provider to the chain with its own timeout.
    pub fn add(mut self, provider: Arc<dyn Provider>, timeout: Duration) -> Self {
        self.chain.push(FallbackEntry { provider, timeout });
        self
    }

    /// Add a provider with the default timeout (120s).
    pub fn add_default(self, provider: Arc<dyn Provider>) -> Self {
        self.add(provider, Duration::from_secs(120))
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    async fn walk_chain(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let total = self.chain.len();
        let mut failure = None;

        for (index, entry) in self.chain.iter().enumerate() {
            let provider = entry.provider.name();
            let attempt = index + 1;
            debug!(provider, attempt, total, "Calling provider");

            match entry.call(request.clone()).await {
                Ok(response) if attempt > 1 => {
                    info!(provider, attempt, "Fallback provider answered");
                    return Ok(response);
                }
                Ok(response) => return Ok(response),
                Err(error) => {
                    warn!(provider, attempt, total, error = %error, "Provider failed");
                    failure = Some(error);
                }
            }
        }

        Err(failure.unwrap_or_else(|| {
            ProviderError::NotConfigured(format!("Fallback chain '{}' has no providers", self.name))
        }))
    }
}

#[async_trait]
impl Provider for FallbackProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let flow = request
            .response_schema
            .as_ref()
            .map_or("unnamed", |schema| schema.name.as_str())
            .to_string();
        let span = info_span!("fallback", fallback = %self.name, flow = %flow);
        self.walk_chain(request).instrument(span).await
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let mut all_models = Vec::new();
        for entry in &self.chain {
            if let Ok(models) = entry.provider.list_models().await {
                all_models.extend(models);
            }
        }
        Ok(all_models)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        for entry in &self.chain {
            if let Ok(true) = entry.provider.health_check().await {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
