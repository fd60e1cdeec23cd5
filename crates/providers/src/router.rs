//! Provider router: selects the generation provider named in config.

use curalink_core::provider::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::fallback::FallbackProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Router name of the chain built from `flows.fallback`.
pub const FALLBACK_CHAIN: &str = "fallback";

/// Holds the configured providers and knows which one is the default.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// The provider flows should use.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    pub fn default_name(&self) -> &str {
        &self.default_provider
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Build providers from configuration.
///
/// Every entry under `[providers]` becomes an OpenAI-compatible provider.
/// The default provider is always registered, even when it has no section.
/// When `flows.fallback` names further providers, the default becomes a
/// [`FallbackProvider`] chain that splits the flow timeout between entries.
pub fn build_from_config(config: &curalink_config::AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();
        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(name));

        router.register(
            name.clone(),
            Arc::new(OpenAiCompatProvider::new(name, &base_url, &api_key)),
        );
    }

    if router.get(&config.default_provider).is_none() {
        let api_key = config.api_key.clone().unwrap_or_default();
        let base_url = default_base_url(&config.default_provider);
        router.register(
            config.default_provider.clone(),
            Arc::new(OpenAiCompatProvider::new(
                &config.default_provider,
                &base_url,
                &api_key,
            )),
        );
    }

    if !config.flows.fallback.is_empty() {
        let members: Vec<Arc<dyn Provider>> = std::iter::once(&config.default_provider)
            .chain(&config.flows.fallback)
            .filter_map(|name| {
                let provider = router.get(name);
                if provider.is_none() {
                    warn!(provider = %name, "Skipping fallback provider without a [providers] section");
                }
                provider
            })
            .collect();

        let budget = Duration::from_secs(config.flows.timeout_secs) / members.len() as u32;
        let per_entry = budget.max(Duration::from_secs(1));
        let chain = members
            .into_iter()
            .fold(FallbackProvider::new(FALLBACK_CHAIN), |chain, provider| {
                chain.add(provider, per_entry)
            });

        router.register(FALLBACK_CHAIN, Arc::new(chain));
        router.default_provider = FALLBACK_CHAIN.into();
    }

    router
}

/// Default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
