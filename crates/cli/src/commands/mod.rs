pub mod chat;
pub mod doctor;
pub mod flows;
pub mod gateway;
pub mod onboard;

use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use curalink_config::AppConfig;
use curalink_flows::{FlowRunner, FlowSet, FlowSettings};
use tracing::warn;

pub fn load_config() -> Result<AppConfig> {
    AppConfig::load().context("Failed to load config")
}

/// Every flow, wired to the configured default provider.
pub fn build_flows(config: &AppConfig) -> Result<Arc<FlowSet>> {
    let router = curalink_providers::build_from_config(config);
    let provider = router
        .default()
        .with_context(|| format!("Provider '{}' is not configured", router.default_name()))?;

    if !config.has_api_key() {
        warn!("No API key configured; flows will answer with their fallbacks");
    }

    let runner = Arc::new(FlowRunner::new(provider, FlowSettings::from_config(config)));
    let flows = FlowSet::new(runner, config.directory.doctors.clone())
        .context("Failed to compile flow templates")?;
    Ok(Arc::new(flows))
}

/// The argument if given, otherwise all of stdin.
pub fn arg_or_stdin(arg: Option<String>) -> Result<String> {
    match arg {
        Some(text) => Ok(text),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}
