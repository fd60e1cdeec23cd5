//! `curalink gateway`: Start the HTTP API server.

use anyhow::{Result, anyhow};

use super::load_config;

pub async fn run(port_override: Option<u16>) -> Result<()> {
    let mut config = load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("CuraLink Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Storage:   {}", config.storage.backend);

    curalink_gateway::start(config)
        .await
        .map_err(|e| anyhow!("Gateway stopped: {e}"))?;

    Ok(())
}
