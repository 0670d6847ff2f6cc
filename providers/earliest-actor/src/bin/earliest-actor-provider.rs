//! Earliest Actor Provider binary entry point
//!
//! Runs as a wasmCloud capability provider answering deployer/first-funder
//! lookups over NATS.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wasmcloud_provider_sdk::{load_host_data, run_provider};

use earliest_actor_provider::EarliestActorProvider;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("earliest_actor_provider=info".parse()?)
                .add_directive("earliest_actor_common=info".parse()?),
        )
        .init();

    info!("Earliest Actor Provider - starting (v{})", env!("CARGO_PKG_VERSION"));

    // HostData from wasmCloud, env vars for local runs
    let config: HashMap<String, String> = match load_host_data() {
        Ok(host_data) => {
            info!("[MAIN] Received HostData from wasmCloud");
            info!("[MAIN] Host ID: {:?}", host_data.host_id);
            info!("[MAIN] Config entries: {}", host_data.config.len());
            host_data.config.clone()
        }
        Err(e) => {
            warn!(
                "[MAIN] Failed to load HostData: {}. Falling back to env vars.",
                e
            );
            HashMap::new()
        }
    };

    let provider = EarliestActorProvider::with_config(config)?;
    let runtime_provider = provider.clone();
    let provider = Arc::new(provider);

    info!("[MAIN] Provider initialized, running until SIGTERM/SIGINT");

    tokio::spawn(async move {
        if let Err(e) = provider.start().await {
            error!("Provider error: {}", e);
        }
    });

    let handler = run_provider(runtime_provider, "earliest-actor-provider")
        .await
        .context("Provider runtime error")?;
    handler.await;

    info!("[SHUTDOWN] Earliest Actor Provider shutdown complete");
    Ok(())
}
