//! wasmCloud provider implementation for earliest-actor lookups
//!
//! Implements the wasmCloud provider lifecycle.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use wasmcloud_provider_sdk::Provider;

use earliest_actor_common::ResolverConfig;

use crate::executor::DuckDbExecutor;
use crate::nats_listener::{LookupListener, LookupListenerConfig};
use crate::resolver::EarliestActorResolver;

/// Earliest Actor Provider
#[derive(Clone)]
pub struct EarliestActorProvider {
    executor: Arc<DuckDbExecutor>,
    resolver: Arc<EarliestActorResolver>,
    nats_config: LookupListenerConfig,
}

impl EarliestActorProvider {
    /// Create a new provider with configuration from wasmCloud HostData.
    #[instrument(skip(config))]
    pub fn with_config(config: HashMap<String, String>) -> Result<Self> {
        info!("Creating Earliest Actor Provider with config from HostData");

        let resolver_config = if !config.is_empty() {
            ResolverConfig::from_properties(&config)?
        } else {
            ResolverConfig::from_env()?
        };

        let nats_config = if !config.is_empty() {
            LookupListenerConfig::from_properties(&config)
        } else {
            LookupListenerConfig::from_env()
        };

        let executor = Arc::new(DuckDbExecutor::new(resolver_config.clone()));
        let resolver = EarliestActorResolver::new(&resolver_config, executor.clone())
            .context("Failed to build earliest-actor resolver")?;

        Ok(Self {
            executor,
            resolver: Arc::new(resolver),
            nats_config,
        })
    }

    /// Create a new provider from environment variables
    #[instrument]
    pub fn new() -> Result<Self> {
        Self::with_config(HashMap::new())
    }

    /// Resolver shared with the listener
    pub fn resolver(&self) -> Arc<EarliestActorResolver> {
        Arc::clone(&self.resolver)
    }

    /// Start the provider
    #[instrument(skip(self))]
    pub async fn start(self: Arc<Self>) -> Result<()> {
        info!("Starting Earliest Actor Provider");

        if !self.executor.is_healthy() {
            return Err(anyhow::anyhow!("Failed to verify event corpus connection"));
        }
        info!("Event corpus connection verified");

        let listener = LookupListener::new(self.nats_config.clone(), self.resolver());

        // Blocks until the NATS subscription ends
        listener.start().await?;

        info!("Earliest Actor Provider stopped");
        Ok(())
    }

    /// Check provider health
    pub fn is_healthy(&self) -> bool {
        self.executor.is_healthy()
    }
}

impl Provider for EarliestActorProvider {}
