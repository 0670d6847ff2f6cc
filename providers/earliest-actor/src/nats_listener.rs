//! NATS listener for earliest-actor lookups
//!
//! Listens to `actors.earliest.lookup` (configurable). Each request carries a
//! JSON [`LookupRequest`]; the reply is a JSON [`LookupResponse`] tagged with
//! `status: "ok"` or `status: "error"`.

use anyhow::{Context, Result};
use earliest_actor_common::{LookupError, LookupRequest, LookupResponse};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::resolver::EarliestActorResolver;

const DEFAULT_NATS_URL: &str = "nats://localhost:4222";
const DEFAULT_LOOKUP_SUBJECT: &str = "actors.earliest.lookup";

/// NATS listener configuration
#[derive(Debug, Clone)]
pub struct LookupListenerConfig {
    /// NATS server URL
    pub nats_url: String,
    /// Subject for lookup requests
    pub lookup_subject: String,
}

impl LookupListenerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let nats_url = std::env::var("NATS_URL").unwrap_or_else(|_| DEFAULT_NATS_URL.to_string());

        let lookup_subject = std::env::var("ACTOR_RESOLVER_LOOKUP_SUBJECT")
            .unwrap_or_else(|_| DEFAULT_LOOKUP_SUBJECT.to_string());

        Self {
            nats_url,
            lookup_subject,
        }
    }

    /// Load configuration from wasmCloud HostData properties.
    pub fn from_properties(props: &HashMap<String, String>) -> Self {
        let nats_url = props
            .get("nats_url")
            .or_else(|| props.get("NATS_URL"))
            .cloned()
            .unwrap_or_else(|| DEFAULT_NATS_URL.to_string());

        let lookup_subject = props
            .get("actor_resolver_lookup_subject")
            .or_else(|| props.get("ACTOR_RESOLVER_LOOKUP_SUBJECT"))
            .cloned()
            .unwrap_or_else(|| DEFAULT_LOOKUP_SUBJECT.to_string());

        Self {
            nats_url,
            lookup_subject,
        }
    }
}

/// NATS listener for lookup requests
pub struct LookupListener {
    config: LookupListenerConfig,
    resolver: Arc<EarliestActorResolver>,
}

impl LookupListener {
    /// Create a new lookup listener
    pub fn new(config: LookupListenerConfig, resolver: Arc<EarliestActorResolver>) -> Self {
        Self { config, resolver }
    }

    /// Start listening for lookup requests
    #[instrument(skip(self))]
    pub async fn start(self) -> Result<()> {
        info!("Connecting to NATS at {}", self.config.nats_url);

        let client = async_nats::connect(&self.config.nats_url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        let mut subscriber = client
            .subscribe(self.config.lookup_subject.clone())
            .await
            .context("Failed to subscribe to lookup subject")?;

        info!(
            "Earliest-actor lookup listener is ready on {}",
            self.config.lookup_subject
        );

        while let Some(message) = subscriber.next().await {
            let response = self.process_lookup(&message.payload).await;

            let Some(reply_subject) = message.reply else {
                warn!("Lookup request on {} has no reply subject", message.subject);
                continue;
            };

            let response_bytes = serde_json::to_vec(&response).unwrap_or_else(|e| {
                format!(
                    r#"{{"status": "error", "kind": "serialization", "message": "{}"}}"#,
                    e.to_string().replace('"', "'")
                )
                .into_bytes()
            });
            if let Err(e) = client.publish(reply_subject, response_bytes.into()).await {
                error!("Failed to send lookup response: {}", e);
            }
        }

        warn!("Lookup subscription ended");
        Ok(())
    }

    /// Process one lookup request payload
    #[instrument(skip(self, payload), fields(payload_len = payload.len()))]
    pub async fn process_lookup(&self, payload: &[u8]) -> LookupResponse {
        let request: LookupRequest = match serde_json::from_slice(payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse lookup request: {}", e);
                return LookupResponse::from(&LookupError::Construction(format!(
                    "Invalid request: {}",
                    e
                )));
            }
        };

        info!("Processing lookup for {} addresses", request.addresses.len());

        let hints = request.hints(self.resolver.hints());
        match self.resolver.resolve_strs(request.addresses.as_slice(), &hints).await {
            Ok(tables) => LookupResponse::Ok {
                deployments: tables.deployments.into_rows(),
                funding: tables.funding.into_rows(),
            },
            Err(e) => {
                error!("Lookup failed: {}", e);
                LookupResponse::from(&e)
            }
        }
    }
}
