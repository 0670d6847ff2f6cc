//! Earliest-actor resolution pipeline
//!
//! build query → execute → decode rows → split into tables

use std::sync::Arc;

use earliest_actor_common::{
    decode_batches, split_rows, ActorTables, Address, EarliestActorQuery, ExecutionHints,
    LookupError, ResolverConfig,
};
use tracing::{debug, error, info, instrument};

use crate::executor::QueryExecutor;

/// Resolves deployers and first funders for batches of addresses
pub struct EarliestActorResolver {
    query: EarliestActorQuery,
    executor: Arc<dyn QueryExecutor>,
    hints: ExecutionHints,
}

impl EarliestActorResolver {
    /// Create a resolver over an executor, using the config's query settings and hints
    pub fn new(config: &ResolverConfig, executor: Arc<dyn QueryExecutor>) -> Result<Self, LookupError> {
        Ok(Self {
            query: EarliestActorQuery::from_config(config)?,
            executor,
            hints: config.execution_hints(),
        })
    }

    /// Default execution hints
    pub fn hints(&self) -> ExecutionHints {
        self.hints
    }

    /// Resolve with the default hints.
    ///
    /// `Ok` with empty tables means nothing matched; any failure is an `Err`.
    pub async fn resolve(&self, addresses: &[Address]) -> Result<ActorTables, LookupError> {
        self.resolve_with_hints(addresses, &self.hints).await
    }

    /// Resolve with per-call execution hints
    #[instrument(skip(self, addresses, hints), fields(address_count = addresses.len(), tier = %hints.performance))]
    pub async fn resolve_with_hints(
        &self,
        addresses: &[Address],
        hints: &ExecutionHints,
    ) -> Result<ActorTables, LookupError> {
        let request = self.query.build(addresses)?;
        debug!(
            "Built earliest-actor query (floor={}, scale={})",
            self.query.min_block_number(),
            self.query.scale_factor()
        );

        let batches = self.executor.execute(&request, hints).await?;
        let rows = decode_batches(&batches)?;
        info!("Lookup returned {} rows", rows.len());

        let tables = split_rows(rows)?;
        info!(
            "Resolved {} deployments and {} funding records",
            tables.deployments.len(),
            tables.funding.len()
        );

        Ok(tables)
    }

    /// Resolve address strings, rejecting malformed ones before any query runs
    pub async fn resolve_strs<S: AsRef<str>>(
        &self,
        addresses: &[S],
        hints: &ExecutionHints,
    ) -> Result<ActorTables, LookupError> {
        let addresses = Address::parse_all(addresses)?;
        self.resolve_with_hints(&addresses, hints).await
    }

    /// Fail-soft resolution: any failure is logged and yields empty tables.
    ///
    /// Callers using this cannot tell "nothing matched" from "lookup failed";
    /// prefer [`resolve`](Self::resolve) where that matters.
    pub async fn resolve_or_empty(&self, addresses: &[Address]) -> ActorTables {
        match self.resolve(addresses).await {
            Ok(tables) => tables,
            Err(e) => {
                error!("Earliest-actor lookup failed ({}): {}", e.kind(), e);
                ActorTables::default()
            }
        }
    }
}
