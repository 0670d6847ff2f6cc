//! Earliest Actor Provider
//!
//! wasmCloud capability provider that resolves, for batches of addresses, the
//! account that deployed each contract and the account that first funded each
//! address with a plain native-currency transfer.
//!
//! This provider:
//! - Listens on NATS subject `actors.earliest.lookup` (request/reply)
//! - Builds one parameterized query over the creation-trace and transaction tables
//! - Executes it against the DuckDB event corpus
//! - Replies with the deployment and funding tables as JSON
//!
//! Configuration via environment variables:
//! - NATS_URL: NATS server URL
//! - ACTOR_RESOLVER_*: query floor, decimals, tables, database path, execution hints

pub mod executor;
pub mod nats_listener;
pub mod provider;
pub mod resolver;

pub use executor::{DuckDbExecutor, QueryExecutor};
pub use nats_listener::{LookupListener, LookupListenerConfig};
pub use provider::EarliestActorProvider;
pub use resolver::EarliestActorResolver;

// Re-export common types
pub use earliest_actor_common::{
    ActorTables, Address, DeploymentTable, EarliestDeployment, EarliestFunding, ExecutionHints,
    FundingTable, LookupError, LookupRequest, LookupResponse, PerformanceTier, ResolverConfig,
};
