//! Earliest Actor Common Library
//!
//! Shared query construction, row contracts, result tables, and configuration
//! for resolving, per address, who deployed it and who first funded it with a
//! native-currency transfer.
//!
//! Pipeline: [`EarliestActorQuery::build`] → execution backend →
//! [`decode_batches`] → [`split_rows`] → [`ActorTables`].

pub mod config;
pub mod error;
pub mod query;
pub mod rows;
pub mod schemas;
pub mod splitter;
pub mod tables;
pub mod types;

// Native-only modules (DuckDB access). Consumers compiled to WASM only depend
// on the pure query/contract layer.
#[cfg(not(target_family = "wasm"))]
pub mod connection;

pub use config::ResolverConfig;
pub use error::LookupError;
pub use query::EarliestActorQuery;
pub use rows::decode_batches;
pub use schemas::{
    actor_rows_schema, creation_traces_schema, deployments_schema, funding_schema,
    get_schema_for_table, transactions_schema, CREATION_TRACES_TABLE, DEPLOYMENT_COLUMNS,
    FUNDING_COLUMNS, TRANSACTIONS_TABLE,
};
pub use splitter::split_rows;
pub use tables::{encode_ipc_stream, ActorTables, DeploymentTable, FundingTable};
pub use types::*;

#[cfg(not(target_family = "wasm"))]
pub use connection::{create_corpus_tables, create_readonly_connection};

/// Result type alias for earliest-actor operations
pub type Result<T> = std::result::Result<T, LookupError>;
