//! Configuration for earliest-actor lookups
//!
//! One explicit configuration object carries everything the query builder and
//! the execution backend need. It is loaded from wasmCloud HostData properties
//! or from environment variables and handed to constructors; nothing is read
//! from process-global state after that.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::schemas::{is_valid_table_name, CREATION_TRACES_TABLE, TRANSACTIONS_TABLE};
use crate::types::{ExecutionHints, PerformanceTier};

/// Default minimum block number; earlier blocks are genesis/pre-launch noise.
pub const DEFAULT_MIN_BLOCK_NUMBER: i64 = 100_000;

/// Default native-asset decimals (wei -> ETH, jager -> BNB).
pub const DEFAULT_NATIVE_DECIMALS: u32 = 18;

/// Largest decimals value a DECIMAL(38, 0) value column can be scaled by.
const MAX_NATIVE_DECIMALS: u32 = 38;

/// Property keys understood by [`ResolverConfig::from_properties`].
///
/// Environment variables use the same names upper-cased.
const PROPERTY_KEYS: &[&str] = &[
    "actor_resolver_min_block_number",
    "actor_resolver_native_decimals",
    "actor_resolver_creation_table",
    "actor_resolver_transactions_table",
    "actor_resolver_database_path",
    "actor_resolver_performance",
    "actor_resolver_poll_interval_seconds",
    "actor_resolver_timeout_seconds",
    "actor_resolver_memory_limit_mb",
    "actor_resolver_threads",
    "actor_resolver_temp_dir",
];

/// Earliest-actor resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    // Query semantics
    /// Events below this block number are ignored by both branches
    pub min_block_number: i64,
    /// Decimals of the native asset; raw values are divided by 10^decimals
    pub native_decimals: u32,
    /// Table holding contract creation events
    pub creation_table: String,
    /// Table holding transactions (native value transfers)
    pub transactions_table: String,

    // Execution backend
    /// DuckDB database file holding the event corpus (in-memory when unset)
    pub database_path: Option<String>,
    /// Default performance tier for lookups
    pub performance: PerformanceTier,
    /// How often a running query is checked on, in seconds
    pub poll_interval_seconds: u64,
    /// Query timeout in seconds
    pub timeout_seconds: u64,
    /// Memory limit in MB per connection (medium tier; large doubles it)
    pub memory_limit_mb: usize,
    /// Number of threads per connection (medium tier; large doubles it)
    pub threads: usize,
    /// Temporary directory for DuckDB spill files
    pub temp_directory: String,
}

impl ResolverConfig {
    /// Load configuration from wasmCloud properties HashMap
    ///
    /// Properties (from wasmCloud link config):
    /// - actor_resolver_min_block_number, actor_resolver_native_decimals
    /// - actor_resolver_creation_table, actor_resolver_transactions_table
    /// - actor_resolver_database_path
    /// - actor_resolver_performance, actor_resolver_poll_interval_seconds
    /// - actor_resolver_timeout_seconds
    /// - actor_resolver_memory_limit_mb, actor_resolver_threads, actor_resolver_temp_dir
    pub fn from_properties(props: &HashMap<String, String>) -> Result<Self> {
        let defaults = Self::default();

        let min_block_number = parse_or(
            props,
            "actor_resolver_min_block_number",
            defaults.min_block_number,
        )?;
        let native_decimals = parse_or(
            props,
            "actor_resolver_native_decimals",
            defaults.native_decimals,
        )?;
        let creation_table = props
            .get("actor_resolver_creation_table")
            .cloned()
            .unwrap_or(defaults.creation_table);
        let transactions_table = props
            .get("actor_resolver_transactions_table")
            .cloned()
            .unwrap_or(defaults.transactions_table);
        let database_path = props
            .get("actor_resolver_database_path")
            .filter(|v| !v.is_empty())
            .cloned();

        let performance = match props.get("actor_resolver_performance") {
            Some(v) => v.parse()?,
            None => defaults.performance,
        };
        let poll_interval_seconds = parse_or(
            props,
            "actor_resolver_poll_interval_seconds",
            defaults.poll_interval_seconds,
        )?;
        let timeout_seconds = parse_or(
            props,
            "actor_resolver_timeout_seconds",
            defaults.timeout_seconds,
        )?;
        let memory_limit_mb = parse_or(
            props,
            "actor_resolver_memory_limit_mb",
            defaults.memory_limit_mb,
        )?;
        let threads = parse_or(props, "actor_resolver_threads", defaults.threads)?;
        let temp_directory = props
            .get("actor_resolver_temp_dir")
            .cloned()
            .unwrap_or(defaults.temp_directory);

        let config = Self {
            min_block_number,
            native_decimals,
            creation_table,
            transactions_table,
            database_path,
            performance,
            poll_interval_seconds,
            timeout_seconds,
            memory_limit_mb,
            threads,
            temp_directory,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Environment variables mirror the property keys, upper-cased:
    /// - ACTOR_RESOLVER_MIN_BLOCK_NUMBER, ACTOR_RESOLVER_NATIVE_DECIMALS
    /// - ACTOR_RESOLVER_CREATION_TABLE, ACTOR_RESOLVER_TRANSACTIONS_TABLE
    /// - ACTOR_RESOLVER_DATABASE_PATH, ACTOR_RESOLVER_PERFORMANCE
    /// - ACTOR_RESOLVER_POLL_INTERVAL_SECONDS, ACTOR_RESOLVER_TIMEOUT_SECONDS
    /// - ACTOR_RESOLVER_MEMORY_LIMIT_MB, ACTOR_RESOLVER_THREADS, ACTOR_RESOLVER_TEMP_DIR
    pub fn from_env() -> Result<Self> {
        let props: HashMap<String, String> = PROPERTY_KEYS
            .iter()
            .filter_map(|key| {
                env::var(key.to_uppercase())
                    .ok()
                    .map(|value| (key.to_string(), value))
            })
            .collect();

        Self::from_properties(&props)
    }

    /// Factor that converts raw smallest-unit values into native units
    pub fn scale_factor(&self) -> f64 {
        10f64.powi(self.native_decimals as i32)
    }

    /// Execution hints derived from the configured defaults
    pub fn execution_hints(&self) -> ExecutionHints {
        ExecutionHints {
            performance: self.performance,
            poll_interval: Duration::from_secs(self.poll_interval_seconds),
            timeout: Duration::from_secs(self.timeout_seconds),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.min_block_number < 0 {
            return Err(anyhow::anyhow!("Minimum block number cannot be negative"));
        }

        if self.native_decimals > MAX_NATIVE_DECIMALS {
            return Err(anyhow::anyhow!(
                "Native decimals must be at most {}",
                MAX_NATIVE_DECIMALS
            ));
        }

        for table in [&self.creation_table, &self.transactions_table] {
            if !is_valid_table_name(table) {
                return Err(anyhow::anyhow!("Invalid table name: {}", table));
            }
        }

        if self.poll_interval_seconds == 0 {
            return Err(anyhow::anyhow!("Poll interval must be greater than 0"));
        }

        if self.timeout_seconds == 0 {
            return Err(anyhow::anyhow!("Timeout must be greater than 0"));
        }

        if self.memory_limit_mb == 0 {
            return Err(anyhow::anyhow!("Memory limit must be greater than 0"));
        }

        if self.threads == 0 {
            return Err(anyhow::anyhow!("Thread count must be greater than 0"));
        }

        Ok(())
    }
}

/// Parse a numeric property, falling back to `default` only when it is absent
fn parse_or<T>(props: &HashMap<String, String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match props.get(key) {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {}", key, v)),
        None => Ok(default),
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_block_number: DEFAULT_MIN_BLOCK_NUMBER,
            native_decimals: DEFAULT_NATIVE_DECIMALS,
            creation_table: CREATION_TRACES_TABLE.to_string(),
            transactions_table: TRANSACTIONS_TABLE.to_string(),
            database_path: None,
            performance: PerformanceTier::Large,
            poll_interval_seconds: 5,
            timeout_seconds: 300,
            memory_limit_mb: 512,
            threads: 4,
            temp_directory: "/tmp/earliest-actor".to_string(),
        }
    }
}
