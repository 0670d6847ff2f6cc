//! DuckDB connection management for the event corpus
//!
//! Lookups open the configured database file read-only. Without a configured
//! path an in-memory database is used, which is only useful once corpus tables
//! have been created and loaded in it.

use duckdb::{AccessMode, Config, Connection};
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::error::LookupError;
use crate::schemas::{create_table_sql, creation_traces_schema, transactions_schema};
use crate::types::PerformanceTier;

/// Open a read-only connection sized for the requested performance tier.
///
/// The large tier doubles the configured thread and memory baseline.
pub fn create_readonly_connection(
    config: &ResolverConfig,
    tier: PerformanceTier,
) -> Result<Connection, LookupError> {
    let conn = match &config.database_path {
        Some(path) => {
            debug!("Opening event corpus {} read-only", path);
            let db_config = Config::default().access_mode(AccessMode::ReadOnly)?;
            Connection::open_with_flags(path, db_config).map_err(|e| {
                warn!("Failed to open event corpus {}: {}", path, e);
                LookupError::Execution(format!("Failed to open {}: {}", path, e))
            })?
        }
        None => {
            debug!("No database path configured, opening in-memory DuckDB");
            Connection::open_in_memory()?
        }
    };

    let threads = config.threads * tier.multiplier();
    let memory_limit_mb = config.memory_limit_mb * tier.multiplier();
    conn.execute_batch(&format!(
        "SET memory_limit = '{}MB';
         SET threads = {};
         SET temp_directory = '{}';",
        memory_limit_mb,
        threads,
        config.temp_directory.replace('\'', "''")
    ))
    .map_err(|e| {
        warn!("Failed to configure DuckDB: {}", e);
        LookupError::Config(format!("Failed to configure DuckDB: {}", e))
    })?;

    info!(
        "DuckDB connection ready (tier={}, memory={}MB, threads={})",
        tier, memory_limit_mb, threads
    );

    Ok(conn)
}

/// Create the corpus tables named in the configuration if they are missing
pub fn create_corpus_tables(conn: &Connection, config: &ResolverConfig) -> Result<(), LookupError> {
    for (table, schema) in [
        (&config.creation_table, creation_traces_schema()),
        (&config.transactions_table, transactions_schema()),
    ] {
        let ddl = create_table_sql(table, &schema);
        debug!("Creating corpus table: {}", ddl);
        conn.execute_batch(&ddl)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_connection() {
        let config = ResolverConfig::default();
        let conn = create_readonly_connection(&config, PerformanceTier::Medium).unwrap();
        create_corpus_tables(&conn, &config).unwrap();

        let count: i64 = conn
            .query_row("SELECT count(*) FROM creation_traces", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_missing_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ResolverConfig {
            database_path: Some(dir.path().join("missing.duckdb").display().to_string()),
            ..ResolverConfig::default()
        };

        let err = create_readonly_connection(&config, PerformanceTier::Large).unwrap_err();
        assert!(matches!(err, LookupError::Execution(_)));
    }
}
