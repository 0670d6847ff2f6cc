//! Query execution against the event corpus
//!
//! [`QueryExecutor`] is the seam between the lookup pipeline and whatever runs
//! the SQL. [`DuckDbExecutor`] runs parameterized queries against a DuckDB
//! database and returns Arrow record batches.

use std::sync::Arc;
use std::time::Duration;

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use duckdb::InterruptHandle;
use earliest_actor_common::{
    create_readonly_connection, ExecutionHints, LookupError, PerformanceTier, QueryRequest,
    ResolverConfig, SqlParam,
};
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, instrument, warn};

/// Lower bound on the status-check cadence
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Execution capability for lookup queries
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a query and return its result batches.
    ///
    /// `hints` carry the performance tier, status-check cadence, and timeout.
    async fn execute(
        &self,
        request: &QueryRequest,
        hints: &ExecutionHints,
    ) -> Result<Vec<RecordBatch>, LookupError>;
}

/// DuckDB-backed executor
pub struct DuckDbExecutor {
    config: ResolverConfig,
}

impl DuckDbExecutor {
    /// Create a new executor
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Run the query on the current thread.
    ///
    /// The connection's interrupt handle is sent on `interrupt_tx` before the
    /// query starts.
    fn execute_sync(
        config: &ResolverConfig,
        request: &QueryRequest,
        tier: PerformanceTier,
        interrupt_tx: oneshot::Sender<Arc<InterruptHandle>>,
    ) -> Result<Vec<RecordBatch>, LookupError> {
        let start = std::time::Instant::now();
        debug!("Executing query: {}", request.query);

        let conn = create_readonly_connection(config, tier)?;
        // Receiver is gone only if the caller stopped waiting
        let _ = interrupt_tx.send(conn.interrupt_handle());

        let mut stmt = conn
            .prepare(&request.query)
            .map_err(|e| LookupError::Execution(format!("Failed to prepare query: {}", e)))?;

        let values: Vec<duckdb::types::Value> =
            request.parameters.iter().map(sql_param_to_value).collect();

        let batches: Vec<RecordBatch> = stmt
            .query_arrow(duckdb::params_from_iter(values))
            .map_err(|e| LookupError::Execution(format!("query_arrow failed: {}", e)))?
            .collect();

        info!(
            "Query executed: {} rows in {} batches, {}ms",
            batches.iter().map(RecordBatch::num_rows).sum::<usize>(),
            batches.len(),
            start.elapsed().as_millis()
        );

        Ok(batches)
    }

    /// Check if the corpus is reachable (opens a connection and runs `SELECT 1`)
    pub fn is_healthy(&self) -> bool {
        match create_readonly_connection(&self.config, PerformanceTier::Medium) {
            Ok(conn) => conn.execute("SELECT 1", []).is_ok(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl QueryExecutor for DuckDbExecutor {
    #[instrument(skip(self, request), fields(query_len = request.query.len(), tier = %hints.performance))]
    async fn execute(
        &self,
        request: &QueryRequest,
        hints: &ExecutionHints,
    ) -> Result<Vec<RecordBatch>, LookupError> {
        let config = self.config.clone();
        let owned_request = request.clone();
        let tier = hints.performance;
        let start = Instant::now();
        let (interrupt_tx, interrupt_rx) = oneshot::channel();

        let mut task = tokio::task::spawn_blocking(move || {
            Self::execute_sync(&config, &owned_request, tier, interrupt_tx)
        });

        let poll_interval = hints.poll_interval.max(MIN_POLL_INTERVAL);
        let mut status = interval_at(start + poll_interval, poll_interval);
        let deadline = tokio::time::sleep(hints.timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                joined = &mut task => {
                    return joined.map_err(|e| {
                        LookupError::Execution(format!("query task panicked: {}", e))
                    })?;
                }
                _ = status.tick() => {
                    debug!("Query still executing after {}ms", start.elapsed().as_millis());
                }
                _ = &mut deadline => {
                    warn!("Query timed out after {:?}, interrupting", hints.timeout);
                    break;
                }
            }
        }

        // Errors here mean the task ended before the connection opened
        if let Ok(handle) = interrupt_rx.await {
            // An interrupt issued before the query starts can be lost, so
            // repeat it until the blocking task returns.
            loop {
                handle.interrupt();
                tokio::select! {
                    _ = &mut task => break,
                    _ = tokio::time::sleep(MIN_POLL_INTERVAL) => {}
                }
            }
        } else {
            let _ = task.await;
        }

        info!(
            "Interrupted query released after {}ms",
            start.elapsed().as_millis()
        );
        Err(LookupError::Timeout(hints.timeout))
    }
}

fn sql_param_to_value(param: &SqlParam) -> duckdb::types::Value {
    use duckdb::types::Value;

    match param {
        SqlParam::Null => Value::Null,
        SqlParam::Bool(v) => Value::Boolean(*v),
        SqlParam::Int64(v) => Value::BigInt(*v),
        SqlParam::Float64(v) => Value::Double(*v),
        SqlParam::String(v) => Value::Text(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_creation() {
        let executor = DuckDbExecutor::new(ResolverConfig::default());
        assert!(executor.config().database_path.is_none());
    }

    #[test]
    fn test_in_memory_is_healthy() {
        let executor = DuckDbExecutor::new(ResolverConfig::default());
        assert!(executor.is_healthy());
    }

    #[test]
    fn test_sql_param_to_value() {
        use duckdb::types::Value;

        assert_eq!(sql_param_to_value(&SqlParam::Int64(7)), Value::BigInt(7));
        assert_eq!(
            sql_param_to_value(&SqlParam::String("0xabc".to_string())),
            Value::Text("0xabc".to_string())
        );
        assert_eq!(sql_param_to_value(&SqlParam::Null), Value::Null);
    }

    #[tokio::test]
    async fn test_parameterized_query() {
        let executor = DuckDbExecutor::new(ResolverConfig::default());
        let request = QueryRequest::new(
            "SELECT unnest(string_split(CAST($1 AS VARCHAR), ',')) AS a, CAST($2 AS BIGINT) AS b",
        )
        .with_parameters(vec![
            SqlParam::String("x,y".to_string()),
            SqlParam::Int64(42),
        ]);

        let batches = executor
            .execute(&request, &ExecutionHints::default())
            .await
            .unwrap();
        let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
        assert_eq!(rows, 2);
    }

    #[tokio::test]
    async fn test_malformed_query_is_execution_error() {
        let executor = DuckDbExecutor::new(ResolverConfig::default());
        let request = QueryRequest::new("SELEC nonsense FROM");

        let err = executor
            .execute(&request, &ExecutionHints::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::Execution(_)));
    }

    #[tokio::test]
    async fn test_timeout_interrupts_running_query() {
        let executor = DuckDbExecutor::new(ResolverConfig {
            threads: 1,
            ..ResolverConfig::default()
        });
        let request = QueryRequest::new(
            "SELECT sum(a.range * b.range) FROM range(40000) a, range(40000) b",
        );
        let hints = ExecutionHints::default()
            .with_poll_interval(Duration::from_millis(50))
            .with_timeout(Duration::from_millis(200));

        let start = std::time::Instant::now();
        let err = executor.execute(&request, &hints).await.unwrap_err();

        assert!(matches!(err, LookupError::Timeout(t) if t == Duration::from_millis(200)));
        assert_eq!(err.to_string(), "Query timed out after 200ms");
        // The blocking task has already finished when execute returns
        assert!(start.elapsed() < Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_missing_table_is_execution_error() {
        let executor = DuckDbExecutor::new(ResolverConfig::default());
        let request = QueryRequest::new("SELECT * FROM creation_traces");

        let err = executor
            .execute(&request, &ExecutionHints::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::Execution(_)));
    }
}
