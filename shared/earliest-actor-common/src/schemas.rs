//! Arrow schemas for the event corpus and the lookup result shapes
//!
//! The corpus tables follow the layout of the indexed chain tables the
//! lookups run against: one row per contract creation trace and one row per
//! transaction, keyed by block number and transaction index.

use arrow_schema::{DataType, Field, Schema, TimeUnit};
use regex::Regex;
use std::sync::Arc;

// Corpus table names
pub const CREATION_TRACES_TABLE: &str = "creation_traces";
pub const TRANSACTIONS_TABLE: &str = "transactions";

// Combined result columns, in query output order
pub const COL_QUERY_TYPE: &str = "query_type";
pub const COL_ADDRESS: &str = "address";
pub const COL_ACTOR: &str = "actor";
pub const COL_TX_HASH: &str = "tx_hash";
pub const COL_BLOCK_NUMBER: &str = "block_number";
pub const COL_BLOCK_TIME: &str = "block_time";
pub const COL_AMOUNT: &str = "amount";

/// Output columns of the deployment table
pub const DEPLOYMENT_COLUMNS: [&str; 5] = [
    "contract_address",
    "deployer",
    "transaction_id",
    "block_number",
    "block_time",
];

/// Output columns of the funding table
pub const FUNDING_COLUMNS: [&str; 6] = [
    "recipient",
    "funder",
    "transaction_id",
    "block_number",
    "block_time",
    "amount",
];

fn block_timestamp_field(name: &str) -> Field {
    Field::new(
        name,
        DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
        false,
    )
}

/// Create Arrow schema for the creation_traces table
///
/// One row per contract creation (CREATE/CREATE2), including factory deployments.
pub fn creation_traces_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("address", DataType::Utf8, false), // created contract
        Field::new("from_address", DataType::Utf8, false), // deployer
        Field::new("transaction_hash", DataType::Utf8, false),
        Field::new("transaction_index", DataType::Int32, false),
        Field::new("block_number", DataType::Int64, false),
        Field::new(
            "block_timestamp",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            false,
        ),
    ]))
}

/// Create Arrow schema for the transactions table
///
/// Only the columns the funding branch reads. `value` is the raw smallest-unit
/// integer; `input_data` is NULL, empty, or `0x` for plain value transfers.
pub fn transactions_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("from_address", DataType::Utf8, true),
        Field::new("to_address", DataType::Utf8, true),
        Field::new("value", DataType::Decimal128(38, 0), true),
        Field::new("input_data", DataType::Utf8, true),
        Field::new("transaction_hash", DataType::Utf8, false),
        Field::new("transaction_index", DataType::Int32, false),
        Field::new("block_number", DataType::Int64, false),
        Field::new(
            "block_timestamp",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            false,
        ),
    ]))
}

/// Schema of the combined, tagged result set
///
/// `block_time` travels as epoch microseconds so every backend can produce it.
pub fn actor_rows_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(COL_QUERY_TYPE, DataType::Utf8, false),
        Field::new(COL_ADDRESS, DataType::Utf8, false),
        Field::new(COL_ACTOR, DataType::Utf8, false),
        Field::new(COL_TX_HASH, DataType::Utf8, false),
        Field::new(COL_BLOCK_NUMBER, DataType::Int64, false),
        Field::new(COL_BLOCK_TIME, DataType::Int64, false),
        Field::new(COL_AMOUNT, DataType::Float64, true),
    ]))
}

/// Schema of the deployment output table
pub fn deployments_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(DEPLOYMENT_COLUMNS[0], DataType::Utf8, false),
        Field::new(DEPLOYMENT_COLUMNS[1], DataType::Utf8, false),
        Field::new(DEPLOYMENT_COLUMNS[2], DataType::Utf8, false),
        Field::new(DEPLOYMENT_COLUMNS[3], DataType::Int64, false),
        block_timestamp_field(DEPLOYMENT_COLUMNS[4]),
    ]))
}

/// Schema of the funding output table
pub fn funding_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(FUNDING_COLUMNS[0], DataType::Utf8, false),
        Field::new(FUNDING_COLUMNS[1], DataType::Utf8, false),
        Field::new(FUNDING_COLUMNS[2], DataType::Utf8, false),
        Field::new(FUNDING_COLUMNS[3], DataType::Int64, false),
        block_timestamp_field(FUNDING_COLUMNS[4]),
        Field::new(FUNDING_COLUMNS[5], DataType::Float64, false),
    ]))
}

/// Get the corpus schema for a table name
pub fn get_schema_for_table(table_name: &str) -> Option<Arc<Schema>> {
    match table_name {
        CREATION_TRACES_TABLE => Some(creation_traces_schema()),
        TRANSACTIONS_TABLE => Some(transactions_schema()),
        _ => None,
    }
}

/// Whether a configured table name is safe to splice into SQL.
///
/// Table names cannot be bound as parameters, so they are restricted to
/// dotted identifiers (`transactions`, `bnb.creation_traces`).
pub fn is_valid_table_name(name: &str) -> bool {
    match Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*){0,2}$") {
        Ok(re) => re.is_match(name),
        Err(_) => false,
    }
}

/// Convert Arrow DataType to DuckDB SQL type string
pub fn arrow_type_to_duckdb(data_type: &DataType) -> String {
    match data_type {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => "VARCHAR".to_string(),
        DataType::Int32 => "INTEGER".to_string(),
        DataType::Int64 => "BIGINT".to_string(),
        DataType::Float64 => "DOUBLE".to_string(),
        DataType::Boolean => "BOOLEAN".to_string(),
        DataType::Timestamp(TimeUnit::Microsecond, None) => "TIMESTAMP".to_string(),
        DataType::Timestamp(TimeUnit::Microsecond, Some(_)) => {
            "TIMESTAMP WITH TIME ZONE".to_string()
        }
        DataType::Decimal128(precision, scale) => format!("DECIMAL({}, {})", precision, scale),
        other => format!("{:?}", other).to_uppercase(),
    }
}

/// Generate CREATE TABLE IF NOT EXISTS DDL from an Arrow schema
pub fn create_table_sql(table_name: &str, schema: &Schema) -> String {
    let columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|field| {
            let nullability = if field.is_nullable() { "" } else { " NOT NULL" };
            format!(
                "    {} {}{}",
                field.name(),
                arrow_type_to_duckdb(field.data_type()),
                nullability
            )
        })
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
        table_name,
        columns.join(",\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lookup() {
        assert!(get_schema_for_table(CREATION_TRACES_TABLE).is_some());
        assert!(get_schema_for_table(TRANSACTIONS_TABLE).is_some());
        assert!(get_schema_for_table("blocks").is_none());
    }

    #[test]
    fn test_output_schemas_follow_column_order() {
        let names: Vec<String> = deployments_schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, DEPLOYMENT_COLUMNS);

        let names: Vec<String> = funding_schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, FUNDING_COLUMNS);
    }

    #[test]
    fn test_table_name_validation() {
        assert!(is_valid_table_name("transactions"));
        assert!(is_valid_table_name("bnb.creation_traces"));
        assert!(is_valid_table_name("lake.bnb.transactions"));
        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("1transactions"));
        assert!(!is_valid_table_name("transactions t"));
        assert!(!is_valid_table_name("transactions;--"));
        assert!(!is_valid_table_name("a.b.c.d"));
    }

    #[test]
    fn test_create_table_sql() {
        let ddl = create_table_sql(TRANSACTIONS_TABLE, &transactions_schema());
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS transactions ("));
        assert!(ddl.contains("value DECIMAL(38, 0)"));
        assert!(ddl.contains("block_number BIGINT NOT NULL"));
        assert!(ddl.contains("block_timestamp TIMESTAMP NOT NULL"));
        assert!(ddl.contains("input_data VARCHAR,"));
    }
}
