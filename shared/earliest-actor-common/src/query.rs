//! Combined earliest-deployment / earliest-funding query
//!
//! Builds one parameterized SQL statement with two branches over the event
//! corpus, each keeping the earliest qualifying event per queried address,
//! unioned into a single tagged result set:
//!
//! | query_type  | address | actor | tx_hash | block_number | block_time | amount |
//! |-------------|---------|-------|---------|--------------|------------|--------|
//! | deployments | contract | deployer | ... | ... | epoch µs | NULL |
//! | funding     | recipient | funder | ... | ... | epoch µs | native units |
//!
//! Bound parameters:
//! - `$1` comma-joined address list, split inside SQL
//! - `$2` minimum block number
//! - `$3` native-asset scaling factor
//!
//! Ties on block number are broken by transaction index, then transaction hash.

use std::collections::HashSet;

use crate::config::ResolverConfig;
use crate::error::LookupError;
use crate::schemas::is_valid_table_name;
use crate::types::{Address, QueryRequest, SqlParam, Source};

/// Builder for the combined earliest-actor query
#[derive(Debug, Clone)]
pub struct EarliestActorQuery {
    creation_table: String,
    transactions_table: String,
    min_block_number: i64,
    scale_factor: f64,
}

impl EarliestActorQuery {
    /// Create a builder from resolver configuration
    pub fn from_config(config: &ResolverConfig) -> Result<Self, LookupError> {
        for table in [&config.creation_table, &config.transactions_table] {
            if !is_valid_table_name(table) {
                return Err(LookupError::Construction(format!(
                    "Invalid table name: {}",
                    table
                )));
            }
        }

        Ok(Self {
            creation_table: config.creation_table.clone(),
            transactions_table: config.transactions_table.clone(),
            min_block_number: config.min_block_number,
            scale_factor: config.scale_factor(),
        })
    }

    pub fn min_block_number(&self) -> i64 {
        self.min_block_number
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Build the query for a batch of addresses.
    ///
    /// Duplicate addresses are collapsed, keeping first-seen order. An empty
    /// batch is rejected instead of producing a query that cannot match.
    pub fn build(&self, addresses: &[Address]) -> Result<QueryRequest, LookupError> {
        if addresses.is_empty() {
            return Err(LookupError::Construction(
                "Address list cannot be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(addresses.len());
        for address in addresses {
            if seen.insert(address.as_str()) {
                unique.push(address.as_str());
            }
        }
        let address_list = unique.join(",");

        Ok(QueryRequest::new(self.sql()).with_parameters(vec![
            SqlParam::String(address_list),
            SqlParam::Int64(self.min_block_number),
            SqlParam::Float64(self.scale_factor),
        ]))
    }

    fn sql(&self) -> String {
        let deployments = Source::Deployments.tag();
        let funding = Source::Funding.tag();

        format!(
            r#"WITH address_list AS (
    SELECT DISTINCT target_address
    FROM (SELECT unnest(string_split(CAST($1 AS VARCHAR), ',')) AS target_address)
),
deployments AS (
    SELECT
        al.target_address AS contract_address,
        ct.from_address AS deployer,
        ct.transaction_hash AS tx_hash,
        ct.block_number,
        ct.block_timestamp,
        ROW_NUMBER() OVER (
            PARTITION BY al.target_address
            ORDER BY ct.block_number ASC, ct.transaction_index ASC, ct.transaction_hash ASC
        ) AS rn
    FROM address_list al
    LEFT JOIN {creation} ct ON ct.address = al.target_address
        AND ct.block_number >= CAST($2 AS BIGINT)
),
funding AS (
    SELECT
        al.target_address AS recipient,
        t.from_address AS funder,
        t.transaction_hash AS tx_hash,
        t.block_number,
        t.block_timestamp,
        CAST(t.value AS DOUBLE) / CAST($3 AS DOUBLE) AS amount,
        ROW_NUMBER() OVER (
            PARTITION BY al.target_address
            ORDER BY t.block_number ASC, t.transaction_index ASC, t.transaction_hash ASC
        ) AS rn
    FROM address_list al
    LEFT JOIN {transactions} t ON t.to_address = al.target_address
        AND t.block_number >= CAST($2 AS BIGINT)
        AND t.value > 0
        AND (t.input_data IS NULL OR t.input_data IN ('', '0x'))
)
SELECT
    '{deployments}' AS query_type,
    contract_address AS address,
    deployer AS actor,
    tx_hash,
    block_number,
    epoch_us(block_timestamp) AS block_time,
    CAST(NULL AS DOUBLE) AS amount
FROM deployments
WHERE rn = 1 AND block_number IS NOT NULL

UNION ALL

SELECT
    '{funding}' AS query_type,
    recipient AS address,
    funder AS actor,
    tx_hash,
    block_number,
    epoch_us(block_timestamp) AS block_time,
    amount
FROM funding
WHERE rn = 1 AND block_number IS NOT NULL

ORDER BY query_type, address"#,
            creation = self.creation_table,
            transactions = self.transactions_table,
            deployments = deployments,
            funding = funding,
        )
    }
}
