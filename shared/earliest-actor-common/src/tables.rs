//! Output tables of an earliest-actor lookup
//!
//! Each table is an ordered list of typed rows with a fixed column layout
//! ([`DEPLOYMENT_COLUMNS`], [`FUNDING_COLUMNS`]). Tables can be materialized as
//! Arrow record batches and encoded as Arrow IPC streams for transport.

use std::sync::Arc;

use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::RecordBatch;
use arrow_array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use serde::{Deserialize, Serialize};

use crate::error::LookupError;
use crate::schemas::{deployments_schema, funding_schema, DEPLOYMENT_COLUMNS, FUNDING_COLUMNS};
use crate::types::{EarliestDeployment, EarliestFunding};

/// Earliest deployment per contract address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentTable {
    rows: Vec<EarliestDeployment>,
}

/// Earliest funding per recipient address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FundingTable {
    rows: Vec<EarliestFunding>,
}

/// Both lookup results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActorTables {
    pub deployments: DeploymentTable,
    pub funding: FundingTable,
}

impl DeploymentTable {
    pub const COLUMNS: [&'static str; 5] = DEPLOYMENT_COLUMNS;

    pub fn new(rows: Vec<EarliestDeployment>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[EarliestDeployment] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<EarliestDeployment> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Find the row for a contract address
    pub fn get(&self, contract_address: &str) -> Option<&EarliestDeployment> {
        self.rows
            .iter()
            .find(|r| r.contract_address == contract_address)
    }

    /// Materialize as an Arrow record batch in [`DEPLOYMENT_COLUMNS`] order
    pub fn to_record_batch(&self) -> Result<RecordBatch, LookupError> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                self.rows.iter().map(|r| r.contract_address.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                self.rows.iter().map(|r| r.deployer.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                self.rows.iter().map(|r| r.transaction_id.as_str()),
            )),
            Arc::new(Int64Array::from_iter_values(
                self.rows.iter().map(|r| r.block_number),
            )),
            Arc::new(
                TimestampMicrosecondArray::from_iter_values(
                    self.rows.iter().map(|r| r.block_time.timestamp_micros()),
                )
                .with_timezone("UTC"),
            ),
        ];

        Ok(RecordBatch::try_new(deployments_schema(), columns)?)
    }
}

impl FundingTable {
    pub const COLUMNS: [&'static str; 6] = FUNDING_COLUMNS;

    pub fn new(rows: Vec<EarliestFunding>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[EarliestFunding] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<EarliestFunding> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Find the row for a recipient address
    pub fn get(&self, recipient: &str) -> Option<&EarliestFunding> {
        self.rows.iter().find(|r| r.recipient == recipient)
    }

    /// Materialize as an Arrow record batch in [`FUNDING_COLUMNS`] order
    pub fn to_record_batch(&self) -> Result<RecordBatch, LookupError> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                self.rows.iter().map(|r| r.recipient.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                self.rows.iter().map(|r| r.funder.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                self.rows.iter().map(|r| r.transaction_id.as_str()),
            )),
            Arc::new(Int64Array::from_iter_values(
                self.rows.iter().map(|r| r.block_number),
            )),
            Arc::new(
                TimestampMicrosecondArray::from_iter_values(
                    self.rows.iter().map(|r| r.block_time.timestamp_micros()),
                )
                .with_timezone("UTC"),
            ),
            Arc::new(Float64Array::from_iter_values(
                self.rows.iter().map(|r| r.amount),
            )),
        ];

        Ok(RecordBatch::try_new(funding_schema(), columns)?)
    }
}

impl ActorTables {
    pub fn is_empty(&self) -> bool {
        self.deployments.is_empty() && self.funding.is_empty()
    }
}

/// Encode a record batch as an Arrow IPC stream
pub fn encode_ipc_stream(batch: &RecordBatch) -> Result<Vec<u8>, LookupError> {
    let mut out = Vec::new();
    {
        let mut writer = StreamWriter::try_new(&mut out, &batch.schema())?;
        writer.write(batch)?;
        writer.finish()?;
    }
    Ok(out)
}
