//! Split the combined result set into per-source tables

use crate::error::LookupError;
use crate::tables::{ActorTables, DeploymentTable, FundingTable};
use crate::types::{ActorRow, EarliestDeployment, EarliestFunding, Source};

/// Partition tagged rows by source and reshape each partition.
///
/// Row order within each table follows input order. Deployments drop the
/// amount; a funding row without an amount is a shape error.
pub fn split_rows(rows: Vec<ActorRow>) -> Result<ActorTables, LookupError> {
    let mut deployments = Vec::new();
    let mut funding = Vec::new();

    for row in rows {
        match row.source {
            Source::Deployments => deployments.push(EarliestDeployment {
                contract_address: row.address,
                deployer: row.actor,
                transaction_id: row.transaction_id,
                block_number: row.block_number,
                block_time: row.block_time,
            }),
            Source::Funding => {
                let amount = row.amount.ok_or_else(|| {
                    LookupError::Shape(format!("Funding row for {} has no amount", row.address))
                })?;
                funding.push(EarliestFunding {
                    recipient: row.address,
                    funder: row.actor,
                    transaction_id: row.transaction_id,
                    block_number: row.block_number,
                    block_time: row.block_time,
                    amount,
                });
            }
        }
    }

    Ok(ActorTables {
        deployments: DeploymentTable::new(deployments),
        funding: FundingTable::new(funding),
    })
}
