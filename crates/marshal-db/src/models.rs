//! Database row models
//!
//! Read models mirror the ledger tables; conversions into core types live
//! here so the repository code stays query-focused.

use std::str::FromStr;

use marshal_core::{Address, DeployedInstance, Result, StepRecord};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A completed step
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StepRow {
    pub id: i64,
    pub network: String,
    pub step_order: i64,
    pub step_id: String,
    pub recorded_at: String,
}

impl StepRow {
    pub fn into_record(self, instances: Vec<DeployedInstance>) -> StepRecord {
        StepRecord {
            network: self.network,
            order: self.step_order as u64,
            step_id: self.step_id,
            recorded_at: Some(self.recorded_at),
            instances,
        }
    }
}

/// An instance produced by a completed step
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InstanceRow {
    pub id: i64,
    pub ledger_step_id: i64,
    pub network: String,
    pub step_order: i64,
    pub position: i64,
    pub artifact_name: String,
    pub binding_key: String,
    pub address: String,
    pub tx_hash: String,
    pub deployer: Option<String>,
    pub confirmed_at: i64,
}

impl InstanceRow {
    pub fn into_instance(self) -> Result<DeployedInstance> {
        let handle = parse_address(&self.address)?;
        let deployer = self.deployer.as_deref().map(parse_address).transpose()?;

        Ok(DeployedInstance {
            artifact: self.artifact_name,
            key: self.binding_key,
            network: self.network,
            handle,
            tx_hash: self.tx_hash,
            deployer,
            confirmed_at: self.confirmed_at as u64,
        })
    }
}

fn parse_address(value: &str) -> Result<Address> {
    Address::from_str(value)
        .map_err(|e| marshal_core::Error::Database(sqlx::Error::Decode(Box::new(e))))
}

/// Filter for listing recorded instances
#[derive(Debug, Default, Clone)]
pub struct InstanceFilter {
    /// Filter by network name
    pub network: Option<String>,
    /// Only the most recent instance per binding key
    pub latest_only: bool,
}

impl InstanceFilter {
    /// Create a filter for the latest instances on a network
    pub fn for_network(network: impl Into<String>) -> Self {
        Self {
            network: Some(network.into()),
            latest_only: true,
        }
    }
}
