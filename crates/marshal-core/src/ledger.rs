//! Deployment ledger
//!
//! The ledger is the durable, per-network record of completed migration
//! steps and the instances they produced. It is what makes runs resumable:
//! a step present in the ledger is never executed again on that network.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::types::{DeployedInstance, StepRecord};

/// Persistent record of completed steps, partitioned by network
#[async_trait]
pub trait DeploymentLedger: Send + Sync {
    /// Highest completed step order on `network`, 0 if the network is unseen
    async fn last_completed(&self, network: &str) -> Result<u64>;

    /// Atomically record a completed step and its instances
    ///
    /// Returns `false` without touching anything when `(network, order)` is
    /// already recorded.
    async fn record_step(
        &self,
        network: &str,
        order: u64,
        step_id: &str,
        instances: &[DeployedInstance],
    ) -> Result<bool>;

    /// Most recently recorded instance published under `key`, falling back to
    /// the most recent instance of the artifact named `key`
    async fn resolve(&self, network: &str, key: &str) -> Result<DeployedInstance>;

    /// All completed steps on `network`, in ascending order
    async fn steps(&self, network: &str) -> Result<Vec<StepRecord>>;
}

// =============================================================================
// In-memory Implementation
// =============================================================================

/// Ledger held in memory, lost when dropped
#[derive(Debug, Default)]
pub struct MemoryLedger {
    networks: RwLock<HashMap<String, BTreeMap<u64, StepRecord>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeploymentLedger for MemoryLedger {
    async fn last_completed(&self, network: &str) -> Result<u64> {
        let networks = self.networks.read().await;
        Ok(networks
            .get(network)
            .and_then(|steps| steps.keys().next_back().copied())
            .unwrap_or(0))
    }

    async fn record_step(
        &self,
        network: &str,
        order: u64,
        step_id: &str,
        instances: &[DeployedInstance],
    ) -> Result<bool> {
        let mut networks = self.networks.write().await;
        let steps = networks.entry(network.to_string()).or_default();
        if steps.contains_key(&order) {
            return Ok(false);
        }

        steps.insert(
            order,
            StepRecord {
                network: network.to_string(),
                order,
                step_id: step_id.to_string(),
                recorded_at: None,
                instances: instances.to_vec(),
            },
        );
        Ok(true)
    }

    async fn resolve(&self, network: &str, key: &str) -> Result<DeployedInstance> {
        let networks = self.networks.read().await;
        let latest = |matches: &dyn Fn(&DeployedInstance) -> bool| {
            networks.get(network).and_then(|steps| {
                steps
                    .values()
                    .rev()
                    .flat_map(|step| step.instances.iter().rev())
                    .find(|instance| matches(instance))
                    .cloned()
            })
        };

        latest(&|instance: &DeployedInstance| instance.key == key)
            .or_else(|| latest(&|instance: &DeployedInstance| instance.artifact == key))
            .ok_or_else(|| Error::not_yet_deployed(network, key))
    }

    async fn steps(&self, network: &str) -> Result<Vec<StepRecord>> {
        let networks = self.networks.read().await;
        Ok(networks
            .get(network)
            .map(|steps| steps.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;

    fn instance(network: &str, key: &str, byte: u8) -> DeployedInstance {
        DeployedInstance {
            artifact: key.to_string(),
            key: key.to_string(),
            network: network.to_string(),
            handle: Address::repeat_byte(byte),
            tx_hash: format!("0x{:064x}", byte),
            deployer: None,
            confirmed_at: u64::from(byte),
        }
    }

    #[tokio::test]
    async fn test_unseen_network_is_zero() {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.last_completed("mainnet").await.unwrap(), 0);
        assert!(ledger.steps("mainnet").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_step_is_idempotent() {
        let ledger = MemoryLedger::new();
        let first = [instance("local", "Token", 1)];
        let second = [instance("local", "Token", 2)];

        assert!(ledger.record_step("local", 1, "token", &first).await.unwrap());
        assert!(!ledger.record_step("local", 1, "token", &second).await.unwrap());

        let resolved = ledger.resolve("local", "Token").await.unwrap();
        assert_eq!(resolved.handle, Address::repeat_byte(1));
        assert_eq!(ledger.last_completed("local").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_resolve_prefers_latest_step() {
        let ledger = MemoryLedger::new();
        ledger
            .record_step("local", 1, "a", &[instance("local", "Token", 1)])
            .await
            .unwrap();
        ledger
            .record_step("local", 2, "b", &[instance("local", "Token", 2)])
            .await
            .unwrap();

        let resolved = ledger.resolve("local", "Token").await.unwrap();
        assert_eq!(resolved.handle, Address::repeat_byte(2));
    }

    #[tokio::test]
    async fn test_resolve_by_key_then_artifact() {
        let ledger = MemoryLedger::new();
        let gov = DeployedInstance {
            key: "gov".to_string(),
            ..instance("local", "Token", 1)
        };
        let fee = DeployedInstance {
            key: "fee".to_string(),
            ..instance("local", "Token", 2)
        };
        ledger.record_step("local", 1, "tokens", &[gov, fee]).await.unwrap();

        assert_eq!(
            ledger.resolve("local", "gov").await.unwrap().handle,
            Address::repeat_byte(1)
        );
        assert_eq!(
            ledger.resolve("local", "Token").await.unwrap().handle,
            Address::repeat_byte(2)
        );

        // An explicit binding key wins over a newer artifact name match
        let named = DeployedInstance {
            artifact: "Vault".to_string(),
            ..instance("sepolia", "Token", 3)
        };
        let newer = DeployedInstance {
            key: "fee".to_string(),
            ..instance("sepolia", "Token", 4)
        };
        ledger.record_step("sepolia", 1, "vault", &[named]).await.unwrap();
        ledger.record_step("sepolia", 2, "fee", &[newer]).await.unwrap();
        assert_eq!(
            ledger.resolve("sepolia", "Token").await.unwrap().handle,
            Address::repeat_byte(3)
        );
        assert_eq!(
            ledger.resolve("sepolia", "Vault").await.unwrap().handle,
            Address::repeat_byte(3)
        );
    }

    #[tokio::test]
    async fn test_networks_are_partitioned() {
        let ledger = MemoryLedger::new();
        ledger
            .record_step("local", 1, "a", &[instance("local", "Token", 1)])
            .await
            .unwrap();

        assert_eq!(ledger.last_completed("sepolia").await.unwrap(), 0);
        let err = ledger.resolve("sepolia", "Token").await.unwrap_err();
        assert!(matches!(err, Error::NotYetDeployed { .. }));
    }
}
