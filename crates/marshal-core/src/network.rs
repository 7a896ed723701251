//! Network context passed explicitly into every deployment call

use std::time::Duration;

use crate::types::Address;

/// Default number of blocks to wait for after inclusion
pub const DEFAULT_CONFIRMATIONS: u64 = 1;

/// Default time to wait for a deployment to be confirmed
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Active network and its deployment parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkContext {
    /// Network identifier, also the ledger partition key
    pub name: String,
    /// Expected chain ID, checked against the RPC endpoint when set
    pub chain_id: Option<u64>,
    /// Accounts authorized to deploy; empty means any signer is accepted
    pub accounts: Vec<Address>,
    pub confirmations: u64,
    pub timeout: Duration,
    /// Fixed gas limit for deployments, passed through verbatim
    pub gas_limit: Option<u64>,
}

impl NetworkContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain_id: None,
            accounts: Vec::new(),
            confirmations: DEFAULT_CONFIRMATIONS,
            timeout: DEFAULT_TIMEOUT,
            gas_limit: None,
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn with_accounts(mut self, accounts: Vec<Address>) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Whether `account` may deploy on this network
    pub fn is_authorized(&self, account: &Address) -> bool {
        self.accounts.is_empty() || self.accounts.contains(account)
    }
}
