//! Submission of single deployments
//!
//! A [`Deployer`] sends one creation transaction, waits for it to confirm and
//! returns the new instance. It never retries: a failed deployment is
//! reported as-is and retry policy belongs to whoever invoked it.

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::Bytes;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;

use crate::artifact::ArtifactSpec;
use crate::error::{Error, Result};
use crate::network::NetworkContext;
use crate::types::{Address, DeployedInstance, ResolvedArg};

/// Deploys one artifact with bound constructor arguments
#[async_trait]
pub trait Deployer: Send + Sync {
    /// Submit the deployment and suspend until it is confirmed
    ///
    /// Fails with [`Error::Submission`], [`Error::ConfirmationTimeout`] or
    /// [`Error::ExecutionReverted`]; no instance is produced on failure.
    async fn deploy(
        &self,
        spec: &ArtifactSpec,
        args: &[ResolvedArg],
        ctx: &NetworkContext,
    ) -> Result<DeployedInstance>;
}

// =============================================================================
// JSON-RPC Implementation
// =============================================================================

/// Deployer sending CREATE transactions through a JSON-RPC endpoint
pub struct RpcDeployer {
    rpc_url: Url,
    signer: PrivateKeySigner,
}

impl RpcDeployer {
    pub fn new(rpc_url: &str, private_key: &str) -> Result<Self> {
        let rpc_url: Url = rpc_url
            .parse()
            .map_err(|e| Error::Rpc(format!("Invalid RPC URL '{}': {}", rpc_url, e)))?;
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|e| Error::InvalidArgument(format!("Invalid private key: {}", e)))?;

        Ok(Self { rpc_url, signer })
    }

    /// Address of the signing account
    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

#[async_trait]
impl Deployer for RpcDeployer {
    async fn deploy(
        &self,
        spec: &ArtifactSpec,
        args: &[ResolvedArg],
        ctx: &NetworkContext,
    ) -> Result<DeployedInstance> {
        let from = self.address();
        if !ctx.is_authorized(&from) {
            return Err(Error::Submission(format!(
                "Account {} is not authorized to deploy on {}",
                from, ctx.name
            )));
        }

        let data = spec.deploy_data(args)?;

        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(self.rpc_url.clone());

        if let Some(expected) = ctx.chain_id {
            let actual = provider
                .get_chain_id()
                .await
                .map_err(|e| Error::Rpc(format!("Failed to fetch chain ID: {}", e)))?;
            if actual != expected {
                return Err(Error::Submission(format!(
                    "Endpoint for {} reports chain ID {}, expected {}",
                    ctx.name, actual, expected
                )));
            }
        }

        let mut tx = TransactionRequest::default()
            .with_from(from)
            .with_deploy_code(Bytes::from(data));
        if let Some(gas_limit) = ctx.gas_limit {
            tx = tx.with_gas_limit(gas_limit);
        }

        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| Error::Submission(format!("Failed to send deployment: {}", e)))?;
        let tx_hash = format!("{:?}", pending.tx_hash());

        tracing::info!(
            network = %ctx.name,
            artifact = %spec.name,
            tx_hash = %tx_hash,
            confirmations = ctx.confirmations,
            "deployment submitted, awaiting confirmation"
        );

        let receipt = tokio::time::timeout(
            ctx.timeout,
            pending
                .with_required_confirmations(ctx.confirmations)
                .get_receipt(),
        )
        .await
        .map_err(|_| Error::ConfirmationTimeout {
            tx_hash: tx_hash.clone(),
            secs: ctx.timeout.as_secs(),
        })?
        .map_err(|e| Error::Submission(format!("Failed to get receipt for {}: {}", tx_hash, e)))?;

        if !receipt.status() {
            return Err(Error::ExecutionReverted(tx_hash));
        }

        let handle = receipt.contract_address.ok_or_else(|| {
            Error::Submission(format!("Receipt for {} has no contract address", tx_hash))
        })?;

        Ok(DeployedInstance {
            artifact: spec.name.clone(),
            key: spec.name.clone(),
            network: ctx.name.clone(),
            handle,
            tx_hash,
            deployer: Some(from),
            confirmed_at: receipt.block_number.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::Abi;
    use crate::bytecode::Bytecode;

    // anvil's first default account
    const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn token_spec() -> ArtifactSpec {
        ArtifactSpec::new(
            "ODAOToken",
            Abi::default(),
            Bytecode::from_hex("0x6080604052").unwrap(),
        )
    }

    #[test]
    fn test_new_derives_signer_address() {
        let deployer = RpcDeployer::new("http://localhost:8545", ANVIL_KEY).unwrap();
        assert_eq!(
            deployer.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[test]
    fn test_new_rejects_bad_inputs() {
        assert!(RpcDeployer::new("not a url", ANVIL_KEY).is_err());
        assert!(matches!(
            RpcDeployer::new("http://localhost:8545", "0x1234"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_unauthorized_account_is_rejected_before_submission() {
        // Port 9 is discard; nothing is ever sent because the check comes first
        let deployer = RpcDeployer::new("http://127.0.0.1:9", ANVIL_KEY).unwrap();
        let ctx = NetworkContext::new("sepolia").with_accounts(vec![Address::repeat_byte(0x42)]);

        let err = deployer.deploy(&token_spec(), &[], &ctx).await.unwrap_err();
        assert!(matches!(err, Error::Submission(ref msg) if msg.contains("not authorized")));
    }

    #[tokio::test]
    async fn test_bad_arguments_are_rejected_before_submission() {
        let deployer = RpcDeployer::new("http://127.0.0.1:9", ANVIL_KEY).unwrap();
        let ctx = NetworkContext::new("local");
        let args = [ResolvedArg::Literal(serde_json::json!(1))];

        let err = deployer.deploy(&token_spec(), &args, &ctx).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
