//! Get the address bound to a key on a network

use clap::Args;
use color_eyre::eyre::Result;
use marshal_core::DeploymentLedger;

use crate::commands::open_ledger;

/// Get the address bound to a key on a network
#[derive(Args)]
pub struct GetCommand {
    /// Binding key, the artifact name unless the action set `bind`
    pub key: String,

    /// Network name
    #[arg(long, short)]
    pub network: String,
}

impl GetCommand {
    pub async fn run(self) -> Result<()> {
        let db = open_ledger().await?;
        let instance = db.resolve(&self.network, &self.key).await?;

        // Just print the address for easy scripting: $(marshal get ODAOToken --network sepolia)
        println!("{}", instance.handle);
        Ok(())
    }
}
