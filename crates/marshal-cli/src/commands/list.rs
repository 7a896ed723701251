//! List recorded deployments

use clap::Args;
use color_eyre::eyre::Result;
use console::style;
use marshal_db::InstanceFilter;

use crate::commands::open_ledger;

/// List recorded deployments
#[derive(Args)]
pub struct ListCommand {
    /// Filter by network
    #[arg(long, short)]
    pub network: Option<String>,

    /// Include instances superseded by a later step
    #[arg(long)]
    pub all: bool,
}

impl ListCommand {
    pub async fn run(self) -> Result<()> {
        let db = open_ledger().await?;
        let filter = InstanceFilter {
            network: self.network.clone(),
            latest_only: !self.all,
        };
        let instances = db.list_instances(filter).await?;

        if instances.is_empty() {
            println!("No deployments found.");
            if self.network.is_some() {
                println!(
                    "Try running without {} to see all deployments.",
                    style("--network").yellow()
                );
            }
            return Ok(());
        }

        // Print table header
        println!(
            "{:<15} {:<6} {:<20} {:<20} {:<44} {:<10}",
            "Network", "Step", "Key", "Artifact", "Address", "Block"
        );
        println!("{}", "-".repeat(120));

        for i in &instances {
            println!(
                "{:<15} {:<6} {:<20} {:<20} {:<44} {:<10}",
                i.network, i.step_order, i.binding_key, i.artifact_name, i.address, i.confirmed_at
            );
        }

        println!();
        println!("Total: {} deployment(s)", instances.len());

        Ok(())
    }
}
