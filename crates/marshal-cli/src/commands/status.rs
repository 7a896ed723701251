//! Show completed and pending steps for a network

use std::collections::HashMap;

use clap::Args;
use color_eyre::eyre::Result;
use console::style;
use marshal_core::{DeploymentLedger, MigrationPlan, StepRecord};

use crate::commands::open_ledger;
use crate::config::MarshalConfig;

/// Show completed and pending steps for a network
#[derive(Args)]
pub struct StatusCommand {
    /// Network name from marshal.toml
    #[arg(long, short)]
    pub network: String,
}

impl StatusCommand {
    pub async fn run(self) -> Result<()> {
        let config = MarshalConfig::load()?;
        let plan = MigrationPlan::load(&config.project.migrations)?;
        let ledger = open_ledger().await?;

        let last_completed = ledger.last_completed(&self.network).await?;
        let records = ledger.steps(&self.network).await?;
        let recorded: HashMap<u64, &StepRecord> = records.iter().map(|r| (r.order, r)).collect();

        println!(
            "{} {} (last completed step: {})",
            style("Network").bold(),
            style(&self.network).cyan(),
            last_completed
        );
        println!();

        let mut pending = 0;
        for step in plan.steps() {
            match recorded.get(&step.order) {
                Some(record) => {
                    println!(
                        "  {} {:>4}  {:<20} {}",
                        style("✓").green(),
                        step.order,
                        step.id,
                        style(record.recorded_at.as_deref().unwrap_or("")).dim()
                    );
                }
                None if step.order <= last_completed => {
                    // Skipped steps below the ledger's high-water mark never run again
                    println!(
                        "  {} {:>4}  {:<20} {}",
                        style("-").dim(),
                        step.order,
                        step.id,
                        style("skipped").dim()
                    );
                }
                None => {
                    pending += 1;
                    println!(
                        "  {} {:>4}  {:<20} {}",
                        style("•").yellow(),
                        step.order,
                        step.id,
                        style("pending").yellow()
                    );
                }
            }
        }

        let unknown: Vec<&StepRecord> = records
            .iter()
            .filter(|r| !plan.steps().iter().any(|s| s.order == r.order))
            .collect();
        for record in &unknown {
            println!(
                "  {} {:>4}  {:<20} {}",
                style("?").red(),
                record.order,
                record.step_id,
                style("recorded but not in plan").red()
            );
        }

        println!();
        println!("{} pending step(s)", pending);

        Ok(())
    }
}
