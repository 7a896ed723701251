//! Run pending migration steps against a network

use async_trait::async_trait;
use clap::Args;
use color_eyre::eyre::Result;
use console::style;
use dialoguer::Confirm;
use marshal_core::{
    ArtifactSpec, DeployedInstance, Deployer, Error, ForgeArtifactStore, MigrationPlan,
    MigrationRunner, MigrationStep, NetworkContext, ResolvedArg, RpcDeployer, RunOptions,
};

use crate::commands::open_ledger;
use crate::config::MarshalConfig;

/// Run pending migration steps against a network
#[derive(Args)]
pub struct RunCommand {
    /// Network name from marshal.toml
    #[arg(long, short)]
    pub network: String,

    /// Stop after the step with this order
    #[arg(long)]
    pub to: Option<u64>,

    /// Check and list pending steps without deploying
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,
}

impl RunCommand {
    pub async fn run(self) -> Result<()> {
        let config = MarshalConfig::load()?;
        let network = config.get_network(&self.network)?;
        let plan = MigrationPlan::load(&config.project.migrations)?;
        let artifacts = ForgeArtifactStore::new(&config.project.artifacts);
        let ledger = open_ledger().await?;

        let options = RunOptions { target: self.to };

        let deployer: Box<dyn Deployer> = if self.dry_run {
            Box::new(DryRunDeployer)
        } else {
            let deployer = RpcDeployer::new(&network.rpc_url, network.private_key()?)?;
            println!(
                "{} Deploying to {} as {}",
                style("→").blue(),
                style(&network.context.name).cyan(),
                style(deployer.address()).yellow()
            );
            Box::new(deployer)
        };

        let mut runner = MigrationRunner::new(&artifacts, deployer.as_ref(), &ledger);

        let pending = runner.plan(&plan, &network.context, options).await?;
        if pending.is_empty() {
            println!(
                "{} {} is up to date",
                style("✓").green(),
                style(&network.context.name).cyan()
            );
            return Ok(());
        }

        print_pending(&pending);

        if self.dry_run {
            println!();
            println!(
                "{} Dry run complete. Run without {} to deploy.",
                style("ℹ").blue(),
                style("--dry-run").yellow()
            );
            return Ok(());
        }

        if !self.yes {
            let proceed = Confirm::new()
                .with_prompt(format!(
                    "Deploy {} step(s) to {}?",
                    pending.len(),
                    network.context.name
                ))
                .default(false)
                .interact()?;
            if !proceed {
                println!("Aborted.");
                return Ok(());
            }
        }

        match runner.run(&plan, &network.context, options).await {
            Ok(report) => {
                for step in &report.steps {
                    println!(
                        "{} Step {} ({})",
                        style("✓").green(),
                        step.order,
                        style(&step.id).cyan()
                    );
                    for instance in &step.instances {
                        println!(
                            "    {} {}",
                            style(&instance.key).cyan(),
                            style(instance.handle).yellow()
                        );
                    }
                }
                println!();
                println!(
                    "{} {} deployment(s), {} is at step {}",
                    style("✓").green().bold(),
                    report.deployments(),
                    style(&report.network).cyan(),
                    report.last_completed
                );
                Ok(())
            }
            Err(err) => {
                report_failure(&err);
                std::process::exit(1);
            }
        }
    }
}

fn print_pending(pending: &[MigrationStep]) {
    println!("Pending steps:");
    for step in pending {
        let artifacts: Vec<&str> = step.actions.iter().map(|a| a.key()).collect();
        println!(
            "  {:>4}  {:<20} {}",
            step.order,
            step.id,
            style(artifacts.join(", ")).dim()
        );
    }
}

fn report_failure(err: &Error) {
    match err {
        Error::StepFailed { order, step, .. } => {
            eprintln!(
                "{} Step {} ({}) failed: {}",
                style("✗").red().bold(),
                order,
                style(step).cyan(),
                err.cause()
            );
            eprintln!(
                "  Completed steps are recorded; the next run resumes from step {}.",
                order
            );
        }
        other => eprintln!("{} {}", style("✗").red().bold(), other),
    }
}

/// Stands in for the RPC deployer when nothing may be sent
struct DryRunDeployer;

#[async_trait]
impl Deployer for DryRunDeployer {
    async fn deploy(
        &self,
        spec: &ArtifactSpec,
        _args: &[ResolvedArg],
        _ctx: &NetworkContext,
    ) -> marshal_core::Result<DeployedInstance> {
        Err(Error::Submission(format!(
            "dry run, {} was not deployed",
            spec.name
        )))
    }
}
