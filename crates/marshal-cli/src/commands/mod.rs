//! CLI commands for marshal

use clap::Subcommand;
use color_eyre::eyre::Result;

pub mod get;
pub mod init;
pub mod list;
pub mod run;
pub mod status;

/// All available CLI commands
#[derive(Subcommand)]
pub enum Command {
    /// Initialize marshal in a contracts project
    Init(init::InitCommand),

    /// Run pending migration steps against a network
    Run(run::RunCommand),

    /// Show completed and pending steps for a network
    Status(status::StatusCommand),

    /// List recorded deployments
    List(list::ListCommand),

    /// Get the address bound to a key on a network
    Get(get::GetCommand),
}

impl Command {
    /// Execute the command
    pub async fn run(self) -> Result<()> {
        match self {
            Command::Init(cmd) => cmd.run().await,
            Command::Run(cmd) => cmd.run().await,
            Command::Status(cmd) => cmd.run().await,
            Command::List(cmd) => cmd.run().await,
            Command::Get(cmd) => cmd.run().await,
        }
    }
}

/// Open the ledger, failing with a hint when `marshal init` has not been run
pub(crate) async fn open_ledger() -> Result<marshal_db::Database> {
    if !marshal_db::Database::exists() {
        return Err(color_eyre::eyre::eyre!(
            "No ledger found ({} missing). Run `marshal init` first.",
            marshal_core::MarshalDir::NAME
        ));
    }
    Ok(marshal_db::Database::connect().await?)
}
