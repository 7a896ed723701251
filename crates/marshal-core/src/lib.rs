pub mod abi;
pub mod artifact;
pub mod bytecode;
pub mod deployer;
pub mod dir;
pub mod error;
pub mod ledger;
pub mod migration;
pub mod network;
pub mod runner;
pub mod types;

pub use abi::{Abi, ConstructorInfo, ParamInfo};
pub use artifact::{ArtifactSpec, ArtifactStore, ForgeArtifactStore, MemoryArtifactStore};
pub use bytecode::Bytecode;
pub use deployer::{Deployer, RpcDeployer};
pub use dir::MarshalDir;
pub use error::{Error, Result};
pub use ledger::{DeploymentLedger, MemoryLedger};
pub use migration::{DeployAction, MigrationPlan, MigrationStep};
pub use network::NetworkContext;
pub use runner::{MigrationRunner, RunOptions, RunReport, StepOutcome};
pub use types::*;
