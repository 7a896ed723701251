use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use color_eyre::eyre::{eyre, Result, WrapErr};
use marshal_core::{Address, NetworkContext};
use serde::Deserialize;

pub const MARSHAL_CONFIG: &str = "marshal.toml";

/// Fallback for networks that don't set `private_key`
const PRIVATE_KEY_ENV: &str = "MARSHAL_PRIVATE_KEY";

/// Template written by `marshal init`
pub const CONFIG_TEMPLATE: &str = r#"[project]
artifacts = "."
migrations = "migrations.toml"

[networks.local]
rpc_url = "http://localhost:8545"
# private_key = "${DEPLOYER_KEY}"  (defaults to $MARSHAL_PRIVATE_KEY)
confirmations = 1
timeout_secs = 120
"#;

/// Marshal configuration file structure (marshal.toml)
#[derive(Debug, Clone, Deserialize)]
pub struct MarshalConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub networks: HashMap<String, NetworkEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Project root holding out/ or build/contracts/
    #[serde(default = "default_artifacts")]
    pub artifacts: PathBuf,
    #[serde(default = "default_migrations")]
    pub migrations: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            artifacts: default_artifacts(),
            migrations: default_migrations(),
        }
    }
}

fn default_artifacts() -> PathBuf {
    PathBuf::from(".")
}

fn default_migrations() -> PathBuf {
    PathBuf::from("migrations.toml")
}

/// A `[networks.<name>]` table
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkEntry {
    pub rpc_url: String,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// Accounts allowed to sign; empty allows the configured signer
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub confirmations: Option<u64>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub gas_limit: Option<u64>,
}

impl MarshalConfig {
    /// Load configuration from marshal.toml in the current directory
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(MARSHAL_CONFIG))
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|_| {
            eyre!(
                "Could not find {}. Run `marshal init` first.",
                path.display()
            )
        })?;

        let config: MarshalConfig = toml::from_str(&content)
            .wrap_err_with(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Check if marshal.toml exists
    pub fn exists() -> bool {
        Path::new(MARSHAL_CONFIG).exists()
    }

    /// Get a network configuration by name, resolving environment variables
    pub fn get_network(&self, name: &str) -> Result<NetworkConfig> {
        let entry = self.networks.get(name).ok_or_else(|| {
            eyre!(
                "Network '{}' not found in {} [networks] (available: {})",
                name,
                MARSHAL_CONFIG,
                self.network_names().join(", ")
            )
        })?;

        let rpc_url = resolve_env_var(&entry.rpc_url)?;

        let private_key = match &entry.private_key {
            Some(key) => Some(resolve_env_var(key)?),
            None => std::env::var(PRIVATE_KEY_ENV).ok(),
        };

        let accounts = entry
            .accounts
            .iter()
            .map(|a| {
                let resolved = resolve_env_var(a)?;
                Address::from_str(&resolved)
                    .map_err(|e| eyre!("Invalid account '{}' for {}: {}", resolved, name, e))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut context = NetworkContext::new(name).with_accounts(accounts);
        if let Some(chain_id) = entry.chain_id {
            context = context.with_chain_id(chain_id);
        }
        if let Some(confirmations) = entry.confirmations {
            context = context.with_confirmations(confirmations);
        }
        if let Some(secs) = entry.timeout_secs {
            context = context.with_timeout(Duration::from_secs(secs));
        }
        if let Some(gas_limit) = entry.gas_limit {
            context = context.with_gas_limit(gas_limit);
        }

        Ok(NetworkConfig {
            context,
            rpc_url,
            private_key,
        })
    }

    /// Get all network names defined in marshal.toml
    pub fn network_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.networks.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Network configuration extracted from marshal.toml
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub context: NetworkContext,
    pub rpc_url: String,
    pub private_key: Option<String>,
}

impl NetworkConfig {
    pub fn private_key(&self) -> Result<&str> {
        self.private_key.as_deref().ok_or_else(|| {
            eyre!(
                "No private key for network '{}'. Set `private_key` in {} or {}.",
                self.context.name,
                MARSHAL_CONFIG,
                PRIVATE_KEY_ENV
            )
        })
    }
}

/// Resolve environment variable references in a string
/// Supports ${VAR_NAME} syntax
fn resolve_env_var(value: &str) -> Result<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).map_err(|_| eyre!("Environment variable '{}' not set", var_name))
    } else {
        Ok(value.to_string())
    }
}
