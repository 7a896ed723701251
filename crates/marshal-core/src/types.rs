use serde::{Deserialize, Serialize};
use std::fmt;

/// Re-export alloy types for convenience
pub use alloy::primitives::Address;

// =============================================================================
// Run State
// =============================================================================

/// Lifecycle of a single migration run against one network
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Loading,
    Executing {
        order: u64,
    },
    Recording {
        order: u64,
    },
    Complete,
    Failed {
        /// `None` when the run failed before any step started
        order: Option<u64>,
        cause: String,
    },
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Loading => write!(f, "loading"),
            RunState::Executing { order } => write!(f, "executing step {}", order),
            RunState::Recording { order } => write!(f, "recording step {}", order),
            RunState::Complete => write!(f, "complete"),
            RunState::Failed {
                order: Some(order),
                cause,
            } => write!(f, "failed at step {}: {}", order, cause),
            RunState::Failed { order: None, cause } => write!(f, "failed: {}", cause),
        }
    }
}

// =============================================================================
// Constructor Arguments
// =============================================================================

/// A constructor argument as declared in a migration plan
///
/// References are written as `{ ref = "Token" }` and resolve to the handle
/// published under that binding key. Anything else is a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Reference {
        #[serde(rename = "ref")]
        key: String,
    },
    Literal(serde_json::Value),
}

impl ArgValue {
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        ArgValue::Literal(value.into())
    }

    pub fn reference(key: impl Into<String>) -> Self {
        ArgValue::Reference { key: key.into() }
    }

    /// The binding key this argument points at, if it is a reference
    pub fn reference_key(&self) -> Option<&str> {
        match self {
            ArgValue::Reference { key } => Some(key),
            ArgValue::Literal(_) => None,
        }
    }
}

/// A constructor argument after reference resolution
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedArg {
    Literal(serde_json::Value),
    Handle(Address),
}

impl fmt::Display for ResolvedArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedArg::Literal(value) => write!(f, "{}", value),
            ResolvedArg::Handle(address) => write!(f, "{}", address),
        }
    }
}

// =============================================================================
// Deployment Records
// =============================================================================

/// A confirmed deployment of one artifact on one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedInstance {
    pub artifact: String,
    /// Binding key the handle is published under (artifact name unless overridden)
    pub key: String,
    pub network: String,
    pub handle: Address,
    pub tx_hash: String,
    pub deployer: Option<Address>,
    /// Logical sequence number of the confirmation (block number on EVM chains)
    pub confirmed_at: u64,
}

impl DeployedInstance {
    /// Publish this instance under a different binding key
    pub fn bound_to(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }
}

/// A completed step as persisted in a ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub network: String,
    pub order: u64,
    pub step_id: String,
    pub recorded_at: Option<String>,
    pub instances: Vec<DeployedInstance>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_value_parses_reference_and_literals() {
        let args: Vec<ArgValue> =
            serde_json::from_str(r#"[{"ref": "Token"}, 1000, "name", true]"#).unwrap();

        assert_eq!(args[0], ArgValue::reference("Token"));
        assert_eq!(args[1], ArgValue::literal(1000));
        assert_eq!(args[2], ArgValue::literal("name"));
        assert_eq!(args[3], ArgValue::literal(true));
        assert_eq!(args[0].reference_key(), Some("Token"));
        assert_eq!(args[1].reference_key(), None);
    }

    #[test]
    fn test_resolved_handle_renders_checksummed() {
        let address: Address = "0x5fbdb2315678afecb367f032d93f642f64180aa3"
            .parse()
            .unwrap();
        let arg = ResolvedArg::Handle(address);
        assert_eq!(arg.to_string(), "0x5FbDB2315678afecb367f032d93F642f64180aa3");
    }

    #[test]
    fn test_run_state_display() {
        assert_eq!(RunState::Executing { order: 3 }.to_string(), "executing step 3");
        assert_eq!(
            RunState::Failed {
                order: Some(2),
                cause: "reverted".to_string()
            }
            .to_string(),
            "failed at step 2: reverted"
        );
    }
}
