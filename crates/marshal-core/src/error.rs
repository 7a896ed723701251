use thiserror::Error;

/// Convenience alias used throughout marshal
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    // -------------------------------------------------------------------------
    // Configuration-time errors (no network interaction attempted)
    // -------------------------------------------------------------------------
    #[error("Artifact not found: {name} ({reason})")]
    ArtifactNotFound { name: String, reason: String },

    #[error("Unresolved reference '{key}' in step {order} ({artifact})")]
    UnresolvedReference {
        key: String,
        order: u64,
        artifact: String,
    },

    #[error("Duplicate step order {order}: '{first}' and '{second}'")]
    DuplicateOrder {
        order: u64,
        first: String,
        second: String,
    },

    #[error("Step {order} ('{id}') has no actions")]
    EmptyStep { order: u64, id: String },

    #[error("Invalid migration plan: {0}")]
    InvalidPlan(String),

    #[error("Invalid constructor argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Runtime errors (raised by the deployer)
    // -------------------------------------------------------------------------
    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Confirmation timed out after {secs}s (tx {tx_hash})")]
    ConfirmationTimeout { tx_hash: String, secs: u64 },

    #[error("Execution reverted (tx {0})")]
    ExecutionReverted(String),

    #[error("Step {order} ('{step}') failed: {source}")]
    StepFailed {
        order: u64,
        step: String,
        #[source]
        source: Box<Error>,
    },

    // -------------------------------------------------------------------------
    // Ledger errors
    // -------------------------------------------------------------------------
    #[error("'{key}' is not yet deployed on {network}")]
    NotYetDeployed { network: String, key: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // -------------------------------------------------------------------------
    // Plumbing
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("RPC error: {0}")]
    Rpc(String),
}

impl Error {
    pub fn artifact_not_found(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ArtifactNotFound {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn not_yet_deployed(network: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotYetDeployed {
            network: network.into(),
            key: key.into(),
        }
    }

    /// Whether the error is raised before anything is sent to the network
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::ArtifactNotFound { .. }
                | Error::UnresolvedReference { .. }
                | Error::DuplicateOrder { .. }
                | Error::EmptyStep { .. }
                | Error::InvalidPlan(_)
                | Error::InvalidArgument(_)
        )
    }

    /// The underlying cause, unwrapping a [`Error::StepFailed`]
    pub fn cause(&self) -> &Error {
        match self {
            Error::StepFailed { source, .. } => source.cause(),
            other => other,
        }
    }
}
