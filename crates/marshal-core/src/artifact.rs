//! Artifact resolution
//!
//! An [`ArtifactStore`] maps a logical component name to its pre-built
//! bytecode and ABI. Lookups are pure: for the lifetime of a store a
//! name always resolves to the same [`ArtifactSpec`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::Deserialize;

use crate::abi::Abi;
use crate::bytecode::{has_unlinked_libraries, Bytecode};
use crate::error::{Error, Result};
use crate::types::ResolvedArg;

// =============================================================================
// Artifact Spec
// =============================================================================

/// Compiled bytecode and ABI for one artifact
#[derive(Debug, Clone)]
pub struct ArtifactSpec {
    pub name: String,
    pub abi: Abi,
    pub bytecode: Bytecode,
}

impl ArtifactSpec {
    pub fn new(name: impl Into<String>, abi: Abi, bytecode: Bytecode) -> Self {
        Self {
            name: name.into(),
            abi,
            bytecode,
        }
    }

    /// Creation calldata: bytecode followed by ABI-encoded constructor args
    pub fn deploy_data(&self, args: &[ResolvedArg]) -> Result<Vec<u8>> {
        let encoded = self.abi.encode_constructor_args(args)?;
        Ok(self.bytecode.with_constructor_args(&encoded))
    }
}

// =============================================================================
// Trait Definition
// =============================================================================

/// Read-only lookup of deployable artifacts by name
pub trait ArtifactStore: Send + Sync {
    fn resolve(&self, name: &str) -> Result<Arc<ArtifactSpec>>;
}

// =============================================================================
// In-memory Implementation
// =============================================================================

/// Map-backed store, mostly useful for tests and embedding
#[derive(Debug, Default, Clone)]
pub struct MemoryArtifactStore {
    specs: HashMap<String, Arc<ArtifactSpec>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, spec: ArtifactSpec) {
        self.specs.insert(spec.name.clone(), Arc::new(spec));
    }

    pub fn with(mut self, spec: ArtifactSpec) -> Self {
        self.insert(spec);
        self
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn resolve(&self, name: &str) -> Result<Arc<ArtifactSpec>> {
        self.specs
            .get(name)
            .cloned()
            .ok_or_else(|| Error::artifact_not_found(name, "not registered"))
    }
}

// =============================================================================
// Filesystem Implementation
// =============================================================================

/// On-disk artifact JSON, shared by forge (`bytecode.object`) and truffle
/// (`bytecode` as a plain hex string)
#[derive(Debug, Deserialize)]
struct RawArtifact {
    abi: serde_json::Value,
    #[serde(default)]
    bytecode: Option<RawBytecode>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Hex(String),
    Object { object: String },
}

impl RawBytecode {
    fn as_hex(&self) -> &str {
        match self {
            RawBytecode::Hex(hex) => hex,
            RawBytecode::Object { object } => object,
        }
    }
}

/// Artifact store reading pre-built forge (`out/`) or truffle
/// (`build/contracts/`) output under a project root
#[derive(Debug)]
pub struct ForgeArtifactStore {
    out_dir: PathBuf,
    truffle_dir: PathBuf,
    cache: RwLock<HashMap<String, Arc<ArtifactSpec>>>,
}

impl ForgeArtifactStore {
    /// Create a store for the project rooted at `project_root`
    pub fn new(project_root: &Path) -> Self {
        Self {
            out_dir: project_root.join("out"),
            truffle_dir: project_root.join("build").join("contracts"),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Candidate artifact files for a contract, in lookup order
    fn candidate_paths(&self, name: &str) -> Vec<PathBuf> {
        let file = format!("{}.json", name);
        let mut paths = vec![
            self.out_dir.join(format!("{}.sol", name)).join(&file),
            self.out_dir.join(name).join(&file),
            self.truffle_dir.join(&file),
        ];
        // Contracts living in a differently named source file
        if let Ok(entries) = std::fs::read_dir(&self.out_dir) {
            let mut extra: Vec<PathBuf> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .map(|dir| dir.join(&file))
                .filter(|path| !paths.contains(path))
                .collect();
            extra.sort();
            paths.extend(extra);
        }
        paths
    }

    fn load(&self, name: &str) -> Result<ArtifactSpec> {
        let path = self
            .candidate_paths(name)
            .into_iter()
            .find(|path| path.is_file())
            .ok_or_else(|| {
                Error::artifact_not_found(name, "no build output found, run the build first")
            })?;

        let content = std::fs::read_to_string(&path)?;
        let raw: RawArtifact = serde_json::from_str(&content)?;

        let hex = raw.bytecode.as_ref().map(RawBytecode::as_hex).unwrap_or("");
        if has_unlinked_libraries(hex) {
            return Err(Error::artifact_not_found(
                name,
                "bytecode has unlinked library placeholders",
            ));
        }
        let bytecode = Bytecode::from_hex(hex)?;
        if bytecode.is_empty() {
            return Err(Error::artifact_not_found(
                name,
                "no bytecode (interface or abstract contract)",
            ));
        }

        tracing::debug!(artifact = name, path = %path.display(), size = bytecode.len(), "loaded artifact");
        Ok(ArtifactSpec::new(name, Abi::from_value(&raw.abi)?, bytecode))
    }
}

impl ArtifactStore for ForgeArtifactStore {
    fn resolve(&self, name: &str) -> Result<Arc<ArtifactSpec>> {
        if let Some(spec) = self
            .cache
            .read()
            .ok()
            .and_then(|cache| cache.get(name).cloned())
        {
            return Ok(spec);
        }

        let spec = Arc::new(self.load(name)?);
        let mut cache = self
            .cache
            .write()
            .map_err(|_| Error::artifact_not_found(name, "artifact cache poisoned"))?;
        // Keep the first loaded spec so every caller observes the same one
        Ok(cache.entry(name.to_string()).or_insert(spec).clone())
    }
}
