//! Marshal directory management
//!
//! The [`MarshalDir`] struct manages the `.marshal/` directory where the
//! deployment ledger and other project-local data live.

use std::path::{Path, PathBuf};

/// Manages the `.marshal/` directory for project-local data storage.
#[derive(Debug, Clone)]
pub struct MarshalDir {
    path: PathBuf,
}

impl MarshalDir {
    /// The directory name used for marshal data
    pub const NAME: &str = ".marshal";

    /// Ledger database file inside the directory
    pub const LEDGER_FILE: &str = "marshal.db";

    /// Create a new `MarshalDir` pointing to `.marshal/` in the current directory.
    pub fn new() -> Self {
        Self {
            path: PathBuf::from(Self::NAME),
        }
    }

    /// Create a `MarshalDir` at a custom location.
    pub fn at<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Join a relative path to the marshal directory.
    pub fn join<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.path.join(path)
    }

    /// Path of the ledger database
    pub fn ledger_path(&self) -> PathBuf {
        self.join(Self::LEDGER_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    /// Create the marshal directory if it doesn't exist.
    pub fn create(&self) -> std::io::Result<()> {
        if !self.exists() {
            std::fs::create_dir_all(&self.path)?;
        }
        Ok(())
    }
}

impl Default for MarshalDir {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<Path> for MarshalDir {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let dir = MarshalDir::new();
        assert_eq!(dir.path(), Path::new(".marshal"));
    }

    #[test]
    fn test_ledger_path() {
        let dir = MarshalDir::at("/project/.marshal");
        assert_eq!(
            dir.ledger_path(),
            PathBuf::from("/project/.marshal/marshal.db")
        );
    }

    #[test]
    fn test_create() {
        let root = tempfile::tempdir().unwrap();
        let dir = MarshalDir::at(root.path().join(".marshal"));
        assert!(!dir.exists());
        dir.create().unwrap();
        assert!(dir.exists());
        // Creating twice is fine
        dir.create().unwrap();
    }
}
