use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::LedgerState;

/// The persistence contract injected into the ledger: load the full state
/// at startup, save it after every mutation. The core knows nothing about
/// the layout behind this seam; any backend that round-trips every record
/// field losslessly (documents and their order included) will do.
pub trait Store: Send + Sync {
    /// Load the persisted state, or `None` when nothing was saved yet.
    fn load(&self) -> Result<Option<LedgerState>>;

    /// Persist the full state, replacing whatever was there.
    fn save(&self, state: &LedgerState) -> Result<()>;
}

/// JSON-file implementation of the store contract.
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Store for JsonStore {
    fn load(&self) -> Result<Option<LedgerState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read ledger file {}", self.path.display()))?;
        let state = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse ledger file {}", self.path.display()))?;
        Ok(Some(state))
    }

    fn save(&self, state: &LedgerState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create data directory {}", parent.display())
                })?;
            }
        }
        let json = serde_json::to_string_pretty(state).context("Failed to serialize ledger")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write ledger file {}", self.path.display()))?;
        Ok(())
    }
}
