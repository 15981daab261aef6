use echopost_core::LedgerError;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};


/// Durable set of identifiers already acted upon.
///
/// Backed by a JSON array of strings, rewritten on every new entry.
/// Membership is monotonic: once an id is recorded it is never removed, so
/// an action is attempted at most once per identifier across the lifetime
/// of the file. A crash between the external action and the write can still
/// duplicate one action on the next run; that is an accepted limitation.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: HashSet<String>,
}

impl Ledger {
    /// Open a ledger, loading the backing file if present.
    ///
    /// An unreadable or malformed file is logged and treated as empty:
    /// losing dedup history is preferable to stopping automation.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match Self::read_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Starting with an empty ledger: {}", e);
                HashSet::new()
            }
        };
        debug!(
            "Opened ledger {} with {} entries",
            path.display(),
            entries.len()
        );
        Self { path, entries }
    }

    fn read_entries(path: &Path) -> Result<HashSet<String>, LedgerError> {
        if !path.exists() {
            return Ok(HashSet::new());
        }
        let contents = fs::read_to_string(path).map_err(|e| LedgerError::ReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let ids: Vec<String> =
            serde_json::from_str(&contents).map_err(|e| LedgerError::InvalidFormat {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(ids.into_iter().collect())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains(id)
    }

    /// Record an identifier and persist immediately.
    ///
    /// Recording an already-present id is a no-op. A failed write is logged
    /// and the entry stays in memory for the rest of the run.
    pub fn record(&mut self, id: &str) {
        if !self.entries.insert(id.to_string()) {
            return;
        }
        if let Err(e) = self.persist() {
            warn!("Continuing with unpersisted ledger entry {:?}: {}", id, e);
        }
    }

    fn persist(&self) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| LedgerError::WriteFailed {
                    path: self.path.display().to_string(),
                    reason: e.to_string(),
                })?;
            }
        }
        let mut ids: Vec<&String> = self.entries.iter().collect();
        ids.sort();
        let contents = serde_json::to_string(&ids).map_err(|e| LedgerError::WriteFailed {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        fs::write(&self.path, contents).map_err(|e| LedgerError::WriteFailed {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
