//! Which process logs are selected for display
//!
//! The hidden set is persisted through an injected key-value store so that
//! the selection survives restarts without binding to a specific backend.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::warn;

/// Storage key for the hidden process ids (JSON array)
pub const HIDDEN_LOGS_KEY: &str = "logs.hidden";

#[derive(Debug, Error)]
pub enum KvError {
    #[error("writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encoding value: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Minimal string key-value persistence
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), KvError>;
}

/// Non-persistent store, mostly for tests
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store persisted as a JSON object on disk
#[derive(Debug)]
pub struct FileKvStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileKvStore {
    /// Open the store; a missing or malformed file starts empty
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
                warn!(path = %path.display(), %err, "ignoring malformed state file");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), KvError> {
        let io_err = |source: std::io::Error| KvError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, content).map_err(io_err)
    }
}

impl KeyValueStore for FileKvStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut entries = self.entries.write();
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }
}

/// Source of the currently selected stream identifiers
pub trait VisibleSet: Send + Sync {
    fn visible_logs(&self) -> BTreeSet<String>;
}

impl VisibleSet for BTreeSet<String> {
    fn visible_logs(&self) -> BTreeSet<String> {
        self.clone()
    }
}

/// Known processes minus the ones the user has hidden
pub struct VisibleLogs {
    kv: Arc<dyn KeyValueStore>,
    processes: RwLock<BTreeSet<String>>,
    hidden: RwLock<BTreeSet<String>>,
}

impl VisibleLogs {
    /// Load the hidden set from `kv`
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        let hidden = match kv.get(HIDDEN_LOGS_KEY) {
            Some(raw) => serde_json::from_str::<BTreeSet<String>>(&raw).unwrap_or_else(|err| {
                warn!(%err, "ignoring malformed hidden log list");
                BTreeSet::new()
            }),
            None => BTreeSet::new(),
        };
        Self {
            kv,
            processes: RwLock::new(BTreeSet::new()),
            hidden: RwLock::new(hidden),
        }
    }

    /// Replace the set of known process ids
    pub fn set_processes<I, S>(&self, processes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.processes.write() = processes.into_iter().map(Into::into).collect();
    }

    /// Show or hide a process's logs, persisting the hidden set
    pub fn set_log_visibility(&self, process_id: &str, visible: bool) -> Result<(), KvError> {
        let encoded = {
            let mut hidden = self.hidden.write();
            if visible {
                hidden.remove(process_id);
            } else {
                hidden.insert(process_id.to_string());
            }
            serde_json::to_string(&*hidden)?
        };
        self.kv.set(HIDDEN_LOGS_KEY, &encoded)
    }

    pub fn is_visible(&self, process_id: &str) -> bool {
        self.processes.read().contains(process_id) && !self.hidden.read().contains(process_id)
    }

    pub fn hidden_logs(&self) -> BTreeSet<String> {
        self.hidden.read().clone()
    }
}

impl VisibleSet for VisibleLogs {
    fn visible_logs(&self) -> BTreeSet<String> {
        let hidden = self.hidden.read();
        self.processes
            .read()
            .iter()
            .filter(|p| !hidden.contains(*p))
            .cloned()
            .collect()
    }
}
