//! Durable key-value client state (expanded tree nodes, collapsed flag, theme).
//!
//! The store is a port: [`MemoryStore`] for tests and embedding, [`FileStore`]
//! for a JSON file on disk. [`ClientState`] layers namespaced, typed accessors
//! on top. Unreadable persisted values are logged and treated as absent; they
//! never fail a mount.

use crate::error::StoreError;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// String key-value store.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a single JSON object file, rewritten on every `set`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open `path`. A missing file is an empty store; a corrupt one is logged
    /// and replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable state file {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// `<data dir>/<namespace>/state.json`, if the platform has a data dir.
    pub fn in_data_dir(namespace: &str) -> Option<Result<Self, StoreError>> {
        let path = dirs::data_dir()?.join(namespace).join("state.json");
        Some(Self::open(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let io = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).map_err(io)?;
        std::fs::rename(&tmp, &self.path).map_err(io)
    }
}

impl StateStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }
}

/// Colour scheme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

const EXPANDED_KEY: &str = "filetree-expanded";
const COLLAPSED_KEY: &str = "filetree-collapsed";
const THEME_KEY: &str = "theme";

/// Typed, namespaced view over a [`StateStore`].
#[derive(Clone)]
pub struct ClientState {
    store: Arc<dyn StateStore>,
    namespace: String,
}

impl std::fmt::Debug for ClientState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientState")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl ClientState {
    pub fn new(store: Arc<dyn StateStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// In-memory state, mostly for tests.
    pub fn in_memory(namespace: impl Into<String>) -> Self {
        Self::new(Arc::new(MemoryStore::new()), namespace)
    }

    fn key(&self, name: &str) -> String {
        format!("{}:{}", self.namespace, name)
    }

    fn write(&self, name: &str, value: &str) {
        // Persistence is best effort; the in-memory state stays authoritative.
        if let Err(e) = self.store.set(&self.key(name), value) {
            tracing::warn!("Failed to persist '{}': {}", name, e);
        }
    }

    /// Persisted expanded node paths. Invalid data reads as empty.
    pub fn expanded(&self) -> BTreeSet<String> {
        let Some(raw) = self.store.get(&self.key(EXPANDED_KEY)) else {
            return BTreeSet::new();
        };
        serde_json::from_str::<Vec<String>>(&raw).map_or_else(
            |e| {
                tracing::warn!("Ignoring invalid expanded-node state: {}", e);
                BTreeSet::new()
            },
            |paths| paths.into_iter().collect(),
        )
    }

    pub fn set_expanded(&self, paths: &BTreeSet<String>) {
        match serde_json::to_string(paths) {
            Ok(raw) => self.write(EXPANDED_KEY, &raw),
            Err(e) => tracing::warn!("Failed to encode expanded-node state: {}", e),
        }
    }

    /// Whether the whole tree panel is collapsed. Only `"true"` counts.
    pub fn collapsed(&self) -> bool {
        self.store
            .get(&self.key(COLLAPSED_KEY))
            .is_some_and(|raw| raw == "true")
    }

    pub fn set_collapsed(&self, collapsed: bool) {
        self.write(COLLAPSED_KEY, if collapsed { "true" } else { "false" });
    }

    pub fn theme(&self) -> Option<Theme> {
        match self.store.get(&self.key(THEME_KEY))?.as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            other => {
                tracing::warn!("Ignoring unknown theme '{}'", other);
                None
            }
        }
    }

    pub fn set_theme(&self, theme: Theme) {
        self.write(THEME_KEY, theme.as_str());
    }
}
