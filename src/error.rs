//! Error handling types and utilities.

use std::path::PathBuf;
use thiserror::Error;

/// A specialized Result type for wiring code (config files, session setup).
///
/// Component APIs return their own typed errors below; this alias is only used
/// where errors are collected with `.context()` before being turned into view state.
pub type Result<T> = anyhow::Result<T>;

/// Failure to obtain or decode a static asset (corpus or file tree).
#[derive(Debug, Error)]
pub enum LoadError {
    /// The asset could not be fetched (missing file, transport error).
    #[error("failed to fetch '{asset}': {source}")]
    Fetch {
        asset: String,
        #[source]
        source: std::io::Error,
    },
    /// The asset is not valid JSON.
    #[error("failed to parse '{asset}': {source}")]
    Parse {
        asset: String,
        #[source]
        source: serde_json::Error,
    },
    /// The asset is JSON but not in the expected shape.
    #[error("unexpected shape in '{asset}': {detail}")]
    Shape { asset: String, detail: String },
}

impl LoadError {
    /// Name of the asset that failed to load.
    pub fn asset(&self) -> &str {
        match self {
            Self::Fetch { asset, .. } | Self::Parse { asset, .. } | Self::Shape { asset, .. } => {
                asset
            }
        }
    }
}

/// Errors surfaced by a search backend or the query pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The corpus or engine has not finished loading yet.
    #[error("search is not ready yet")]
    NotReady,
    /// The search engine could not be loaded or initialized.
    #[error("search unavailable: {0}")]
    Unavailable(String),
    /// A query failed inside the engine.
    #[error("search failed: {0}")]
    Engine(String),
}

/// Errors from the persisted key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Errors while reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
