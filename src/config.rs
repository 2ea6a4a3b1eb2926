//! Tunables for the search pipeline and tree filter.
//!
//! Nothing here is user-facing; hosts embed a `docseek.toml` next to the
//! generated site or rely on [`Config::default`].

use crate::error::ConfigError;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Runtime configuration. Every field has a default, so partial TOML is fine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Debounce window measured from the last keystroke, in milliseconds.
    pub quiescence_ms: u64,
    /// Cap on the number of matched results handed to the presentation layer.
    pub max_results: usize,
    /// Largest edit distance accepted by fuzzy term matching.
    pub max_edit_distance: usize,
    /// Query terms shorter than this only match exactly or by prefix.
    pub min_fuzzy_len: usize,
    /// Weight of title tokens relative to content tokens.
    pub title_weight: f32,
    pub content_weight: f32,
    /// Asset path of the page-summary corpus.
    pub corpus_asset: String,
    /// Asset path of the file tree.
    pub tree_asset: String,
    /// Prefix for persisted client-state keys.
    pub state_namespace: String,
    /// Number of memoized query hit lists.
    pub query_cache_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quiescence_ms: 250,
            max_results: 50,
            max_edit_distance: 2,
            min_fuzzy_len: 4,
            title_weight: 2.0,
            content_weight: 1.0,
            corpus_asset: "cache.json".to_string(),
            tree_asset: "filetree.json".to_string(),
            state_namespace: "docseek".to_string(),
            query_cache_size: 64,
        }
    }
}

impl Config {
    /// Parse a TOML document, clamping out-of-range values.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        Ok(config.clamped())
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load `<config dir>/<namespace>/config.toml` if it exists, else defaults.
    pub fn discover(namespace: &str) -> crate::error::Result<Self> {
        let Some(path) = dirs::config_dir().map(|dir| dir.join(namespace).join("config.toml"))
        else {
            return Ok(Self::default());
        };
        if !path.is_file() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let config = Self::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// The debounce window as a [`Duration`].
    pub const fn quiescence(&self) -> Duration {
        Duration::from_millis(self.quiescence_ms)
    }

    fn clamped(mut self) -> Self {
        self.quiescence_ms = self.quiescence_ms.max(1);
        self.max_results = self.max_results.max(1);
        self.query_cache_size = self.query_cache_size.max(1);
        if !self.title_weight.is_finite() || self.title_weight <= 0.0 {
            self.title_weight = Self::default().title_weight;
        }
        if !self.content_weight.is_finite() || self.content_weight <= 0.0 {
            self.content_weight = Self::default().content_weight;
        }
        self
    }
}
