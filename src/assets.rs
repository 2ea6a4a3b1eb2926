//! Static asset access for the generated site (`cache.json`, `filetree.json`).
//!
//! Transport is owned by the host; this module only defines the seam and two
//! stock implementations. There is no timeout and no retry: a failed fetch is
//! reported once and the caller turns it into view state.

use crate::error::LoadError;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::path::PathBuf;

/// Something that can hand out the bytes of a site asset.
pub trait AssetSource: Send + Sync {
    /// Fetch the asset at `path` (site-relative; a leading `/` is ignored).
    fn fetch<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Vec<u8>, LoadError>>;
}

fn relative(path: &str) -> &str {
    path.trim_start_matches('/')
}

/// Reads assets from a generated site's output directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DirSource {
    fn fetch<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Vec<u8>, LoadError>> {
        let full = self.root.join(relative(path));
        async move {
            tracing::debug!("Fetching asset {}", full.display());
            tokio::fs::read(&full).await.map_err(|source| LoadError::Fetch {
                asset: path.to_string(),
                source,
            })
        }
        .boxed()
    }
}

/// Serves assets from memory. Useful for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `contents` under `path`.
    #[must_use]
    pub fn with(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files
            .insert(relative(path).to_string(), contents.into());
        self
    }
}

impl AssetSource for MemorySource {
    fn fetch<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Vec<u8>, LoadError>> {
        let result = self.files.get(relative(path)).cloned().ok_or_else(|| {
            LoadError::Fetch {
                asset: path.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such asset"),
            }
        });
        futures::future::ready(result).boxed()
    }
}
