//! Shared fixtures for integration tests.
//!
//! # Available Fixtures
//!
//! - `reference_corpus`: the two-record `cache.json` with one dated and one
//!   undated page
//! - `sample_tree`: `filetree.json` with `root/dirA/leafFoo` and `root/dirB/leafBar`
//! - `memory_site`: both assets served from memory
//! - `temp_site`: both assets written to a temporary site directory
//!
//! [`TempSite`] is the filesystem building block; prefer `memory_site` for
//! tests that run with paused time.

#![allow(dead_code)] // Each integration test crate uses a different subset

use docseek::assets::{DirSource, MemorySource};
use docseek::corpus::{Corpus, CorpusRecord, parse_timestamp};
use docseek::search::{IndexHandle, QueryEngine};
use docseek::{Config, FileTreeData};
use rstest::fixture;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const REFERENCE_CORPUS: &str = r#"[
    ["a/b.html", ["content1", "Title One", "2024-01-01T00:00:00Z"]],
    ["a/c.html", ["content2", "Title Two", null]]
]"#;

pub const SAMPLE_TREE: &str = r#"{
    "root": [
        {"name": "root", "title": null, "path": "root", "url": null,
         "is_directory": true, "level": 0, "children": [
            {"name": "dirA", "title": null, "path": "root/dirA", "url": null,
             "is_directory": true, "level": 1, "children": [
                {"name": "leafFoo.adoc", "title": null, "path": "root/dirA/leafFoo.adoc",
                 "url": "root/dirA/leafFoo.html", "is_directory": false,
                 "level": 2, "children": []}
            ]},
            {"name": "dirB", "title": null, "path": "root/dirB", "url": null,
             "is_directory": true, "level": 1, "children": [
                {"name": "leafBar.adoc", "title": "Bar Page", "path": "root/dirB/leafBar.adoc",
                 "url": "root/dirB/leafBar.html", "is_directory": false,
                 "level": 2, "children": []},
                {"name": "orphan.adoc", "title": null, "path": "root/dirB/orphan.adoc",
                 "url": null, "is_directory": false, "level": 2, "children": []}
            ]}
        ]}
    ],
    "flat_list": []
}"#;

#[fixture]
pub fn reference_corpus() -> Corpus {
    docseek::tracing::init();
    Corpus::parse("cache.json", REFERENCE_CORPUS.as_bytes()).expect("reference corpus parses")
}

#[fixture]
pub fn sample_tree() -> FileTreeData {
    FileTreeData::parse("filetree.json", SAMPLE_TREE.as_bytes()).expect("sample tree parses")
}

#[fixture]
pub fn memory_site() -> MemorySource {
    docseek::tracing::init();
    MemorySource::new()
        .with("cache.json", REFERENCE_CORPUS)
        .with("filetree.json", SAMPLE_TREE)
}

#[fixture]
pub fn temp_site() -> TempSite {
    let site = TempSite::new();
    site.write("cache.json", REFERENCE_CORPUS);
    site.write("filetree.json", SAMPLE_TREE);
    site
}

/// Config with a short debounce window for real-time tests.
pub fn fast_config() -> Config {
    Config {
        quiescence_ms: 10,
        ..Config::default()
    }
}

pub fn record(path: &str, content: &str, title: &str, timestamp: Option<&str>) -> CorpusRecord {
    CorpusRecord {
        path: path.to_string(),
        content: content.to_string(),
        title: title.to_string(),
        timestamp: timestamp.and_then(parse_timestamp),
    }
}

/// Query engine plus a freshly built index over `records`.
pub fn engine_for(records: Vec<CorpusRecord>) -> (QueryEngine, IndexHandle) {
    let config = Config::default();
    let corpus = Corpus::from_records(records);
    let index = IndexHandle::new(&corpus, &config);
    (QueryEngine::new(corpus, &config), index)
}

/// A generated-site output directory that is removed on drop.
pub struct TempSite {
    _temp: TempDir,
    root: PathBuf,
}

impl TempSite {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().to_path_buf();
        Self { _temp: temp, root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Write `contents` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, contents).expect("Failed to write site asset");
    }

    pub fn remove(&self, relative: &str) {
        std::fs::remove_file(self.root.join(relative)).expect("Failed to remove site asset");
    }

    pub fn source(&self) -> DirSource {
        DirSource::new(&self.root)
    }
}
