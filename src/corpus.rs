//! Page-summary corpus delivered as `cache.json`.
//!
//! Wire shape: `[[path, [content_excerpt, title, timestamp | null]], ...]`.
//! The outer structure must match; the inner summary is read leniently so a
//! single odd record never takes the whole corpus down.

use crate::assets::AssetSource;
use crate::error::LoadError;
use ahash::AHashMap;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::Value;
use std::sync::Arc;

/// Format used by the site generator for git commit times (UTC).
const GIT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format used when presenting a timestamp.
const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One page summary. Identity is `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusRecord {
    pub path: String,
    pub content: String,
    pub title: String,
    pub timestamp: Option<DateTime<FixedOffset>>,
}

impl CorpusRecord {
    /// Title to show: `title`, or the path without its format suffix.
    pub fn display_title(&self) -> &str {
        if !self.title.trim().is_empty() {
            return &self.title;
        }
        strip_format_suffix(&self.path)
    }

    /// Timestamp rendered for display, if any.
    pub fn display_time(&self) -> Option<String> {
        self.timestamp
            .map(|t| t.format(DISPLAY_TIME_FORMAT).to_string())
    }
}

/// `guide/intro.html` -> `guide/intro`. Only the last segment is inspected.
pub fn strip_format_suffix(path: &str) -> &str {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..name_start + dot],
        _ => path,
    }
}

/// Parse a generator timestamp. Malformed values yield `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t);
    }
    NaiveDateTime::parse_from_str(raw, GIT_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

/// The immutable set of records for a session, in delivery order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    records: Arc<[CorpusRecord]>,
    by_path: Arc<AHashMap<String, usize>>,
}

impl Corpus {
    /// Build a corpus from records. Later duplicates of a path are dropped.
    pub fn from_records(records: impl IntoIterator<Item = CorpusRecord>) -> Self {
        let mut by_path = AHashMap::new();
        let mut kept = Vec::new();
        for record in records {
            if by_path.contains_key(&record.path) {
                tracing::warn!("Duplicate corpus path '{}', keeping the first", record.path);
                continue;
            }
            by_path.insert(record.path.clone(), kept.len());
            kept.push(record);
        }
        Self {
            records: kept.into(),
            by_path: Arc::new(by_path),
        }
    }

    /// Decode `cache.json` bytes. `asset` names the source in errors.
    pub fn parse(asset: &str, bytes: &[u8]) -> Result<Self, LoadError> {
        let value: Value = serde_json::from_slice(bytes).map_err(|source| LoadError::Parse {
            asset: asset.to_string(),
            source,
        })?;
        let shape = |detail: String| LoadError::Shape {
            asset: asset.to_string(),
            detail,
        };

        let Value::Array(entries) = value else {
            return Err(shape("top level is not an array".to_string()));
        };

        let mut records = Vec::with_capacity(entries.len());
        for (i, entry) in entries.into_iter().enumerate() {
            records.push(parse_entry(entry).map_err(|detail| shape(format!("entry {i}: {detail}")))?);
        }

        let corpus = Self::from_records(records);
        tracing::info!("Loaded corpus from '{}': {} records", asset, corpus.len());
        Ok(corpus)
    }

    /// Fetch and decode the corpus asset.
    pub async fn load(source: &dyn AssetSource, asset: &str) -> Result<Self, LoadError> {
        let bytes = source.fetch(asset).await?;
        Self::parse(asset, &bytes)
    }

    pub fn records(&self) -> &[CorpusRecord] {
        &self.records
    }

    pub fn get(&self, path: &str) -> Option<&CorpusRecord> {
        self.by_path.get(path).map(|&i| &self.records[i])
    }

    /// Delivery position of a path, used as the stable tie-breaker.
    pub fn position(&self, path: &str) -> Option<usize> {
        self.by_path.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn parse_entry(entry: Value) -> Result<CorpusRecord, String> {
    let Value::Array(mut pair) = entry else {
        return Err("not a [path, summary] pair".to_string());
    };
    if pair.len() < 2 {
        return Err(format!("expected 2 elements, found {}", pair.len()));
    }
    let summary = pair.swap_remove(1);
    let Value::String(path) = pair.swap_remove(0) else {
        return Err("path is not a string".to_string());
    };
    let Value::Array(fields) = summary else {
        return Err(format!("summary for '{path}' is not an array"));
    };

    let text = |i: usize| {
        fields
            .get(i)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let timestamp = match fields.get(2) {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                tracing::warn!("Ignoring malformed timestamp '{}' for '{}'", raw, path);
            }
            parsed
        }
        Some(other) => {
            tracing::warn!("Ignoring non-string timestamp {} for '{}'", other, path);
            None
        }
    };

    Ok(CorpusRecord {
        content: text(0),
        title: text(1),
        timestamp,
        path,
    })
}
