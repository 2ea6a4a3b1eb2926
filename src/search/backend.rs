//! Interchangeable ranking engines behind one capability.
//!
//! The query pipeline only sees [`SearchBackend`]: "ranked hits for a query
//! string". The in-memory [`IndexHandle`] implements it directly; a hosted
//! full-text engine (loaded by the page at runtime) is adapted through
//! [`ExternalEngine`] and [`ExternalBackend`]. When the hosted engine is not
//! deployed, [`NullEngine`] stands in and reports itself unavailable.

use super::index::{Hit, IndexHandle};
use crate::corpus::{CorpusRecord, parse_timestamp};
use crate::error::SearchError;
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Ranked lookup capability. Hits are ordered by descending `score`.
pub trait SearchBackend: Send + Sync {
    fn search<'a>(
        &'a self,
        query: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<Hit>, SearchError>>;

    /// Hint that `query` is likely to be searched soon.
    fn preload(&self, _query: &str) {}
}

impl SearchBackend for IndexHandle {
    fn search<'a>(
        &'a self,
        query: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<Hit>, SearchError>> {
        let hits = IndexHandle::search(self, query);
        futures::future::ready(Ok(hits.iter().take(limit).cloned().collect())).boxed()
    }
}

/// Engine options forwarded verbatim to the hosted engine.
pub type EngineOptions = serde_json::Map<String, serde_json::Value>;

/// Page data a hosted engine returns for one result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Fragment {
    pub url: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

impl Fragment {
    /// Convert to a corpus-shaped record: path from `url`, title and date from `meta`.
    pub fn into_record(self) -> CorpusRecord {
        let path = self.url.trim_start_matches('/').to_string();
        let timestamp = self.meta.get("date").and_then(|raw| parse_timestamp(raw));
        let title = self.meta.get("title").cloned().unwrap_or_default();
        CorpusRecord {
            path,
            content: self.excerpt,
            title,
            timestamp,
        }
    }
}

/// One result handle; fragment data is fetched lazily.
pub trait ExternalResult: Send + Sync {
    fn data(&self) -> BoxFuture<'_, Result<Fragment, SearchError>>;
}

/// The hosted engine's surface: `init`, `search`, `preload`.
pub trait ExternalEngine: Send + Sync {
    fn init(&self) -> BoxFuture<'_, Result<(), SearchError>>;

    /// Results in the engine's own relevance order, best first.
    fn search<'a>(
        &'a self,
        query: &'a str,
        options: &'a EngineOptions,
    ) -> BoxFuture<'a, Result<Vec<Box<dyn ExternalResult>>, SearchError>>;

    fn preload(&self, query: &str, options: &EngineOptions);
}

/// Stand-in used when no hosted engine is deployed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEngine;

impl ExternalEngine for NullEngine {
    fn init(&self) -> BoxFuture<'_, Result<(), SearchError>> {
        futures::future::ready(Err(SearchError::Unavailable(
            "no search engine is deployed".to_string(),
        )))
        .boxed()
    }

    fn search<'a>(
        &'a self,
        _query: &'a str,
        _options: &'a EngineOptions,
    ) -> BoxFuture<'a, Result<Vec<Box<dyn ExternalResult>>, SearchError>> {
        futures::future::ready(Err(SearchError::Unavailable(
            "no search engine is deployed".to_string(),
        )))
        .boxed()
    }

    fn preload(&self, _query: &str, _options: &EngineOptions) {}
}

/// Adapts an initialized [`ExternalEngine`] to [`SearchBackend`].
pub struct ExternalBackend<E> {
    engine: Arc<E>,
    options: EngineOptions,
}

impl<E: ExternalEngine> ExternalBackend<E> {
    /// Initialize `engine`. Any failure maps to [`SearchError::Unavailable`].
    pub async fn connect(engine: Arc<E>, options: EngineOptions) -> Result<Self, SearchError> {
        engine.init().await.map_err(|e| match e {
            SearchError::Unavailable(reason) | SearchError::Engine(reason) => {
                SearchError::Unavailable(reason)
            }
            SearchError::NotReady => {
                SearchError::Unavailable("engine did not become ready".to_string())
            }
        })?;
        tracing::info!("External search engine initialized");
        Ok(Self { engine, options })
    }
}

impl<E: ExternalEngine> SearchBackend for ExternalBackend<E> {
    fn search<'a>(
        &'a self,
        query: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<Hit>, SearchError>> {
        async move {
            let results = self.engine.search(query, &self.options).await?;
            let fragments = join_all(results.iter().take(limit).map(|r| r.data())).await;

            // Positional order becomes a descending synthetic score.
            let total = fragments.len();
            let hits = fragments
                .into_iter()
                .enumerate()
                .filter_map(|(rank, fragment)| match fragment {
                    Ok(fragment) => {
                        let record = fragment.into_record();
                        Some(Hit {
                            path: record.path.clone(),
                            score: (total - rank) as f32,
                            record: Some(record),
                        })
                    }
                    Err(e) => {
                        tracing::warn!("Dropping result without fragment data: {}", e);
                        None
                    }
                })
                .collect();
            Ok(hits)
        }
        .boxed()
    }

    fn preload(&self, query: &str) {
        self.engine.preload(query, &self.options);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    struct Ready(Fragment);

    impl ExternalResult for Ready {
        fn data(&self) -> BoxFuture<'_, Result<Fragment, SearchError>> {
            futures::future::ready(Ok(self.0.clone())).boxed()
        }
    }

    struct Broken;

    impl ExternalResult for Broken {
        fn data(&self) -> BoxFuture<'_, Result<Fragment, SearchError>> {
            futures::future::ready(Err(SearchError::Engine("gone".to_string()))).boxed()
        }
    }

    struct FixedEngine;

    impl ExternalEngine for FixedEngine {
        fn init(&self) -> BoxFuture<'_, Result<(), SearchError>> {
            futures::future::ready(Ok(())).boxed()
        }

        fn search<'a>(
            &'a self,
            _query: &'a str,
            _options: &'a EngineOptions,
        ) -> BoxFuture<'a, Result<Vec<Box<dyn ExternalResult>>, SearchError>> {
            let fragment = |url: &str, title: &str| Fragment {
                url: url.to_string(),
                excerpt: format!("about {title}"),
                meta: BTreeMap::from([("title".to_string(), title.to_string())]),
            };
            let results: Vec<Box<dyn ExternalResult>> = vec![
                Box::new(Ready(fragment("/first.html", "First"))),
                Box::new(Broken),
                Box::new(Ready(fragment("/second.html", "Second"))),
            ];
            futures::future::ready(Ok(results)).boxed()
        }

        fn preload(&self, _query: &str, _options: &EngineOptions) {}
    }

    #[tokio::test]
    async fn null_engine_is_unavailable() {
        let err = ExternalBackend::connect(Arc::new(NullEngine), EngineOptions::new())
            .await
            .err()
            .expect("null engine must not connect");
        check!(matches!(err, SearchError::Unavailable(_)));
    }

    #[tokio::test]
    async fn external_hits_are_descending_and_skip_broken_fragments() {
        let backend = ExternalBackend::connect(Arc::new(FixedEngine), EngineOptions::new())
            .await
            .expect("connect");
        let hits = SearchBackend::search(&backend, "anything", 10)
            .await
            .expect("search");

        let paths: Vec<_> = hits.iter().map(|h| h.path.as_str()).collect();
        check!(paths == vec!["first.html", "second.html"]);
        check!(hits[0].score > hits[1].score);
        check!(hits[0].record.as_ref().map(|r| r.title.as_str()) == Some("First"));
    }

    #[test]
    fn fragment_date_is_parsed_leniently() {
        let fragment = Fragment {
            url: "/a.html".to_string(),
            excerpt: String::new(),
            meta: BTreeMap::from([("date".to_string(), "not a date".to_string())]),
        };
        let record = fragment.into_record();
        check!(record.path == "a.html");
        check!(record.timestamp.is_none());
        check!(record.title.is_empty());
    }
}
