//! Query resolution: ranked hits or the recency view.
//!
//! Policy:
//! - An empty or whitespace-only query never touches a backend; it returns the
//!   whole corpus by descending timestamp, undated records last, ties in
//!   delivery order ([`ResultOrigin::Recency`]).
//! - A query with hits returns them by descending relevance, capped at
//!   `max_results` ([`ResultOrigin::Matched`]).
//! - A query without hits returns the same recency view, tagged
//!   [`ResultOrigin::Fallback`] so the caller can say "no matches".

use super::backend::SearchBackend;
use super::index::{Hit, IndexHandle};
use crate::config::Config;
use crate::corpus::{Corpus, CorpusRecord};
use crate::error::SearchError;
use std::cmp::Ordering;

/// Why a result list looks the way it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultOrigin {
    /// No query: recency-sorted corpus.
    Recency,
    /// Ranked matches for the query.
    Matched,
    /// The query matched nothing; recency-sorted corpus instead.
    Fallback,
}

/// One row of a result list.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub record: CorpusRecord,
    /// Display title (falls back to the path without its format suffix).
    pub title: String,
    /// Relevance, higher is better. `None` in recency views.
    pub relevance: Option<f32>,
    pub display_time: Option<String>,
}

impl QueryResult {
    fn new(record: CorpusRecord, relevance: Option<f32>) -> Self {
        Self {
            title: record.display_title().to_string(),
            display_time: record.display_time(),
            relevance,
            record,
        }
    }

    /// Link target for the page.
    pub fn href(&self) -> String {
        format!("/{}", self.record.path.trim_start_matches('/'))
    }
}

/// A resolved query, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub query: String,
    pub origin: ResultOrigin,
    pub results: Vec<QueryResult>,
}

impl QueryOutcome {
    /// Total shown under the result list.
    pub fn total(&self) -> usize {
        self.results.len()
    }
}

/// Newest first; undated last. `sort_by` is stable, so ties keep corpus order.
fn by_recency(a: &CorpusRecord, b: &CorpusRecord) -> Ordering {
    match (a.timestamp, b.timestamp) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Resolves queries against a corpus and a ranking backend.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    corpus: Corpus,
    max_results: usize,
}

impl QueryEngine {
    pub fn new(corpus: Corpus, config: &Config) -> Self {
        Self {
            corpus,
            max_results: config.max_results,
        }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Every record exactly once, newest first.
    pub fn recency_view(&self) -> Vec<QueryResult> {
        let mut records: Vec<&CorpusRecord> = self.corpus.records().iter().collect();
        records.sort_by(|a, b| by_recency(a, b));
        records
            .into_iter()
            .map(|record| QueryResult::new(record.clone(), None))
            .collect()
    }

    /// Recently updated pages, newest first, for the history list.
    pub fn history(&self, limit: Option<usize>) -> Vec<QueryResult> {
        let mut view = self.recency_view();
        if let Some(limit) = limit {
            view.truncate(limit);
        }
        view
    }

    /// Resolve against the in-memory index. Synchronous.
    pub fn resolve(&self, index: &IndexHandle, query: &str) -> QueryOutcome {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return self.recency_outcome(query, ResultOrigin::Recency);
        }
        let hits = index.search(trimmed);
        self.assemble(query, &hits)
    }

    /// Resolve against any backend.
    pub async fn resolve_with(
        &self,
        backend: &dyn SearchBackend,
        query: &str,
    ) -> Result<QueryOutcome, SearchError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(self.recency_outcome(query, ResultOrigin::Recency));
        }
        let hits = backend.search(trimmed, self.max_results).await?;
        Ok(self.assemble(query, &hits))
    }

    fn recency_outcome(&self, query: &str, origin: ResultOrigin) -> QueryOutcome {
        QueryOutcome {
            query: query.to_string(),
            origin,
            results: self.recency_view(),
        }
    }

    /// Turn backend hits into results; hits unknown to both corpus and
    /// backend are skipped.
    fn assemble(&self, query: &str, hits: &[Hit]) -> QueryOutcome {
        let results: Vec<QueryResult> = hits
            .iter()
            .filter_map(|hit| {
                let record = self
                    .corpus
                    .get(&hit.path)
                    .cloned()
                    .or_else(|| hit.record.clone());
                if record.is_none() {
                    tracing::debug!("Skipping hit for unknown page '{}'", hit.path);
                }
                record.map(|record| QueryResult::new(record, Some(hit.score)))
            })
            .take(self.max_results)
            .collect();

        if results.is_empty() {
            tracing::debug!("No matches for '{}', showing recency view", query.trim());
            return self.recency_outcome(query, ResultOrigin::Fallback);
        }

        QueryOutcome {
            query: query.to_string(),
            origin: ResultOrigin::Matched,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::parse_timestamp;
    use assert2::check;

    fn record(path: &str, title: &str, ts: Option<&str>) -> CorpusRecord {
        CorpusRecord {
            path: path.to_string(),
            content: format!("content of {title}"),
            title: title.to_string(),
            timestamp: ts.and_then(parse_timestamp),
        }
    }

    fn engine(records: Vec<CorpusRecord>) -> (QueryEngine, IndexHandle) {
        let config = Config::default();
        let corpus = Corpus::from_records(records);
        let index = IndexHandle::new(&corpus, &config);
        (QueryEngine::new(corpus, &config), index)
    }

    fn titles(outcome: &QueryOutcome) -> Vec<&str> {
        outcome.results.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn empty_query_orders_by_recency_with_undated_last() {
        let (engine, index) = engine(vec![
            record("a.html", "Undated A", None),
            record("b.html", "Old", Some("2023-01-01T00:00:00Z")),
            record("c.html", "Undated C", None),
            record("d.html", "New", Some("2024-05-01 10:00:00")),
            record("e.html", "Old Twin", Some("2023-01-01T00:00:00Z")),
        ]);
        let outcome = engine.resolve(&index, "   ");
        check!(outcome.origin == ResultOrigin::Recency);
        check!(titles(&outcome) == vec!["New", "Old", "Old Twin", "Undated A", "Undated C"]);
        check!(outcome.results.iter().all(|r| r.relevance.is_none()));
    }

    #[test]
    fn matched_results_carry_relevance() {
        let (engine, index) = engine(vec![
            record("a.html", "Alpha", None),
            record("b.html", "Beta", None),
        ]);
        let outcome = engine.resolve(&index, "beta");
        check!(outcome.origin == ResultOrigin::Matched);
        check!(titles(&outcome) == vec!["Beta"]);
        check!(outcome.results[0].relevance.is_some());
        check!(outcome.results[0].href() == "/b.html");
    }

    #[test]
    fn zero_hits_fall_back_to_recency() {
        let (engine, index) = engine(vec![
            record("a.html", "Alpha", None),
            record("b.html", "Beta", Some("2024-01-01T00:00:00Z")),
        ]);
        let outcome = engine.resolve(&index, "zzzzzz");
        check!(outcome.origin == ResultOrigin::Fallback);
        check!(titles(&outcome) == vec!["Beta", "Alpha"]);
    }

    #[test]
    fn empty_title_falls_back_to_path() {
        let (engine, index) = engine(vec![record("notes/draft.html", "", None)]);
        let outcome = engine.resolve(&index, "");
        check!(titles(&outcome) == vec!["notes/draft"]);
    }

    #[test]
    fn history_is_capped() {
        let (engine, _) = engine(vec![
            record("a.html", "A", Some("2024-01-01T00:00:00Z")),
            record("b.html", "B", Some("2024-02-01T00:00:00Z")),
        ]);
        let history = engine.history(Some(1));
        check!(history.len() == 1);
        check!(history[0].title == "B");
        check!(history[0].display_time.as_deref() == Some("2024-02-01 00:00"));
    }

    #[tokio::test]
    async fn resolve_with_backend_matches_sync_path() {
        let (engine, index) = engine(vec![
            record("a.html", "Alpha guide", None),
            record("b.html", "Beta guide", None),
        ]);
        let sync = engine.resolve(&index, "guide");
        let backend: &dyn SearchBackend = &index;
        let async_outcome = engine.resolve_with(backend, "guide").await.expect("resolve");
        check!(sync == async_outcome);
    }
}
