//! TF-IDF inverted index over the page corpus.
//!
//! [`SearchIndex`] is immutable once built. [`IndexHandle`] owns the live index
//! and swaps in a rebuilt one atomically, so a query sees either the old index
//! or the new one, never a mix.

use super::scoring::{self, FuzzyPolicy};
use super::tokenize::{analyze, contains_cjk, literal_terms};
use crate::config::Config;
use crate::corpus::{Corpus, CorpusRecord};
use ahash::AHashMap;
use lru::LruCache;
use rust_stemmers::{Algorithm, Stemmer};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// How query terms are compared against documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    /// Stemmed tokens with prefix and bounded edit-distance matching.
    Fuzzy,
    /// Lower-cased literal containment of each whitespace-separated term.
    Literal,
}

impl MatchMode {
    /// Any CJK character in the query disables fuzzy matching entirely.
    pub fn for_query(query: &str) -> Self {
        if contains_cjk(query) {
            Self::Literal
        } else {
            Self::Fuzzy
        }
    }
}

/// Per-query search options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub limit: usize,
    /// Forced match mode; `None` picks one from the query text.
    pub mode: Option<MatchMode>,
    pub fuzzy: FuzzyPolicy,
}

impl SearchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            limit: config.max_results,
            mode: None,
            fuzzy: FuzzyPolicy {
                max_edit_distance: config.max_edit_distance,
                min_fuzzy_len: config.min_fuzzy_len,
            },
        }
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// A ranked match. `record` is only set by backends that know more about a
/// page than the corpus does.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub path: String,
    pub score: f32,
    pub record: Option<CorpusRecord>,
}

/// Derived search view of one corpus record.
#[derive(Debug, Clone)]
pub struct IndexedDocument {
    pub path: String,
    pub title_tokens: Vec<String>,
    pub content_tokens: Vec<String>,
    title_lower: String,
    content_lower: String,
}

/// Builder for accumulating term frequencies before TF-IDF finalization.
struct TermBuilder {
    /// Flat map from (term, doc) → raw field-weighted TF
    term_docs: AHashMap<(String, usize), f32>,
    docs: Vec<IndexedDocument>,
    /// Token count per document, for length normalization
    doc_lengths: Vec<usize>,
    title_weight: f32,
    content_weight: f32,
    stemmer: Stemmer,
}

impl TermBuilder {
    fn new(config: &Config) -> Self {
        Self {
            term_docs: AHashMap::new(),
            docs: Vec::new(),
            doc_lengths: Vec::new(),
            title_weight: config.title_weight,
            content_weight: config.content_weight,
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    fn add_terms(&mut self, tokens: &[String], doc: usize, base_score: f32) {
        for token in tokens {
            *self.term_docs.entry((token.clone(), doc)).or_insert(0.0) += base_score;
        }
        self.doc_lengths[doc] += tokens.len();
    }

    /// The path is the retrieval key and is never tokenized.
    fn add_record(&mut self, record: &CorpusRecord) {
        let doc = self.docs.len();
        let title_tokens = analyze(&record.title, &self.stemmer);
        let content_tokens = analyze(&record.content, &self.stemmer);

        self.doc_lengths.push(0);
        self.add_terms(&title_tokens, doc, self.title_weight);
        self.add_terms(&content_tokens, doc, self.content_weight);

        self.docs.push(IndexedDocument {
            path: record.path.clone(),
            title_tokens,
            content_tokens,
            title_lower: record.title.to_lowercase(),
            content_lower: record.content.to_lowercase(),
        });
    }

    fn finalize(self, generation: u64) -> SearchIndex {
        let start = std::time::Instant::now();
        let total_docs = self.docs.len() as f32;
        let total_length: usize = self.doc_lengths.iter().sum();
        let avg_doc_length = if self.doc_lengths.is_empty() {
            1.0
        } else {
            total_length as f32 / self.doc_lengths.len() as f32
        };

        let mut grouped: AHashMap<String, Vec<(usize, f32)>> = AHashMap::new();
        let total_term_doc_pairs = self.term_docs.len();
        for ((term, doc), tf) in self.term_docs {
            grouped.entry(term).or_default().push((doc, tf));
        }

        let mut terms = AHashMap::with_capacity(grouped.len());
        for (term, doc_tfs) in grouped {
            let doc_freq = doc_tfs.len() as f32;
            let mut postings: Vec<(usize, f32)> = doc_tfs
                .into_iter()
                .map(|(doc, tf)| {
                    let doc_length = self.doc_lengths[doc].max(1) as f32;
                    (doc, scoring::tf_idf(tf, doc_length, avg_doc_length, doc_freq, total_docs))
                })
                .collect();
            postings.sort_by_key(|(doc, _)| *doc);
            terms.insert(term, postings);
        }

        let index = SearchIndex {
            docs: self.docs,
            terms,
            title_weight: self.title_weight,
            content_weight: self.content_weight,
            generation,
        };

        tracing::info!(
            "Built search index: {} unique terms, {} documents, {} term-document pairs in {:?}",
            index.term_count(),
            index.document_count(),
            total_term_doc_pairs,
            start.elapsed()
        );

        index
    }
}

/// A searchable term index with TF-IDF scoring.
#[derive(Debug, Clone)]
pub struct SearchIndex {
    /// Documents in corpus order; position doubles as the tie-breaker.
    docs: Vec<IndexedDocument>,
    /// Term → (doc position, TF-IDF weight), sorted by doc position.
    terms: AHashMap<String, Vec<(usize, f32)>>,
    title_weight: f32,
    content_weight: f32,
    generation: u64,
}

impl SearchIndex {
    /// Index every record of `corpus`. Building twice yields equal rankings.
    pub fn build(corpus: &Corpus, config: &Config) -> Self {
        Self::build_generation(corpus, config, 0)
    }

    fn build_generation(corpus: &Corpus, config: &Config, generation: u64) -> Self {
        let mut builder = TermBuilder::new(config);
        for record in corpus.records() {
            builder.add_record(record);
        }
        builder.finalize(generation)
    }

    /// Ranked matches for `query`, highest relevance first.
    ///
    /// Every query term must be satisfied by the document (AND semantics);
    /// per-term scores are summed.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Vec<Hit> {
        let mode = options.mode.unwrap_or_else(|| MatchMode::for_query(query));
        let scored = match mode {
            MatchMode::Fuzzy => self.search_fuzzy(query, &options.fuzzy),
            MatchMode::Literal => self.search_literal(query),
        };

        let mut ranked: Vec<(f32, usize)> = scored.into_iter().map(|(doc, s)| (s, doc)).collect();
        ranked.sort_by(|a, b| scoring::by_relevance(*a, *b));

        ranked
            .into_iter()
            .take(options.limit)
            .map(|(score, doc)| Hit {
                path: self.docs[doc].path.clone(),
                score,
                record: None,
            })
            .collect()
    }

    fn search_fuzzy(&self, query: &str, policy: &FuzzyPolicy) -> AHashMap<usize, f32> {
        let stemmer = Stemmer::create(Algorithm::English);
        let mut query_terms = analyze(query, &stemmer);
        query_terms.sort();
        query_terms.dedup();

        let mut combined: Option<AHashMap<usize, f32>> = None;
        for query_term in &query_terms {
            let per_doc = self.term_scores(query_term, policy);
            combined = Some(match combined {
                None => per_doc,
                Some(acc) => acc
                    .into_iter()
                    .filter_map(|(doc, score)| per_doc.get(&doc).map(|s| (doc, score + s)))
                    .collect(),
            });
            if combined.as_ref().is_some_and(|scores| scores.is_empty()) {
                break;
            }
        }
        combined.unwrap_or_default()
    }

    /// Best score per document for one query term across all matching index terms.
    fn term_scores(&self, query_term: &str, policy: &FuzzyPolicy) -> AHashMap<usize, f32> {
        let mut per_doc: AHashMap<usize, f32> = AHashMap::new();
        for (term, postings) in &self.terms {
            let Some(factor) = scoring::term_match_factor(query_term, term, policy) else {
                continue;
            };
            for &(doc, weight) in postings {
                let score = weight * factor;
                let entry = per_doc.entry(doc).or_insert(0.0);
                if score > *entry {
                    *entry = score;
                }
            }
        }
        per_doc
    }

    fn search_literal(&self, query: &str) -> AHashMap<usize, f32> {
        let mut needles = literal_terms(query);
        needles.sort_unstable();
        needles.dedup();
        if needles.is_empty() {
            return AHashMap::new();
        }

        self.docs
            .iter()
            .enumerate()
            .filter_map(|(i, doc)| {
                let mut total = 0.0;
                for needle in &needles {
                    let title_hits = scoring::occurrences(&doc.title_lower, needle);
                    let content_hits = scoring::occurrences(&doc.content_lower, needle);
                    if title_hits + content_hits == 0 {
                        return None;
                    }
                    total += scoring::literal_score(
                        title_hits,
                        content_hits,
                        self.title_weight,
                        self.content_weight,
                    );
                }
                Some((i, total))
            })
            .collect()
    }

    pub fn documents(&self) -> &[IndexedDocument] {
        &self.docs
    }

    /// Get the number of unique terms in the index
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Get the number of documents in the index
    pub fn document_count(&self) -> usize {
        self.docs.len()
    }

    /// Build counter of the handle that produced this index.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Shared owner of the live index plus a memo of recent query hits.
pub struct IndexHandle {
    current: RwLock<Arc<SearchIndex>>,
    cache: Mutex<LruCache<(u64, String), Arc<[Hit]>>>,
    options: SearchOptions,
    config: Config,
}

impl std::fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexHandle")
            .field("generation", &self.snapshot().generation())
            .field("documents", &self.snapshot().document_count())
            .finish_non_exhaustive()
    }
}

impl IndexHandle {
    /// Build the first index for `corpus`.
    pub fn new(corpus: &Corpus, config: &Config) -> Self {
        let capacity = NonZeroUsize::new(config.query_cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            current: RwLock::new(Arc::new(SearchIndex::build_generation(corpus, config, 1))),
            cache: Mutex::new(LruCache::new(capacity)),
            options: SearchOptions::from_config(config),
            config: config.clone(),
        }
    }

    /// The index queries currently run against.
    pub fn snapshot(&self) -> Arc<SearchIndex> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Build a fresh index off to the side, then publish it in one step.
    pub fn rebuild(&self, corpus: &Corpus) {
        let next_generation = self.snapshot().generation() + 1;
        let index = Arc::new(SearchIndex::build_generation(corpus, &self.config, next_generation));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = index;
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        tracing::debug!("Published search index generation {}", next_generation);
    }

    /// Search the live index, memoizing hit lists per generation and query.
    pub fn search(&self, query: &str) -> Arc<[Hit]> {
        let index = self.snapshot();
        let key = (index.generation(), query.trim().to_string());

        if let Some(hits) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            tracing::debug!("Query cache hit for '{}'", key.1);
            return Arc::clone(hits);
        }

        let hits: Arc<[Hit]> = index.search(&key.1, &self.options).into();
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key, Arc::clone(&hits));
        hits
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    fn record(path: &str, title: &str, content: &str) -> CorpusRecord {
        CorpusRecord {
            path: path.to_string(),
            content: content.to_string(),
            title: title.to_string(),
            timestamp: None,
        }
    }

    fn corpus() -> Corpus {
        Corpus::from_records([
            record("math/functional.html", "泛函分析", "泛函分析是研究函数空间的数学分支"),
            record("math/apps.html", "应用", "广泛应用的函数"),
            record("guide/install.html", "Installation", "Install the toolchain and configure paths"),
            record("guide/search.html", "Searching", "Search pages by title and content"),
            record("guide/config.html", "Configuration", "Configuration reference for the search engine"),
        ])
    }

    fn paths(hits: &[Hit]) -> Vec<&str> {
        hits.iter().map(|h| h.path.as_str()).collect()
    }

    #[test]
    fn cjk_query_is_literal_only() {
        let index = SearchIndex::build(&corpus(), &Config::default());
        let hits = index.search("泛函", &SearchOptions::default());
        check!(paths(&hits) == vec!["math/functional.html"]);
    }

    #[rstest]
    #[case("泛函，分析")]
    #[case("泛函、分析")]
    #[case("泛函?")]
    #[case("“泛函”")]
    #[case("泛函分析。")]
    #[case("(泛函)")]
    fn cjk_query_ignores_punctuation(#[case] query: &str) {
        let index = SearchIndex::build(&corpus(), &Config::default());
        let hits = index.search(query, &SearchOptions::default());
        check!(paths(&hits) == vec!["math/functional.html"]);
    }

    #[test]
    fn cjk_query_does_not_match_scattered_characters() {
        let index = SearchIndex::build(&corpus(), &Config::default());
        let hits = index.search("函数", &SearchOptions::default());
        check!(paths(&hits) == vec!["math/functional.html", "math/apps.html"]);

        let hits = index.search("广泛", &SearchOptions::default());
        check!(paths(&hits) == vec!["math/apps.html"]);
    }

    #[test]
    fn mode_selection() {
        check!(MatchMode::for_query("search") == MatchMode::Fuzzy);
        check!(MatchMode::for_query("rust 泛函") == MatchMode::Literal);
    }

    #[test]
    fn fuzzy_query_tolerates_typos() {
        let index = SearchIndex::build(&corpus(), &Config::default());
        let hits = index.search("instalation", &SearchOptions::default());
        check!(paths(&hits).first() == Some(&"guide/install.html"));
    }

    #[test]
    fn prefix_query_matches_while_typing() {
        let index = SearchIndex::build(&corpus(), &Config::default());
        let hits = index.search("confi", &SearchOptions::default());
        check!(paths(&hits).contains(&"guide/config.html"));
    }

    #[test]
    fn terms_combine_with_and() {
        let index = SearchIndex::build(&corpus(), &Config::default());
        let hits = index.search("search engine", &SearchOptions::default());
        check!(paths(&hits) == vec!["guide/config.html"]);
    }

    #[test]
    fn scores_are_non_increasing() {
        let index = SearchIndex::build(&corpus(), &Config::default());
        let hits = index.search("search", &SearchOptions::default());
        check!(hits.len() >= 2);
        check!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn title_outranks_content() {
        let index = SearchIndex::build(&corpus(), &Config::default());
        let hits = index.search("searching", &SearchOptions::default());
        check!(paths(&hits).first() == Some(&"guide/search.html"));
    }

    #[test]
    fn path_is_not_indexed() {
        let index = SearchIndex::build(&corpus(), &Config::default());
        check!(index.search("guide", &SearchOptions::default()).is_empty());
    }

    #[test]
    fn stop_word_only_query_has_no_hits() {
        let index = SearchIndex::build(&corpus(), &Config::default());
        check!(index.search("the", &SearchOptions::default()).is_empty());
    }

    #[test]
    fn limit_is_applied() {
        let index = SearchIndex::build(&corpus(), &Config::default());
        let options = SearchOptions {
            limit: 1,
            ..SearchOptions::default()
        };
        check!(index.search("search", &options).len() == 1);
    }

    #[test]
    fn rebuild_swaps_generation_and_clears_cache() {
        let handle = IndexHandle::new(&corpus(), &Config::default());
        check!(handle.search("泛函").len() == 1);
        check!(handle.snapshot().generation() == 1);

        handle.rebuild(&Corpus::from_records([record("x.html", "泛函", "")]));
        check!(handle.snapshot().generation() == 2);
        let hits = handle.search("泛函");
        check!(paths(&hits) == vec!["x.html"]);
    }

    #[test]
    fn build_is_idempotent() {
        let a = SearchIndex::build(&corpus(), &Config::default());
        let b = SearchIndex::build(&corpus(), &Config::default());
        check!(a.search("search", &SearchOptions::default()) == b.search("search", &SearchOptions::default()));
        check!(a.term_count() == b.term_count());
    }
}
