//! Full-text search over the page corpus.
//!
//! This module provides TF-IDF based search with CJK-aware tokenization,
//! fuzzy and literal matching, and recency-ordered fallback views.

pub mod backend;
pub mod index;
pub mod query;
pub(crate) mod scoring;
pub mod tokenize;

pub use backend::{
    EngineOptions, ExternalBackend, ExternalEngine, ExternalResult, Fragment, NullEngine,
    SearchBackend,
};
pub use index::{Hit, IndexHandle, IndexedDocument, MatchMode, SearchIndex, SearchOptions};
pub use query::{QueryEngine, QueryOutcome, QueryResult, ResultOrigin};
pub use scoring::FuzzyPolicy;
pub use tokenize::{contains_cjk, is_cjk, tokenize};
