//! Search relevance and ranking algorithms.
//!
//! Relevance is always "higher is better": every score produced here is
//! non-negative and results are ordered by descending score.

use rapidfuzz::distance::levenshtein;
use std::cmp::Ordering;

/// Weight applied when a query term is an exact index term.
const EXACT_FACTOR: f32 = 1.0;
/// Weight applied when a query term is a strict prefix of an index term.
const PREFIX_FACTOR: f32 = 0.75;
/// Weight applied to a fuzzy match at edit distance 1; each further edit costs more.
const FUZZY_FACTOR: f32 = 0.5;
/// Shortest query term allowed to match by prefix.
const MIN_PREFIX_LEN: usize = 2;

/// Bounds for approximate term matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyPolicy {
    /// Largest edit distance ever accepted.
    pub max_edit_distance: usize,
    /// Terms shorter than this never match fuzzily.
    pub min_fuzzy_len: usize,
}

impl FuzzyPolicy {
    /// Edit budget for a query term of `len` characters.
    ///
    /// Short terms are exact-or-prefix only, mid-length terms allow one edit,
    /// long terms up to the configured maximum.
    pub(crate) fn allowed_edits(&self, len: usize) -> usize {
        if len < self.min_fuzzy_len {
            0
        } else if len < self.min_fuzzy_len * 2 {
            self.max_edit_distance.min(1)
        } else {
            self.max_edit_distance
        }
    }
}

/// How well `query_term` matches `index_term`, as a multiplicative factor.
///
/// Returns:
/// - 1.0: Exact match
/// - 0.75: Query term is a prefix of the index term
/// - 0.5 and below: Within the edit budget
/// - None: No match
pub(crate) fn term_match_factor(query_term: &str, index_term: &str, policy: &FuzzyPolicy) -> Option<f32> {
    if query_term == index_term {
        return Some(EXACT_FACTOR);
    }

    let query_len = query_term.chars().count();
    if query_len >= MIN_PREFIX_LEN && index_term.starts_with(query_term) {
        return Some(PREFIX_FACTOR);
    }

    let budget = policy.allowed_edits(query_len);
    if budget == 0 {
        return None;
    }
    let index_len = index_term.chars().count();
    if query_len.abs_diff(index_len) > budget {
        return None;
    }

    let distance = levenshtein::distance(query_term.chars(), index_term.chars());
    (distance <= budget).then(|| FUZZY_FACTOR / distance as f32)
}

/// TF-IDF weight of a term in one document.
///
/// Uses `(1 + ln(tf_normalized)) * ln(1 + total_docs / doc_freq)` where
/// `tf_normalized = tf / max(doc_length / avg_doc_length, 0.5)`. The smoothed
/// IDF stays positive even when every document contains the term, so a
/// one-page corpus still ranks.
pub(crate) fn tf_idf(tf: f32, doc_length: f32, avg_doc_length: f32, doc_freq: f32, total_docs: f32) -> f32 {
    let length_norm = (doc_length / avg_doc_length.max(1.0)).max(0.5);
    let tf_normalized = (tf / length_norm).max(f32::MIN_POSITIVE);
    let idf = (1.0 + total_docs / doc_freq.max(1.0)).ln();
    (1.0 + tf_normalized.ln()).max(0.1) * idf
}

/// Number of non-overlapping occurrences of `needle` in `haystack`.
pub(crate) fn occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Score for literal containment: dampened, field-weighted occurrence count.
pub(crate) fn literal_score(title_hits: usize, content_hits: usize, title_weight: f32, content_weight: f32) -> f32 {
    let weighted = title_hits as f32 * title_weight + content_hits as f32 * content_weight;
    if weighted <= 0.0 {
        0.0
    } else {
        1.0 + weighted.ln_1p()
    }
}

/// Descending relevance, ties broken by ascending corpus position.
pub(crate) fn by_relevance(a: (f32, usize), b: (f32, usize)) -> Ordering {
    b.0.total_cmp(&a.0).then(a.1.cmp(&b.1))
}
