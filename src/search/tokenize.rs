//! Text tokenization, CJK segmentation and stemming for search indexing.
//!
//! [`tokenize`] is the script-aware splitter: text is lower-cased, then cut into
//! runs by script. Runs of letters and digits become tokens directly; Han runs
//! are split at word boundaries by a dictionary segmenter; Kana and Hangul runs
//! are kept whole. [`analyze`] layers stop-word removal and English stemming on
//! top for the words that have separable spelling.

use rust_stemmers::Stemmer;

/// Common English stop words to filter out from indexing.
/// These high-frequency words add little value to search relevance.
pub(crate) const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "will", "with",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Word,
    Han,
    Kana,
    Hangul,
    Separator,
}

fn script_of(c: char) -> Script {
    match u32::from(c) {
        0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xF900..=0xFAFF
        | 0x20000..=0x2EBEF
        | 0x30000..=0x3134F => Script::Han,
        0x3040..=0x309F | 0x30A0..=0x30FF | 0x31F0..=0x31FF | 0xFF66..=0xFF9F => Script::Kana,
        0x1100..=0x11FF | 0x3130..=0x318F | 0xAC00..=0xD7AF => Script::Hangul,
        _ if c.is_alphanumeric() => Script::Word,
        _ => Script::Separator,
    }
}

/// Whether `c` belongs to a script written without spaces between words.
pub fn is_cjk(c: char) -> bool {
    matches!(script_of(c), Script::Han | Script::Kana | Script::Hangul)
}

/// Whether any character of `text` is CJK.
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk)
}

#[cfg(feature = "segmentation")]
static SEGMENTER: std::sync::LazyLock<jieba_rs::Jieba> = std::sync::LazyLock::new(|| {
    let start = std::time::Instant::now();
    let jieba = jieba_rs::Jieba::new();
    tracing::debug!("Loaded segmentation dictionary in {:?}", start.elapsed());
    jieba
});

/// Split a run of Han characters at word boundaries.
#[cfg(feature = "segmentation")]
fn segment_han(run: &str, tokens: &mut Vec<String>) {
    tokens.extend(
        SEGMENTER
            .cut(run, true)
            .into_iter()
            .filter(|word| !word.trim().is_empty())
            .map(str::to_string),
    );
}

/// Without a segmenter the run is one token; never drop it.
#[cfg(not(feature = "segmentation"))]
fn segment_han(run: &str, tokens: &mut Vec<String>) {
    tokens.push(run.to_string());
}

fn flush(script: Script, run: &str, tokens: &mut Vec<String>) {
    if run.is_empty() {
        return;
    }
    match script {
        Script::Han => segment_han(run, tokens),
        Script::Word | Script::Kana | Script::Hangul => tokens.push(run.to_string()),
        Script::Separator => {}
    }
}

/// Converts text into an ordered sequence of lower-cased tokens.
///
/// Pure and synchronous. Separators (whitespace, punctuation, `_`, `-`) are
/// dropped. A script change also ends a token, so `rust编程` yields `rust`
/// followed by the Han segments.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut tokens = Vec::new();

    let mut run_start = 0;
    let mut run_script = Script::Separator;
    for (i, c) in lowered.char_indices() {
        let script = script_of(c);
        if script != run_script {
            flush(run_script, &lowered[run_start..i], &mut tokens);
            run_start = i;
            run_script = script;
        }
    }
    flush(run_script, &lowered[run_start..], &mut tokens);

    tokens
}

/// Lower-cased literal search terms: `text` split at separator characters
/// (whitespace and punctuation, ASCII or full-width), empty pieces dropped.
/// Runs of different scripts stay together, so `泛函分析` remains one term.
pub(crate) fn literal_terms(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| script_of(c) == Script::Separator)
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

/// Tokenizes and normalizes text for the index: stop words are removed and
/// separable words are stemmed. CJK tokens pass through untouched.
pub(crate) fn analyze(text: &str, stemmer: &Stemmer) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter_map(|token| normalize_token(token, stemmer))
        .collect()
}

/// Normalize a single lower-cased token; `None` for stop words.
pub(crate) fn normalize_token(token: String, stemmer: &Stemmer) -> Option<String> {
    if contains_cjk(&token) {
        return Some(token);
    }
    if STOP_WORDS.contains(&token.as_str()) {
        return None;
    }
    Some(stemmer.stem(&token).into_owned())
}
