//! Highlighting of filter hits in labels.
//!
//! Matching is a literal, case-insensitive substring test (the filter is
//! regex-escaped), never token based.

use regex::{Regex, RegexBuilder};

/// A run of label text, flagged when it matched the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub highlighted: bool,
}

fn matcher(filter: &str) -> Option<Regex> {
    if filter.is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(filter))
        .case_insensitive(true)
        .build()
        .map_err(|e| tracing::warn!("Cannot highlight '{}': {}", filter, e))
        .ok()
}

/// Split `text` into plain and highlighted runs. Concatenating the runs
/// always reproduces `text`.
pub fn highlight_segments<'a>(text: &'a str, filter: &str) -> Vec<Segment<'a>> {
    let Some(re) = matcher(filter) else {
        return vec![Segment {
            text,
            highlighted: false,
        }];
    };

    let mut segments = Vec::new();
    let mut last = 0;
    for hit in re.find_iter(text) {
        if hit.start() > last {
            segments.push(Segment {
                text: &text[last..hit.start()],
                highlighted: false,
            });
        }
        segments.push(Segment {
            text: hit.as_str(),
            highlighted: true,
        });
        last = hit.end();
    }
    if last < text.len() || segments.is_empty() {
        segments.push(Segment {
            text: &text[last..],
            highlighted: false,
        });
    }
    segments
}

/// Escape `&`, `<`, `>`, `"` and `'` for HTML text and attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// HTML label with every hit wrapped in `<mark>`.
///
/// With an empty filter the text is returned exactly as given, without
/// escaping, so highlighting nothing is the identity.
pub fn highlight_html(text: &str, filter: &str) -> String {
    if filter.is_empty() {
        return text.to_string();
    }
    highlight_segments(text, filter)
        .into_iter()
        .map(|segment| {
            if segment.highlighted {
                format!("<mark>{}</mark>", escape_html(segment.text))
            } else {
                escape_html(segment.text)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    #[rstest]
    #[case("Getting Started")]
    #[case("<b>raw</b>")]
    #[case("")]
    fn empty_filter_is_identity(#[case] text: &str) {
        check!(highlight_html(text, "") == text);
        let segments = highlight_segments(text, "");
        check!(segments.len() == 1);
        check!(!segments[0].highlighted);
    }

    #[test]
    fn wraps_every_case_insensitive_hit() {
        check!(highlight_html("Foo and foo", "FOO") == "<mark>Foo</mark> and <mark>foo</mark>");
    }

    #[test]
    fn filter_is_literal_not_regex() {
        check!(highlight_html("a.b axb", ".") == "a<mark>.</mark>b axb");
        check!(highlight_html("f(x)", "(x") == "f<mark>(x</mark>)");
    }

    #[test]
    fn markup_in_labels_is_escaped() {
        check!(highlight_html("<T> type", "type") == "&lt;T&gt; <mark>type</mark>");
    }

    #[test]
    fn segments_reassemble() {
        let text = "泛函分析与函数";
        let joined: String = highlight_segments(text, "函")
            .iter()
            .map(|s| s.text)
            .collect();
        check!(joined == text);
    }
}
