use std::sync::LazyLock;

use regex::Regex;

static WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\w+").expect("word pattern is valid")
});

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[.!?]\s+").expect("sentence pattern is valid")
});

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase word tokens (`\w+` runs) of `text`, in order.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD.find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Split text into sentence-like units at whitespace that follows `.`, `!`
/// or `?`. The terminating punctuation stays with its sentence and the
/// whitespace itself is dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END.find_iter(text) {
        // The punctuation mark is a single ASCII byte.
        units.push(&text[start..m.start() + 1]);
        start = m.end();
    }
    units.push(&text[start..]);

    units
}
