//! Extractive answer synthesis from retrieved chunks.
//!
//! Retrieved chunks are split into sentence-like units, each unit is scored
//! by how many distinct non-stop-word tokens it shares with the question,
//! and the best distinct units are joined into a short answer.

use std::collections::HashSet;

use crate::text_util::{split_sentences, tokenize};

/// Default number of sentence units joined into an answer.
pub const DEFAULT_MAX_UNITS: usize = 3;

/// Units shorter than this many characters are ignored.
const MIN_UNIT_CHARS: usize = 20;

const STOPWORDS: &[&str] = &[
    "what", "when", "where", "who", "how", "why", "is", "are", "am", "the",
    "a", "an", "and", "or", "for", "of", "to", "in", "on", "at", "do", "does",
    "did", "can", "could", "i", "you", "we", "they", "it", "this", "that",
    "about",
];

const GREETINGS: &[&str] = &["hi", "hello", "hey", "hii", "heyy"];

/// Document header and metadata lines that should never be quoted.
const HEADER_MARKERS: &[&str] = &[
    "Company Knowledge Base –",
    "Document Title:",
    "Version:",
    "Last Updated:",
];

/// Bullet glyphs stripped from chunk text (including the private-use glyph
/// some PDF exporters emit for list bullets).
const BULLETS: &[char] = &['\u{f0b7}', '•'];

pub const NOT_FOUND_MESSAGE: &str =
    "I couldn't find anything about that in the document. \
     Try asking things like:\n\
     - How many sick leaves do employees get per year?\n\
     - What are the working hours?\n\
     - What is the WFH policy?";

pub const GREETING_MESSAGE: &str =
    "Hi! I'm the company knowledge base chatbot. \
     Ask me about leaves, working hours, WFH policy, user roles, \
     onboarding, or support.\n\n\
     Example questions:\n\
     - How many sick leaves do employees get per year?\n\
     - What are the working hours?\n\
     - What is the WFH policy?";

/// A sentence unit with its keyword-overlap score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredUnit {
    pub text: String,
    pub score: usize,
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// Lowercase tokens of `text` with stop words removed, in order.
pub fn keywords(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| !is_stopword(t))
        .collect()
}

/// Number of distinct keywords shared by `unit` and the question keywords.
pub fn score_unit(unit: &str, question_keywords: &HashSet<String>) -> usize {
    keywords(unit)
        .into_iter()
        .collect::<HashSet<_>>()
        .intersection(question_keywords)
        .count()
}

fn is_greeting(question_keywords: &[String]) -> bool {
    !question_keywords.is_empty()
        && question_keywords
            .iter()
            .all(|t| GREETINGS.contains(&t.as_str()))
}

fn is_header(unit: &str) -> bool {
    HEADER_MARKERS.iter().any(|marker| unit.contains(marker))
}

/// Split every chunk into candidate units and score them, in encounter
/// order. Short fragments and header lines are dropped.
pub fn score_units<S: AsRef<str>>(
    chunks: &[S],
    question_keywords: &HashSet<String>,
) -> Vec<ScoredUnit> {
    let mut scored = Vec::new();

    for chunk in chunks {
        let clean = chunk.as_ref().replace('\n', " ").replace(BULLETS, "");

        for part in split_sentences(clean.trim()) {
            let unit = part.trim();
            if unit.chars().count() < MIN_UNIT_CHARS || is_header(unit) {
                continue;
            }

            scored.push(ScoredUnit {
                text: unit.to_string(),
                score: score_unit(unit, question_keywords),
            });
        }
    }

    scored
}

/// Build a short extractive answer for `question` from retrieved chunks.
///
/// Returns [`NOT_FOUND_MESSAGE`] when there are no chunks, no usable units,
/// or no unit shares a keyword with the question, and [`GREETING_MESSAGE`]
/// when the question is only a greeting. Otherwise the highest-scoring
/// distinct units (ties keep retrieval order) are joined with spaces, up to
/// `max_units` of them.
///
/// # Examples
///
/// ```
/// use askdocs::answer::{extract_answer, NOT_FOUND_MESSAGE};
///
/// let chunks =
///     ["Employees get 12 sick leaves per year. Working hours are 9 to 6."];
/// let question = "How many sick leaves do employees get?";
/// let answer = extract_answer(question, &chunks, 3);
/// assert!(answer.starts_with("Employees get 12 sick leaves per year."));
///
/// let none: [&str; 0] = [];
/// assert_eq!(extract_answer("anything", &none, 3), NOT_FOUND_MESSAGE);
/// ```
pub fn extract_answer<S: AsRef<str>>(
    question: &str,
    chunks: &[S],
    max_units: usize,
) -> String {
    if chunks.is_empty() {
        return NOT_FOUND_MESSAGE.to_string();
    }

    let question_keywords = keywords(question);
    if is_greeting(&question_keywords) {
        return GREETING_MESSAGE.to_string();
    }
    let question_keywords: HashSet<String> =
        question_keywords.into_iter().collect();

    let mut scored = score_units(chunks, &question_keywords);

    // Stable: equal scores keep encounter order.
    scored.sort_by(|a, b| b.score.cmp(&a.score));

    match scored.first() {
        None => return NOT_FOUND_MESSAGE.to_string(),
        Some(best) if best.score == 0 => {
            return NOT_FOUND_MESSAGE.to_string();
        }
        Some(_) => {}
    }

    let mut used = HashSet::new();
    let mut picked = Vec::new();
    for unit in &scored {
        if used.insert(unit.text.to_lowercase().trim().to_string()) {
            picked.push(unit.text.as_str());
        }
        if picked.len() >= max_units {
            break;
        }
    }

    picked.join(" ")
}
