//! Chunking utilities for splitting page text into overlapping segments.
//!
//! Pages are split on whitespace and words are packed into chunks of at most
//! [`DEFAULT_MAX_CHARS`] characters. Consecutive chunks share a few trailing
//! words so that a sentence cut at a boundary is still retrievable from
//! either side.

/// Default maximum chunk size in characters.
pub const DEFAULT_MAX_CHARS: usize = 600;

/// Default overlap between adjacent chunks in characters.
pub const DEFAULT_OVERLAP: usize = 100;

/// Rough average word length used to turn a character overlap into a word
/// count.
const CHARS_PER_WORD: usize = 5;

/// Chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters.
    pub max_chars: usize,
    /// Approximate overlap between adjacent chunks in characters.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// Number of words carried from a closed chunk into the next one.
///
/// This is only an approximation of `overlap` characters; it assumes an
/// average of five characters per word and never goes below one word.
pub fn overlap_words(overlap: usize) -> usize {
    (overlap / CHARS_PER_WORD).max(1)
}

/// Split text into word-bounded chunks (optionally overlapping).
///
/// Words are accumulated while the projected length (each word counted with
/// one trailing separator) stays within `max_chars`. When the next word
/// would overflow, the current chunk is closed and the next chunk is seeded
/// with the last [`overlap_words`] words of the closed one.
///
/// A single word longer than `max_chars` is kept whole. Empty or
/// whitespace-only input produces no chunks.
///
/// # Examples
///
/// ```
/// use askdocs::chunking::chunk_text;
///
/// let chunks = chunk_text("Hello, world!", 600, 100);
/// assert_eq!(chunks, vec!["Hello, world!".to_string()]);
///
/// assert!(chunk_text("   \n\t ", 600, 100).is_empty());
///
/// let text = "word ".repeat(500);
/// assert!(chunk_text(&text, 600, 100).len() >= 2);
/// ```
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let carry = overlap_words(overlap);

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count() + 1;

        if !current.is_empty() && current_len + word_len > max_chars {
            chunks.push(current.join(" "));

            if overlap > 0 && current.len() > carry {
                current.drain(..current.len() - carry);
            } else {
                current.clear();
            }

            current_len = current.iter().map(|w| w.chars().count() + 1).sum();
        }

        current.push(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}
