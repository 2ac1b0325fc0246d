//! Tokenization: NFKC normalization, lowercasing, and alphanumeric-run
//! splitting.
//!
//! A token is a run of Unicode letters and digits after NFKC normalization
//! and lowercasing. Stop words and tokens below the minimum length are
//! dropped; positions are the indices into the filtered stream, so the
//! position of a surviving token shifts left past every dropped one.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

use unicode_normalization::UnicodeNormalization;

/// Default English stop words embedded at compile time.
static DEFAULT_STOP_WORDS: LazyLock<HashSet<String>> = LazyLock::new(|| {
    parse_stop_words(include_str!("../data/stop_words.txt"))
});

/// Parse a stop-word list: one word per line, `#` starts a comment.
/// Entries pass through the same normalization as document text so matching
/// stays case- and form-insensitive.
fn parse_stop_words(raw: &str) -> HashSet<String> {
    raw.lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(normalize)
        .filter(|word| !word.is_empty())
        .collect()
}

/// NFKC-normalize and lowercase a string.
pub fn normalize(value: &str) -> String {
    value.nfkc().collect::<String>().to_lowercase()
}

/// Tokenizer configured with a stop-word set and a minimum token length.
pub struct Tokenizer {
    stop_words: HashSet<String>,
    min_token_len: usize,
}

impl Tokenizer {
    /// Tokenizer with the embedded default stop-word list.
    pub fn new(min_token_len: usize) -> Self {
        Self {
            stop_words: DEFAULT_STOP_WORDS.clone(),
            min_token_len,
        }
    }

    /// Tokenizer with an explicit stop-word set (already raw strings; they
    /// are normalized here).
    pub fn with_stop_words<I, S>(stop_words: I, min_token_len: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            stop_words: stop_words
                .into_iter()
                .map(|w| normalize(w.as_ref()))
                .filter(|w| !w.is_empty())
                .collect(),
            min_token_len,
        }
    }

    /// Load a stop-word file (one word per line, `#` comments).
    pub fn from_stop_word_file(path: &Path, min_token_len: usize) -> io::Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(Self {
            stop_words: parse_stop_words(&raw),
            min_token_len,
        })
    }

    /// Tokenize one document's text. Positions are implied by index.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = normalize(text);
        normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|tok| !tok.is_empty())
            .filter(|tok| tok.chars().count() >= self.min_token_len)
            .filter(|tok| !self.stop_words.contains(*tok))
            .map(str::to_owned)
            .collect()
    }
}
