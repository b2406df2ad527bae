//! Profanity masking for user supplied text.

use regex::{Regex, RegexBuilder};

/// Character used to mask denied words.
pub const MASK_CHAR: char = '*';

/// Words masked when no custom list is configured.
pub const DEFAULT_DENYLIST: &[&str] = &["badword", "spam", "idiot", "stupid", "damn"];

/// Masks denied words in text.
///
/// Matching is Unicode case-insensitive and does not respect word boundaries,
/// so `"spammer"` becomes `"****mer"`. Words are applied in list order; a
/// span that has already been masked never matches a later word.
#[derive(Debug, Clone)]
pub struct ProfanityFilter {
    words: Vec<String>,
    matchers: Vec<Regex>,
}

impl ProfanityFilter {
    /// Create a filter from a list of words.
    ///
    /// Empty entries are dropped.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut kept = Vec::new();
        let mut matchers = Vec::new();
        for word in words {
            let word: String = word.into();
            if word.is_empty() {
                continue;
            }
            match RegexBuilder::new(&regex::escape(&word))
                .case_insensitive(true)
                .build()
            {
                Ok(matcher) => {
                    matchers.push(matcher);
                    kept.push(word);
                }
                Err(e) => tracing::warn!(%word, error = %e, "Skipping unusable denylist word"),
            }
        }
        Self {
            words: kept,
            matchers,
        }
    }

    /// Get the configured word list.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Return `text` with every denied word replaced by a run of [`MASK_CHAR`]
    /// of the same length.
    pub fn filter(&self, text: &str) -> String {
        let mut out = text.to_string();
        for matcher in &self.matchers {
            if matcher.is_match(&out) {
                out = matcher
                    .replace_all(&out, |caps: &regex::Captures<'_>| {
                        mask(caps[0].chars().count())
                    })
                    .into_owned();
            }
        }
        out
    }
}

impl Default for ProfanityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_DENYLIST.iter().copied())
    }
}

fn mask(len: usize) -> String {
    std::iter::repeat_n(MASK_CHAR, len).collect()
}
