use std::collections::HashSet;

use anyhow::Result;
use regex::Regex;
use stop_words::{get, LANGUAGE};
use unicode_normalization::UnicodeNormalization;

/// Normalizes review text before vectorization and topic modeling
#[derive(Debug, Clone)]
pub struct TextCleaner {
    digits_regex: Regex,
    url_regex: Regex,
    special_chars_regex: Regex,
    extra_spaces_regex: Regex,
}

impl TextCleaner {
    /// Compile the cleaning expressions
    pub fn new() -> Result<Self> {
        let digits_regex =
            Regex::new(r"\d+").map_err(|e| anyhow::anyhow!("Failed to compile digits regex: {e}"))?;
        let url_regex =
            Regex::new(r"http\S+").map_err(|e| anyhow::anyhow!("Failed to compile URL regex: {e}"))?;
        let special_chars_regex = Regex::new(r"[^\w\s]")
            .map_err(|e| anyhow::anyhow!("Failed to compile special chars regex: {e}"))?;
        let extra_spaces_regex =
            Regex::new(r"\s+").map_err(|e| anyhow::anyhow!("Failed to compile spaces regex: {e}"))?;

        Ok(Self {
            digits_regex,
            url_regex,
            special_chars_regex,
            extra_spaces_regex,
        })
    }

    /// Lower-case, then strip digits, URLs and punctuation and collapse whitespace
    #[must_use]
    pub fn clean(&self, text: &str) -> String {
        let lowered = text.nfc().collect::<String>().to_lowercase();

        let no_digits = self.digits_regex.replace_all(&lowered, "");
        let no_urls = self.url_regex.replace_all(&no_digits, "");
        let no_special = self.special_chars_regex.replace_all(&no_urls, " ");

        self.extra_spaces_regex
            .replace_all(&no_special, " ")
            .trim()
            .to_string()
    }
}

/// English stop words shared by the vectorizers and the topic models
#[must_use]
pub fn english_stop_words() -> HashSet<String> {
    get(LANGUAGE::English).iter().map(ToString::to_string).collect()
}

/// Split cleaned text on whitespace, dropping stop words and short tokens
#[must_use]
pub fn tokenize(text: &str, stop_words: &HashSet<String>, min_len: usize) -> Vec<String> {
    text.split_whitespace()
        .filter(|token| token.chars().count() >= min_len && !stop_words.contains(*token))
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        let cleaner = TextCleaner::new().expect("Failed to create text cleaner");

        // URL removal
        let cleaned = cleaner.clean("See https://example.com/help for more");
        assert_eq!(cleaned, "see for more");

        // Digits are dropped, not replaced
        assert_eq!(cleaner.clean("Lost 500 birr in 2 days"), "lost birr in days");

        // Punctuation becomes a space
        assert_eq!(cleaner.clean("Slow!!!app,really"), "slow app really");

        // Whitespace normalization
        assert_eq!(cleaner.clean("  Too   many    spaces   "), "too many spaces");
    }

    #[test]
    fn test_clean_empty_text() {
        let cleaner = TextCleaner::new().expect("Failed to create text cleaner");
        assert_eq!(cleaner.clean(""), "");
    }

    #[test]
    fn test_tokenize() {
        let stop_words: HashSet<String> = ["the", "is"].iter().map(ToString::to_string).collect();
        let tokens = tokenize("the app is very slow ok", &stop_words, 3);

        assert_eq!(tokens, vec!["app", "very", "slow"]);
    }
}
