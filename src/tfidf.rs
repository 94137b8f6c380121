//! TF-IDF vectorization and corpus keyword ranking.
//!
//! The vectorizer follows the usual smoothed formulation: raw term counts,
//! `idf = ln((1 + n) / (1 + df)) + 1`, rows L2-normalized. Stop words are
//! removed before n-grams are formed, and the vocabulary is pruned by
//! document frequency before any weights are computed.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::models::KeywordScore;

/// Default token pattern: runs of two or more word characters
pub const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

/// Configurable TF-IDF vectorizer
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    ngram_range: (usize, usize),
    min_df: usize,
    max_df: f64,
    max_features: Option<usize>,
    stop_words: Option<HashSet<String>>,
    token_regex: Regex,
}

impl TfidfVectorizer {
    /// Unigrams, no stop words, no frequency cut-offs
    pub fn new() -> Result<Self> {
        Ok(Self {
            ngram_range: (1, 1),
            min_df: 1,
            max_df: 1.0,
            max_features: None,
            stop_words: None,
            token_regex: compile_token_pattern(DEFAULT_TOKEN_PATTERN)?,
        })
    }

    /// Set n-gram range for feature extraction
    #[must_use]
    pub fn with_ngram_range(mut self, min_n: usize, max_n: usize) -> Self {
        let min_n = min_n.max(1);
        self.ngram_range = (min_n, max_n.max(min_n));
        self
    }

    /// Terms appearing in fewer than `min_df` documents are ignored
    #[must_use]
    pub const fn with_min_df(mut self, min_df: usize) -> Self {
        self.min_df = min_df;
        self
    }

    /// Terms appearing in more than `max_df` of the documents are ignored
    #[must_use]
    pub fn with_max_df(mut self, max_df: f64) -> Self {
        self.max_df = max_df.clamp(0.0, 1.0);
        self
    }

    /// Keep only the `max_features` most frequent terms
    #[must_use]
    pub const fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Remove these words before building n-grams
    #[must_use]
    pub fn with_stop_words(mut self, stop_words: HashSet<String>) -> Self {
        self.stop_words = Some(stop_words);
        self
    }

    /// Replace the token pattern
    pub fn with_token_pattern(mut self, pattern: &str) -> Result<Self> {
        self.token_regex = compile_token_pattern(pattern)?;
        Ok(self)
    }

    /// Split a document into stop-word-free n-grams
    #[must_use]
    pub fn analyze(&self, document: &str) -> Vec<String> {
        let lowered = document.to_lowercase();
        let tokens: Vec<&str> = self
            .token_regex
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|token| self.stop_words.as_ref().map_or(true, |stop| !stop.contains(*token)))
            .collect();

        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n {
            if n > tokens.len() {
                break;
            }
            terms.extend(tokens.windows(n).map(|window| window.join(" ")));
        }
        terms
    }

    /// Learn the vocabulary and idf weights, and return the weighted matrix
    pub fn fit_transform<S: AsRef<str>>(&self, documents: &[S]) -> Result<TfidfMatrix> {
        if documents.is_empty() {
            return Err(PipelineError::Vectorizer("cannot fit on an empty corpus".to_string()));
        }

        let n_docs = documents.len();
        let mut doc_counts: Vec<HashMap<String, usize>> = Vec::with_capacity(n_docs);
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut total_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let mut counts: HashMap<String, usize> = HashMap::new();
            for term in self.analyze(doc.as_ref()) {
                *counts.entry(term).or_default() += 1;
            }
            for (term, count) in &counts {
                *doc_freq.entry(term.clone()).or_default() += 1;
                *total_freq.entry(term.clone()).or_default() += count;
            }
            doc_counts.push(counts);
        }

        if doc_freq.is_empty() {
            return Err(PipelineError::Vectorizer(
                "empty vocabulary; perhaps the documents only contain stop words".to_string(),
            ));
        }

        let max_doc_count = self.max_df * n_docs as f64;
        let mut kept: Vec<String> = doc_freq
            .iter()
            .filter(|(_, &df)| df >= self.min_df && df as f64 <= max_doc_count)
            .map(|(term, _)| term.clone())
            .collect();
        debug!(
            "Vocabulary pruned from {} to {} terms (min_df={}, max_df={})",
            doc_freq.len(),
            kept.len(),
            self.min_df,
            self.max_df
        );

        if let Some(limit) = self.max_features {
            kept.sort_by(|a, b| total_freq[b].cmp(&total_freq[a]).then_with(|| a.cmp(b)));
            kept.truncate(limit);
        }

        if kept.is_empty() {
            return Err(PipelineError::Vectorizer(
                "after pruning, no terms remain; try a lower min_df or a higher max_df".to_string(),
            ));
        }

        kept.sort();
        let vocabulary: HashMap<&str, usize> = kept.iter().enumerate().map(|(i, term)| (term.as_str(), i)).collect();
        let idf: Vec<f64> = kept
            .iter()
            .map(|term| ((1.0 + n_docs as f64) / (1.0 + doc_freq[term] as f64)).ln() + 1.0)
            .collect();

        let rows = doc_counts
            .iter()
            .map(|counts| {
                let mut row: Vec<(usize, f64)> = counts
                    .iter()
                    .filter_map(|(term, &count)| {
                        vocabulary
                            .get(term.as_str())
                            .map(|&col| (col, count as f64 * idf[col]))
                    })
                    .collect();
                row.sort_by_key(|(col, _)| *col);

                let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (_, weight) in &mut row {
                        *weight /= norm;
                    }
                }
                row
            })
            .collect();

        Ok(TfidfMatrix {
            rows,
            feature_names: kept,
        })
    }
}

fn compile_token_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| PipelineError::Vectorizer(format!("invalid token pattern {pattern:?}: {e}")))
}

/// Sparse document-term matrix of TF-IDF weights
#[derive(Debug, Clone)]
pub struct TfidfMatrix {
    rows: Vec<Vec<(usize, f64)>>,
    feature_names: Vec<String>,
}

impl TfidfMatrix {
    /// Number of documents
    #[must_use]
    pub fn n_docs(&self) -> usize {
        self.rows.len()
    }

    /// Number of vocabulary terms
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Vocabulary terms in column order (alphabetical)
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Non-zero `(column, weight)` pairs of one document
    #[must_use]
    pub fn row(&self, index: usize) -> &[(usize, f64)] {
        self.rows.get(index).map(Vec::as_slice).unwrap_or_default()
    }

    /// Iterate over document rows
    pub fn rows(&self) -> impl Iterator<Item = &[(usize, f64)]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Mean weight of each column, zeros included
    #[must_use]
    pub fn column_means(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.n_features()];
        for row in &self.rows {
            for &(col, weight) in row {
                sums[col] += weight;
            }
        }

        let n = self.n_docs().max(1) as f64;
        sums.into_iter().map(|sum| sum / n).collect()
    }
}

/// Ranks corpus keywords by mean TF-IDF weight
#[derive(Debug, Clone)]
pub struct KeywordRanker {
    vectorizer: TfidfVectorizer,
}

impl KeywordRanker {
    /// Rank with a configured vectorizer
    #[must_use]
    pub const fn new(vectorizer: TfidfVectorizer) -> Self {
        Self { vectorizer }
    }

    /// Keyword table sorted by mean weight, heaviest first
    pub fn rank<S: AsRef<str>>(&self, cleaned_documents: &[S]) -> Result<Vec<KeywordScore>> {
        let matrix = self.vectorizer.fit_transform(cleaned_documents)?;
        let means = matrix.column_means();

        let mut keywords: Vec<KeywordScore> = matrix
            .feature_names()
            .iter()
            .zip(means)
            .map(|(word, tfidf)| KeywordScore {
                word: word.clone(),
                tfidf,
            })
            .collect();
        keywords.sort_by(|a, b| b.tfidf.total_cmp(&a.tfidf).then_with(|| a.word.cmp(&b.word)));

        info!("TF-IDF analysis complete. Found {} features.", keywords.len());
        Ok(keywords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_builds_bigrams_after_stop_words() {
        let stop_words: HashSet<String> = ["the"].iter().map(ToString::to_string).collect();
        let vectorizer = TfidfVectorizer::new()
            .expect("vectorizer")
            .with_ngram_range(1, 2)
            .with_stop_words(stop_words);

        let terms = vectorizer.analyze("the transfer the failed");
        assert_eq!(terms, vec!["transfer", "failed", "transfer failed"]);
    }

    #[test]
    fn test_rows_are_l2_normalized() {
        let vectorizer = TfidfVectorizer::new().expect("vectorizer");
        let matrix = vectorizer
            .fit_transform(&["slow transfer", "slow login", "fingerprint login works"])
            .expect("fit should succeed");

        for row in matrix.rows() {
            let norm: f64 = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
        assert_eq!(matrix.feature_names(), ["fingerprint", "login", "slow", "transfer", "works"]);
    }

    #[test]
    fn test_ubiquitous_word_pruned_by_max_df() {
        let docs = ["zebra alpha", "zebra beta", "zebra gamma", "zebra delta"];
        let vectorizer = TfidfVectorizer::new().expect("vectorizer").with_max_df(0.85);
        let matrix = vectorizer.fit_transform(&docs).expect("fit should succeed");

        assert!(!matrix.feature_names().iter().any(|w| w == "zebra"));
        assert_eq!(matrix.n_features(), 4);
    }

    #[test]
    fn test_everything_pruned_is_an_error() {
        let vectorizer = TfidfVectorizer::new().expect("vectorizer").with_min_df(5);
        assert!(vectorizer.fit_transform(&["only once here"]).is_err());
    }
}
