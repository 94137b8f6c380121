//! Data models for review records
//!
//! Rows flow through the pipeline as [`ReviewRecord`] (cleaned input),
//! [`AnalyzedReview`] (enriched in memory) and [`FinalReviewRow`] (the table
//! handed to the loader).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// A cleaned review as produced by the preprocessing stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Unique review identifier
    pub review_id: String,
    /// Raw review text, absent for empty cells
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub review_text: Option<String>,
    /// Star rating
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rating: Option<f64>,
    /// Bank the review was written for
    pub bank_name: String,
    /// Review date, passed through untouched
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub review_date: Option<String>,
}

impl ReviewRecord {
    /// Review text with missing values coerced to an empty string
    #[must_use]
    pub fn text(&self) -> &str {
        self.review_text.as_deref().unwrap_or_default()
    }
}

/// Three-way sentiment label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    /// Score at or above the upper threshold
    Positive,
    /// Score at or below the lower threshold
    Negative,
    /// Anything in between
    Neutral,
}

impl SentimentLabel {
    /// Label as written to files and the database
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            other => Err(format!("Unknown sentiment label: {other}")),
        }
    }
}

/// A review enriched by the analysis stages
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedReview {
    /// The untouched input row
    pub record: ReviewRecord,
    /// Text after TF-IDF cleaning
    pub cleaned_review: String,
    /// Backend polarity score
    pub sentiment_score: f64,
    /// Label derived from the score
    pub sentiment_label: SentimentLabel,
    /// Comma-joined category names or "other"
    pub theme: String,
}

impl AnalyzedReview {
    /// Start enrichment of a record with neutral defaults
    #[must_use]
    pub const fn new(record: ReviewRecord) -> Self {
        Self {
            record,
            cleaned_review: String::new(),
            sentiment_score: 0.0,
            sentiment_label: SentimentLabel::Neutral,
            theme: String::new(),
        }
    }
}

/// One row of the final analysis table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReviewRow {
    /// Unique review identifier
    pub review_id: String,
    /// Raw review text
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub review_text: Option<String>,
    /// Sentiment label
    #[serde(default, deserialize_with = "lenient_label")]
    pub sentiment_label: Option<SentimentLabel>,
    /// Sentiment score
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sentiment_score: Option<f64>,
    /// Assigned theme
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub theme: Option<String>,
    /// Star rating
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rating: Option<f64>,
    /// Bank name, resolved to an id at load time
    pub bank_name: String,
}

impl From<&AnalyzedReview> for FinalReviewRow {
    fn from(review: &AnalyzedReview) -> Self {
        Self {
            review_id: review.record.review_id.clone(),
            review_text: review.record.review_text.clone(),
            sentiment_label: Some(review.sentiment_label),
            sentiment_score: Some(review.sentiment_score),
            theme: Some(review.theme.clone()),
            rating: review.record.rating,
            bank_name: review.record.bank_name.clone(),
        }
    }
}

/// A bank from the lookup table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bank {
    /// Primary key
    pub bank_id: i64,
    /// Display name used by the review files
    pub bank_name: String,
}

/// A final row whose bank has been resolved, ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    /// Unique review identifier
    pub review_id: String,
    /// Resolved foreign key
    pub bank_id: i64,
    /// Raw review text
    pub review_text: Option<String>,
    /// Star rating
    pub rating: Option<f64>,
    /// Sentiment label
    pub sentiment_label: Option<SentimentLabel>,
    /// Sentiment score
    pub sentiment_score: Option<f64>,
    /// Assigned theme
    pub theme: Option<String>,
}

impl NewReview {
    /// Attach a bank id to a final row
    #[must_use]
    pub fn from_row(row: FinalReviewRow, bank_id: i64) -> Self {
        Self {
            review_id: row.review_id,
            bank_id,
            review_text: row.review_text,
            rating: row.rating.filter(|v| v.is_finite()),
            sentiment_label: row.sentiment_label,
            sentiment_score: row.sentiment_score.filter(|v| v.is_finite()),
            theme: row.theme,
        }
    }
}

/// Database representation of a review
#[derive(Debug, Clone, PartialEq)]
pub struct DbReview {
    /// Primary key
    pub review_id: String,
    /// Foreign key to banks
    pub bank_id: i64,
    /// Raw review text
    pub review_text: Option<String>,
    /// Star rating
    pub rating: Option<f64>,
    /// Sentiment label as stored
    pub sentiment_label: Option<String>,
    /// Sentiment score
    pub sentiment_score: Option<f64>,
    /// Assigned theme
    pub theme: Option<String>,
}

/// Mean TF-IDF weight of one vocabulary term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordScore {
    /// Unigram or n-gram
    pub word: String,
    /// Mean weight across all documents
    pub tfidf: f64,
}

/// Top weighted words of one fitted topic
#[derive(Debug, Clone, PartialEq)]
pub struct TopicSummary {
    /// Zero-based topic index
    pub index: usize,
    /// Words with their weights, heaviest first
    pub words: Vec<(String, f64)>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty() && !is_nan_token(s)))
}

// Unparseable numbers and "NaN" cells both become None.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite()))
}

fn lenient_label<'de, D>(deserializer: D) -> Result<Option<SentimentLabel>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|s| s.parse().ok()))
}

fn is_nan_token(value: &str) -> bool {
    matches!(value.trim(), "NaN" | "nan" | "NULL" | "null" | "None")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_missing_cells_as_none() {
        let data = "review_id,review_text,rating,bank_name,review_date\nr1,,NaN,CBE,\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let record: ReviewRecord = reader
            .deserialize()
            .next()
            .expect("one row")
            .expect("row should parse");

        assert_eq!(record.review_id, "r1");
        assert_eq!(record.review_text, None);
        assert_eq!(record.rating, None);
        assert_eq!(record.text(), "");
    }

    #[test]
    fn test_sentiment_label_parsing() {
        assert_eq!("Positive".parse::<SentimentLabel>(), Ok(SentimentLabel::Positive));
        assert_eq!(" negative ".parse::<SentimentLabel>(), Ok(SentimentLabel::Negative));
        assert!("meh".parse::<SentimentLabel>().is_err());
    }
}
