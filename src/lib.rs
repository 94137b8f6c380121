//! Bank Reviews - Sentiment and Thematic Analysis
//!
//! A Rust library for batch analysis of bank-app customer reviews: sentiment
//! scoring, rule-based themes, TF-IDF keywords and LDA topics, with results
//! persisted to a relational store keyed by bank.
//!
//! # Features
//!
//! - Two lexicon sentiment backends with explicit thresholds
//! - Keyword taxonomy theme assignment (top-K, injectable taxonomy)
//! - TF-IDF keyword ranking
//! - Corpus-wide and per-bank topic modeling
//! - Idempotent bulk loading into SQLite

/// Configuration management
pub mod config;
/// Database operations
pub mod db;
/// Error types
pub mod error;
/// Loading the final table into the database
pub mod loader;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Text cleaning and tokenization
pub mod nlp;
/// Stage composition and file I/O
pub mod pipeline;
/// Database schema definitions
pub mod schema;
/// Sentiment scoring
pub mod sentiment;
/// TF-IDF vectorization and keyword ranking
pub mod tfidf;
/// Rule-based theme assignment
pub mod themes;
/// LDA topic modeling
pub mod topics;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use db::Database;
pub use error::{PipelineError, Result};
pub use loader::{LoadReport, ReviewLoader};
pub use models::{AnalyzedReview, FinalReviewRow, KeywordScore, ReviewRecord, SentimentLabel, TopicSummary};
pub use pipeline::ReviewPipeline;
pub use sentiment::{classify, SentimentAnalyzer, SentimentBackend, SentimentThresholds};
pub use themes::{assign_theme, MatchMode, ThemeTaxonomy};
