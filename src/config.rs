use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::sentiment::{SentimentBackend, SentimentThresholds};
use crate::themes::MatchMode;

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Relational store settings
    pub database: DatabaseConfig,
    /// Log output settings
    pub logging: LoggingConfig,
    /// Input and output file locations
    pub paths: PathsConfig,
    /// Sentiment scoring settings
    pub sentiment: SentimentConfig,
    /// TF-IDF keyword ranking settings
    pub keywords: KeywordsConfig,
    /// LDA topic modeling settings
    pub topics: TopicsConfig,
    /// Rule-based theme assignment settings
    pub themes: ThemesConfig,
}

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file
    pub path: String,
    /// How long a statement waits on a locked database
    pub busy_timeout_secs: u64,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level (trace, debug, info, warn, error)
    pub level: String,
    /// Optional JSON log file
    pub file_path: Option<String>,
    /// "json" or "text"
    pub format: String,
}

/// Locations of the pipeline's tabular files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Cleaned reviews produced by the preprocessing stage
    pub cleaned_input: String,
    /// Final analysis table consumed by the loader
    pub final_output: String,
    /// Optional keyword ranking table
    pub keywords_output: Option<String>,
}

/// Sentiment scorer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    /// Which lexicon scores the reviews
    pub backend: SentimentBackend,
    /// Overrides the backend's default upper threshold
    pub positive_threshold: Option<f64>,
    /// Overrides the backend's default lower threshold
    pub negative_threshold: Option<f64>,
}

impl SentimentConfig {
    /// Thresholds for the configured backend with any overrides applied.
    #[must_use]
    pub fn thresholds(&self) -> SentimentThresholds {
        let defaults = self.backend.default_thresholds();
        SentimentThresholds {
            positive: self.positive_threshold.unwrap_or(defaults.positive),
            negative: self.negative_threshold.unwrap_or(defaults.negative),
        }
    }
}

/// Corpus TF-IDF settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsConfig {
    /// Smallest n-gram length
    pub ngram_min: usize,
    /// Largest n-gram length
    pub ngram_max: usize,
    /// Minimum number of documents a term must appear in
    pub min_df: usize,
    /// Maximum share of documents a term may appear in
    pub max_df: f64,
    /// Remove English stop words before building n-grams
    pub use_stop_words: bool,
    /// Number of keywords printed in the run summary
    pub report_limit: usize,
}

/// LDA settings for both the corpus and the per-bank models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicsConfig {
    /// Topics fitted over the whole corpus
    pub num_topics: usize,
    /// Sweeps over the corpus during training
    pub passes: usize,
    /// Words shown per corpus topic
    pub words_per_topic: usize,
    /// Dictionary drops tokens found in fewer documents
    pub no_below: usize,
    /// Dictionary drops tokens found in a larger share of documents
    pub no_above: f64,
    /// Shortest token kept by the corpus model
    pub min_token_len: usize,
    /// Seed shared by both models
    pub seed: u64,
    /// Banks with fewer qualifying reviews are skipped
    pub bank_min_docs: usize,
    /// Cleaned reviews must be longer than this to qualify
    pub bank_min_chars: usize,
    /// Ranked words kept per bank topic
    pub bank_top_n: usize,
    /// Vocabulary cap for the per-bank vectorizer
    pub bank_max_features: usize,
}

/// Theme assignment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemesConfig {
    /// Number of categories joined into the theme column
    pub top_k: usize,
    /// YAML or JSON taxonomy replacing the built-in one
    pub taxonomy_path: Option<String>,
    /// How trigger keywords are matched against review text
    pub match_mode: MatchMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: "data/bank_reviews.db".to_string(),
                busy_timeout_secs: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            paths: PathsConfig {
                cleaned_input: "data/processed/reviews_processed.csv".to_string(),
                final_output: "data/processed/reviews_final.csv".to_string(),
                keywords_output: None,
            },
            sentiment: SentimentConfig {
                backend: SentimentBackend::Vader,
                positive_threshold: None,
                negative_threshold: None,
            },
            keywords: KeywordsConfig {
                ngram_min: 1,
                ngram_max: 2,
                min_df: 5,
                max_df: 0.85,
                use_stop_words: true,
                report_limit: 20,
            },
            topics: TopicsConfig {
                num_topics: 4,
                passes: 10,
                words_per_topic: 10,
                no_below: 5,
                no_above: 0.5,
                min_token_len: 3,
                seed: 42,
                bank_min_docs: 50,
                bank_min_chars: 10,
                bank_top_n: 12,
                bank_max_features: 800,
            },
            themes: ThemesConfig {
                top_k: 1,
                taxonomy_path: None,
                match_mode: MatchMode::Substring,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        let defaults = Config::try_from(&Self::default())
            .map_err(|e| anyhow::anyhow!("Failed to serialize default configuration: {e}"))?;

        let config = Config::builder()
            // Start with default values
            .add_source(defaults)
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("config").required(false))
            // BANK_REVIEWS__TOPICS__NUM_TOPICS=6 and friends
            .add_source(Environment::with_prefix("BANK_REVIEWS").separator("__"))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {e}"))?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(anyhow::anyhow!("database.path cannot be empty"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        let thresholds = self.sentiment.thresholds();
        if thresholds.negative >= thresholds.positive {
            return Err(anyhow::anyhow!(
                "negative_threshold ({}) must be below positive_threshold ({})",
                thresholds.negative,
                thresholds.positive
            ));
        }

        if self.keywords.ngram_min == 0 || self.keywords.ngram_min > self.keywords.ngram_max {
            return Err(anyhow::anyhow!(
                "Invalid n-gram range ({}, {})",
                self.keywords.ngram_min,
                self.keywords.ngram_max
            ));
        }
        if self.keywords.max_df <= 0.0 || self.keywords.max_df > 1.0 {
            return Err(anyhow::anyhow!("keywords.max_df must be in (0, 1]"));
        }

        if self.topics.num_topics == 0 {
            return Err(anyhow::anyhow!("topics.num_topics must be greater than 0"));
        }
        if self.topics.passes == 0 {
            return Err(anyhow::anyhow!("topics.passes must be greater than 0"));
        }
        if self.topics.no_above <= 0.0 || self.topics.no_above > 1.0 {
            return Err(anyhow::anyhow!("topics.no_above must be in (0, 1]"));
        }

        if self.themes.top_k == 0 {
            return Err(anyhow::anyhow!("themes.top_k must be greater than 0"));
        }

        Ok(())
    }

    /// Get database path from environment or config
    pub fn get_database_path(&self) -> String {
        std::env::var("DATABASE_URL").map_or_else(
            |_| self.database.path.clone(),
            |url| url.trim_start_matches("sqlite://").trim_start_matches("sqlite:").to_string(),
        )
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.path, "data/bank_reviews.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.themes.top_k, 1);
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = AppConfig::default();
        config.topics.num_topics = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_threshold_overrides() {
        let mut config = AppConfig::default();
        config.sentiment.positive_threshold = Some(0.2);
        let thresholds = config.sentiment.thresholds();
        assert!((thresholds.positive - 0.2).abs() < f64::EPSILON);
        assert!((thresholds.negative + 0.05).abs() < f64::EPSILON);
    }
}
