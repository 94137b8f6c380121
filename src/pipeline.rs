//! Analysis stages composed into one pass over the cleaned review table.
//!
//! `read → clean → score sentiment → rank keywords → assign themes → write`.
//! Enrichment only fills derived fields; the input columns are written back
//! untouched.

use std::fs::{self, File};
use std::path::Path;

use tracing::{info, warn};

use crate::config::{AppConfig, KeywordsConfig, TopicsConfig};
use crate::error::{PipelineError, Result};
use crate::logging::OperationTimer;
use crate::metrics::{MetricsTimer, PipelineMetrics};
use crate::models::{AnalyzedReview, FinalReviewRow, KeywordScore, ReviewRecord};
use crate::nlp::{english_stop_words, TextCleaner};
use crate::sentiment::{SentimentAnalyzer, SentimentDistribution};
use crate::tfidf::{KeywordRanker, TfidfVectorizer};
use crate::themes::{ThemeAssigner, ThemeTaxonomy};
use crate::topics::{BankTopicConfig, BankTopicModeler, CorpusTopicConfig, CorpusTopicModel, LdaParams};

/// Read the cleaned review table
pub fn read_cleaned_reviews(path: &Path) -> Result<Vec<ReviewRecord>> {
    if !path.exists() {
        return Err(PipelineError::InputNotFound(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_reader(File::open(path)?);
    let records = reader.deserialize().collect::<std::result::Result<Vec<ReviewRecord>, _>>()?;
    info!("Loaded {} reviews from {}", records.len(), path.display());
    Ok(records)
}

/// Write the final analysis table.
///
/// Columns: `review_id, review_text, sentiment_label, sentiment_score, theme,
/// rating, bank_name`.
pub fn write_final_reviews(path: &Path, reviews: &[AnalyzedReview]) -> Result<()> {
    create_parent_dir(path)?;

    let mut writer = csv::Writer::from_path(path)?;
    for review in reviews {
        writer.serialize(FinalReviewRow::from(review))?;
    }
    writer.flush()?;

    info!("Saved {} analyzed reviews to {}", reviews.len(), path.display());
    Ok(())
}

/// Write the keyword ranking as `word,tfidf`
pub fn write_keywords(path: &Path, keywords: &[KeywordScore]) -> Result<()> {
    create_parent_dir(path)?;

    let mut writer = csv::Writer::from_path(path)?;
    for keyword in keywords {
        writer.serialize(keyword)?;
    }
    writer.flush()?;

    info!("Saved {} keywords to {}", keywords.len(), path.display());
    Ok(())
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Keyword ranker configured from the `keywords` section
pub fn keyword_ranker(config: &KeywordsConfig) -> Result<KeywordRanker> {
    let mut vectorizer = TfidfVectorizer::new()?
        .with_ngram_range(config.ngram_min, config.ngram_max)
        .with_min_df(config.min_df)
        .with_max_df(config.max_df);
    if config.use_stop_words {
        vectorizer = vectorizer.with_stop_words(english_stop_words());
    }
    Ok(KeywordRanker::new(vectorizer))
}

/// Whole-corpus topic model configured from the `topics` section
#[must_use]
pub fn corpus_topic_model(config: &TopicsConfig) -> CorpusTopicModel {
    CorpusTopicModel::new(
        CorpusTopicConfig {
            lda: LdaParams {
                num_topics: config.num_topics,
                passes: config.passes,
                seed: config.seed,
                ..LdaParams::default()
            },
            words_per_topic: config.words_per_topic,
            no_below: config.no_below,
            no_above: config.no_above,
            min_token_len: config.min_token_len,
        },
        english_stop_words(),
    )
}

/// Per-bank topic modeler configured from the `topics` section
#[must_use]
pub fn bank_topic_modeler(config: &TopicsConfig) -> BankTopicModeler {
    BankTopicModeler::new(
        BankTopicConfig {
            n_topics: config.num_topics,
            top_n: config.bank_top_n,
            min_docs: config.bank_min_docs,
            min_chars: config.bank_min_chars,
            max_features: config.bank_max_features,
            max_iter: config.passes,
            seed: config.seed,
        },
        english_stop_words(),
    )
}

/// What one analysis pass produced
#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    /// Reviews analyzed
    pub reviews: usize,
    /// Label counts
    pub sentiment: SentimentDistribution,
    /// Reviews per theme, largest first
    pub themes: Vec<(String, usize)>,
    /// Corpus keywords, heaviest first
    pub keywords: Vec<KeywordScore>,
}

/// Sentiment, keyword and theme stages over one review table
pub struct ReviewPipeline {
    cleaner: TextCleaner,
    analyzer: SentimentAnalyzer,
    ranker: KeywordRanker,
    assigner: ThemeAssigner,
    metrics: PipelineMetrics,
}

impl ReviewPipeline {
    /// Assemble the stages from their parts
    #[must_use]
    pub fn new(cleaner: TextCleaner, analyzer: SentimentAnalyzer, ranker: KeywordRanker, assigner: ThemeAssigner) -> Self {
        Self {
            cleaner,
            analyzer,
            ranker,
            assigner,
            metrics: PipelineMetrics::new(),
        }
    }

    /// Build every stage from configuration, loading the taxonomy file if one is set
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let taxonomy = match &config.themes.taxonomy_path {
            Some(path) => ThemeTaxonomy::from_file(Path::new(path))?,
            None => ThemeTaxonomy::bank_reviews(),
        };
        info!(
            "Using {} sentiment backend and {} theme categories",
            config.sentiment.backend,
            taxonomy.categories().len()
        );

        Ok(Self::new(
            TextCleaner::new()?,
            SentimentAnalyzer::new(config.sentiment.backend, config.sentiment.thresholds()),
            keyword_ranker(&config.keywords)?,
            ThemeAssigner::new(taxonomy, config.themes.top_k, config.themes.match_mode),
        ))
    }

    /// Wrap records and fill their cleaned text
    #[must_use]
    pub fn prepare(&self, records: Vec<ReviewRecord>) -> Vec<AnalyzedReview> {
        prepare_reviews(&self.cleaner, records)
    }

    /// Run every stage over already-prepared reviews.
    ///
    /// A corpus too small for a keyword vocabulary is logged and leaves the
    /// keyword list empty.
    pub fn analyze(&mut self, reviews: &mut [AnalyzedReview]) -> AnalysisReport {
        let timer = MetricsTimer::new("sentiment");
        let sentiment = self.analyzer.analyze(reviews);
        timer.finish(&mut self.metrics);
        self.metrics.record_sentiment(&sentiment);

        let timer = MetricsTimer::new("keywords");
        let cleaned: Vec<&str> = reviews.iter().map(|r| r.cleaned_review.as_str()).collect();
        let keywords = match self.ranker.rank(&cleaned) {
            Ok(keywords) => keywords,
            Err(e) => {
                warn!("Keyword extraction skipped: {}", e);
                self.metrics.record_error("vectorizer", "keywords");
                Vec::new()
            }
        };
        timer.finish(&mut self.metrics);
        self.metrics.record_keywords(keywords.len());

        let timer = MetricsTimer::new("themes");
        let themes = self.assigner.assign_all(reviews);
        timer.finish(&mut self.metrics);
        self.metrics.record_themes(&themes);

        AnalysisReport {
            reviews: reviews.len(),
            sentiment,
            themes,
            keywords,
        }
    }

    /// Read `input`, analyze it and write the final table to `output`
    pub fn run_file(&mut self, input: &Path, output: &Path, keywords_output: Option<&Path>) -> Result<AnalysisReport> {
        let timer = OperationTimer::new("analyze");

        let records = read_cleaned_reviews(input)?;
        let mut reviews = self.prepare(records);
        let report = self.analyze(&mut reviews);

        write_final_reviews(output, &reviews)?;
        if let Some(path) = keywords_output {
            write_keywords(path, &report.keywords)?;
        }

        for (theme, count) in &report.themes {
            info!("Theme {:<30} {:>6}", theme, count);
        }
        timer.finish();
        Ok(report)
    }

    /// Metrics gathered so far
    #[must_use]
    pub const fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }
}

/// Read `input` and return it prepared for topic modeling
pub fn read_and_clean(input: &Path) -> Result<Vec<AnalyzedReview>> {
    let cleaner = TextCleaner::new()?;
    Ok(prepare_reviews(&cleaner, read_cleaned_reviews(input)?))
}

/// Wrap records and fill their cleaned text
#[must_use]
pub fn prepare_reviews(cleaner: &TextCleaner, records: Vec<ReviewRecord>) -> Vec<AnalyzedReview> {
    records
        .into_iter()
        .map(|record| {
            let cleaned = cleaner.clean(record.text());
            let mut review = AnalyzedReview::new(record);
            review.cleaned_review = cleaned;
            review
        })
        .collect()
}
