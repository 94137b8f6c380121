use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use tracing::info;

use crate::loader::LoadReport;
use crate::sentiment::SentimentDistribution;

/// Reviews passed through a sentiment backend
pub const REVIEWS_SCORED: &str = "bank_reviews_reviews_scored_total";
/// Reviews given a theme, labeled by theme
pub const THEMES_ASSIGNED: &str = "bank_reviews_themes_assigned_total";
/// Terms in the keyword ranking
pub const KEYWORDS_RANKED: &str = "bank_reviews_keywords_ranked";
/// Rows committed to the reviews table
pub const ROWS_INSERTED: &str = "bank_reviews_rows_inserted_total";
/// Rows dropped because their bank had no id
pub const ROWS_UNMAPPED: &str = "bank_reviews_rows_unmapped_total";
/// Rows skipped because the review id was already stored
pub const ROWS_DUPLICATE: &str = "bank_reviews_rows_duplicate_total";
/// Stage wall time
pub const STAGE_DURATION: &str = "bank_reviews_stage_duration_seconds";
/// Failures by kind and stage
pub const ERRORS: &str = "bank_reviews_errors_total";

/// Pipeline metrics.
///
/// Every value is reported through the `metrics` facade (a no-op unless the
/// embedding process installs a recorder) and also tallied locally for the
/// end-of-run summary.
#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    reviews_scored: u64,
    themes_assigned: u64,
    keywords_ranked: u64,
    rows_inserted: u64,
    rows_unmapped: u64,
    rows_duplicate: u64,
    errors: u64,
    stages: Vec<(String, Duration)>,
}

/// Copy of the local tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Reviews given a sentiment label
    pub reviews_scored: u64,
    /// Reviews given a theme
    pub themes_assigned: u64,
    /// Size of the latest keyword ranking
    pub keywords_ranked: u64,
    /// Rows committed to the store
    pub rows_inserted: u64,
    /// Rows dropped for an unknown bank
    pub rows_unmapped: u64,
    /// Rows skipped as already stored
    pub rows_duplicate: u64,
    /// Errors logged by any stage
    pub errors: u64,
}

impl PipelineMetrics {
    /// Empty tallies
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one sentiment pass
    pub fn record_sentiment(&mut self, distribution: &SentimentDistribution) {
        let total = distribution.total() as u64;
        self.reviews_scored += total;

        counter!(REVIEWS_SCORED, "label" => "positive").increment(distribution.positive as u64);
        counter!(REVIEWS_SCORED, "label" => "negative").increment(distribution.negative as u64);
        counter!(REVIEWS_SCORED, "label" => "neutral").increment(distribution.neutral as u64);
        histogram!("bank_reviews_mean_sentiment_score").record(distribution.mean_score);
    }

    /// Record the per-theme review counts of one assignment pass
    pub fn record_themes(&mut self, distribution: &[(String, usize)]) {
        for (theme, count) in distribution {
            self.themes_assigned += *count as u64;
            counter!(THEMES_ASSIGNED, "theme" => theme.clone()).increment(*count as u64);
        }
    }

    /// Record the size of the keyword ranking
    pub fn record_keywords(&mut self, count: usize) {
        self.keywords_ranked = count as u64;
        gauge!(KEYWORDS_RANKED).set(count as f64);
    }

    /// Record the outcome of a load into the store
    pub fn record_load(&mut self, report: &LoadReport) {
        self.rows_inserted += report.inserted as u64;
        self.rows_unmapped += report.unmapped as u64;
        self.rows_duplicate += report.skipped_duplicates as u64;

        counter!(ROWS_INSERTED).increment(report.inserted as u64);
        counter!(ROWS_UNMAPPED).increment(report.unmapped as u64);
        counter!(ROWS_DUPLICATE).increment(report.skipped_duplicates as u64);
    }

    /// Record how long a stage took
    pub fn record_stage(&mut self, stage: &str, duration: Duration) {
        histogram!(STAGE_DURATION, "stage" => stage.to_string()).record(duration.as_secs_f64());
        self.stages.push((stage.to_string(), duration));
    }

    /// Record a failure
    pub fn record_error(&mut self, kind: &str, stage: &str) {
        self.errors += 1;
        counter!(ERRORS, "type" => kind.to_string(), "stage" => stage.to_string()).increment(1);
    }

    /// Stage durations in the order they finished
    #[must_use]
    pub fn stages(&self) -> &[(String, Duration)] {
        &self.stages
    }

    /// Copy the local tallies
    #[must_use]
    pub const fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reviews_scored: self.reviews_scored,
            themes_assigned: self.themes_assigned,
            keywords_ranked: self.keywords_ranked,
            rows_inserted: self.rows_inserted,
            rows_unmapped: self.rows_unmapped,
            rows_duplicate: self.rows_duplicate,
            errors: self.errors,
        }
    }

    /// Log the end-of-run summary
    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        info!(
            reviews_scored = snapshot.reviews_scored,
            themes_assigned = snapshot.themes_assigned,
            keywords_ranked = snapshot.keywords_ranked,
            rows_inserted = snapshot.rows_inserted,
            rows_unmapped = snapshot.rows_unmapped,
            rows_duplicate = snapshot.rows_duplicate,
            errors = snapshot.errors,
            "Pipeline summary"
        );
        for (stage, duration) in &self.stages {
            info!(stage = stage.as_str(), duration_ms = duration.as_millis(), "Stage timing");
        }
    }
}

/// Times one stage and records it on [`finish`](Self::finish)
pub struct MetricsTimer {
    stage: String,
    start: Instant,
}

impl MetricsTimer {
    /// Start timing `stage`
    #[must_use]
    pub fn new(stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            start: Instant::now(),
        }
    }

    /// Stop the clock and record the elapsed time on `metrics`
    pub fn finish(self, metrics: &mut PipelineMetrics) -> Duration {
        let duration = self.start.elapsed();
        metrics.record_stage(&self.stage, duration);
        duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_tallies() {
        let mut metrics = PipelineMetrics::new();
        metrics.record_sentiment(&SentimentDistribution {
            positive: 2,
            negative: 1,
            neutral: 1,
            mean_score: 0.2,
        });
        metrics.record_themes(&[("other".to_string(), 3), ("App Stability & Bugs".to_string(), 1)]);
        metrics.record_error("database", "load");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.reviews_scored, 4);
        assert_eq!(snapshot.themes_assigned, 4);
        assert_eq!(snapshot.errors, 1);
    }

    #[test]
    fn test_timer_records_stage() {
        let mut metrics = PipelineMetrics::new();
        MetricsTimer::new("sentiment").finish(&mut metrics);
        assert_eq!(metrics.stages().len(), 1);
        assert_eq!(metrics.stages()[0].0, "sentiment");
    }
}
