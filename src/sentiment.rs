//! Lexicon-based sentiment scoring.
//!
//! Two interchangeable backends produce a polarity score; a pure threshold
//! function turns that score into a [`SentimentLabel`]. Thresholds are passed
//! explicitly so each backend (or a test) can supply its own.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;
use vader_sentiment::SentimentIntensityAnalyzer;

use crate::models::{AnalyzedReview, SentimentLabel};

/// Available scoring backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SentimentBackend {
    /// General-purpose polarity lexicon, thresholds ±0.1
    Lexicon,
    /// Social-media tuned compound score, thresholds ±0.05
    Vader,
}

impl SentimentBackend {
    /// Thresholds documented for this backend
    #[must_use]
    pub const fn default_thresholds(self) -> SentimentThresholds {
        match self {
            Self::Lexicon => SentimentThresholds {
                positive: 0.1,
                negative: -0.1,
            },
            Self::Vader => SentimentThresholds {
                positive: 0.05,
                negative: -0.05,
            },
        }
    }

    /// Build the scorer for this backend
    #[must_use]
    pub fn scorer(self) -> Box<dyn PolarityScorer> {
        match self {
            Self::Lexicon => Box::new(LexiconScorer::new()),
            Self::Vader => Box::new(VaderScorer::new()),
        }
    }
}

impl fmt::Display for SentimentBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexicon => f.write_str("lexicon"),
            Self::Vader => f.write_str("vader"),
        }
    }
}

/// Inclusive bounds used by [`classify`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentThresholds {
    /// Scores at or above this are Positive
    pub positive: f64,
    /// Scores at or below this are Negative
    pub negative: f64,
}

/// Map a polarity score to a label.
///
/// `score >= positive` is Positive, `score <= negative` is Negative, anything
/// else (including NaN) is Neutral.
#[must_use]
pub fn classify(score: f64, thresholds: &SentimentThresholds) -> SentimentLabel {
    if score >= thresholds.positive {
        SentimentLabel::Positive
    } else if score <= thresholds.negative {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/// Anything that can turn text into a polarity score
pub trait PolarityScorer {
    /// Polarity of `text`; must not fail on empty input
    fn polarity(&self, text: &str) -> f64;
}

/// VADER compound score, roughly in [-1, 1]
pub struct VaderScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderScorer {
    /// Create a scorer with VADER's built-in lexicon
    #[must_use]
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl PolarityScorer for VaderScorer {
    fn polarity(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }

        self.analyzer
            .polarity_scores(text)
            .get("compound")
            .copied()
            .unwrap_or_default()
    }
}

const POSITIVE_WORDS: &[(&str, f64)] = &[
    ("good", 0.7),
    ("great", 0.8),
    ("excellent", 1.0),
    ("amazing", 0.6),
    ("wonderful", 1.0),
    ("fantastic", 0.4),
    ("awesome", 1.0),
    ("perfect", 1.0),
    ("best", 1.0),
    ("better", 0.5),
    ("nice", 0.6),
    ("love", 0.5),
    ("like", 0.2),
    ("happy", 0.8),
    ("easy", 0.43),
    ("fast", 0.2),
    ("quick", 0.33),
    ("smooth", 0.4),
    ("helpful", 0.5),
    ("reliable", 0.5),
    ("convenient", 0.5),
    ("simple", 0.3),
    ("secure", 0.4),
    ("satisfied", 0.5),
    ("thanks", 0.2),
    ("thank", 0.2),
    ("efficient", 0.5),
    ("friendly", 0.4),
];

const NEGATIVE_WORDS: &[(&str, f64)] = &[
    ("bad", -0.7),
    ("terrible", -1.0),
    ("awful", -1.0),
    ("horrible", -1.0),
    ("worst", -1.0),
    ("worse", -0.4),
    ("poor", -0.4),
    ("hate", -0.8),
    ("useless", -0.5),
    ("disappointing", -0.6),
    ("disappointed", -0.75),
    ("annoying", -0.8),
    ("frustrating", -0.4),
    ("slow", -0.3),
    ("difficult", -0.5),
    ("broken", -0.4),
    ("stupid", -0.8),
    ("boring", -1.0),
    ("wrong", -0.5),
    ("fail", -0.5),
    ("failed", -0.5),
    ("confusing", -0.3),
    ("unreliable", -0.5),
    ("rubbish", -0.6),
    ("waste", -0.2),
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("extremely", 1.5),
    ("really", 1.2),
    ("so", 1.2),
    ("too", 1.2),
    ("super", 1.3),
    ("totally", 1.3),
    ("quite", 1.1),
    ("somewhat", 0.8),
    ("slightly", 0.7),
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nothing", "neither", "nor", "dont", "don't", "doesnt",
    "doesn't", "didnt", "didn't", "isnt", "isn't", "wasnt", "wasn't", "cant", "can't",
    "cannot", "wont", "won't",
];

/// Polarity and subjectivity from the general-purpose lexicon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexiconScore {
    /// Mean signed weight of opinion words, clamped to [-1, 1]
    pub polarity: f64,
    /// Share of tokens that carry an opinion, in [0, 1]
    pub subjectivity: f64,
}

/// Averages weighted opinion words with intensifier and negation handling
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    /// Create a scorer over the built-in word lists
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Score `text`, returning both polarity and subjectivity
    #[must_use]
    pub fn score(&self, text: &str) -> LexiconScore {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|w| !w.is_empty())
            .collect();

        let mut total = 0.0;
        let mut opinion_words = 0_usize;

        for (i, word) in words.iter().enumerate() {
            let Some(weight) = Self::weight(word) else {
                continue;
            };
            let mut sentiment = weight;

            if i > 0 {
                if let Some((_, intensity)) = INTENSIFIERS.iter().find(|(w, _)| *w == words[i - 1]) {
                    sentiment *= intensity;
                }
            }

            // Negation may sit one or two words back ("not good", "not very good")
            let negated = (i >= 1 && NEGATIONS.contains(&words[i - 1]))
                || (i >= 2 && NEGATIONS.contains(&words[i - 2]));
            if negated {
                sentiment *= -0.5;
            }

            total += sentiment;
            opinion_words += 1;
        }

        if opinion_words == 0 {
            return LexiconScore {
                polarity: 0.0,
                subjectivity: 0.0,
            };
        }

        LexiconScore {
            polarity: (total / opinion_words as f64).clamp(-1.0, 1.0),
            subjectivity: (opinion_words as f64 / words.len() as f64).clamp(0.0, 1.0),
        }
    }

    fn weight(word: &str) -> Option<f64> {
        POSITIVE_WORDS
            .iter()
            .chain(NEGATIVE_WORDS.iter())
            .find(|(w, _)| *w == word)
            .map(|(_, weight)| *weight)
    }
}

impl PolarityScorer for LexiconScorer {
    fn polarity(&self, text: &str) -> f64 {
        self.score(text).polarity
    }
}

/// Label counts produced by one scoring pass
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SentimentDistribution {
    /// Reviews labeled Positive
    pub positive: usize,
    /// Reviews labeled Negative
    pub negative: usize,
    /// Reviews labeled Neutral
    pub neutral: usize,
    /// Mean polarity over all scored reviews
    pub mean_score: f64,
}

impl SentimentDistribution {
    /// Number of reviews scored
    #[must_use]
    pub const fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

/// Applies one scorer and one set of thresholds to a review table
pub struct SentimentAnalyzer {
    scorer: Box<dyn PolarityScorer>,
    thresholds: SentimentThresholds,
}

impl SentimentAnalyzer {
    /// Analyzer for a built-in backend
    #[must_use]
    pub fn new(backend: SentimentBackend, thresholds: SentimentThresholds) -> Self {
        Self::with_scorer(backend.scorer(), thresholds)
    }

    /// Analyzer over any scorer
    #[must_use]
    pub fn with_scorer(scorer: Box<dyn PolarityScorer>, thresholds: SentimentThresholds) -> Self {
        Self { scorer, thresholds }
    }

    /// Score one text; missing text is scored as `""`
    #[must_use]
    pub fn score(&self, text: Option<&str>) -> (f64, SentimentLabel) {
        let polarity = self.scorer.polarity(text.unwrap_or_default());
        (polarity, classify(polarity, &self.thresholds))
    }

    /// Score every review in place and return the label distribution
    pub fn analyze(&self, reviews: &mut [AnalyzedReview]) -> SentimentDistribution {
        info!("Starting sentiment analysis of {} reviews", reviews.len());

        let mut distribution = SentimentDistribution::default();
        let mut score_sum = 0.0;

        for review in reviews.iter_mut() {
            let (score, label) = self.score(Some(review.record.text()));
            review.sentiment_score = score;
            review.sentiment_label = label;

            score_sum += score;
            match label {
                SentimentLabel::Positive => distribution.positive += 1,
                SentimentLabel::Negative => distribution.negative += 1,
                SentimentLabel::Neutral => distribution.neutral += 1,
            }
        }

        if !reviews.is_empty() {
            distribution.mean_score = score_sum / reviews.len() as f64;
        }

        info!(
            positive = distribution.positive,
            negative = distribution.negative,
            neutral = distribution.neutral,
            "Sentiment analysis complete"
        );
        distribution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vader_thresholds() {
        let thresholds = SentimentBackend::Vader.default_thresholds();
        assert_eq!(classify(0.06, &thresholds), SentimentLabel::Positive);
        assert_eq!(classify(-0.02, &thresholds), SentimentLabel::Neutral);
        assert_eq!(classify(-0.10, &thresholds), SentimentLabel::Negative);
        assert_eq!(classify(0.05, &thresholds), SentimentLabel::Positive);
        assert_eq!(classify(-0.05, &thresholds), SentimentLabel::Negative);
    }

    #[test]
    fn test_lexicon_thresholds() {
        let thresholds = SentimentBackend::Lexicon.default_thresholds();
        assert_eq!(classify(0.06, &thresholds), SentimentLabel::Neutral);
        assert_eq!(classify(0.1, &thresholds), SentimentLabel::Positive);
        assert_eq!(classify(-0.1, &thresholds), SentimentLabel::Negative);
    }

    #[test]
    fn test_nan_is_neutral() {
        let thresholds = SentimentBackend::Vader.default_thresholds();
        assert_eq!(classify(f64::NAN, &thresholds), SentimentLabel::Neutral);
    }

    #[test]
    fn test_lexicon_scorer() {
        let scorer = LexiconScorer::new();

        assert!(scorer.polarity("Great app, very easy to use") > 0.0);
        assert!(scorer.polarity("Terrible and slow, the worst bank app") < 0.0);
        assert!(scorer.polarity("not good") < 0.0);
        assert_eq!(scorer.polarity("I opened an account on Monday"), 0.0);
        assert_eq!(scorer.polarity(""), 0.0);
    }

    #[test]
    fn test_lexicon_subjectivity() {
        let score = LexiconScorer::new().score("good good");
        assert!((score.subjectivity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_vader_empty_text() {
        let scorer = VaderScorer::new();
        assert_eq!(scorer.polarity(""), 0.0);
        assert_eq!(scorer.polarity("   "), 0.0);
    }
}
