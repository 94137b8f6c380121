//! Rule-based theme assignment.
//!
//! Each category of a [`ThemeTaxonomy`] lists trigger keywords. A review's
//! score for a category is the number of distinct triggers found in its
//! lower-cased text; the highest scoring categories become its theme.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::models::AnalyzedReview;

/// Theme given to reviews that match no category
pub const OTHER_THEME: &str = "other";

/// How trigger keywords are located in review text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Plain substring containment; "fail" also matches "failure" and "unfailing"
    #[default]
    Substring,
    /// Trigger must start at a word boundary; "fail" matches "failure" but not "unfailing"
    WordPrefix,
}

/// One named category and its trigger keywords
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeCategory {
    /// Category name written to the theme column
    pub name: String,
    /// Lower-case trigger substrings
    pub keywords: Vec<String>,
}

/// Ordered category list; order breaks ties between equal scores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeTaxonomy {
    categories: Vec<ThemeCategory>,
}

impl ThemeTaxonomy {
    /// Build a taxonomy, lower-casing triggers and rejecting malformed input
    pub fn new(categories: Vec<ThemeCategory>) -> Result<Self> {
        if categories.is_empty() {
            return Err(PipelineError::Taxonomy("taxonomy has no categories".to_string()));
        }

        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(categories.len());
        for category in categories {
            let name = category.name.trim().to_string();
            if name.is_empty() {
                return Err(PipelineError::Taxonomy("category name cannot be empty".to_string()));
            }
            if name == OTHER_THEME {
                return Err(PipelineError::Taxonomy(format!("'{OTHER_THEME}' is reserved")));
            }
            if !seen.insert(name.clone()) {
                return Err(PipelineError::Taxonomy(format!("duplicate category: {name}")));
            }

            let keywords: Vec<String> = category
                .keywords
                .iter()
                .map(|kw| kw.trim().to_lowercase())
                .filter(|kw| !kw.is_empty())
                .collect();
            if keywords.is_empty() {
                warn!("Theme category '{}' has no keywords and can never match", name);
            }

            normalized.push(ThemeCategory { name, keywords });
        }

        Ok(Self {
            categories: normalized,
        })
    }

    /// The four-category taxonomy for bank-app reviews
    #[must_use]
    pub fn bank_reviews() -> Self {
        let category = |name: &str, keywords: &[&str]| ThemeCategory {
            name: name.to_string(),
            keywords: keywords.iter().map(ToString::to_string).collect(),
        };

        Self {
            categories: vec![
                category(
                    "Transaction Performance",
                    &["slow", "loading", "transfer", "delay", "pending", "stuck", "money sent", "transaction"],
                ),
                category(
                    "App Stability & Bugs",
                    &["crash", "error", "update", "login error", "bug", "hang", "fail"],
                ),
                category(
                    "Account Access & Security",
                    &["login", "fingerprint", "password", "locked", "otp", "user name", "security", "username"],
                ),
                category(
                    "User Experience (UI/Design)",
                    &["ui", "design", "easy to use", "confusing", "user friendly", "layout", "simple"],
                ),
            ],
        }
    }

    /// Read a taxonomy from a `.yaml`, `.yml` or `.json` file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::InputNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)?;
        let parsed: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents)?,
            Some("yaml" | "yml") => serde_yaml::from_str(&contents)?,
            _ => {
                return Err(PipelineError::Taxonomy(format!(
                    "unsupported taxonomy file type: {}",
                    path.display()
                )))
            }
        };

        Self::new(parsed.categories)
    }

    /// Categories in tie-breaking order
    #[must_use]
    pub fn categories(&self) -> &[ThemeCategory] {
        &self.categories
    }
}

impl Default for ThemeTaxonomy {
    fn default() -> Self {
        Self::bank_reviews()
    }
}

fn keyword_hit(text: &str, keyword: &str, mode: MatchMode) -> bool {
    match mode {
        MatchMode::Substring => text.contains(keyword),
        MatchMode::WordPrefix => text.match_indices(keyword).any(|(start, _)| {
            text[..start]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric())
        }),
    }
}

/// Top-`k` themes of `text` using substring matching
#[must_use]
pub fn assign_theme(text: Option<&str>, taxonomy: &ThemeTaxonomy, k: usize) -> String {
    assign_theme_with(text, taxonomy, k, MatchMode::Substring)
}

/// Top-`k` themes of `text`, joined by `", "`, or [`OTHER_THEME`].
///
/// Categories are ranked by hit count; equal counts keep taxonomy order.
#[must_use]
pub fn assign_theme_with(text: Option<&str>, taxonomy: &ThemeTaxonomy, k: usize, mode: MatchMode) -> String {
    let Some(text) = text else {
        return OTHER_THEME.to_string();
    };
    let text = text.to_lowercase();

    let mut scores: Vec<(&str, usize)> = taxonomy
        .categories
        .iter()
        .map(|category| {
            let hits = category
                .keywords
                .iter()
                .filter(|kw| keyword_hit(&text, kw, mode))
                .count();
            (category.name.as_str(), hits)
        })
        .filter(|(_, hits)| *hits > 0)
        .collect();

    // Stable sort keeps taxonomy order among ties
    scores.sort_by(|a, b| b.1.cmp(&a.1));

    let themes = scores
        .into_iter()
        .take(k)
        .map(|(name, _)| name)
        .collect::<Vec<_>>()
        .join(", ");

    if themes.is_empty() {
        OTHER_THEME.to_string()
    } else {
        themes
    }
}

/// Applies a taxonomy to a whole review table
#[derive(Debug, Clone)]
pub struct ThemeAssigner {
    taxonomy: ThemeTaxonomy,
    top_k: usize,
    mode: MatchMode,
}

impl ThemeAssigner {
    /// Create an assigner returning up to `top_k` categories per review
    #[must_use]
    pub const fn new(taxonomy: ThemeTaxonomy, top_k: usize, mode: MatchMode) -> Self {
        Self { taxonomy, top_k, mode }
    }

    /// Theme for a single text
    #[must_use]
    pub fn assign(&self, text: Option<&str>) -> String {
        assign_theme_with(text, &self.taxonomy, self.top_k, self.mode)
    }

    /// Fill the theme column and return review counts per theme, largest first
    pub fn assign_all(&self, reviews: &mut [AnalyzedReview]) -> Vec<(String, usize)> {
        info!("Starting rule-based thematic clustering...");

        let mut counts: HashMap<String, usize> = HashMap::new();
        for review in reviews.iter_mut() {
            review.theme = self.assign(Some(review.record.text()));
            *counts.entry(review.theme.clone()).or_default() += 1;
        }

        let mut distribution: Vec<(String, usize)> = counts.into_iter().collect();
        distribution.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        info!("Thematic assignment complete: {} distinct themes", distribution.len());
        distribution
    }
}
