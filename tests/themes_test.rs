//! Tests for rule-based theme assignment

use std::io::Write;

use bank_reviews::models::{AnalyzedReview, ReviewRecord};
use bank_reviews::themes::{assign_theme, assign_theme_with, MatchMode, ThemeAssigner, ThemeCategory, ThemeTaxonomy, OTHER_THEME};
use proptest::prelude::*;
use tempfile::Builder;

fn category(name: &str, keywords: &[&str]) -> ThemeCategory {
    ThemeCategory {
        name: name.to_string(),
        keywords: keywords.iter().map(ToString::to_string).collect(),
    }
}

fn hits(text: &str, category: &ThemeCategory) -> usize {
    let text = text.to_lowercase();
    category.keywords.iter().filter(|kw| text.contains(kw.as_str())).count()
}

#[test]
fn test_default_taxonomy_order() {
    let taxonomy = ThemeTaxonomy::default();
    let names: Vec<&str> = taxonomy.categories().iter().map(|c| c.name.as_str()).collect();

    assert_eq!(
        names,
        [
            "Transaction Performance",
            "App Stability & Bugs",
            "Account Access & Security",
            "User Experience (UI/Design)"
        ]
    );
}

#[test]
fn test_crashing_after_login_error() {
    let taxonomy = ThemeTaxonomy::bank_reviews();
    assert_eq!(
        assign_theme(Some("the app keeps crashing after login error"), &taxonomy, 1),
        "App Stability & Bugs"
    );
}

#[test]
fn test_case_insensitive_matching() {
    let taxonomy = ThemeTaxonomy::bank_reviews();
    assert_eq!(assign_theme(Some("FINGERPRINT LOGIN"), &taxonomy, 1), "Account Access & Security");
}

#[test]
fn test_custom_taxonomy() {
    let taxonomy = ThemeTaxonomy::new(vec![
        category("Fees", &["fee", "charge"]),
        category("Support", &["agent", "branch", "Call Center"]),
    ])
    .expect("valid taxonomy");

    assert_eq!(assign_theme(Some("the call center agent was rude"), &taxonomy, 1), "Support");
    assert_eq!(assign_theme(Some("hidden charge and fee"), &taxonomy, 2), "Fees");
    assert_eq!(assign_theme(Some("works fine"), &taxonomy, 2), OTHER_THEME);
}

#[test]
fn test_reserved_other_category() {
    assert!(ThemeTaxonomy::new(vec![category("other", &["misc"])]).is_err());
}

#[test]
fn test_taxonomy_from_yaml() {
    let mut file = Builder::new().suffix(".yaml").tempfile().expect("temp file");
    writeln!(
        file,
        "categories:\n  - name: Fees\n    keywords: [Fee, charge]\n  - name: Support\n    keywords: [agent]"
    )
    .expect("write taxonomy");

    let taxonomy = ThemeTaxonomy::from_file(file.path()).expect("load taxonomy");
    assert_eq!(taxonomy.categories().len(), 2);
    assert_eq!(taxonomy.categories()[0].keywords, vec!["fee", "charge"]);
}

#[test]
fn test_taxonomy_from_json() {
    let mut file = Builder::new().suffix(".json").tempfile().expect("temp file");
    write!(
        file,
        r#"{{"categories": [{{"name": "Fees", "keywords": ["fee"]}}]}}"#
    )
    .expect("write taxonomy");

    let taxonomy = ThemeTaxonomy::from_file(file.path()).expect("load taxonomy");
    assert_eq!(assign_theme(Some("monthly fee"), &taxonomy, 1), "Fees");
}

#[test]
fn test_taxonomy_unsupported_extension() {
    let file = Builder::new().suffix(".toml").tempfile().expect("temp file");
    assert!(ThemeTaxonomy::from_file(file.path()).is_err());
}

#[test]
fn test_word_prefix_keeps_inflections() {
    let taxonomy = ThemeTaxonomy::bank_reviews();
    assert_eq!(
        assign_theme_with(Some("transfers are delayed"), &taxonomy, 1, MatchMode::WordPrefix),
        "Transaction Performance"
    );
    assert_eq!(
        assign_theme_with(Some("guide me"), &taxonomy, 1, MatchMode::WordPrefix),
        OTHER_THEME
    );
}

#[test]
fn test_assign_all_distribution() {
    let record = |id: &str, text: Option<&str>| ReviewRecord {
        review_id: id.to_string(),
        review_text: text.map(ToString::to_string),
        rating: None,
        bank_name: "BOA".to_string(),
        review_date: None,
    };
    let mut reviews = vec![
        AnalyzedReview::new(record("1", Some("transfer pending"))),
        AnalyzedReview::new(record("2", Some("slow transaction"))),
        AnalyzedReview::new(record("3", None)),
    ];

    let assigner = ThemeAssigner::new(ThemeTaxonomy::bank_reviews(), 1, MatchMode::Substring);
    let distribution = assigner.assign_all(&mut reviews);

    assert_eq!(reviews[2].theme, OTHER_THEME);
    assert_eq!(
        distribution,
        vec![("Transaction Performance".to_string(), 2), (OTHER_THEME.to_string(), 1)]
    );
}

proptest! {
    #[test]
    fn prop_top_one_is_a_best_category(text in "[a-z ]{0,60}") {
        let taxonomy = ThemeTaxonomy::bank_reviews();
        let theme = assign_theme(Some(&text), &taxonomy, 1);

        let scores: Vec<usize> = taxonomy.categories().iter().map(|c| hits(&text, c)).collect();
        let best = scores.iter().copied().max().unwrap_or(0);

        if best == 0 {
            prop_assert_eq!(theme, OTHER_THEME);
        } else {
            // Earliest category with the maximal count wins
            let index = scores.iter().position(|&s| s == best).unwrap_or_default();
            prop_assert_eq!(theme, taxonomy.categories()[index].name.clone());
        }
    }

    #[test]
    fn prop_top_k_never_exceeds_k(text in "[a-z ]{0,60}", k in 1usize..5) {
        let theme = assign_theme(Some(&text), &ThemeTaxonomy::bank_reviews(), k);
        prop_assert!(theme.split(", ").count() <= k);
    }
}
