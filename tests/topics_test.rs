//! Tests for corpus and per-bank topic modeling

use std::collections::HashSet;

use bank_reviews::models::{AnalyzedReview, ReviewRecord};
use bank_reviews::topics::{
    format_corpus_report, BankTopicConfig, BankTopicModeler, CorpusTopicConfig, CorpusTopicModel, Dictionary, LdaParams,
};

fn corpus() -> Vec<String> {
    let mut docs = Vec::new();
    for i in 0..20 {
        if i % 2 == 0 {
            docs.push("transfer pending transfer delayed money pending".to_string());
        } else {
            docs.push("fingerprint login password locked fingerprint".to_string());
        }
    }
    docs
}

fn review(bank: &str, cleaned: &str) -> AnalyzedReview {
    let mut review = AnalyzedReview::new(ReviewRecord {
        review_id: format!("{bank}-{cleaned}"),
        review_text: Some(cleaned.to_string()),
        rating: None,
        bank_name: bank.to_string(),
        review_date: None,
    });
    review.cleaned_review = cleaned.to_string();
    review
}

fn small_model() -> CorpusTopicModel {
    CorpusTopicModel::new(
        CorpusTopicConfig {
            lda: LdaParams {
                num_topics: 2,
                passes: 20,
                ..LdaParams::default()
            },
            words_per_topic: 3,
            ..CorpusTopicConfig::default()
        },
        HashSet::new(),
    )
}

#[test]
fn test_dictionary_drops_short_documents_terms() {
    let docs: Vec<Vec<String>> = corpus()
        .iter()
        .map(|d| d.split_whitespace().map(ToString::to_string).collect())
        .collect();
    let mut dictionary = Dictionary::from_documents(&docs);
    assert_eq!(dictionary.doc_freq("transfer"), Some(10));

    // Every token sits in exactly half of the documents
    dictionary.filter_extremes(5, 0.5);
    assert_eq!(dictionary.len(), 8);

    dictionary.filter_extremes(5, 0.4);
    assert!(dictionary.is_empty());
}

#[test]
fn test_corpus_model_report() {
    let topics = small_model().fit(&corpus()).expect("fit");
    assert_eq!(topics.len(), 2);
    assert!(topics.iter().all(|t| t.words.len() == 3));

    let report = format_corpus_report(&topics);
    assert!(report.starts_with("--- Topic 1 ---\n"));
    assert!(report.contains("--- Topic 2 ---"));
    assert!(report.contains("weight=0."));
}

#[test]
fn test_corpus_model_is_deterministic() {
    let docs = corpus();
    let first = small_model().run(&docs).expect("first run");
    let second = small_model().run(&docs).expect("second run");
    assert_eq!(first, second);
}

#[test]
fn test_corpus_model_too_small() {
    let docs = vec!["transfer pending".to_string(), "login locked".to_string()];
    assert!(small_model().fit(&docs).is_err());
}

#[test]
fn test_bank_with_few_reviews_is_skipped() {
    let modeler = BankTopicModeler::new(BankTopicConfig::default(), HashSet::new());
    let reviews = vec![
        review("Bank of Abyssinia", "the transfer keeps failing every time"),
        review("Bank of Abyssinia", "short"),
    ];

    let banks = modeler.fit(&reviews);
    assert_eq!(banks.len(), 1);
    assert_eq!(banks[0].doc_count, 1);
    assert!(banks[0].topics.is_none());

    let report = modeler.run(&reviews);
    assert_eq!(
        report,
        "\n=== Bank of Abyssinia (1 reviews) ===\nInsufficient data for reliable LDA modeling."
    );
}

#[test]
fn test_banks_keep_first_appearance_order() {
    let config = BankTopicConfig {
        n_topics: 2,
        min_docs: 6,
        ..BankTopicConfig::default()
    };
    let modeler = BankTopicModeler::new(config, HashSet::new());

    let mut reviews = Vec::new();
    for _ in 0..3 {
        reviews.push(review("Dashen", "fingerprint login works smoothly"));
        reviews.push(review("CBE", "transfer pending for hours"));
        reviews.push(review("CBE", "transfer failed again today"));
        reviews.push(review("CBE", "pending transfer never arrived"));
    }

    let banks = modeler.fit(&reviews);
    let names: Vec<&str> = banks.iter().map(|b| b.bank_name.as_str()).collect();
    assert_eq!(names, ["Dashen", "CBE"]);

    assert!(banks[0].topics.is_none());
    let topics = banks[1].topics.as_ref().expect("CBE has enough reviews");
    assert_eq!(topics.len(), 2);
    assert!(topics.iter().all(|t| !t.words.is_empty()));
}

#[test]
fn test_bank_topics_are_deterministic() {
    let config = BankTopicConfig {
        n_topics: 2,
        min_docs: 6,
        ..BankTopicConfig::default()
    };
    let modeler = BankTopicModeler::new(config, HashSet::new());

    let mut reviews = Vec::new();
    for _ in 0..4 {
        reviews.push(review("CBE", "transfer pending for hours"));
        reviews.push(review("CBE", "fingerprint login failed again"));
    }

    assert_eq!(modeler.run(&reviews), modeler.run(&reviews));
}

fn bank_reviews(count: usize) -> Vec<AnalyzedReview> {
    let templates = [
        "transfer pending for hours",
        "fingerprint login failed again",
        "customer service never answers",
        "balance update very slow",
        "application crashes after update",
    ];
    let mut reviews: Vec<AnalyzedReview> = (0..count)
        .map(|i| review("Dashen", templates[i % templates.len()]))
        .collect();
    // Exactly ten characters does not qualify
    reviews.push(review("Dashen", "0123456789"));
    reviews
}

#[test]
fn test_bank_document_threshold_with_defaults() {
    let modeler = BankTopicModeler::new(BankTopicConfig::default(), HashSet::new());

    let below = modeler.fit(&bank_reviews(49));
    assert_eq!(below[0].doc_count, 49);
    assert!(below[0].topics.is_none());

    let at = modeler.fit(&bank_reviews(50));
    assert_eq!(at[0].doc_count, 50);
    let topics = at[0].topics.as_ref().expect("50 qualifying reviews are modeled");
    assert_eq!(topics.len(), 4);
}
