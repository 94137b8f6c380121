//! End-to-end tests: cleaned CSV → final CSV → database

use std::io::Write;
use std::path::Path;

use bank_reviews::config::AppConfig;
use bank_reviews::db::Database;
use bank_reviews::loader::ReviewLoader;
use bank_reviews::models::FinalReviewRow;
use bank_reviews::pipeline::{read_and_clean, read_cleaned_reviews, write_keywords, ReviewPipeline};
use bank_reviews::{KeywordScore, PipelineError, SentimentBackend, SentimentLabel};
use tempfile::tempdir;

const CLEANED_HEADER: &str = "review_id,review_text,rating,bank_name,review_date";

fn write_cleaned(path: &Path, rows: &[&str]) {
    let mut file = std::fs::File::create(path).expect("Failed to create input");
    writeln!(file, "{CLEANED_HEADER}").expect("Failed to write header");
    for row in rows {
        writeln!(file, "{row}").expect("Failed to write row");
    }
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.sentiment.backend = SentimentBackend::Lexicon;
    config.keywords.min_df = 1;
    config
}

#[test]
fn test_missing_input_is_reported() {
    let dir = tempdir().expect("Failed to create temp directory");
    let err = read_cleaned_reviews(&dir.path().join("absent.csv")).expect_err("missing input");
    assert!(matches!(err, PipelineError::InputNotFound(_)));
}

#[test]
fn test_analyze_writes_final_table() {
    let dir = tempdir().expect("Failed to create temp directory");
    let input = dir.path().join("cleaned.csv");
    let output = dir.path().join("out").join("final.csv");
    let keywords = dir.path().join("keywords.csv");
    write_cleaned(
        &input,
        &[
            "r1,\"Excellent app, very fast transfer\",5,Dashen Bank,2024-04-01",
            "r2,The app keeps crashing after login error,1,CBE,2024-04-02",
            "r3,,3,CBE,",
        ],
    );

    let mut pipeline = ReviewPipeline::from_config(&test_config()).expect("Failed to build pipeline");
    let report = pipeline
        .run_file(&input, &output, Some(&keywords))
        .expect("Analysis should succeed");
    assert_eq!(report.reviews, 3);
    assert!(!report.keywords.is_empty());

    let mut reader = csv::Reader::from_path(&output).expect("Failed to open output");
    let headers: Vec<String> = reader
        .headers()
        .expect("Failed to read headers")
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        headers,
        [
            "review_id",
            "review_text",
            "sentiment_label",
            "sentiment_score",
            "theme",
            "rating",
            "bank_name"
        ]
    );

    let rows: Vec<FinalReviewRow> = reader
        .deserialize()
        .collect::<Result<_, _>>()
        .expect("Failed to parse output");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].sentiment_label, Some(SentimentLabel::Positive));
    assert_eq!(rows[0].theme.as_deref(), Some("Transaction Performance"));
    assert_eq!(rows[1].theme.as_deref(), Some("App Stability & Bugs"));
    assert_eq!(rows[2].review_text, None);
    assert_eq!(rows[2].sentiment_label, Some(SentimentLabel::Neutral));
    assert_eq!(rows[2].theme.as_deref(), Some("other"));

    let ranked: Vec<KeywordScore> = csv::Reader::from_path(&keywords)
        .expect("Failed to open keywords")
        .deserialize()
        .collect::<Result<_, _>>()
        .expect("Failed to parse keywords");
    assert_eq!(ranked.len(), report.keywords.len());
}

#[test]
fn test_final_table_loads_into_database() {
    let dir = tempdir().expect("Failed to create temp directory");
    let input = dir.path().join("cleaned.csv");
    let output = dir.path().join("final.csv");
    write_cleaned(
        &input,
        &[
            "a1,Fingerprint login is easy,5,Dashen Bank,2024-01-01",
            "a2,Transfer pending for days,1,Unknown Bank,2024-01-02",
        ],
    );

    let mut pipeline = ReviewPipeline::from_config(&test_config()).expect("Failed to build pipeline");
    pipeline.run_file(&input, &output, None).expect("Analysis should succeed");

    let mut db = Database::open_in_memory().expect("Failed to create database");
    db.ensure_bank("Dashen Bank").expect("Failed to add bank");
    let report = ReviewLoader::new(&mut db).load(&output).expect("Load should succeed");

    assert_eq!(report.read, 2);
    assert_eq!(report.unmapped, 1);
    assert_eq!(report.inserted, 1);

    let stored = db.get_review("a1").expect("Failed to query").expect("Review missing");
    assert_eq!(stored.theme.as_deref(), Some("Account Access & Security"));
    assert_eq!(stored.rating, Some(5.0));
}

#[test]
fn test_taxonomy_file_from_config() {
    let dir = tempdir().expect("Failed to create temp directory");
    let taxonomy = dir.path().join("taxonomy.yaml");
    std::fs::write(&taxonomy, "categories:\n  - name: Fees\n    keywords: [fee]\n").expect("Failed to write taxonomy");

    let mut config = test_config();
    config.themes.taxonomy_path = Some(taxonomy.to_string_lossy().into_owned());

    let input = dir.path().join("cleaned.csv");
    write_cleaned(&input, &["f1,Hidden FEE every month,2,CBE,2024-02-01"]);

    let mut reviews = read_and_clean(&input).expect("Failed to read input");
    assert_eq!(reviews[0].cleaned_review, "hidden fee every month");

    let mut pipeline = ReviewPipeline::from_config(&config).expect("Failed to build pipeline");
    pipeline.analyze(&mut reviews);
    assert_eq!(reviews[0].theme, "Fees");
}

#[test]
fn test_bad_taxonomy_file_fails() {
    let dir = tempdir().expect("Failed to create temp directory");
    let taxonomy = dir.path().join("taxonomy.json");
    std::fs::write(&taxonomy, r#"{"categories": []}"#).expect("Failed to write taxonomy");

    let mut config = test_config();
    config.themes.taxonomy_path = Some(taxonomy.to_string_lossy().into_owned());

    assert!(matches!(
        ReviewPipeline::from_config(&config),
        Err(PipelineError::Taxonomy(_))
    ));
}

#[test]
fn test_keywords_written_as_word_tfidf() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("kw.csv");
    write_keywords(
        &path,
        &[KeywordScore {
            word: "transfer".to_string(),
            tfidf: 0.25,
        }],
    )
    .expect("Failed to write keywords");

    let contents = std::fs::read_to_string(&path).expect("Failed to read keywords");
    assert_eq!(contents, "word,tfidf\ntransfer,0.25\n");
}
