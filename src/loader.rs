//! Persistence of the final analysis table.
//!
//! Rows are joined to the bank lookup table by name and bulk inserted in one
//! transaction. Review ids already in the store are skipped, so loading the
//! same file twice is harmless.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::db::Database;
use crate::error::{PipelineError, Result};
use crate::metrics::PipelineMetrics;
use crate::models::{FinalReviewRow, NewReview};
use crate::validation::InputValidator;

/// Row counts of one load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Rows read from the file
    pub read: usize,
    /// Rows dropped because their review id is unusable as a key
    pub invalid_ids: usize,
    /// Rows dropped because their bank has no id
    pub unmapped: usize,
    /// Rows committed
    pub inserted: usize,
    /// Rows whose review id was already stored
    pub skipped_duplicates: usize,
}

/// Read the final analysis table
pub fn read_final_rows(path: &Path) -> Result<Vec<FinalReviewRow>> {
    if !path.exists() {
        return Err(PipelineError::InputNotFound(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_reader(File::open(path)?);
    let rows = reader.deserialize().collect::<std::result::Result<Vec<FinalReviewRow>, _>>()?;
    Ok(rows)
}

/// Drop rows whose review id fails validation, returning the kept rows and the number dropped
#[must_use]
pub fn drop_invalid_ids(rows: Vec<FinalReviewRow>) -> (Vec<FinalReviewRow>, usize) {
    let total = rows.len();
    let valid: Vec<FinalReviewRow> = rows
        .into_iter()
        .filter(|row| match InputValidator::validate_review_id(&row.review_id) {
            Ok(()) => true,
            Err(e) => {
                debug!("Skipping row: {}", e);
                false
            }
        })
        .collect();

    let invalid = total - valid.len();
    (valid, invalid)
}

/// Attach bank ids, returning the resolvable rows and the number dropped
#[must_use]
pub fn resolve_banks(rows: Vec<FinalReviewRow>, bank_map: &HashMap<String, i64>) -> (Vec<NewReview>, usize) {
    let total = rows.len();
    let resolved: Vec<NewReview> = rows
        .into_iter()
        .filter_map(|row| {
            let bank_id = *bank_map.get(&row.bank_name)?;
            Some(NewReview::from_row(row, bank_id))
        })
        .collect();

    let unmapped = total - resolved.len();
    (resolved, unmapped)
}

/// Moves final rows into the relational store
pub struct ReviewLoader<'a> {
    db: &'a mut Database,
}

impl<'a> ReviewLoader<'a> {
    /// Loader writing into `db`
    #[must_use]
    pub fn new(db: &'a mut Database) -> Self {
        Self { db }
    }

    /// Load one final table.
    ///
    /// A missing file fails before the store is touched. Any database error
    /// rolls back the whole batch.
    pub fn load(&mut self, path: &Path) -> Result<LoadReport> {
        let rows = read_final_rows(path)?;
        info!("Loaded {} records from CSV.", rows.len());

        let read = rows.len();
        let (rows, invalid_ids) = drop_invalid_ids(rows);
        if invalid_ids > 0 {
            warn!("{} reviews have invalid review ids and will be skipped.", invalid_ids);
        }

        let bank_map = self.db.bank_map()?;
        let (reviews, unmapped) = resolve_banks(rows, &bank_map);
        if unmapped > 0 {
            warn!("{} reviews have unmapped bank names and will be skipped.", unmapped);
        }

        let inserted = self.db.insert_reviews(&reviews)?;
        info!("Successfully inserted {} new reviews.", inserted);

        Ok(LoadReport {
            read,
            invalid_ids,
            unmapped,
            inserted,
            skipped_duplicates: reviews.len() - inserted,
        })
    }
}

/// Open the store, load `input` and close the store again.
///
/// Failures are logged and counted on `metrics` rather than returned; `None`
/// means nothing was committed. The input is checked before a connection is
/// opened.
pub fn load_final_table(
    database_path: &str,
    busy_timeout: Duration,
    input: &Path,
    metrics: &mut PipelineMetrics,
) -> Option<LoadReport> {
    if !input.exists() {
        error!("Input file not found at {}", input.display());
        metrics.record_error("input_not_found", "load");
        return None;
    }

    let result = Database::new(database_path, busy_timeout).and_then(|mut db| ReviewLoader::new(&mut db).load(input));

    match result {
        Ok(report) => {
            metrics.record_load(&report);
            Some(report)
        }
        Err(e) if e.is_database() => {
            error!("Database error: {}", e);
            metrics.record_error("database", "load");
            None
        }
        Err(e) => {
            error!("Load failed: {}", e);
            metrics.record_error("load", "load");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(review_id: &str, bank_name: &str) -> FinalReviewRow {
        FinalReviewRow {
            review_id: review_id.to_string(),
            review_text: Some("works".to_string()),
            sentiment_label: None,
            sentiment_score: None,
            theme: None,
            rating: Some(4.0),
            bank_name: bank_name.to_string(),
        }
    }

    #[test]
    fn test_resolve_banks_drops_unknown() {
        let bank_map: HashMap<String, i64> = [("CBE".to_string(), 1)].into_iter().collect();
        let (resolved, unmapped) = resolve_banks(vec![row("r1", "CBE"), row("r2", "Unknown Bank")], &bank_map);

        assert_eq!(unmapped, 1);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].bank_id, 1);
    }

    #[test]
    fn test_drop_invalid_ids() {
        let (kept, invalid) = drop_invalid_ids(vec![row("r1", "CBE"), row("  ", "CBE"), row("bad\nid", "CBE")]);

        assert_eq!(invalid, 2);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].review_id, "r1");
    }

    #[test]
    fn test_missing_file_is_reported() {
        let mut db = Database::open_in_memory().expect("in-memory db");
        let err = ReviewLoader::new(&mut db)
            .load(Path::new("no/such/final.csv"))
            .expect_err("missing file");
        assert!(matches!(err, PipelineError::InputNotFound(_)));
        assert_eq!(db.count_reviews().expect("count"), 0);
    }
}
