use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use tracing::{debug, error, info};

use crate::error::{PipelineError, Result};
use crate::models::{Bank, DbReview, NewReview};
use crate::schema::{banks, reviews};

/// Owns the single connection used by a pipeline run.
///
/// The connection is closed when the value is dropped, so every exit path
/// (success, database error, early return) releases it.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database file and apply migrations
    pub fn new(database_path: &str, busy_timeout: Duration) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(database_path)?;
        conn.busy_timeout(busy_timeout)?;
        Self::from_connection(conn)
    }

    /// In-memory database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        Self::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!("../migrations/2025-11-20-000000_create_tables/up.sql"))?;
        debug!("Database migrations applied");
        Ok(())
    }

    /// Register a bank if it is not already known and return it
    pub fn ensure_bank(&self, name: &str) -> Result<Bank> {
        self.conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES (?1) ON CONFLICT ({}) DO NOTHING",
                banks::TABLE,
                banks::BANK_NAME,
                banks::BANK_NAME
            ),
            params![name],
        )?;

        self.get_bank(name)?
            .ok_or_else(|| PipelineError::Other(format!("Failed to retrieve bank: {name}")))
    }

    /// Look up a bank by name
    pub fn get_bank(&self, name: &str) -> Result<Option<Bank>> {
        let bank = self
            .conn
            .query_row(
                &format!(
                    "SELECT {}, {} FROM {} WHERE {} = ?1",
                    banks::BANK_ID,
                    banks::BANK_NAME,
                    banks::TABLE,
                    banks::BANK_NAME
                ),
                params![name],
                Self::map_bank,
            )
            .optional()?;

        Ok(bank)
    }

    /// All registered banks ordered by id
    pub fn list_banks(&self) -> Result<Vec<Bank>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {}, {} FROM {} ORDER BY {}",
            banks::BANK_ID,
            banks::BANK_NAME,
            banks::TABLE,
            banks::BANK_ID
        ))?;

        let banks = stmt
            .query_map([], Self::map_bank)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(banks)
    }

    /// Name to id mapping read from the banks table
    pub fn bank_map(&self) -> Result<HashMap<String, i64>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {}, {} FROM {};", banks::BANK_NAME, banks::BANK_ID, banks::TABLE))?;

        let mut map = HashMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        for row in rows {
            let (name, id) = row?;
            map.insert(name, id);
        }

        Ok(map)
    }

    /// Insert reviews in one transaction, skipping ids that already exist.
    ///
    /// Returns the number of rows actually inserted. Any failure rolls the
    /// whole batch back.
    pub fn insert_reviews(&mut self, new_reviews: &[NewReview]) -> Result<usize> {
        let tx = self.conn.transaction()?;

        match Self::insert_batch(&tx, new_reviews) {
            Ok(inserted) => {
                tx.commit()?;
                info!("Committed {} new reviews", inserted);
                Ok(inserted)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    error!("Rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    fn insert_batch(tx: &Transaction<'_>, new_reviews: &[NewReview]) -> Result<usize> {
        let placeholders = (1..=reviews::INSERT_COLUMNS.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO NOTHING",
            reviews::TABLE,
            reviews::INSERT_COLUMNS.join(", "),
            placeholders,
            reviews::REVIEW_ID
        );

        let mut stmt = tx.prepare(&query)?;
        let mut inserted = 0;
        for review in new_reviews {
            inserted += stmt.execute(params![
                review.review_id,
                review.bank_id,
                review.review_text,
                review.rating,
                review.sentiment_label.map(|label| label.as_str()),
                review.sentiment_score,
                review.theme,
            ])?;
        }

        Ok(inserted)
    }

    /// Get a stored review by id
    pub fn get_review(&self, review_id: &str) -> Result<Option<DbReview>> {
        let review = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE {} = ?1",
                    reviews::INSERT_COLUMNS.join(", "),
                    reviews::TABLE,
                    reviews::REVIEW_ID
                ),
                params![review_id],
                Self::map_review,
            )
            .optional()?;

        Ok(review)
    }

    /// Total number of stored reviews
    pub fn count_reviews(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", reviews::TABLE), [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Statistics about stored reviews
    pub fn get_load_stats(&self) -> Result<LoadStats> {
        let total_reviews = self.count_reviews()?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT b.{name}, COUNT(r.{id}) FROM {banks} b LEFT JOIN {reviews} r ON r.{fk} = b.{pk} \
             GROUP BY b.{pk}, b.{name} ORDER BY b.{pk}",
            name = banks::BANK_NAME,
            id = reviews::REVIEW_ID,
            banks = banks::TABLE,
            reviews = reviews::TABLE,
            fk = reviews::BANK_ID,
            pk = banks::BANK_ID,
        ))?;

        let per_bank = stmt
            .query_map([], |row| {
                let count: i64 = row.get(1)?;
                Ok((row.get::<_, String>(0)?, usize::try_from(count).unwrap_or_default()))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(LoadStats {
            total_reviews,
            per_bank,
        })
    }

    fn map_bank(row: &Row<'_>) -> rusqlite::Result<Bank> {
        Ok(Bank {
            bank_id: row.get(banks::BANK_ID)?,
            bank_name: row.get(banks::BANK_NAME)?,
        })
    }

    fn map_review(row: &Row<'_>) -> rusqlite::Result<DbReview> {
        Ok(DbReview {
            review_id: row.get(reviews::REVIEW_ID)?,
            bank_id: row.get(reviews::BANK_ID)?,
            review_text: row.get(reviews::REVIEW_TEXT)?,
            rating: row.get(reviews::RATING)?,
            sentiment_label: row.get(reviews::SENTIMENT_LABEL)?,
            sentiment_score: row.get(reviews::SENTIMENT_SCORE)?,
            theme: row.get(reviews::THEME)?,
        })
    }
}

/// Statistics about stored reviews
#[derive(Debug)]
pub struct LoadStats {
    /// Rows in the reviews table
    pub total_reviews: usize,
    /// Review count per registered bank
    pub per_bank: Vec<(String, usize)>,
}

/// Open the configured database
pub fn establish_connection(database_path: &str, busy_timeout: Duration) -> Result<Database> {
    info!("Connecting to database at {}", database_path);
    Database::new(database_path, busy_timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_bank_is_idempotent() {
        let db = Database::open_in_memory().expect("Failed to open database");

        let first = db.ensure_bank("Dashen Bank").expect("Failed to add bank");
        let second = db.ensure_bank("Dashen Bank").expect("Failed to add bank");

        assert_eq!(first, second);
        assert_eq!(db.list_banks().expect("Failed to list banks").len(), 1);
    }

    #[test]
    fn test_bank_map() {
        let db = Database::open_in_memory().expect("Failed to open database");
        let cbe = db.ensure_bank("CBE").expect("Failed to add bank");
        let boa = db.ensure_bank("BOA").expect("Failed to add bank");

        let map = db.bank_map().expect("Failed to read bank map");
        assert_eq!(map.get("CBE"), Some(&cbe.bank_id));
        assert_eq!(map.get("BOA"), Some(&boa.bank_id));
        assert_eq!(map.get("Unknown"), None);
    }
}
