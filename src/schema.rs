//! Database schema definitions
//!
//! This module provides constants for table and column names used with rusqlite.

/// Banks lookup table schema
pub mod banks {
    /// Table name
    pub const TABLE: &str = "banks";
    /// Primary key column
    pub const BANK_ID: &str = "bank_id";
    /// Unique bank name column
    pub const BANK_NAME: &str = "bank_name";
}

/// Reviews table schema
pub mod reviews {
    /// Table name
    pub const TABLE: &str = "reviews";
    /// Primary key column
    pub const REVIEW_ID: &str = "review_id";
    /// Foreign key to the banks table
    pub const BANK_ID: &str = "bank_id";
    /// Raw review text column
    pub const REVIEW_TEXT: &str = "review_text";
    /// Star rating column
    pub const RATING: &str = "rating";
    /// Sentiment label column
    pub const SENTIMENT_LABEL: &str = "sentiment_label";
    /// Sentiment score column
    pub const SENTIMENT_SCORE: &str = "sentiment_score";
    /// Assigned theme column
    pub const THEME: &str = "theme";

    /// Insert order shared by the loader and its prepared statement
    pub const INSERT_COLUMNS: [&str; 7] = [
        REVIEW_ID,
        BANK_ID,
        REVIEW_TEXT,
        RATING,
        SENTIMENT_LABEL,
        SENTIMENT_SCORE,
        THEME,
    ];
}
