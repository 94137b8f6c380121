use anyhow::{anyhow, Result};
use std::path::Path;

/// Validation utilities for command-line input
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate bank name
    pub fn validate_bank_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(anyhow!("Bank name cannot be empty"));
        }

        if name.len() > 100 {
            return Err(anyhow!("Bank name too long (max 100 characters)"));
        }

        if name.contains('\0') || name.contains('\r') || name.contains('\n') {
            return Err(anyhow!("Bank name contains invalid characters"));
        }

        Ok(())
    }

    /// Validate review identifier
    pub fn validate_review_id(review_id: &str) -> Result<()> {
        if review_id.trim().is_empty() {
            return Err(anyhow!("Review id cannot be empty"));
        }

        if review_id.len() > 255 {
            return Err(anyhow!("Review id too long (max 255 characters)"));
        }

        if review_id.chars().any(char::is_control) {
            return Err(anyhow!("Review id contains control characters"));
        }

        Ok(())
    }

    /// Validate file path
    pub fn validate_file_path(path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();
        if path_str.trim().is_empty() {
            return Err(anyhow!("File path cannot be empty"));
        }

        if path_str.contains('\0') {
            return Err(anyhow!("File path contains a NUL byte"));
        }

        if path_str.len() > 4096 {
            return Err(anyhow!("File path too long (max 4096 characters)"));
        }

        Ok(())
    }

    /// Validate an input file that must already exist
    pub fn validate_input_file(path: &Path) -> Result<()> {
        Self::validate_file_path(path)?;

        if path.exists() && !path.is_file() {
            return Err(anyhow!("Input path is not a file: {}", path.display()));
        }

        Ok(())
    }

    /// Validate number of themes kept per review
    pub fn validate_top_k(top_k: usize) -> Result<()> {
        if top_k == 0 {
            return Err(anyhow!("top-k must be greater than 0"));
        }

        if top_k > 20 {
            return Err(anyhow!("top-k too large (max 20)"));
        }

        Ok(())
    }

    /// Validate number of LDA topics
    pub fn validate_num_topics(num_topics: usize) -> Result<()> {
        if num_topics == 0 {
            return Err(anyhow!("Number of topics must be greater than 0"));
        }

        if num_topics > 100 {
            return Err(anyhow!("Number of topics too large (max 100)"));
        }

        Ok(())
    }

    /// Validate LDA passes
    pub fn validate_passes(passes: usize) -> Result<()> {
        if passes == 0 {
            return Err(anyhow!("Passes must be greater than 0"));
        }

        if passes > 1000 {
            return Err(anyhow!("Passes too large (max 1000)"));
        }

        Ok(())
    }

    /// Validate database URL or path
    pub fn validate_database_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(anyhow!("Database URL cannot be empty"));
        }

        if url.contains("://") && !url.starts_with("sqlite://") {
            return Err(anyhow!("Only SQLite databases are supported"));
        }

        if url.len() > 1000 {
            return Err(anyhow!("Database URL too long"));
        }

        Ok(())
    }

    /// Sanitize text input
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
            .collect::<String>()
            .trim()
            .to_string()
    }
}
