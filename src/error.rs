//! Typed errors at the extraction and ingestion seams.
//!
//! Configuration, store, and CLI plumbing use `anyhow::Result` with
//! `.context(...)`; the pipeline surfaces these enums so callers can tell a
//! missing capability from a broken file or a permission denial.

use thiserror::Error;

/// Maximum characters of a remote diagnostic payload kept in an error.
pub const DIAGNOSTIC_CHARS: usize = 800;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// A required capability is missing. `hint` tells the operator how to fix it.
    #[error("{message} ({hint})")]
    Config { message: String, hint: String },

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("spreadsheet extraction failed: {0}")]
    Spreadsheet(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("cloud OCR failed: {0}")]
    CloudOcr(String),

    #[error("cloud OCR timed out after {attempts} polls")]
    CloudOcrTimeout { attempts: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    pub fn config(message: impl Into<String>, hint: impl Into<String>) -> Self {
        ExtractError::Config {
            message: message.into(),
            hint: hint.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("not permitted: {0}")]
    Forbidden(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("file error: {0}")]
    File(String),

    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

/// Truncate a diagnostic payload to [`DIAGNOSTIC_CHARS`] characters.
pub fn truncate_diagnostic(payload: &str) -> String {
    payload.chars().take(DIAGNOSTIC_CHARS).collect()
}
