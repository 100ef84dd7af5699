// src/utils/error.rs
use std::path::PathBuf;
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Could not open workbook: {0}")]
    Workbook(String),

    #[error("Required sheet '{0}' not found in workbook")]
    MissingSheet(String),

    #[error("Sheet '{sheet}' has {found} column(s), {required} required")]
    MissingColumns {
        sheet: String,
        required: usize,
        found: usize,
    },

    #[error("Entity name label not found in sheet '{sheet}'")]
    EntityNameNotFound { sheet: String },

    #[error("Period tag '{tag}' must be 1 to {max} characters")]
    InvalidPeriod { tag: String, max: usize },

    #[error("Reporting period not found in sheet '{sheet}' and no --period given")]
    PeriodNotFound { sheet: String },
}

#[derive(Error, Debug)]
pub enum NoteError {
    #[error("Notes document {path:?} is unreadable: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Notes document {path:?} could not be parsed: {reason}")]
    Unparsable { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("Unsupported database URL scheme: {0}")]
    UnsupportedBackend(String),

    #[error("Insert failed for item '{item}': {source}")]
    Insert {
        item: String,
        #[source]
        source: sqlx::Error,
    },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Note extraction failed: {0}")]
    Notes(#[from] NoteError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
