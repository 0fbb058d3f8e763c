use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AllowOnlyOneError {
    // I/O Errors
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings file not found: {}", .0.display())]
    SettingsNotFound(PathBuf),

    #[error("Corpus database not found: {}", .0.display())]
    CorpusNotFound(PathBuf),

    // Configuration Errors
    #[error("Invalid settings file: {0}")]
    InvalidSettings(#[from] toml::de::Error),

    #[error("Duplicate settings for field '{field}' on {kind} '{category}'")]
    DuplicateSettings {
        field: String,
        kind: String,
        category: String,
    },

    #[error("Unsupported record kind in settings: {0}")]
    UnsupportedKind(String),

    // Record Errors
    #[error("Invalid record data: {0}")]
    InvalidRecord(#[from] serde_json::Error),

    // Corpus Errors
    #[error("Corpus lookup failed: {0}")]
    CorpusLookup(#[from] rusqlite::Error),

    #[error("Corpus unavailable during {operation}: {cause}")]
    CorpusUnavailable { operation: String, cause: String },
}

pub type Result<T> = std::result::Result<T, AllowOnlyOneError>;

impl AllowOnlyOneError {
    /// Returns true if this error came from the corpus backend.
    ///
    /// Callers must treat these as a failed validation step, never as
    /// "no conflict".
    pub fn is_corpus_failure(&self) -> bool {
        matches!(
            self,
            AllowOnlyOneError::CorpusLookup(_) | AllowOnlyOneError::CorpusUnavailable { .. }
        )
    }
}
