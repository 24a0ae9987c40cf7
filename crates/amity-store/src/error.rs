use amity_shared::AmityError;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A domain rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] AmityError),

    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Seed document could not be parsed.
    #[error("Seed error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Classify this error in the shared taxonomy.
    ///
    /// Infrastructure failures (SQLite, I/O, migrations) count as upstream
    /// failures of the persistence layer.
    pub fn kind(&self) -> AmityError {
        match self {
            StoreError::Domain(e) => e.clone(),
            StoreError::Json(e) => AmityError::Validation(e.to_string()),
            other => AmityError::Upstream(other.to_string()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Domain(AmityError::NotFound(_)))
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, StoreError::Domain(AmityError::InvalidState(_)))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Domain(AmityError::Validation(_)))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
