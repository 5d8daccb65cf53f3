//! Error types for the Shelfwise core library.

use thiserror::Error;

/// All errors that can occur within the Shelfwise core library.
#[derive(Debug, Error)]
pub enum ShelfError {
    /// A SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A book key was requested that does not exist in the library.
    #[error("Book not found: {0}")]
    BookNotFound(String),

    /// A bookshelf ID was requested that does not exist in the library.
    #[error("Bookshelf not found: {0}")]
    BookshelfNotFound(String),

    /// A book with the same key is already in the library.
    #[error("Duplicate book key: {0}")]
    DuplicateKey(String),

    /// User input failed validation (blank title, rating out of range, ...).
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The opened file is not a valid Shelfwise library.
    #[error("Invalid library: {0}")]
    InvalidLibrary(String),

    /// An external export (e.g. a Kindle library cache) could not be parsed.
    #[error("Import error: {0}")]
    Import(String),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be (de)serialized as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`ShelfError`].
pub type Result<T> = std::result::Result<T, ShelfError>;

impl ShelfError {
    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(e) => format!("Failed to save: {e}"),
            Self::BookNotFound(_) => "Book no longer exists".to_string(),
            Self::BookshelfNotFound(_) => "Bookshelf no longer exists".to_string(),
            Self::DuplicateKey(key) => format!("A book with key {key} is already in your library"),
            Self::ValidationFailed(msg) => msg.clone(),
            Self::InvalidLibrary(_) => "Could not open library file".to_string(),
            Self::Import(e) => format!("Could not read export: {e}"),
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_key_message_names_key() {
        let e = ShelfError::DuplicateKey("B00TEST123".to_string());
        assert!(e.to_string().contains("B00TEST123"));
        assert!(e.user_message().contains("B00TEST123"));
    }

    #[test]
    fn test_validation_message_passes_through() {
        let e = ShelfError::ValidationFailed("Rating must be between 0 and 5".to_string());
        assert_eq!(e.user_message(), "Rating must be between 0 and 5");
    }
}
