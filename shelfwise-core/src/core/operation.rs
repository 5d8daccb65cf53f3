//! Activity history entries recorded for every library mutation.

use crate::{BookUpdate, OrderScope, ReadStatus};
use serde::{Deserialize, Serialize};

/// A single library mutation recorded in the activity log.
///
/// Every variant carries a stable `operation_id` and a wall-clock
/// `timestamp` (unix seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    /// A book was added by hand.
    AddBook {
        operation_id: String,
        timestamp: i64,
        book_key: String,
        title: String,
    },
    /// A book's editable fields were changed.
    UpdateBook {
        operation_id: String,
        timestamp: i64,
        book_key: String,
        update: BookUpdate,
    },
    /// Only the reading status changed.
    SetStatus {
        operation_id: String,
        timestamp: i64,
        book_key: String,
        status: ReadStatus,
    },
    /// A book was removed from the library.
    DeleteBook {
        operation_id: String,
        timestamp: i64,
        book_key: String,
    },
    /// A batch of records was merged in from an export.
    ImportBooks {
        operation_id: String,
        timestamp: i64,
        added: usize,
        skipped: usize,
    },
    /// A bookshelf was created.
    CreateBookshelf {
        operation_id: String,
        timestamp: i64,
        shelf_id: String,
        name: String,
    },
    /// A bookshelf's name, icon, or description changed.
    UpdateBookshelf {
        operation_id: String,
        timestamp: i64,
        shelf_id: String,
        name: String,
    },
    /// A bookshelf was removed. Its books stay in the library.
    DeleteBookshelf {
        operation_id: String,
        timestamp: i64,
        shelf_id: String,
    },
    /// A book was put on a bookshelf.
    ShelveBook {
        operation_id: String,
        timestamp: i64,
        shelf_id: String,
        book_key: String,
    },
    /// A book was taken off a bookshelf.
    UnshelveBook {
        operation_id: String,
        timestamp: i64,
        shelf_id: String,
        book_key: String,
    },
    /// A note or rating changed.
    Annotate {
        operation_id: String,
        timestamp: i64,
        book_key: String,
        rating: u8,
    },
    /// The custom order of a view was replaced.
    Reorder {
        operation_id: String,
        timestamp: i64,
        scope: OrderScope,
        keys: Vec<String>,
    },
    /// Every book, shelf, and annotation was removed.
    ClearLibrary {
        operation_id: String,
        timestamp: i64,
    },
}

impl Operation {
    /// Returns the stable identifier for this operation.
    #[must_use]
    pub fn operation_id(&self) -> &str {
        match self {
            Self::AddBook { operation_id, .. }
            | Self::UpdateBook { operation_id, .. }
            | Self::SetStatus { operation_id, .. }
            | Self::DeleteBook { operation_id, .. }
            | Self::ImportBooks { operation_id, .. }
            | Self::CreateBookshelf { operation_id, .. }
            | Self::UpdateBookshelf { operation_id, .. }
            | Self::DeleteBookshelf { operation_id, .. }
            | Self::ShelveBook { operation_id, .. }
            | Self::UnshelveBook { operation_id, .. }
            | Self::Annotate { operation_id, .. }
            | Self::Reorder { operation_id, .. }
            | Self::ClearLibrary { operation_id, .. } => operation_id,
        }
    }

    /// Returns the wall-clock Unix timestamp (seconds) when this operation was created.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::AddBook { timestamp, .. }
            | Self::UpdateBook { timestamp, .. }
            | Self::SetStatus { timestamp, .. }
            | Self::DeleteBook { timestamp, .. }
            | Self::ImportBooks { timestamp, .. }
            | Self::CreateBookshelf { timestamp, .. }
            | Self::UpdateBookshelf { timestamp, .. }
            | Self::DeleteBookshelf { timestamp, .. }
            | Self::ShelveBook { timestamp, .. }
            | Self::UnshelveBook { timestamp, .. }
            | Self::Annotate { timestamp, .. }
            | Self::Reorder { timestamp, .. }
            | Self::ClearLibrary { timestamp, .. } => *timestamp,
        }
    }

    /// Returns the variant name stored in the `operation_type` column.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::AddBook { .. } => "AddBook",
            Self::UpdateBook { .. } => "UpdateBook",
            Self::SetStatus { .. } => "SetStatus",
            Self::DeleteBook { .. } => "DeleteBook",
            Self::ImportBooks { .. } => "ImportBooks",
            Self::CreateBookshelf { .. } => "CreateBookshelf",
            Self::UpdateBookshelf { .. } => "UpdateBookshelf",
            Self::DeleteBookshelf { .. } => "DeleteBookshelf",
            Self::ShelveBook { .. } => "ShelveBook",
            Self::UnshelveBook { .. } => "UnshelveBook",
            Self::Annotate { .. } => "Annotate",
            Self::Reorder { .. } => "Reorder",
            Self::ClearLibrary { .. } => "ClearLibrary",
        }
    }

    /// One-line description shown in the activity panel.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::AddBook { title, .. } => format!("Added \"{title}\""),
            Self::UpdateBook { update, .. } => format!("Edited \"{}\"", update.title),
            Self::SetStatus { book_key, status, .. } => {
                format!("Marked {book_key} as {}", status.as_str())
            }
            Self::DeleteBook { book_key, .. } => format!("Deleted {book_key}"),
            Self::ImportBooks { added, skipped, .. } => {
                format!("Imported {added} books ({skipped} skipped)")
            }
            Self::CreateBookshelf { name, .. } => format!("Created bookshelf \"{name}\""),
            Self::UpdateBookshelf { name, .. } => format!("Edited bookshelf \"{name}\""),
            Self::DeleteBookshelf { shelf_id, .. } => format!("Deleted bookshelf {shelf_id}"),
            Self::ShelveBook { book_key, shelf_id, .. } => {
                format!("Added {book_key} to bookshelf {shelf_id}")
            }
            Self::UnshelveBook { book_key, shelf_id, .. } => {
                format!("Removed {book_key} from bookshelf {shelf_id}")
            }
            Self::Annotate { book_key, rating, .. } => {
                format!("Annotated {book_key} ({rating}/5)")
            }
            Self::Reorder { keys, .. } => format!("Reordered {} books", keys.len()),
            Self::ClearLibrary { .. } => "Cleared the library".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_serialization() {
        let op = Operation::AddBook {
            operation_id: "op-123".to_string(),
            timestamp: 1234567890,
            book_key: "B000FC0SIM".to_string(),
            title: "Dune".to_string(),
        };

        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"type\":\"AddBook\""));
        assert!(json.contains("\"book_key\":\"B000FC0SIM\""));

        let parsed: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.operation_id(), "op-123");
        assert_eq!(parsed.timestamp(), 1234567890);
        assert_eq!(parsed.type_name(), "AddBook");
    }

    #[test]
    fn test_reorder_carries_scope() {
        let op = Operation::Reorder {
            operation_id: "op-1".to_string(),
            timestamp: 1,
            scope: OrderScope::Shelf("s1".to_string()),
            keys: vec!["a".to_string(), "b".to_string()],
        };
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains(r#""scope":{"type":"shelf","id":"s1"}"#));
        assert_eq!(op.describe(), "Reordered 2 books");
    }
}
