//! Result type for book removal.
//!
//! Deleting a book also drops it from every bookshelf and every custom
//! order, and discards its annotation. [`DeleteResult`] reports what was
//! touched so the front-end can refresh the affected views.
//!
//! ```rust
//! use shelfwise_core::DeleteResult;
//!
//! let result = DeleteResult {
//!     book_key: "B000FC0SIM".to_string(),
//!     affected_shelf_ids: vec!["shelf-1".to_string()],
//!     had_annotation: true,
//! };
//! let json = serde_json::to_string(&result).unwrap();
//! assert!(json.contains("affectedShelfIds"));
//! ```

use serde::{Deserialize, Serialize};

/// The outcome of [`Library::delete_book`](super::library::Library::delete_book).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// Key of the removed book.
    pub book_key: String,

    /// IDs of bookshelves the book was removed from.
    pub affected_shelf_ids: Vec<String>,

    /// Whether a note or rating was discarded along with the book.
    pub had_annotation: bool,
}
