//! Book records and the inputs used to create and edit them.

use serde::{Deserialize, Serialize};

use crate::{Result, ShelfError};

/// Reading progress of a book.
///
/// Serialized as a snake_case string (`"unread"`, `"reading"`, `"read"`).
///
/// # Examples
///
/// ```rust
/// use shelfwise_core::ReadStatus;
///
/// let json = serde_json::to_string(&ReadStatus::Reading).unwrap();
/// assert_eq!(json, r#""reading""#);
/// assert_eq!(ReadStatus::default(), ReadStatus::Unread);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStatus {
    #[default]
    Unread,
    Reading,
    Read,
}

impl ReadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Reading => "reading",
            Self::Read => "read",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unread" => Some(Self::Unread),
            "reading" => Some(Self::Reading),
            "read" => Some(Self::Read),
            _ => None,
        }
    }
}

/// Where a book record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookSource {
    /// Entered by hand.
    Manual,
    /// Brought in from a Kindle library export.
    Imported,
}

impl BookSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Imported => "imported",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manual" => Some(Self::Manual),
            "imported" => Some(Self::Imported),
            _ => None,
        }
    }
}

/// A single book in the library, identified by its catalog `key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub key: String,
    pub title: String,
    pub author: String,
    /// Unix timestamp (seconds) of purchase/acquisition, when known.
    pub acquired_at: Option<i64>,
    #[serde(default)]
    pub status: ReadStatus,
    pub cover_url: Option<String>,
    pub source: BookSource,
    pub created_at: i64,
    #[serde(default)]
    pub modified_at: i64,
}

/// Input for adding a book by hand.
///
/// When `key` is `None` a `manual-<uuid>` key is generated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub key: Option<String>,
    pub title: String,
    #[serde(default)]
    pub author: String,
    pub acquired_at: Option<i64>,
    #[serde(default)]
    pub status: ReadStatus,
    pub cover_url: Option<String>,
}

/// Editable fields of an existing book. Key and provenance never change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookUpdate {
    pub title: String,
    #[serde(default)]
    pub author: String,
    pub acquired_at: Option<i64>,
    pub status: ReadStatus,
    pub cover_url: Option<String>,
}

impl From<&Book> for BookUpdate {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            acquired_at: book.acquired_at,
            status: book.status,
            cover_url: book.cover_url.clone(),
        }
    }
}

/// Trims `title` and rejects it when nothing is left.
pub(crate) fn normalize_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ShelfError::ValidationFailed("Title is required".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Blank cover URLs are stored as `None`.
pub(crate) fn normalize_cover_url(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [ReadStatus::Unread, ReadStatus::Reading, ReadStatus::Read] {
            assert_eq!(ReadStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ReadStatus::parse("finished"), None);
    }

    #[test]
    fn test_book_serializes_camel_case() {
        let book = Book {
            key: "B000FC0SIM".to_string(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            acquired_at: Some(1_400_000_000),
            status: ReadStatus::Read,
            cover_url: None,
            source: BookSource::Imported,
            created_at: 1_700_000_000,
            modified_at: 1_700_000_000,
        };
        let json = serde_json::to_string(&book).unwrap();
        assert!(json.contains("\"acquiredAt\":1400000000"));
        assert!(json.contains("\"source\":\"imported\""));
        assert!(json.contains("\"status\":\"read\""));
    }

    #[test]
    fn test_book_without_status_defaults_to_unread() {
        let json = r#"{"key":"k","title":"T","author":"","acquiredAt":null,
                       "coverUrl":null,"source":"manual","createdAt":1}"#;
        let book: Book = serde_json::from_str(json).unwrap();
        assert_eq!(book.status, ReadStatus::Unread);
        assert_eq!(book.modified_at, 0);
    }

    #[test]
    fn test_normalize_title_rejects_blank() {
        assert!(matches!(normalize_title("   "), Err(ShelfError::ValidationFailed(_))));
        assert_eq!(normalize_title("  Emma ").unwrap(), "Emma");
    }

    #[test]
    fn test_normalize_cover_url_drops_blank() {
        assert_eq!(normalize_cover_url(Some("  ".to_string())), None);
        assert_eq!(
            normalize_cover_url(Some(" https://x/y.jpg ".to_string())),
            Some("https://x/y.jpg".to_string())
        );
    }
}
