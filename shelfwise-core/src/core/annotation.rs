//! Per-book personal notes and star ratings.

use serde::{Deserialize, Serialize};

use crate::{Result, ShelfError};

/// Highest star rating a book can receive.
pub const MAX_RATING: u8 = 5;

/// The user's note and 0–5 star rating for one book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub rating: u8,
}

impl Annotation {
    /// An empty note with no stars carries no information and is not stored.
    pub fn is_empty(&self) -> bool {
        self.note.trim().is_empty() && self.rating == 0
    }
}

/// An annotation paired with the key of the book it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationEntry {
    pub book_key: String,
    #[serde(flatten)]
    pub annotation: Annotation,
}

pub(crate) fn validate_rating(rating: u8) -> Result<()> {
    if rating > MAX_RATING {
        return Err(ShelfError::ValidationFailed(format!(
            "Rating must be between 0 and {MAX_RATING}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rating_bounds() {
        assert!(validate_rating(0).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(matches!(validate_rating(6), Err(ShelfError::ValidationFailed(_))));
    }

    #[test]
    fn test_whitespace_note_without_rating_is_empty() {
        let a = Annotation { note: "  \n".to_string(), rating: 0 };
        assert!(a.is_empty());
        let b = Annotation { note: String::new(), rating: 1 };
        assert!(!b.is_empty());
    }

    #[test]
    fn test_entry_flattens_annotation() {
        let entry = AnnotationEntry {
            book_key: "k1".to_string(),
            annotation: Annotation { note: "great".to_string(), rating: 4 },
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"bookKey":"k1","note":"great","rating":4}"#);
    }
}
