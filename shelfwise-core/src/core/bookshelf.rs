use serde::{Deserialize, Serialize};

use crate::{Result, ShelfError};

/// A user-defined collection of books. `book_keys` is the membership list in
/// the order books were added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookshelf {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub book_keys: Vec<String>,
    pub created_at: i64,
}

/// Input for creating or renaming a bookshelf.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBookshelf {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
}

impl NewBookshelf {
    pub(crate) fn normalized(&self) -> Result<Self> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ShelfError::ValidationFailed(
                "Bookshelf name is required".to_string(),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            icon: self.icon.trim().to_string(),
            description: self.description.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_trims_fields() {
        let input = NewBookshelf {
            name: "  Sci-Fi ".to_string(),
            icon: " 🚀 ".to_string(),
            description: " space ".to_string(),
        };
        let n = input.normalized().unwrap();
        assert_eq!(n.name, "Sci-Fi");
        assert_eq!(n.icon, "🚀");
        assert_eq!(n.description, "space");
    }

    #[test]
    fn test_normalized_rejects_blank_name() {
        let input = NewBookshelf::default();
        assert!(matches!(input.normalized(), Err(ShelfError::ValidationFailed(_))));
    }
}
