//! Manual (drag-and-drop) display order for books.
//!
//! A custom order is a list of book keys attached to an [`OrderScope`]. It
//! never has to mention every book: [`apply_custom_order`] places the listed
//! books first and lets everything else follow in its original relative
//! order, so newly added books simply show up at the end.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::Book;

const LIBRARY_SCOPE_KEY: &str = "library";
const SHELF_SCOPE_PREFIX: &str = "shelf:";

/// Which view a custom order belongs to.
///
/// Serialized adjacently tagged so the front-end can send
/// `{"type":"library"}` or `{"type":"shelf","id":"..."}`.
///
/// # Examples
///
/// ```rust
/// use shelfwise_core::OrderScope;
///
/// let scope = OrderScope::Shelf("abc".to_string());
/// let json = serde_json::to_string(&scope).unwrap();
/// assert_eq!(json, r#"{"type":"shelf","id":"abc"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "camelCase")]
pub enum OrderScope {
    /// The all-books view.
    Library,
    /// A single bookshelf, by ID.
    Shelf(String),
}

impl OrderScope {
    /// Returns the string stored in the `custom_orders.scope` column.
    pub fn storage_key(&self) -> String {
        match self {
            Self::Library => LIBRARY_SCOPE_KEY.to_string(),
            Self::Shelf(id) => format!("{SHELF_SCOPE_PREFIX}{id}"),
        }
    }

    pub fn from_storage_key(key: &str) -> Option<Self> {
        if key == LIBRARY_SCOPE_KEY {
            return Some(Self::Library);
        }
        key.strip_prefix(SHELF_SCOPE_PREFIX)
            .filter(|id| !id.is_empty())
            .map(|id| Self::Shelf(id.to_string()))
    }
}

/// A stored custom order, as it appears in exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomOrder {
    pub scope: OrderScope,
    pub keys: Vec<String>,
}

/// Reorders `books` so that keys listed in `order` come first, in list order.
///
/// Books missing from `order` keep their original relative order after the
/// listed ones. Keys in `order` with no matching book are ignored, and a key
/// listed twice counts at its first position.
pub fn apply_custom_order(books: Vec<Book>, order: &[String]) -> Vec<Book> {
    apply_custom_order_by(books, order, |book| book.key.as_str())
}

/// [`apply_custom_order`] for any item that can name its book key.
pub fn apply_custom_order_by<T, F>(items: Vec<T>, order: &[String], key: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    if order.is_empty() {
        return items;
    }
    let mut rank: HashMap<&str, usize> = HashMap::with_capacity(order.len());
    for (i, k) in order.iter().enumerate() {
        rank.entry(k.as_str()).or_insert(i);
    }

    let mut indexed: Vec<(usize, usize, T)> = items
        .into_iter()
        .enumerate()
        .map(|(original, item)| {
            let r = rank.get(key(&item)).copied().unwrap_or(usize::MAX);
            (r, original, item)
        })
        .collect();
    indexed.sort_by_key(|(r, original, _)| (*r, *original));
    indexed.into_iter().map(|(_, _, item)| item).collect()
}

/// Moves `key` to `to_index` within `keys`, clamping past-the-end targets.
///
/// Returns `false` and leaves `keys` untouched when `key` is not present.
pub fn move_key(keys: &mut Vec<String>, key: &str, to_index: usize) -> bool {
    let Some(from) = keys.iter().position(|k| k == key) else {
        return false;
    };
    let moved = keys.remove(from);
    let target = to_index.min(keys.len());
    keys.insert(target, moved);
    true
}
