//! Deduplicated merge of incoming book records into an existing collection.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::core::book::{normalize_cover_url, normalize_title};
use crate::Book;

/// Result of [`merge_records`]: the records to insert and the keys turned away.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// New records, in incoming order.
    pub added: Vec<Book>,
    /// Keys that were already present, repeated within the batch, or blank.
    pub skipped: Vec<String>,
}

/// Counts reported to the user after an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub added: usize,
    pub skipped: usize,
    /// Keys of the newly added books.
    pub added_keys: Vec<String>,
}

impl From<&MergeOutcome> for ImportSummary {
    fn from(outcome: &MergeOutcome) -> Self {
        Self {
            added: outcome.added.len(),
            skipped: outcome.skipped.len(),
            added_keys: outcome.added.iter().map(|b| b.key.clone()).collect(),
        }
    }
}

/// Splits `incoming` into records to add and keys to skip.
///
/// Existing records always win, so a re-import never overwrites the user's
/// edits. Within `incoming` the first occurrence of a key wins. Keys are
/// compared after trimming; the added records carry the trimmed key.
pub fn merge_records<I>(existing_keys: &HashSet<String>, incoming: I) -> MergeOutcome
where
    I: IntoIterator<Item = Book>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut outcome = MergeOutcome::default();

    for mut book in incoming {
        let key = book.key.trim().to_string();
        if key.is_empty() || existing_keys.contains(&key) || !seen.insert(key.clone()) {
            outcome.skipped.push(key);
            continue;
        }
        book.key = key;
        outcome.added.push(book);
    }
    outcome
}

/// [`merge_records`] for records read from an outside source.
///
/// Each record is normalized the way a hand-entered book is: the title is
/// trimmed and must not be blank, the author and cover URL are trimmed. A
/// record with a blank title is skipped. Zero timestamps are stamped with
/// `now`.
pub fn merge_imported<I>(existing_keys: &HashSet<String>, incoming: I, now: i64) -> MergeOutcome
where
    I: IntoIterator<Item = Book>,
{
    let mut rejected = Vec::new();
    let valid: Vec<Book> = incoming
        .into_iter()
        .filter_map(|mut book| match normalize_title(&book.title) {
            Ok(title) => {
                book.title = title;
                book.author = book.author.trim().to_string();
                book.cover_url = normalize_cover_url(book.cover_url.take());
                if book.created_at == 0 {
                    book.created_at = now;
                }
                if book.modified_at == 0 {
                    book.modified_at = book.created_at;
                }
                Some(book)
            }
            Err(_) => {
                log::warn!("skipping import record {:?}: blank title", book.key);
                rejected.push(book.key.trim().to_string());
                None
            }
        })
        .collect();

    let mut outcome = merge_records(existing_keys, valid);
    outcome.skipped.extend(rejected);
    outcome
}
