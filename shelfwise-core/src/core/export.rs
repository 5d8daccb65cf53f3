//! Library export and import as a single JSON document.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::annotation::MAX_RATING;
use crate::core::library::{
    clear_all_in_tx, insert_book, insert_bookshelf, replace_custom_order, shelf_members_in_tx,
    upsert_annotation,
};
use crate::{
    merge_imported, AnnotationEntry, Book, Bookshelf, CustomOrder, Library, Operation, OrderScope,
    ShelfError,
};

/// Format version written by this build.
pub const EXPORT_VERSION: u32 = 1;

/// Top-level JSON structure of an exported library.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportLibrary {
    pub version: u32,
    #[serde(default)]
    pub app_version: String,
    #[serde(default)]
    pub exported_at: i64,
    #[serde(default)]
    pub books: Vec<Book>,
    #[serde(default)]
    pub bookshelves: Vec<Bookshelf>,
    #[serde(default)]
    pub annotations: Vec<AnnotationEntry>,
    #[serde(default)]
    pub custom_orders: Vec<CustomOrder>,
}

/// How an imported document combines with the open library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportMode {
    /// Keep existing data; add only what is new.
    #[default]
    Merge,
    /// Clear the library first, then load the document.
    Replace,
}

/// Result returned after reading an export document's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub app_version: String,
    pub exported_at: i64,
    pub book_count: usize,
    pub bookshelf_count: usize,
    pub annotation_count: usize,
    pub custom_order_count: usize,
}

/// What [`import_library`] actually applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub books_added: usize,
    pub books_skipped: usize,
    pub bookshelves_added: usize,
    pub bookshelves_skipped: usize,
    pub annotations_applied: usize,
    pub custom_orders_applied: usize,
}

/// Errors specific to export/import operations.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid export format: {0}")]
    InvalidFormat(String),

    #[error(transparent)]
    Library(#[from] ShelfError),
}

impl ExportError {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Library(e) => e.user_message(),
            Self::Json(_) => "This file is not a Shelfwise export".to_string(),
            other => other.to_string(),
        }
    }
}

/// Serializes the whole library to `writer` as pretty-printed JSON.
pub fn export_library<W: Write>(library: &Library, writer: W) -> Result<(), ExportError> {
    let doc = ExportLibrary {
        version: EXPORT_VERSION,
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        exported_at: chrono::Utc::now().timestamp(),
        books: library.list_books()?,
        bookshelves: library.list_bookshelves()?,
        annotations: library.list_annotations()?,
        custom_orders: library
            .all_custom_orders()?
            .into_iter()
            .map(|(scope, keys)| CustomOrder { scope, keys })
            .collect(),
    };
    serde_json::to_writer_pretty(writer, &doc)?;
    log::info!(
        "exported {} books and {} bookshelves",
        doc.books.len(),
        doc.bookshelves.len()
    );
    Ok(())
}

pub fn export_library_to_file<P: AsRef<Path>>(library: &Library, path: P) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(File::create(path)?);
    export_library(library, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Reads and validates a document, returning its counts without touching
/// any library.
pub fn peek_import<R: Read>(reader: R) -> Result<ImportResult, ExportError> {
    let doc = read_document(reader)?;
    Ok(ImportResult {
        app_version: doc.app_version,
        exported_at: doc.exported_at,
        book_count: doc.books.len(),
        bookshelf_count: doc.bookshelves.len(),
        annotation_count: doc.annotations.len(),
        custom_order_count: doc.custom_orders.len(),
    })
}

pub fn peek_import_file<P: AsRef<Path>>(path: P) -> Result<ImportResult, ExportError> {
    peek_import(BufReader::new(File::open(path)?))
}

/// Loads a document into `library` in one transaction.
///
/// In [`ImportMode::Replace`] the library is cleared first. In
/// [`ImportMode::Merge`] existing books, bookshelves, annotations and custom
/// orders always win over the document's.
///
/// # Errors
///
/// Returns [`ExportError::InvalidFormat`] for an unsupported version or an
/// out-of-range rating; nothing is written in that case.
pub fn import_library<R: Read>(
    reader: R,
    library: &mut Library,
    mode: ImportMode,
) -> Result<ImportReport, ExportError> {
    let doc = read_document(reader)?;

    let (existing_keys, existing_shelves, existing_annotations, existing_scopes) = match mode {
        ImportMode::Replace => Default::default(),
        ImportMode::Merge => (
            library.book_keys()?,
            library
                .list_bookshelves()?
                .into_iter()
                .map(|s| s.id)
                .collect::<HashSet<_>>(),
            library
                .list_annotations()?
                .into_iter()
                .map(|e| e.book_key)
                .collect::<HashSet<_>>(),
            library
                .all_custom_orders()?
                .into_iter()
                .map(|(scope, _)| scope)
                .collect::<HashSet<_>>(),
        ),
    };

    let now = chrono::Utc::now().timestamp();
    let outcome = merge_imported(&existing_keys, doc.books, now);
    let mut book_keys = existing_keys;
    book_keys.extend(outcome.added.iter().map(|b| b.key.clone()));

    let mut report = ImportReport {
        books_added: outcome.added.len(),
        books_skipped: outcome.skipped.len(),
        ..Default::default()
    };

    let report = library.run_logged(|tx| {
        if mode == ImportMode::Replace {
            clear_all_in_tx(tx)?;
        }
        for book in &outcome.added {
            insert_book(tx, book)?;
        }

        let mut shelf_ids = existing_shelves;
        for shelf in &doc.bookshelves {
            if shelf.id.trim().is_empty() || shelf.name.trim().is_empty() || !shelf_ids.insert(shelf.id.clone()) {
                report.bookshelves_skipped += 1;
                continue;
            }
            insert_bookshelf(tx, shelf)?;
            report.bookshelves_added += 1;
        }

        let mut annotated = existing_annotations;
        for entry in &doc.annotations {
            if !book_keys.contains(&entry.book_key) || !annotated.insert(entry.book_key.clone()) {
                continue;
            }
            if !entry.annotation.is_empty() {
                upsert_annotation(tx, &entry.book_key, &entry.annotation, now)?;
                report.annotations_applied += 1;
            }
        }

        let mut ordered = existing_scopes;
        for order in &doc.custom_orders {
            let scope_known = match &order.scope {
                OrderScope::Library => true,
                OrderScope::Shelf(id) => shelf_ids.contains(id),
            };
            if !scope_known || !ordered.insert(order.scope.clone()) {
                continue;
            }
            let members = match &order.scope {
                OrderScope::Library => None,
                OrderScope::Shelf(id) => Some(shelf_members_in_tx(tx, id)?),
            };
            let in_scope = |k: &str| match &members {
                Some(members) => members.contains(k),
                None => book_keys.contains(k),
            };
            let mut seen = HashSet::new();
            let keys: Vec<String> = order
                .keys
                .iter()
                .filter(|k| in_scope(k.as_str()) && seen.insert(k.as_str()))
                .cloned()
                .collect();
            replace_custom_order(tx, &order.scope, &keys)?;
            report.custom_orders_applied += 1;
        }

        let op = Operation::ImportBooks {
            operation_id: Uuid::new_v4().to_string(),
            timestamp: now,
            added: report.books_added,
            skipped: report.books_skipped,
        };
        Ok((report, op))
    })?;

    log::info!(
        "library import ({mode:?}): {} books added, {} skipped, {} bookshelves added",
        report.books_added,
        report.books_skipped,
        report.bookshelves_added
    );
    Ok(report)
}

pub fn import_library_file<P: AsRef<Path>>(
    path: P,
    library: &mut Library,
    mode: ImportMode,
) -> Result<ImportReport, ExportError> {
    import_library(BufReader::new(File::open(path)?), library, mode)
}

fn read_document<R: Read>(reader: R) -> Result<ExportLibrary, ExportError> {
    let doc: ExportLibrary = serde_json::from_reader(reader)?;
    if doc.version != EXPORT_VERSION {
        return Err(ExportError::InvalidFormat(format!(
            "unsupported export version {}",
            doc.version
        )));
    }
    if let Some(entry) = doc.annotations.iter().find(|e| e.annotation.rating > MAX_RATING) {
        return Err(ExportError::InvalidFormat(format!(
            "rating {} on {} is out of range",
            entry.annotation.rating, entry.book_key
        )));
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Annotation, BookSource, NewBook, NewBookshelf, ReadStatus};
    use tempfile::NamedTempFile;

    fn new_library() -> (Library, NamedTempFile) {
        let temp = NamedTempFile::new().unwrap();
        let lib = Library::create(temp.path()).unwrap();
        (lib, temp)
    }

    fn add(lib: &mut Library, key: &str, title: &str) {
        lib.add_book(NewBook {
            key: Some(key.to_string()),
            title: title.to_string(),
            ..Default::default()
        })
        .unwrap();
    }

    fn export_to_vec(lib: &Library) -> Vec<u8> {
        let mut buf = Vec::new();
        export_library(lib, &mut buf).unwrap();
        buf
    }

    /// Library with two books, one shelf holding "b", a rating on "a" and a
    /// library order of b, a.
    fn populated() -> (Library, NamedTempFile, String) {
        let (mut lib, temp) = new_library();
        add(&mut lib, "a", "Alpha");
        add(&mut lib, "b", "Beta");
        let shelf = lib
            .create_bookshelf(NewBookshelf { name: "Faves".to_string(), ..Default::default() })
            .unwrap();
        lib.add_to_bookshelf(&shelf.id, "b").unwrap();
        lib.set_rating("a", 4).unwrap();
        lib.reorder_book(&OrderScope::Library, "b", 0).unwrap();
        (lib, temp, shelf.id)
    }

    #[test]
    fn test_export_document_shape() {
        let (lib, _temp, _) = populated();
        let json: serde_json::Value = serde_json::from_slice(&export_to_vec(&lib)).unwrap();
        assert_eq!(json["version"], 1);
        assert!(json["appVersion"].is_string());
        assert_eq!(json["books"].as_array().unwrap().len(), 2);
        assert_eq!(json["bookshelves"][0]["bookKeys"][0], "b");
        assert_eq!(json["annotations"][0]["bookKey"], "a");
        assert_eq!(json["annotations"][0]["rating"], 4);
        assert_eq!(json["customOrders"][0]["scope"]["type"], "library");
    }

    #[test]
    fn test_peek_import_counts() {
        let (lib, _temp, _) = populated();
        let result = peek_import(export_to_vec(&lib).as_slice()).unwrap();
        assert_eq!(result.book_count, 2);
        assert_eq!(result.bookshelf_count, 1);
        assert_eq!(result.annotation_count, 1);
        assert_eq!(result.custom_order_count, 1);
        assert_eq!(result.app_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_replace_import_restores_everything() {
        let (source, _t1, shelf_id) = populated();
        let data = export_to_vec(&source);

        let (mut target, _t2) = new_library();
        add(&mut target, "old", "Stale");
        let report = import_library(data.as_slice(), &mut target, ImportMode::Replace).unwrap();
        assert_eq!(report.books_added, 2);
        assert_eq!(report.bookshelves_added, 1);

        assert!(target.get_book("old").is_err());
        assert_eq!(target.list_books().unwrap(), source.list_books().unwrap());
        assert_eq!(target.get_bookshelf(&shelf_id).unwrap().book_keys, vec!["b".to_string()]);
        assert_eq!(target.get_annotation("a").unwrap().rating, 4);
        assert_eq!(
            target.custom_order(&OrderScope::Library).unwrap(),
            vec!["b".to_string(), "a".to_string()]
        );
    }

    #[test]
    fn test_merge_import_keeps_existing_data() {
        let (source, _t1, shelf_id) = populated();
        let data = export_to_vec(&source);

        let (mut target, _t2) = new_library();
        add(&mut target, "a", "My Alpha");
        target.set_note("a", "mine").unwrap();
        target
            .set_custom_order(&OrderScope::Library, vec!["a".to_string()])
            .unwrap();

        let report = import_library(data.as_slice(), &mut target, ImportMode::Merge).unwrap();
        assert_eq!(report.books_added, 1);
        assert_eq!(report.books_skipped, 1);
        assert_eq!(report.annotations_applied, 0);
        assert_eq!(report.custom_orders_applied, 0);

        assert_eq!(target.get_book("a").unwrap().title, "My Alpha");
        assert_eq!(target.get_annotation("a").unwrap(), Annotation { note: "mine".to_string(), rating: 0 });
        assert_eq!(target.custom_order(&OrderScope::Library).unwrap(), vec!["a".to_string()]);
        assert_eq!(target.get_bookshelf(&shelf_id).unwrap().book_keys, vec!["b".to_string()]);
    }

    #[test]
    fn test_merge_import_twice_skips_shelves() {
        let (source, _t1, _) = populated();
        let data = export_to_vec(&source);
        let (mut target, _t2) = new_library();

        import_library(data.as_slice(), &mut target, ImportMode::Merge).unwrap();
        let second = import_library(data.as_slice(), &mut target, ImportMode::Merge).unwrap();
        assert_eq!(second.books_added, 0);
        assert_eq!(second.bookshelves_added, 0);
        assert_eq!(second.bookshelves_skipped, 1);
        assert_eq!(target.list_bookshelves().unwrap().len(), 1);
    }

    #[test]
    fn test_import_drops_dangling_references() {
        let doc = serde_json::json!({
            "version": 1,
            "books": [{
                "key": "k1", "title": "One", "author": "", "status": "read",
                "source": "imported", "createdAt": 10
            }],
            "bookshelves": [{ "id": "s1", "name": "S", "bookKeys": ["ghost", "k1"], "createdAt": 11 }],
            "annotations": [
                { "bookKey": "ghost", "note": "x", "rating": 2 },
                { "bookKey": "k1", "note": "", "rating": 3 }
            ],
            "customOrders": [
                { "scope": { "type": "shelf", "id": "missing" }, "keys": ["k1"] },
                { "scope": { "type": "library" }, "keys": ["ghost", "k1", "k1"] }
            ]
        });
        let data = serde_json::to_vec(&doc).unwrap();
        let (mut lib, _temp) = new_library();

        let report = import_library(data.as_slice(), &mut lib, ImportMode::Replace).unwrap();
        assert_eq!(report.annotations_applied, 1);
        assert_eq!(report.custom_orders_applied, 1);

        let book = lib.get_book("k1").unwrap();
        assert_eq!(book.status, ReadStatus::Read);
        assert_eq!(book.source, BookSource::Imported);
        assert_eq!(lib.get_bookshelf("s1").unwrap().book_keys, vec!["k1".to_string()]);
        assert_eq!(lib.custom_order(&OrderScope::Library).unwrap(), vec!["k1".to_string()]);
        assert!(lib.custom_order(&OrderScope::Shelf("missing".to_string())).unwrap().is_empty());
    }

    #[test]
    fn test_import_validates_book_records() {
        let doc = serde_json::json!({
            "version": 1,
            "books": [
                { "key": "blank", "title": "   ", "author": "", "source": "imported", "createdAt": 0 },
                { "key": "ok", "title": "  Middlemarch ", "author": " Eliot ", "source": "imported", "createdAt": 0 }
            ]
        });
        let data = serde_json::to_vec(&doc).unwrap();
        let (mut lib, _temp) = new_library();

        let report = import_library(data.as_slice(), &mut lib, ImportMode::Merge).unwrap();
        assert_eq!(report.books_added, 1);
        assert_eq!(report.books_skipped, 1);
        assert!(lib.get_book("blank").is_err());

        let book = lib.get_book("ok").unwrap();
        assert_eq!(book.title, "Middlemarch");
        assert_eq!(book.author, "Eliot");
        assert!(book.created_at > 0);
        assert_eq!(book.modified_at, book.created_at);
    }

    #[test]
    fn test_shelf_order_is_limited_to_shelf_members() {
        let book = |key: &str| {
            serde_json::json!({ "key": key, "title": key, "author": "", "source": "manual", "createdAt": 1 })
        };
        let doc = serde_json::json!({
            "version": 1,
            "books": [book("a"), book("b"), book("c")],
            "bookshelves": [{ "id": "s1", "name": "S", "bookKeys": ["a", "c"], "createdAt": 2 }],
            "customOrders": [
                { "scope": { "type": "shelf", "id": "s1" }, "keys": ["b", "c", "a"] }
            ]
        });
        let data = serde_json::to_vec(&doc).unwrap();
        let (mut lib, _temp) = new_library();
        import_library(data.as_slice(), &mut lib, ImportMode::Replace).unwrap();

        let scope = OrderScope::Shelf("s1".to_string());
        assert_eq!(lib.custom_order(&scope).unwrap(), vec!["c".to_string(), "a".to_string()]);

        lib.add_to_bookshelf("s1", "b").unwrap();
        let keys: Vec<String> = lib.ordered_books(&scope).unwrap().into_iter().map(|b| b.key).collect();
        assert_eq!(keys, vec!["c".to_string(), "a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_unsupported_version() {
        let data = br#"{"version": 2, "books": []}"#;
        let (mut lib, _temp) = new_library();
        let err = import_library(&data[..], &mut lib, ImportMode::Replace).unwrap_err();
        assert!(matches!(err, ExportError::InvalidFormat(_)));
        assert!(matches!(peek_import(&data[..]), Err(ExportError::InvalidFormat(_))));
    }

    #[test]
    fn test_out_of_range_rating_writes_nothing() {
        let (mut lib, _temp) = new_library();
        add(&mut lib, "keep", "Keep me");
        let data = br#"{"version": 1, "annotations": [{"bookKey": "keep", "note": "", "rating": 9}]}"#;
        let err = import_library(&data[..], &mut lib, ImportMode::Replace).unwrap_err();
        assert!(matches!(err, ExportError::InvalidFormat(_)));
        assert!(lib.get_book("keep").is_ok());
    }

    #[test]
    fn test_garbage_input() {
        let err = peek_import(&b"not json"[..]).unwrap_err();
        assert!(matches!(err, ExportError::Json(_)));
        assert_eq!(err.user_message(), "This file is not a Shelfwise export");
    }

    #[test]
    fn test_file_round_trip_and_logging() {
        let (source, _t1, _) = populated();
        let out = NamedTempFile::new().unwrap();
        export_library_to_file(&source, out.path()).unwrap();
        assert_eq!(peek_import_file(out.path()).unwrap().book_count, 2);

        let (mut target, _t2) = new_library();
        import_library_file(out.path(), &mut target, ImportMode::Merge).unwrap();
        assert_eq!(target.count_books().unwrap(), 2);
        let ops = target.list_operations(1).unwrap();
        assert_eq!(ops[0].operation_type, "ImportBooks");
    }

    #[test]
    fn test_import_mode_serialization() {
        assert_eq!(serde_json::to_string(&ImportMode::Replace).unwrap(), "\"Replace\"");
        let mode: ImportMode = serde_json::from_str("\"Merge\"").unwrap();
        assert_eq!(mode, ImportMode::Merge);
    }
}
