//! High-level library operations over a Shelfwise SQLite file.

use crate::core::annotation::validate_rating;
use crate::core::book::{normalize_cover_url, normalize_title};
use crate::core::merge::merge_imported;
use crate::core::order::{apply_custom_order, move_key};
use crate::core::query::run_query;
use crate::{
    Annotation, AnnotationEntry, Book, BookPage, BookQuery, BookSource, BookUpdate, BookView,
    Bookshelf, DeleteResult, ImportSummary, NewBook, NewBookshelf, Operation, OperationLog,
    OperationSummary, OrderScope, ReadStatus, Result, ShelfError, Storage,
};
use rusqlite::{Connection, OptionalExtension, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use uuid::Uuid;

const BOOK_COLUMNS: &str =
    "key, title, author, acquired_at, status, cover_url, source, created_at, modified_at";

/// Aggregate counts shown on the library overview.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
    pub total: usize,
    pub unread: usize,
    pub reading: usize,
    pub read: usize,
    pub manual: usize,
    pub imported: usize,
    pub bookshelves: usize,
    pub rated: usize,
    /// Mean rating over rated books, or `None` when nothing is rated.
    pub average_rating: Option<f64>,
}

/// An open Shelfwise library backed by a SQLite database.
///
/// `Library` is the record store: every mutation of books, bookshelves,
/// annotations and custom orders goes through its methods, runs in a single
/// transaction, and is recorded in the [`OperationLog`].
pub struct Library {
    storage: Storage,
    operation_log: OperationLog,
}

impl Library {
    /// Creates a new library file at `path` and records its display name
    /// (e.g. `"My Books"` for `my-books.shelfwise`).
    ///
    /// # Errors
    ///
    /// Returns [`ShelfError::Database`] for any SQLite failure.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let storage = Storage::create(&path)?;

        let filename = path
            .as_ref()
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Library");
        storage.connection().execute(
            "INSERT INTO library_meta (key, value) VALUES ('name', ?)",
            [humanize(filename)],
        )?;
        log::info!("created library at {}", path.as_ref().display());

        Ok(Self {
            storage,
            operation_log: OperationLog::default(),
        })
    }

    /// Opens an existing library file.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfError::InvalidLibrary`] if the file is not a Shelfwise
    /// library, or [`ShelfError::Database`] for any SQLite failure.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let storage = Storage::open(&path)?;
        log::info!("opened library at {}", path.as_ref().display());
        Ok(Self {
            storage,
            operation_log: OperationLog::default(),
        })
    }

    /// Returns the underlying SQLite connection.
    pub fn connection(&self) -> &Connection {
        self.storage.connection()
    }

    /// Runs `f` in a transaction, then logs the operation it returns and commits.
    pub(crate) fn run_logged<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<(T, Operation)>,
    {
        let tx = self.storage.connection_mut().transaction()?;
        let (value, op) = f(&tx)?;
        self.operation_log.log(&tx, &op)?;
        self.operation_log.purge_if_needed(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Display name recorded when the library was created.
    pub fn name(&self) -> Result<String> {
        let name = self
            .connection()
            .query_row("SELECT value FROM library_meta WHERE key = 'name'", [], |row| {
                row.get::<_, Option<String>>(0)
            })
            .optional()?
            .flatten();
        Ok(name.unwrap_or_else(|| "Library".to_string()))
    }

    // ── Books ────────────────────────────────────────────────────────

    /// Fetches a single book by key.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfError::BookNotFound`] if no book has this key.
    pub fn get_book(&self, key: &str) -> Result<Book> {
        let row = self
            .connection()
            .query_row(
                &format!("SELECT {BOOK_COLUMNS} FROM books WHERE key = ?"),
                [key],
                map_book_row,
            )
            .optional()?
            .ok_or_else(|| ShelfError::BookNotFound(key.to_string()))?;
        book_from_row(row)
    }

    /// Returns every book in default order: oldest first, then insertion order.
    pub fn list_books(&self) -> Result<Vec<Book>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {BOOK_COLUMNS} FROM books ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt
            .query_map([], map_book_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(book_from_row).collect()
    }

    pub fn count_books(&self) -> Result<usize> {
        let count: i64 = self
            .connection()
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Adds a book entered by hand.
    ///
    /// A `manual-<uuid>` key is generated when `input.key` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfError::ValidationFailed`] for a blank title, or
    /// [`ShelfError::DuplicateKey`] if the key is already taken.
    pub fn add_book(&mut self, input: NewBook) -> Result<Book> {
        let title = normalize_title(&input.title)?;
        let key = match input.key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            Some(k) => k.to_string(),
            None => format!("manual-{}", Uuid::new_v4()),
        };
        if book_exists(self.connection(), &key)? {
            return Err(ShelfError::DuplicateKey(key));
        }

        let now = chrono::Utc::now().timestamp();
        let book = Book {
            key,
            title,
            author: input.author.trim().to_string(),
            acquired_at: input.acquired_at,
            status: input.status,
            cover_url: normalize_cover_url(input.cover_url),
            source: BookSource::Manual,
            created_at: now,
            modified_at: now,
        };

        self.run_logged(|tx| {
            insert_book(tx, &book)?;
            let op = Operation::AddBook {
                operation_id: Uuid::new_v4().to_string(),
                timestamp: now,
                book_key: book.key.clone(),
                title: book.title.clone(),
            };
            Ok(((), op))
        })?;

        log::info!("added book {}", book.key);
        Ok(book)
    }

    /// Replaces the editable fields of `key` and returns the stored book.
    pub fn update_book(&mut self, key: &str, update: BookUpdate) -> Result<Book> {
        if !book_exists(self.connection(), key)? {
            return Err(ShelfError::BookNotFound(key.to_string()));
        }
        let update = BookUpdate {
            title: normalize_title(&update.title)?,
            author: update.author.trim().to_string(),
            acquired_at: update.acquired_at,
            status: update.status,
            cover_url: normalize_cover_url(update.cover_url),
        };

        let now = chrono::Utc::now().timestamp();
        self.run_logged(|tx| {
            tx.execute(
                "UPDATE books SET title = ?, author = ?, acquired_at = ?, status = ?, cover_url = ?, modified_at = ?
                 WHERE key = ?",
                rusqlite::params![
                    update.title,
                    update.author,
                    update.acquired_at,
                    update.status.as_str(),
                    update.cover_url,
                    now,
                    key,
                ],
            )?;
            let op = Operation::UpdateBook {
                operation_id: Uuid::new_v4().to_string(),
                timestamp: now,
                book_key: key.to_string(),
                update,
            };
            Ok(((), op))
        })?;

        self.get_book(key)
    }

    /// Changes only the reading status of `key`.
    pub fn set_status(&mut self, key: &str, status: ReadStatus) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        self.run_logged(|tx| {
            let changed = tx.execute(
                "UPDATE books SET status = ?, modified_at = ? WHERE key = ?",
                rusqlite::params![status.as_str(), now, key],
            )?;
            if changed == 0 {
                return Err(ShelfError::BookNotFound(key.to_string()));
            }
            let op = Operation::SetStatus {
                operation_id: Uuid::new_v4().to_string(),
                timestamp: now,
                book_key: key.to_string(),
                status,
            };
            Ok(((), op))
        })
    }

    /// Deletes `key` together with its annotation, shelf memberships and
    /// custom-order entries, all in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfError::BookNotFound`] if no book has this key.
    pub fn delete_book(&mut self, key: &str) -> Result<DeleteResult> {
        if !book_exists(self.connection(), key)? {
            return Err(ShelfError::BookNotFound(key.to_string()));
        }
        let affected_shelf_ids = self.bookshelves_for_book(key)?;

        let now = chrono::Utc::now().timestamp();
        let had_annotation = self.run_logged(|tx| {
            tx.execute("DELETE FROM custom_orders WHERE book_key = ?", [key])?;
            tx.execute("DELETE FROM bookshelf_books WHERE book_key = ?", [key])?;
            let had_annotation =
                tx.execute("DELETE FROM annotations WHERE book_key = ?", [key])? > 0;
            tx.execute("DELETE FROM books WHERE key = ?", [key])?;

            let op = Operation::DeleteBook {
                operation_id: Uuid::new_v4().to_string(),
                timestamp: now,
                book_key: key.to_string(),
            };
            Ok((had_annotation, op))
        })?;

        log::info!("deleted book {key} (on {} shelves)", affected_shelf_ids.len());
        Ok(DeleteResult {
            book_key: key.to_string(),
            affected_shelf_ids,
            had_annotation,
        })
    }

    /// Removes every book, bookshelf, annotation and custom order.
    /// The activity log is kept.
    pub fn clear_library(&mut self) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        self.run_logged(|tx| {
            clear_all_in_tx(tx)?;
            let op = Operation::ClearLibrary {
                operation_id: Uuid::new_v4().to_string(),
                timestamp: now,
            };
            Ok(((), op))
        })?;
        log::warn!("library cleared");
        Ok(())
    }

    /// Merges `books` (e.g. from a Kindle export) into the library.
    ///
    /// Books whose key already exists are skipped so the user's edits are
    /// never overwritten; duplicates within `books` keep their first
    /// occurrence. Records with a blank title are skipped, and a zero
    /// `created_at` is replaced with the import time.
    pub fn import_books(&mut self, books: Vec<Book>) -> Result<ImportSummary> {
        let now = chrono::Utc::now().timestamp();
        let existing = self.book_keys()?;
        let outcome = merge_imported(&existing, books, now);
        let summary = ImportSummary::from(&outcome);

        self.run_logged(|tx| {
            for book in &outcome.added {
                insert_book(tx, book)?;
            }
            let op = Operation::ImportBooks {
                operation_id: Uuid::new_v4().to_string(),
                timestamp: now,
                added: summary.added,
                skipped: summary.skipped,
            };
            Ok(((), op))
        })?;

        log::info!(
            "import finished: {} added, {} skipped",
            summary.added,
            summary.skipped
        );
        Ok(summary)
    }

    pub(crate) fn book_keys(&self) -> Result<HashSet<String>> {
        let mut stmt = self.connection().prepare("SELECT key FROM books")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(keys)
    }

    // ── Bookshelves ──────────────────────────────────────────────────

    pub fn create_bookshelf(&mut self, input: NewBookshelf) -> Result<Bookshelf> {
        let input = input.normalized()?;
        let now = chrono::Utc::now().timestamp();
        let shelf = Bookshelf {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            icon: input.icon,
            description: input.description,
            book_keys: vec![],
            created_at: now,
        };

        self.run_logged(|tx| {
            insert_bookshelf(tx, &shelf)?;
            let op = Operation::CreateBookshelf {
                operation_id: Uuid::new_v4().to_string(),
                timestamp: now,
                shelf_id: shelf.id.clone(),
                name: shelf.name.clone(),
            };
            Ok(((), op))
        })?;
        Ok(shelf)
    }

    /// Fetches a bookshelf and its membership list.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfError::BookshelfNotFound`] if the ID is unknown.
    pub fn get_bookshelf(&self, id: &str) -> Result<Bookshelf> {
        let shelf = self
            .connection()
            .query_row(
                "SELECT id, name, icon, description, created_at FROM bookshelves WHERE id = ?",
                [id],
                map_shelf_row,
            )
            .optional()?
            .ok_or_else(|| ShelfError::BookshelfNotFound(id.to_string()))?;
        self.with_book_keys(shelf)
    }

    /// Returns all bookshelves in creation order.
    pub fn list_bookshelves(&self) -> Result<Vec<Bookshelf>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, name, icon, description, created_at FROM bookshelves
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let shelves = stmt
            .query_map([], map_shelf_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        shelves.into_iter().map(|s| self.with_book_keys(s)).collect()
    }

    fn with_book_keys(&self, mut shelf: Bookshelf) -> Result<Bookshelf> {
        let mut stmt = self.connection().prepare(
            "SELECT book_key FROM bookshelf_books WHERE shelf_id = ? ORDER BY position ASC",
        )?;
        shelf.book_keys = stmt
            .query_map([&shelf.id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(shelf)
    }

    /// Renames a bookshelf or changes its icon/description.
    pub fn update_bookshelf(&mut self, id: &str, input: NewBookshelf) -> Result<Bookshelf> {
        let input = input.normalized()?;
        let now = chrono::Utc::now().timestamp();
        self.run_logged(|tx| {
            let changed = tx.execute(
                "UPDATE bookshelves SET name = ?, icon = ?, description = ? WHERE id = ?",
                rusqlite::params![input.name, input.icon, input.description, id],
            )?;
            if changed == 0 {
                return Err(ShelfError::BookshelfNotFound(id.to_string()));
            }
            let op = Operation::UpdateBookshelf {
                operation_id: Uuid::new_v4().to_string(),
                timestamp: now,
                shelf_id: id.to_string(),
                name: input.name,
            };
            Ok(((), op))
        })?;
        self.get_bookshelf(id)
    }

    /// Deletes a bookshelf and its custom order. Its books stay in the library.
    pub fn delete_bookshelf(&mut self, id: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let scope = OrderScope::Shelf(id.to_string()).storage_key();
        self.run_logged(|tx| {
            tx.execute("DELETE FROM bookshelf_books WHERE shelf_id = ?", [id])?;
            tx.execute("DELETE FROM custom_orders WHERE scope = ?", [&scope])?;
            let removed = tx.execute("DELETE FROM bookshelves WHERE id = ?", [id])?;
            if removed == 0 {
                return Err(ShelfError::BookshelfNotFound(id.to_string()));
            }
            let op = Operation::DeleteBookshelf {
                operation_id: Uuid::new_v4().to_string(),
                timestamp: now,
                shelf_id: id.to_string(),
            };
            Ok(((), op))
        })?;
        log::info!("deleted bookshelf {id}");
        Ok(())
    }

    /// Puts `key` on bookshelf `id`. Returns `false` if it was already there.
    pub fn add_to_bookshelf(&mut self, id: &str, key: &str) -> Result<bool> {
        self.ensure_bookshelf(id)?;
        if !book_exists(self.connection(), key)? {
            return Err(ShelfError::BookNotFound(key.to_string()));
        }
        if self.is_on_bookshelf(id, key)? {
            return Ok(false);
        }

        let now = chrono::Utc::now().timestamp();
        self.run_logged(|tx| {
            tx.execute(
                "INSERT INTO bookshelf_books (shelf_id, book_key, position)
                 VALUES (?1, ?2, (SELECT COALESCE(MAX(position), -1) + 1 FROM bookshelf_books WHERE shelf_id = ?1))",
                rusqlite::params![id, key],
            )?;
            let op = Operation::ShelveBook {
                operation_id: Uuid::new_v4().to_string(),
                timestamp: now,
                shelf_id: id.to_string(),
                book_key: key.to_string(),
            };
            Ok(((), op))
        })?;
        Ok(true)
    }

    /// Takes `key` off bookshelf `id`, also dropping it from that shelf's
    /// custom order. Returns `false` if it was not on the shelf.
    pub fn remove_from_bookshelf(&mut self, id: &str, key: &str) -> Result<bool> {
        self.ensure_bookshelf(id)?;
        if !self.is_on_bookshelf(id, key)? {
            return Ok(false);
        }
        let now = chrono::Utc::now().timestamp();
        let scope = OrderScope::Shelf(id.to_string()).storage_key();
        self.run_logged(|tx| {
            tx.execute(
                "DELETE FROM bookshelf_books WHERE shelf_id = ? AND book_key = ?",
                rusqlite::params![id, key],
            )?;
            tx.execute(
                "DELETE FROM custom_orders WHERE scope = ? AND book_key = ?",
                rusqlite::params![scope, key],
            )?;
            let op = Operation::UnshelveBook {
                operation_id: Uuid::new_v4().to_string(),
                timestamp: now,
                shelf_id: id.to_string(),
                book_key: key.to_string(),
            };
            Ok(((), op))
        })?;
        Ok(true)
    }

    fn is_on_bookshelf(&self, id: &str, key: &str) -> Result<bool> {
        let count: i64 = self.connection().query_row(
            "SELECT COUNT(*) FROM bookshelf_books WHERE shelf_id = ? AND book_key = ?",
            rusqlite::params![id, key],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// IDs of the bookshelves holding `key`, in shelf creation order.
    pub fn bookshelves_for_book(&self, key: &str) -> Result<Vec<String>> {
        let mut stmt = self.connection().prepare(
            "SELECT bb.shelf_id FROM bookshelf_books bb
             JOIN bookshelves s ON s.id = bb.shelf_id
             WHERE bb.book_key = ?
             ORDER BY s.created_at ASC, s.rowid ASC",
        )?;
        let ids = stmt
            .query_map([key], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    fn ensure_bookshelf(&self, id: &str) -> Result<()> {
        let exists: bool = self.connection().query_row(
            "SELECT COUNT(*) FROM bookshelves WHERE id = ?",
            [id],
            |row| row.get::<_, i64>(0).map(|c| c > 0),
        )?;
        if !exists {
            return Err(ShelfError::BookshelfNotFound(id.to_string()));
        }
        Ok(())
    }

    // ── Annotations ──────────────────────────────────────────────────

    /// Returns the note and rating for `key`; an empty annotation if none is stored.
    pub fn get_annotation(&self, key: &str) -> Result<Annotation> {
        if !book_exists(self.connection(), key)? {
            return Err(ShelfError::BookNotFound(key.to_string()));
        }
        let annotation = self
            .connection()
            .query_row(
                "SELECT note, rating FROM annotations WHERE book_key = ?",
                [key],
                |row| {
                    Ok(Annotation {
                        note: row.get(0)?,
                        rating: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(annotation.unwrap_or_default())
    }

    /// Replaces the note on `key`, keeping its rating.
    pub fn set_note(&mut self, key: &str, note: &str) -> Result<Annotation> {
        let mut annotation = self.get_annotation(key)?;
        annotation.note = note.to_string();
        self.save_annotation(key, annotation)
    }

    /// Sets the 0–5 star rating on `key`, keeping its note.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfError::ValidationFailed`] if `rating` exceeds 5.
    pub fn set_rating(&mut self, key: &str, rating: u8) -> Result<Annotation> {
        validate_rating(rating)?;
        let mut annotation = self.get_annotation(key)?;
        annotation.rating = rating;
        self.save_annotation(key, annotation)
    }

    fn save_annotation(&mut self, key: &str, annotation: Annotation) -> Result<Annotation> {
        let now = chrono::Utc::now().timestamp();
        self.run_logged(|tx| {
            upsert_annotation(tx, key, &annotation, now)?;
            let op = Operation::Annotate {
                operation_id: Uuid::new_v4().to_string(),
                timestamp: now,
                book_key: key.to_string(),
                rating: annotation.rating,
            };
            Ok(((), op))
        })?;
        Ok(annotation)
    }

    /// Every stored annotation, in book order.
    pub fn list_annotations(&self) -> Result<Vec<AnnotationEntry>> {
        let mut stmt = self.connection().prepare(
            "SELECT a.book_key, a.note, a.rating FROM annotations a
             JOIN books b ON b.key = a.book_key
             ORDER BY b.created_at ASC, b.rowid ASC",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(AnnotationEntry {
                    book_key: row.get(0)?,
                    annotation: Annotation {
                        note: row.get(1)?,
                        rating: row.get(2)?,
                    },
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    // ── Custom order ─────────────────────────────────────────────────

    /// The stored custom order for `scope` (possibly empty).
    pub fn custom_order(&self, scope: &OrderScope) -> Result<Vec<String>> {
        let mut stmt = self.connection().prepare(
            "SELECT book_key FROM custom_orders WHERE scope = ? ORDER BY position ASC",
        )?;
        let keys = stmt
            .query_map([scope.storage_key()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keys)
    }

    /// Replaces the custom order of `scope`.
    ///
    /// Keys that are not books in the scope are dropped and repeated keys
    /// keep their first position. Returns the order actually stored.
    pub fn set_custom_order(&mut self, scope: &OrderScope, keys: Vec<String>) -> Result<Vec<String>> {
        let members: HashSet<String> = self.scope_books(scope)?.into_iter().map(|b| b.key).collect();
        let mut seen = HashSet::new();
        let keys: Vec<String> = keys
            .into_iter()
            .filter(|k| members.contains(k) && seen.insert(k.clone()))
            .collect();

        let now = chrono::Utc::now().timestamp();
        self.run_logged(|tx| {
            replace_custom_order(tx, scope, &keys)?;
            let op = Operation::Reorder {
                operation_id: Uuid::new_v4().to_string(),
                timestamp: now,
                scope: scope.clone(),
                keys: keys.clone(),
            };
            Ok(((), op))
        })?;
        Ok(keys)
    }

    /// Drops the custom order of `scope`, returning the view to default order.
    pub fn reset_custom_order(&mut self, scope: &OrderScope) -> Result<()> {
        self.set_custom_order(scope, vec![]).map(|_| ())
    }

    /// Books of `scope` in default order: all books for the library, or the
    /// shelf's membership order.
    pub fn scope_books(&self, scope: &OrderScope) -> Result<Vec<Book>> {
        match scope {
            OrderScope::Library => self.list_books(),
            OrderScope::Shelf(id) => {
                let shelf = self.get_bookshelf(id)?;
                shelf.book_keys.iter().map(|k| self.get_book(k)).collect()
            }
        }
    }

    /// Books of `scope` as displayed: custom order first, the rest after.
    pub fn ordered_books(&self, scope: &OrderScope) -> Result<Vec<Book>> {
        let order = self.custom_order(scope)?;
        Ok(apply_custom_order(self.scope_books(scope)?, &order))
    }

    /// Drag-and-drop: moves `key` to `to_index` within the displayed order of
    /// `scope` and stores the full resulting list. Returns the new order.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfError::BookNotFound`] if `key` is not in the scope.
    pub fn reorder_book(&mut self, scope: &OrderScope, key: &str, to_index: usize) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.ordered_books(scope)?.into_iter().map(|b| b.key).collect();
        if !move_key(&mut keys, key, to_index) {
            return Err(ShelfError::BookNotFound(key.to_string()));
        }
        self.set_custom_order(scope, keys)
    }

    pub(crate) fn all_custom_orders(&self) -> Result<Vec<(OrderScope, Vec<String>)>> {
        let mut stmt = self
            .connection()
            .prepare("SELECT DISTINCT scope FROM custom_orders ORDER BY scope")?;
        let scopes = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        scopes
            .iter()
            .filter_map(|s| OrderScope::from_storage_key(s))
            .map(|scope| {
                let keys = self.custom_order(&scope)?;
                Ok((scope, keys))
            })
            .collect()
    }

    // ── Views & stats ────────────────────────────────────────────────

    /// Runs a list query: filter, sort (or custom order) and paginate.
    ///
    /// With `shelf_id` set the base list is the shelf in membership order and
    /// [`SortKey::Custom`](crate::SortKey::Custom) uses the shelf's order;
    /// otherwise the whole library and its order are used.
    pub fn query_books(&self, query: &BookQuery) -> Result<BookPage> {
        let scope = match &query.shelf_id {
            Some(id) => OrderScope::Shelf(id.clone()),
            None => OrderScope::Library,
        };
        let books = self.scope_books(&scope)?;
        let order = self.custom_order(&scope)?;
        let views = self.views_for(books)?;
        Ok(run_query(views, query, &order))
    }

    /// The detail view of a single book.
    pub fn get_book_view(&self, key: &str) -> Result<BookView> {
        let book = self.get_book(key)?;
        Ok(BookView {
            annotation: self.get_annotation(key)?,
            shelf_ids: self.bookshelves_for_book(key)?,
            book,
        })
    }

    fn views_for(&self, books: Vec<Book>) -> Result<Vec<BookView>> {
        let mut annotations: HashMap<String, Annotation> = self
            .list_annotations()?
            .into_iter()
            .map(|e| (e.book_key, e.annotation))
            .collect();

        let mut shelves: HashMap<String, Vec<String>> = HashMap::new();
        {
            let mut stmt = self.connection().prepare(
                "SELECT bb.book_key, bb.shelf_id FROM bookshelf_books bb
                 JOIN bookshelves s ON s.id = bb.shelf_id
                 ORDER BY s.created_at ASC, s.rowid ASC",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for (key, shelf_id) in rows {
                shelves.entry(key).or_default().push(shelf_id);
            }
        }

        Ok(books
            .into_iter()
            .map(|book| BookView {
                annotation: annotations.remove(&book.key).unwrap_or_default(),
                shelf_ids: shelves.remove(&book.key).unwrap_or_default(),
                book,
            })
            .collect())
    }

    pub fn stats(&self) -> Result<LibraryStats> {
        let mut stats = LibraryStats::default();
        {
            let mut stmt = self.connection().prepare("SELECT status, source FROM books")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for (status, source) in rows {
                stats.total += 1;
                match ReadStatus::parse(&status) {
                    Some(ReadStatus::Unread) | None => stats.unread += 1,
                    Some(ReadStatus::Reading) => stats.reading += 1,
                    Some(ReadStatus::Read) => stats.read += 1,
                }
                match BookSource::parse(&source) {
                    Some(BookSource::Imported) => stats.imported += 1,
                    _ => stats.manual += 1,
                }
            }
        }

        let (rated, average): (i64, Option<f64>) = self.connection().query_row(
            "SELECT COUNT(*), AVG(rating) FROM annotations WHERE rating > 0",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        stats.rated = rated as usize;
        stats.average_rating = average;

        let shelves: i64 = self
            .connection()
            .query_row("SELECT COUNT(*) FROM bookshelves", [], |row| row.get(0))?;
        stats.bookshelves = shelves as usize;
        Ok(stats)
    }

    // ── Activity log ─────────────────────────────────────────────────

    /// Returns up to `limit` activity entries, newest first.
    pub fn list_operations(&self, limit: usize) -> Result<Vec<OperationSummary>> {
        self.operation_log.list(self.connection(), limit)
    }

    /// Deletes all operations from the log. Returns the number deleted.
    pub fn purge_all_operations(&self) -> Result<usize> {
        self.operation_log.purge_all(self.connection())
    }
}

type BookRow = (String, String, String, Option<i64>, String, Option<String>, String, i64, i64);

fn map_book_row(row: &rusqlite::Row) -> rusqlite::Result<BookRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn book_from_row(row: BookRow) -> Result<Book> {
    let (key, title, author, acquired_at, status, cover_url, source, created_at, modified_at) = row;
    let status = ReadStatus::parse(&status)
        .ok_or_else(|| ShelfError::InvalidLibrary(format!("unknown read status '{status}' on {key}")))?;
    let source = BookSource::parse(&source)
        .ok_or_else(|| ShelfError::InvalidLibrary(format!("unknown source '{source}' on {key}")))?;
    Ok(Book {
        key,
        title,
        author,
        acquired_at,
        status,
        cover_url,
        source,
        created_at,
        modified_at,
    })
}

fn map_shelf_row(row: &rusqlite::Row) -> rusqlite::Result<Bookshelf> {
    Ok(Bookshelf {
        id: row.get(0)?,
        name: row.get(1)?,
        icon: row.get(2)?,
        description: row.get(3)?,
        book_keys: vec![],
        created_at: row.get(4)?,
    })
}

fn book_exists(conn: &Connection, key: &str) -> Result<bool> {
    Ok(conn.query_row("SELECT COUNT(*) FROM books WHERE key = ?", [key], |row| {
        row.get::<_, i64>(0).map(|c| c > 0)
    })?)
}

pub(crate) fn insert_book(tx: &Transaction, book: &Book) -> Result<()> {
    tx.execute(
        &format!("INSERT INTO books ({BOOK_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"),
        rusqlite::params![
            book.key,
            book.title,
            book.author,
            book.acquired_at,
            book.status.as_str(),
            book.cover_url,
            book.source.as_str(),
            book.created_at,
            book.modified_at,
        ],
    )?;
    Ok(())
}

/// Inserts the shelf row and its membership list. Keys that are not books
/// are skipped.
pub(crate) fn insert_bookshelf(tx: &Transaction, shelf: &Bookshelf) -> Result<()> {
    tx.execute(
        "INSERT INTO bookshelves (id, name, icon, description, created_at) VALUES (?, ?, ?, ?, ?)",
        rusqlite::params![shelf.id, shelf.name, shelf.icon, shelf.description, shelf.created_at],
    )?;
    for (position, key) in shelf.book_keys.iter().enumerate() {
        tx.execute(
            "INSERT OR IGNORE INTO bookshelf_books (shelf_id, book_key, position)
             SELECT ?1, key, ?3 FROM books WHERE key = ?2",
            rusqlite::params![shelf.id, key, position as i64],
        )?;
    }
    Ok(())
}

pub(crate) fn upsert_annotation(tx: &Transaction, key: &str, annotation: &Annotation, now: i64) -> Result<()> {
    if annotation.is_empty() {
        tx.execute("DELETE FROM annotations WHERE book_key = ?", [key])?;
    } else {
        tx.execute(
            "INSERT INTO annotations (book_key, note, rating, modified_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(book_key) DO UPDATE SET note = ?2, rating = ?3, modified_at = ?4",
            rusqlite::params![key, annotation.note, annotation.rating, now],
        )?;
    }
    Ok(())
}

/// Books stored on shelf `id`, as seen inside `tx`.
pub(crate) fn shelf_members_in_tx(tx: &Transaction, id: &str) -> Result<HashSet<String>> {
    let mut stmt = tx.prepare("SELECT book_key FROM bookshelf_books WHERE shelf_id = ?")?;
    let keys = stmt
        .query_map([id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<HashSet<_>>>()?;
    Ok(keys)
}

pub(crate) fn replace_custom_order(tx: &Transaction, scope: &OrderScope, keys: &[String]) -> Result<()> {
    let scope_key = scope.storage_key();
    tx.execute("DELETE FROM custom_orders WHERE scope = ?", [&scope_key])?;
    for (position, key) in keys.iter().enumerate() {
        tx.execute(
            "INSERT OR IGNORE INTO custom_orders (scope, book_key, position) VALUES (?, ?, ?)",
            rusqlite::params![scope_key, key, position as i64],
        )?;
    }
    Ok(())
}

pub(crate) fn clear_all_in_tx(tx: &Transaction) -> Result<()> {
    tx.execute_batch(
        "DELETE FROM custom_orders;
         DELETE FROM bookshelf_books;
         DELETE FROM annotations;
         DELETE FROM bookshelves;
         DELETE FROM books;",
    )?;
    Ok(())
}

/// Turns a file stem like `my-books` into a display name like `My Books`.
fn humanize(filename: &str) -> String {
    filename
        .split(|c| c == '-' || c == '_')
        .filter(|s| !s.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
