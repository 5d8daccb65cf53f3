//! Core library for Shelfwise, a local personal book library manager.
//!
//! The primary entry point is [`Library`], which represents an open
//! `.shelfwise` database file. All mutations of books, bookshelves,
//! annotations and custom orders go through `Library` methods.
//!
//! Books arrive either by hand ([`Library::add_book`]) or from a Kindle
//! library export ([`parse_kindle_export`] followed by
//! [`Library::import_books`]). The whole dataset can be moved between
//! machines with [`export_library`] and [`import_library`].
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    annotation::{Annotation, AnnotationEntry, MAX_RATING},
    book::{Book, BookSource, BookUpdate, NewBook, ReadStatus},
    bookshelf::{Bookshelf, NewBookshelf},
    delete::DeleteResult,
    error::{Result, ShelfError},
    export::{
        export_library, export_library_to_file, import_library, import_library_file, peek_import,
        peek_import_file, ExportError, ExportLibrary, ImportMode, ImportReport, ImportResult,
        EXPORT_VERSION,
    },
    kindle::{import_kindle_file, parse_kindle_export},
    library::{Library, LibraryStats},
    merge::{merge_imported, merge_records, ImportSummary, MergeOutcome},
    operation::Operation,
    operation_log::{OperationLog, OperationSummary},
    order::{apply_custom_order, move_key, CustomOrder, OrderScope},
    query::{BookPage, BookQuery, BookView, SortDirection, SortKey},
    storage::Storage,
};
