//! Internal domain modules for the Shelfwise core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod annotation;
pub mod book;
pub mod bookshelf;
pub mod delete;
pub mod error;
pub mod export;
pub mod kindle;
pub mod library;
pub mod merge;
pub mod operation;
pub mod operation_log;
pub mod order;
pub mod query;
pub mod storage;

#[doc(inline)]
pub use annotation::{Annotation, AnnotationEntry, MAX_RATING};
#[doc(inline)]
pub use book::{Book, BookSource, BookUpdate, NewBook, ReadStatus};
#[doc(inline)]
pub use bookshelf::{Bookshelf, NewBookshelf};
#[doc(inline)]
pub use delete::DeleteResult;
#[doc(inline)]
pub use error::{Result, ShelfError};
#[doc(inline)]
pub use export::{
    export_library, export_library_to_file, import_library, import_library_file, peek_import,
    peek_import_file, ExportError, ExportLibrary, ImportMode, ImportReport, ImportResult,
    EXPORT_VERSION,
};
#[doc(inline)]
pub use kindle::{import_kindle_file, parse_kindle_export};
#[doc(inline)]
pub use library::{Library, LibraryStats};
#[doc(inline)]
pub use merge::{merge_imported, merge_records, ImportSummary, MergeOutcome};
#[doc(inline)]
pub use operation::Operation;
#[doc(inline)]
pub use operation_log::{OperationLog, OperationSummary};
#[doc(inline)]
pub use order::{apply_custom_order, move_key, CustomOrder, OrderScope};
#[doc(inline)]
pub use query::{BookPage, BookQuery, BookView, SortDirection, SortKey};
#[doc(inline)]
pub use storage::Storage;
