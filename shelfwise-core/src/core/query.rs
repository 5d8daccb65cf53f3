//! Filtering, sorting and pagination for the book list views.
//!
//! Everything here is pure: [`Library::query_books`](super::library::Library::query_books)
//! gathers [`BookView`]s and the relevant custom order, then hands them to
//! [`run_query`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::core::order::apply_custom_order_by;
use crate::{Annotation, Book, BookSource, ReadStatus};

/// What the UI renders for one book: the record plus its annotation and shelves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookView {
    #[serde(flatten)]
    pub book: Book,
    pub annotation: Annotation,
    pub shelf_ids: Vec<String>,
}

/// Sort column for the book list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    /// The drag-and-drop order of the current view.
    #[default]
    Custom,
    Title,
    Author,
    Acquired,
    Added,
    Rating,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Filters, sort and page requested by the book list.
///
/// All fields are optional over IPC; `page` is 1-based and a `page_size` of
/// 0 returns every match on a single page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookQuery {
    pub search: Option<String>,
    pub status: Option<ReadStatus>,
    pub source: Option<BookSource>,
    pub shelf_id: Option<String>,
    pub min_rating: Option<u8>,
    pub sort: SortKey,
    pub direction: SortDirection,
    pub page: usize,
    pub page_size: usize,
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPage {
    pub items: Vec<BookView>,
    /// Number of books matching the filters, across all pages.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub page_count: usize,
}

impl BookQuery {
    /// Returns `true` when `view` passes every filter.
    pub fn matches(&self, view: &BookView) -> bool {
        if let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = needle.to_lowercase();
            let hit = view.book.title.to_lowercase().contains(&needle)
                || view.book.author.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != view.book.status) {
            return false;
        }
        if self.source.is_some_and(|s| s != view.book.source) {
            return false;
        }
        if let Some(shelf) = &self.shelf_id {
            if !view.shelf_ids.iter().any(|id| id == shelf) {
                return false;
            }
        }
        if self.min_rating.is_some_and(|min| view.annotation.rating < min) {
            return false;
        }
        true
    }
}

fn status_rank(status: ReadStatus) -> u8 {
    match status {
        ReadStatus::Unread => 0,
        ReadStatus::Reading => 1,
        ReadStatus::Read => 2,
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Stable sort by `key`. Books without an acquisition date stay last in
/// both directions. [`SortKey::Custom`] leaves the order untouched.
pub fn sort_views(views: &mut [BookView], key: SortKey, direction: SortDirection) {
    let directed = |ord: Ordering| match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    };

    match key {
        SortKey::Custom => {}
        SortKey::Title => {
            views.sort_by(|a, b| directed(compare_text(&a.book.title, &b.book.title)))
        }
        SortKey::Author => views.sort_by(|a, b| {
            directed(
                compare_text(&a.book.author, &b.book.author)
                    .then_with(|| compare_text(&a.book.title, &b.book.title)),
            )
        }),
        SortKey::Acquired => views.sort_by(|a, b| match (a.book.acquired_at, b.book.acquired_at) {
            (Some(x), Some(y)) => directed(x.cmp(&y)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
        SortKey::Added => views.sort_by(|a, b| directed(a.book.created_at.cmp(&b.book.created_at))),
        SortKey::Rating => {
            views.sort_by(|a, b| directed(a.annotation.rating.cmp(&b.annotation.rating)))
        }
        SortKey::Status => views.sort_by(|a, b| {
            directed(status_rank(a.book.status).cmp(&status_rank(b.book.status)))
        }),
    }
}

/// Cuts `items` into the requested page, clamping out-of-range pages.
pub fn paginate(items: Vec<BookView>, page: usize, page_size: usize) -> BookPage {
    let total = items.len();
    if page_size == 0 {
        return BookPage { items, total, page: 1, page_size, page_count: 1 };
    }
    let page_count = total.div_ceil(page_size).max(1);
    let page = page.clamp(1, page_count);
    let items = items
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();
    BookPage { items, total, page, page_size, page_count }
}

/// Filters, orders and pages `views` (given in default library order).
///
/// `custom_order` is only consulted for [`SortKey::Custom`].
pub fn run_query(views: Vec<BookView>, query: &BookQuery, custom_order: &[String]) -> BookPage {
    let filtered: Vec<BookView> = views.into_iter().filter(|v| query.matches(v)).collect();
    let ordered = match query.sort {
        SortKey::Custom => apply_custom_order_by(filtered, custom_order, |v| v.book.key.as_str()),
        key => {
            let mut sorted = filtered;
            sort_views(&mut sorted, key, query.direction);
            sorted
        }
    };
    paginate(ordered, query.page, query.page_size)
}
