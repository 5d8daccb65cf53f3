//! Parser for the Kindle desktop app's library cache export.
//!
//! The Kindle app keeps a `KindleSyncMetadataCache.xml` file listing every
//! title in the account:
//!
//! ```xml
//! <response>
//!   <add_update_list>
//!     <meta_data>
//!       <ASIN>B000FC0SIM</ASIN>
//!       <title pronunciation="...">Dune</title>
//!       <authors><author pronunciation="...">Herbert, Frank</author></authors>
//!       <purchase_date>2015-06-19T23:55:42+0000</purchase_date>
//!       <cde_contenttype>EBOK</cde_contenttype>
//!     </meta_data>
//!   </add_update_list>
//! </response>
//! ```
//!
//! Each usable `<meta_data>` entry becomes an imported [`Book`].

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::{Book, BookSource, ReadStatus, Result, ShelfError};

/// Content types that describe books (purchased e-books and personal documents).
const BOOK_CONTENT_TYPES: &[&str] = &["EBOK", "PDOC"];

/// Separator used when a title lists more than one author.
pub const AUTHOR_SEPARATOR: &str = " & ";

fn asin_regex() -> &'static Regex {
    static ASIN: OnceLock<Regex> = OnceLock::new();
    ASIN.get_or_init(|| Regex::new(r"^[A-Z0-9]{10}$").expect("valid ASIN regex"))
}

/// Returns the Amazon cover image URL for an ASIN, or `None` for keys that
/// are not ASIN-shaped.
pub fn cover_url_for_asin(asin: &str) -> Option<String> {
    asin_regex()
        .is_match(asin)
        .then(|| format!("https://m.media-amazon.com/images/P/{asin}.01._SCLZZZZZZZ_.jpg"))
}

#[derive(Default)]
struct PartialEntry {
    asin: String,
    title: String,
    authors: Vec<String>,
    purchase_date: String,
    content_type: String,
}

impl PartialEntry {
    fn into_book(self, now: i64) -> Option<Book> {
        let key = self.asin.trim().to_string();
        let title = self.title.trim().to_string();
        if key.is_empty() || title.is_empty() {
            return None;
        }
        let content_type = self.content_type.trim();
        if !content_type.is_empty() && !BOOK_CONTENT_TYPES.contains(&content_type) {
            log::debug!("skipping kindle entry {key} with content type {content_type}");
            return None;
        }
        let author = self
            .authors
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .collect::<Vec<_>>()
            .join(AUTHOR_SEPARATOR);

        Some(Book {
            cover_url: cover_url_for_asin(&key),
            acquired_at: parse_purchase_date(&self.purchase_date),
            key,
            title,
            author,
            status: ReadStatus::Unread,
            source: BookSource::Imported,
            created_at: now,
            modified_at: now,
        })
    }
}

/// Parses a Kindle purchase date such as `2015-06-19T23:55:42+0000` into
/// unix seconds. RFC 3339 dates are accepted too.
pub fn parse_purchase_date(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    chrono::DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| chrono::DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.timestamp())
        .ok()
}

/// Parses the XML text of a Kindle library cache into imported books.
///
/// Entries without an ASIN or title, and non-book content (e.g. audible
/// companions), are skipped. Records come back in document order; duplicate
/// ASINs are left for the merge step to resolve.
///
/// # Errors
///
/// Returns [`ShelfError::Import`] if the XML is malformed.
pub fn parse_kindle_export(xml: &str) -> Result<Vec<Book>> {
    let now = chrono::Utc::now().timestamp();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    let mut books = Vec::new();
    let mut entry: Option<PartialEntry> = None;
    let mut current_tag = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                current_tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if current_tag == "meta_data" {
                    entry = Some(PartialEntry::default());
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"meta_data" {
                    if let Some(book) = entry.take().and_then(|p| p.into_book(now)) {
                        books.push(book);
                    }
                }
                current_tag.clear();
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| ShelfError::Import(err.to_string()))?
                    .to_string();
                if let Some(partial) = entry.as_mut() {
                    apply_text(partial, &current_tag, text);
                }
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                if let Some(partial) = entry.as_mut() {
                    apply_text(partial, &current_tag, text);
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(ShelfError::Import(format!(
                    "malformed Kindle export at byte {}: {err}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if entry.is_some() {
        return Err(ShelfError::Import("unterminated meta_data entry".to_string()));
    }

    log::info!("parsed {} books from kindle export", books.len());
    Ok(books)
}

fn apply_text(partial: &mut PartialEntry, tag: &str, text: String) {
    match tag {
        "ASIN" => partial.asin.push_str(&text),
        "title" => partial.title.push_str(&text),
        "author" => partial.authors.push(text),
        "purchase_date" => partial.purchase_date.push_str(&text),
        "cde_contenttype" => partial.content_type.push_str(&text),
        _ => {}
    }
}

/// Reads and parses a Kindle library cache file from disk.
///
/// # Errors
///
/// Returns [`ShelfError::Io`] if the file cannot be read, or
/// [`ShelfError::Import`] if it is not a valid export.
pub fn import_kindle_file<P: AsRef<Path>>(path: P) -> Result<Vec<Book>> {
    let xml = std::fs::read_to_string(path.as_ref())?;
    parse_kindle_export(&xml)
}
