pub mod menu;
pub mod settings;

use tauri::Emitter;

// Re-export core library
pub use shelfwise_core::{
    export_library_to_file, import_kindle_file, import_library_file, peek_import_file,
    Annotation, Book, BookPage, BookQuery, BookUpdate, BookView, Bookshelf, DeleteResult,
    ExportError, ImportMode, ImportReport, ImportResult, ImportSummary, Library, LibraryStats,
    NewBook, NewBookshelf, OperationSummary, OrderScope, ReadStatus, ShelfError,
};

use serde::{Deserialize, Serialize};
use settings::AppSettings;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tauri::{AppHandle, Manager, State};
use tauri_plugin_dialog::DialogExt;
use tauri_plugin_opener::OpenerExt;

/// The library currently shown in the main window.
pub struct OpenLibrary {
    pub library: Library,
    pub path: PathBuf,
}

pub struct AppState {
    pub library: Mutex<Option<OpenLibrary>>,
    pub settings: Mutex<AppSettings>,
}

impl AppState {
    pub fn new(settings: AppSettings) -> Self {
        Self {
            library: Mutex::new(None),
            settings: Mutex::new(settings),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryInfo {
    pub name: String,
    pub path: String,
    pub book_count: usize,
}

/// Errors that carry a message fit for the UI.
trait UserFacing {
    fn user_message(&self) -> String;
}

impl UserFacing for ShelfError {
    fn user_message(&self) -> String {
        ShelfError::user_message(self)
    }
}

impl UserFacing for ExportError {
    fn user_message(&self) -> String {
        ExportError::user_message(self)
    }
}

fn with_library<T, E, F>(state: &AppState, f: F) -> std::result::Result<T, String>
where
    E: UserFacing,
    F: FnOnce(&mut Library) -> std::result::Result<T, E>,
{
    let mut guard = state
        .library
        .lock()
        .map_err(|_| "Library state is unavailable".to_string())?;
    let open = guard.as_mut().ok_or_else(|| "No library is open".to_string())?;
    f(&mut open.library).map_err(|e| e.user_message())
}

fn library_info(open: &OpenLibrary) -> std::result::Result<LibraryInfo, String> {
    Ok(LibraryInfo {
        name: open.library.name().map_err(|e| e.user_message())?,
        path: open.path.to_string_lossy().to_string(),
        book_count: open.library.count_books().map_err(|e| e.user_message())?,
    })
}

/// Creates or opens the library at `path` and makes it the current one.
fn load_library(state: &AppState, path: &Path, create: bool) -> std::result::Result<LibraryInfo, String> {
    let library = if create {
        if path.exists() {
            return Err("A file already exists at this location".to_string());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| format!("Failed to create folder: {e}"))?;
        }
        Library::create(path)
    } else {
        Library::open(path)
    }
    .map_err(|e| e.user_message())?;

    let open = OpenLibrary {
        library,
        path: path.to_path_buf(),
    };
    let info = library_info(&open)?;
    *state
        .library
        .lock()
        .map_err(|_| "Library state is unavailable".to_string())? = Some(open);
    Ok(info)
}

fn remember_library(state: &AppState, path: &Path) {
    let Ok(mut settings) = state.settings.lock() else {
        return;
    };
    settings.last_library = Some(path.to_string_lossy().to_string());
    if let Err(e) = settings::save_settings(&settings) {
        log::warn!("{e}");
    }
}

/// Parses a Kindle export and merges it into the open library.
fn import_kindle_path(state: &AppState, path: &Path) -> std::result::Result<ImportSummary, String> {
    let books = import_kindle_file(path).map_err(|e| e.user_message())?;
    with_library(state, |library| library.import_books(books))
}

// ── Library ─────────────────────────────────────────────────────────

#[tauri::command]
fn create_library(state: State<'_, AppState>, path: String) -> std::result::Result<LibraryInfo, String> {
    let path = PathBuf::from(path);
    let info = load_library(&state, &path, true)?;
    remember_library(&state, &path);
    Ok(info)
}

#[tauri::command]
fn open_library(state: State<'_, AppState>, path: String) -> std::result::Result<LibraryInfo, String> {
    let path = PathBuf::from(path);
    let info = load_library(&state, &path, false)?;
    remember_library(&state, &path);
    Ok(info)
}

/// Suggested location for a new library in the create dialog.
#[tauri::command]
fn default_library_path() -> String {
    settings::default_library_path().to_string_lossy().into_owned()
}

#[tauri::command]
fn current_library(state: State<'_, AppState>) -> std::result::Result<Option<LibraryInfo>, String> {
    let guard = state
        .library
        .lock()
        .map_err(|_| "Library state is unavailable".to_string())?;
    guard.as_ref().map(library_info).transpose()
}

#[tauri::command]
fn library_stats(state: State<'_, AppState>) -> std::result::Result<LibraryStats, String> {
    with_library(&state, |library| library.stats())
}

#[tauri::command]
fn clear_library(state: State<'_, AppState>) -> std::result::Result<(), String> {
    with_library(&state, |library| library.clear_library())
}

// ── Books ───────────────────────────────────────────────────────────

/// Runs a list query. Without one, the first page in the user's default
/// sort is returned.
#[tauri::command]
fn query_books(
    state: State<'_, AppState>,
    query: Option<BookQuery>,
) -> std::result::Result<BookPage, String> {
    let query = match query {
        Some(q) => q,
        None => {
            let settings = state
                .settings
                .lock()
                .map_err(|_| "Settings are unavailable".to_string())?;
            BookQuery {
                sort: settings.default_sort,
                direction: settings.default_direction,
                page: 1,
                page_size: settings.page_size,
                ..Default::default()
            }
        }
    };
    with_library(&state, |library| library.query_books(&query))
}

#[tauri::command]
fn get_book(state: State<'_, AppState>, key: String) -> std::result::Result<BookView, String> {
    with_library(&state, |library| library.get_book_view(&key))
}

#[tauri::command]
fn add_book(state: State<'_, AppState>, book: NewBook) -> std::result::Result<Book, String> {
    with_library(&state, |library| library.add_book(book))
}

#[tauri::command]
fn update_book(
    state: State<'_, AppState>,
    key: String,
    update: BookUpdate,
) -> std::result::Result<Book, String> {
    with_library(&state, |library| library.update_book(&key, update))
}

#[tauri::command]
fn set_status(
    state: State<'_, AppState>,
    key: String,
    status: ReadStatus,
) -> std::result::Result<(), String> {
    with_library(&state, |library| library.set_status(&key, status))
}

#[tauri::command]
fn delete_book(state: State<'_, AppState>, key: String) -> std::result::Result<DeleteResult, String> {
    with_library(&state, |library| library.delete_book(&key))
}

#[tauri::command]
fn import_kindle(state: State<'_, AppState>, path: String) -> std::result::Result<ImportSummary, String> {
    import_kindle_path(&state, Path::new(&path))
}

// ── Bookshelves ─────────────────────────────────────────────────────

#[tauri::command]
fn list_bookshelves(state: State<'_, AppState>) -> std::result::Result<Vec<Bookshelf>, String> {
    with_library(&state, |library| library.list_bookshelves())
}

#[tauri::command]
fn get_bookshelf(state: State<'_, AppState>, id: String) -> std::result::Result<Bookshelf, String> {
    with_library(&state, |library| library.get_bookshelf(&id))
}

/// IDs of the shelves holding `key`, for the book's shelf checkboxes.
#[tauri::command]
fn bookshelves_for_book(state: State<'_, AppState>, key: String) -> std::result::Result<Vec<String>, String> {
    with_library(&state, |library| library.bookshelves_for_book(&key))
}

#[tauri::command]
fn create_bookshelf(
    state: State<'_, AppState>,
    shelf: NewBookshelf,
) -> std::result::Result<Bookshelf, String> {
    with_library(&state, |library| library.create_bookshelf(shelf))
}

#[tauri::command]
fn update_bookshelf(
    state: State<'_, AppState>,
    id: String,
    shelf: NewBookshelf,
) -> std::result::Result<Bookshelf, String> {
    with_library(&state, |library| library.update_bookshelf(&id, shelf))
}

#[tauri::command]
fn delete_bookshelf(state: State<'_, AppState>, id: String) -> std::result::Result<(), String> {
    with_library(&state, |library| library.delete_bookshelf(&id))
}

#[tauri::command]
fn add_to_bookshelf(
    state: State<'_, AppState>,
    id: String,
    key: String,
) -> std::result::Result<bool, String> {
    with_library(&state, |library| library.add_to_bookshelf(&id, &key))
}

#[tauri::command]
fn remove_from_bookshelf(
    state: State<'_, AppState>,
    id: String,
    key: String,
) -> std::result::Result<bool, String> {
    with_library(&state, |library| library.remove_from_bookshelf(&id, &key))
}

// ── Notes, ratings, order ───────────────────────────────────────────

#[tauri::command]
fn get_annotation(state: State<'_, AppState>, key: String) -> std::result::Result<Annotation, String> {
    with_library(&state, |library| library.get_annotation(&key))
}

#[tauri::command]
fn set_note(state: State<'_, AppState>, key: String, note: String) -> std::result::Result<Annotation, String> {
    with_library(&state, |library| library.set_note(&key, &note))
}

#[tauri::command]
fn set_rating(state: State<'_, AppState>, key: String, rating: u8) -> std::result::Result<Annotation, String> {
    with_library(&state, |library| library.set_rating(&key, rating))
}

/// Drag-and-drop. `to_index` is a position in the full order of `scope`.
#[tauri::command]
fn reorder_book(
    state: State<'_, AppState>,
    scope: OrderScope,
    key: String,
    to_index: usize,
) -> std::result::Result<Vec<String>, String> {
    with_library(&state, |library| library.reorder_book(&scope, &key, to_index))
}

/// Replaces the whole order of `scope`; returns the order actually stored.
#[tauri::command]
fn set_custom_order(
    state: State<'_, AppState>,
    scope: OrderScope,
    keys: Vec<String>,
) -> std::result::Result<Vec<String>, String> {
    with_library(&state, |library| library.set_custom_order(&scope, keys))
}

#[tauri::command]
fn reset_custom_order(state: State<'_, AppState>, scope: OrderScope) -> std::result::Result<(), String> {
    with_library(&state, |library| library.reset_custom_order(&scope))
}

// ── Export / import ─────────────────────────────────────────────────

#[tauri::command]
fn export_library_json(state: State<'_, AppState>, path: String) -> std::result::Result<(), String> {
    with_library(&state, |library| export_library_to_file(library, &path))
}

#[tauri::command]
fn peek_library_json(path: String) -> std::result::Result<ImportResult, String> {
    peek_import_file(&path).map_err(|e| e.user_message())
}

#[tauri::command]
fn import_library_json(
    state: State<'_, AppState>,
    path: String,
    mode: ImportMode,
) -> std::result::Result<ImportReport, String> {
    with_library(&state, |library| import_library_file(&path, library, mode))
}

/// Suggested file name for the export dialog, e.g. `shelfwise-2024-05-01.json`.
#[tauri::command]
fn default_export_name() -> String {
    format!("shelfwise-{}.json", chrono::Local::now().format("%Y-%m-%d"))
}

// ── Activity log, settings, misc ────────────────────────────────────

#[tauri::command]
fn list_operations(
    state: State<'_, AppState>,
    limit: Option<usize>,
) -> std::result::Result<Vec<OperationSummary>, String> {
    with_library(&state, |library| library.list_operations(limit.unwrap_or(100)))
}

#[tauri::command]
fn purge_operations(state: State<'_, AppState>) -> std::result::Result<usize, String> {
    with_library(&state, |library| library.purge_all_operations())
}

#[tauri::command]
fn get_settings(state: State<'_, AppState>) -> std::result::Result<AppSettings, String> {
    state
        .settings
        .lock()
        .map(|s| s.clone())
        .map_err(|_| "Settings are unavailable".to_string())
}

#[tauri::command]
fn update_settings(state: State<'_, AppState>, settings: AppSettings) -> std::result::Result<(), String> {
    settings::save_settings(&settings)?;
    *state
        .settings
        .lock()
        .map_err(|_| "Settings are unavailable".to_string())? = settings;
    Ok(())
}

#[tauri::command]
fn open_cover(app: AppHandle, url: String) -> std::result::Result<(), String> {
    if !url.starts_with("https://") {
        return Err("Only https links can be opened".to_string());
    }
    app.opener()
        .open_url(url, None::<&str>)
        .map_err(|e| format!("Failed to open link: {e}"))
}

fn pick_and_import_kindle(app: &AppHandle) {
    let handle = app.clone();
    app.dialog()
        .file()
        .add_filter("Kindle library export", &["xml"])
        .pick_file(move |picked| {
            let Some(path) = picked.and_then(|p| p.into_path().ok()) else {
                return;
            };
            let state = handle.state::<AppState>();
            match import_kindle_path(&state, &path) {
                Ok(summary) => {
                    handle.emit("library-changed", &summary).ok();
                }
                Err(e) => {
                    log::error!("Kindle import from {} failed: {e}", path.display());
                    handle.emit("import-failed", e).ok();
                }
            }
        });
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(
            tauri_plugin_log::Builder::new()
                .level(log::LevelFilter::Info)
                .build(),
        )
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            let menu = menu::build_menu(app.handle())?;
            app.set_menu(menu)?;

            let settings = settings::load_settings();
            let last = settings.last_library.clone().map(PathBuf::from);
            let state = AppState::new(settings);
            if let Some(path) = last.filter(|p| p.exists()) {
                if let Err(e) = load_library(&state, &path, false) {
                    log::warn!("could not reopen {}: {e}", path.display());
                }
            }
            app.manage(state);
            Ok(())
        })
        .on_menu_event(|app, event| {
            let id = event.id().as_ref();
            if id == menu::IMPORT_KINDLE {
                pick_and_import_kindle(app);
            } else if let Some(action) = menu::FORWARDED_ACTIONS.iter().find(|a| **a == id) {
                // Emit event to frontend
                app.emit("menu-action", *action).ok();
            }
        })
        .invoke_handler(tauri::generate_handler![
            create_library,
            open_library,
            default_library_path,
            current_library,
            library_stats,
            clear_library,
            query_books,
            get_book,
            add_book,
            update_book,
            set_status,
            delete_book,
            import_kindle,
            list_bookshelves,
            get_bookshelf,
            bookshelves_for_book,
            create_bookshelf,
            update_bookshelf,
            delete_bookshelf,
            add_to_bookshelf,
            remove_from_bookshelf,
            get_annotation,
            set_note,
            set_rating,
            reorder_book,
            set_custom_order,
            reset_custom_order,
            export_library_json,
            peek_library_json,
            import_library_json,
            default_export_name,
            list_operations,
            purge_operations,
            get_settings,
            update_settings,
            open_cover,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
