//! Application menu construction for Shelfwise.

use tauri::{menu::*, AppHandle, Runtime};

/// Menu item IDs the webview receives through the `menu-action` event.
pub const FORWARDED_ACTIONS: &[&str] = &[
    "file_new",
    "file_open",
    "file_export_json",
    "file_import_json",
    "edit_add_book",
    "edit_new_bookshelf",
    "view_activity",
    "view_refresh",
];

/// Handled natively, then reported to the webview as `library-changed`.
pub const IMPORT_KINDLE: &str = "file_import_kindle";

/// Builds the application menu with File, Edit and View submenus.
///
/// # Errors
///
/// Returns [`tauri::Error`] if any menu item or submenu fails to build.
pub fn build_menu<R: Runtime>(app: &AppHandle<R>) -> Result<Menu<R>, tauri::Error> {
    let menu = MenuBuilder::new(app)
        // File menu
        .items(&[
            &SubmenuBuilder::new(app, "File")
                .items(&[
                    &MenuItemBuilder::with_id("file_new", "New Library...")
                        .accelerator("CmdOrCtrl+N")
                        .build(app)?,
                    &MenuItemBuilder::with_id("file_open", "Open Library...")
                        .accelerator("CmdOrCtrl+O")
                        .build(app)?,
                    &PredefinedMenuItem::separator(app)?,
                    &MenuItemBuilder::with_id(IMPORT_KINDLE, "Import Kindle Export...")
                        .accelerator("CmdOrCtrl+I")
                        .build(app)?,
                    &MenuItemBuilder::with_id("file_import_json", "Import Library JSON...")
                        .build(app)?,
                    &MenuItemBuilder::with_id("file_export_json", "Export Library JSON...")
                        .accelerator("CmdOrCtrl+E")
                        .build(app)?,
                    &PredefinedMenuItem::separator(app)?,
                    &PredefinedMenuItem::close_window(app, None)?,
                    &PredefinedMenuItem::quit(app, None)?,
                ])
                .build()?,

            // Edit menu
            &SubmenuBuilder::new(app, "Edit")
                .items(&[
                    &MenuItemBuilder::with_id("edit_add_book", "Add Book...")
                        .accelerator("CmdOrCtrl+Shift+N")
                        .build(app)?,
                    &MenuItemBuilder::with_id("edit_new_bookshelf", "New Bookshelf...")
                        .build(app)?,
                    &PredefinedMenuItem::separator(app)?,
                    &PredefinedMenuItem::undo(app, None)?,
                    &PredefinedMenuItem::redo(app, None)?,
                    &PredefinedMenuItem::copy(app, None)?,
                    &PredefinedMenuItem::paste(app, None)?,
                ])
                .build()?,

            // View menu
            &SubmenuBuilder::new(app, "View")
                .items(&[
                    &PredefinedMenuItem::fullscreen(app, None)?,
                    &PredefinedMenuItem::separator(app)?,
                    &MenuItemBuilder::with_id("view_activity", "Activity Log...")
                        .build(app)?,
                    &PredefinedMenuItem::separator(app)?,
                    &MenuItemBuilder::with_id("view_refresh", "Refresh")
                        .accelerator("CmdOrCtrl+R")
                        .build(app)?,
                ])
                .build()?,
        ])
        .build()?;

    Ok(menu)
}
