//! Application settings persistence for Shelfwise.
//!
//! Stores user preferences (last opened library, list paging and sort) in a
//! JSON file at an OS-appropriate location.

use serde::{Deserialize, Serialize};
use shelfwise_core::{SortDirection, SortKey};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Library file reopened on startup, if it still exists.
    pub last_library: Option<String>,
    /// Books per page in the list view; 0 shows everything.
    pub page_size: usize,
    pub default_sort: SortKey,
    pub default_direction: SortDirection,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            last_library: None,
            page_size: 50,
            default_sort: SortKey::Custom,
            default_direction: SortDirection::Asc,
        }
    }
}

/// Returns the path to the settings JSON file.
///
/// - macOS / Linux: `~/.config/shelfwise/settings.json`
/// - Windows: `%APPDATA%/Shelfwise/settings.json`
pub fn settings_file_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("Shelfwise").join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("shelfwise").join("settings.json")
    }
}

/// Where a library is created when the user has never picked one:
/// `~/Documents/Shelfwise/library.shelfwise`.
pub fn default_library_path() -> PathBuf {
    dirs::document_dir()
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Documents")
        })
        .join("Shelfwise")
        .join("library.shelfwise")
}

/// Loads settings from disk; returns defaults if the file is missing or corrupt.
pub fn load_settings() -> AppSettings {
    load_settings_from(&settings_file_path())
}

fn load_settings_from(path: &Path) -> AppSettings {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("ignoring unreadable settings at {}: {e}", path.display());
            AppSettings::default()
        }),
        Err(_) => AppSettings::default(),
    }
}

/// Saves settings to disk, creating parent directories as needed.
pub fn save_settings(settings: &AppSettings) -> Result<(), String> {
    save_settings_to(&settings_file_path(), settings)
}

fn save_settings_to(path: &Path, settings: &AppSettings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create settings directory: {e}"))?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {e}"))?;
    fs::write(path, json)
        .map_err(|e| format!("Failed to write settings: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join("nope.json"));
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.page_size, 50);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = AppSettings {
            last_library: Some("/tmp/books.shelfwise".to_string()),
            page_size: 0,
            default_sort: SortKey::Title,
            default_direction: SortDirection::Desc,
        };
        save_settings_to(&path, &settings).unwrap();
        assert_eq!(load_settings_from(&path), settings);
    }

    #[test]
    fn test_corrupt_or_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_settings_from(&path), AppSettings::default());

        fs::write(&path, r#"{"pageSize": 25}"#).unwrap();
        let settings = load_settings_from(&path);
        assert_eq!(settings.page_size, 25);
        assert_eq!(settings.default_sort, SortKey::Custom);
    }
}
