use crate::Result;
use rusqlite::Connection;
use std::path::Path;

/// Tables every library file must contain.
const REQUIRED_TABLES: &[&str] = &[
    "books",
    "bookshelves",
    "bookshelf_books",
    "annotations",
    "custom_orders",
    "operations",
    "library_meta",
];

pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self { conn })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // Validate database structure
        let placeholders = REQUIRED_TABLES.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ({placeholders})"
        );
        let table_count: i64 = conn.query_row(
            &sql,
            rusqlite::params_from_iter(REQUIRED_TABLES.iter()),
            |row| row.get(0),
        )?;

        if table_count != REQUIRED_TABLES.len() as i64 {
            return Err(crate::ShelfError::InvalidLibrary(
                "Not a valid Shelfwise library".to_string(),
            ));
        }

        // Migrate: libraries created before shelf icons existed lack the column
        let column_exists: bool = conn.query_row(
            "SELECT COUNT(*) FROM pragma_table_info('bookshelves') WHERE name='icon'",
            [],
            |row| row.get::<_, i64>(0).map(|count| count > 0),
        )?;

        if !column_exists {
            conn.execute(
                "ALTER TABLE bookshelves ADD COLUMN icon TEXT NOT NULL DEFAULT ''",
                [],
            )?;
        }

        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn table_names(storage: &Storage) -> Vec<String> {
        storage
            .connection()
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_create_storage() {
        let temp = NamedTempFile::new().unwrap();
        let storage = Storage::create(temp.path()).unwrap();

        let tables = table_names(&storage);
        for required in REQUIRED_TABLES {
            assert!(tables.contains(&required.to_string()), "missing table {required}");
        }
    }

    #[test]
    fn test_open_existing_storage() {
        let temp = NamedTempFile::new().unwrap();
        Storage::create(temp.path()).unwrap();

        let storage = Storage::open(temp.path()).unwrap();
        assert!(table_names(&storage).contains(&"books".to_string()));
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let temp = NamedTempFile::new().unwrap();
        let storage = Storage::create(temp.path()).unwrap();
        let enabled: i64 = storage
            .connection()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_open_invalid_database() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "not a database").unwrap();

        let result = Storage::open(temp.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_open_foreign_sqlite_file_is_rejected() {
        let temp = NamedTempFile::new().unwrap();
        {
            let conn = Connection::open(temp.path()).unwrap();
            conn.execute("CREATE TABLE notes (id TEXT PRIMARY KEY)", []).unwrap();
        }
        let result = Storage::open(temp.path());
        assert!(matches!(result, Err(crate::ShelfError::InvalidLibrary(_))));
    }

    #[test]
    fn test_migration_adds_icon_column() {
        let temp = NamedTempFile::new().unwrap();
        {
            let storage = Storage::create(temp.path()).unwrap();
            let conn = storage.connection();
            conn.execute_batch(
                "DROP TABLE bookshelf_books;
                 DROP TABLE bookshelves;
                 CREATE TABLE bookshelves (
                     id TEXT PRIMARY KEY,
                     name TEXT NOT NULL,
                     description TEXT NOT NULL DEFAULT '',
                     created_at INTEGER NOT NULL
                 );
                 CREATE TABLE bookshelf_books (
                     shelf_id TEXT NOT NULL,
                     book_key TEXT NOT NULL,
                     position INTEGER NOT NULL,
                     PRIMARY KEY (shelf_id, book_key)
                 );",
            )
            .unwrap();
        }

        let storage = Storage::open(temp.path()).unwrap();
        let column_exists: bool = storage
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('bookshelves') WHERE name='icon'",
                [],
                |row| row.get::<_, i64>(0).map(|count| count > 0),
            )
            .unwrap();

        assert!(column_exists, "icon column should exist after migration");
    }
}
