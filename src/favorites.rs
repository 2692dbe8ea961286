use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("favorites database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("could not encode favorites: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Saved recipe names, one JSON-encoded list per chat.
///
/// Each chat owns a single key-value slot; every mutation rewrites the whole
/// slot, so readers never see a partially updated list.
pub struct FavoritesStore {
    conn: Mutex<Connection>,
}

fn slot_key(owner: i64) -> String {
    format!("savedRecipes:{}", owner)
}

impl FavoritesStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS slots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            (),
        )?;
        Ok(FavoritesStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // poisoning leaves the connection usable
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read(conn: &Connection, owner: i64) -> Result<Vec<String>, StoreError> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM slots WHERE key = ?1",
                (slot_key(owner),),
                |row| row.get(0),
            )
            .optional()?;
        Ok(match raw {
            None => Vec::new(),
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(saved) => saved,
                Err(e) => {
                    log::warn!("Ignoring unreadable favorites of {}: {}", owner, e);
                    Vec::new()
                }
            },
        })
    }

    fn write(conn: &Connection, owner: i64, saved: &[String]) -> Result<(), StoreError> {
        conn.execute(
            "INSERT INTO slots (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (slot_key(owner), serde_json::to_string(saved)?),
        )?;
        Ok(())
    }

    pub fn list_all(&self, owner: i64) -> Result<Vec<String>, StoreError> {
        Self::read(&self.lock(), owner)
    }

    /// Appends `name` unless it is already saved. Returns whether it was added.
    pub fn add(&self, owner: i64, name: &str) -> Result<bool, StoreError> {
        let conn = self.lock();
        let mut saved = Self::read(&conn, owner)?;
        if saved.iter().any(|s| s == name) {
            return Ok(false);
        }
        saved.push(name.to_string());
        Self::write(&conn, owner, &saved)?;
        log::debug!("Saved {:?} for {}", name, owner);
        Ok(true)
    }

    pub fn remove(&self, owner: i64, name: &str) -> Result<(), StoreError> {
        let conn = self.lock();
        let saved: Vec<String> = Self::read(&conn, owner)?
            .into_iter()
            .filter(|s| s != name)
            .collect();
        Self::write(&conn, owner, &saved)?;
        log::debug!("Removed {:?} for {}", name, owner);
        Ok(())
    }

    #[cfg(test)]
    fn write_raw(&self, owner: i64, raw: &str) {
        self.lock()
            .execute(
                "INSERT OR REPLACE INTO slots (key, value) VALUES (?1, ?2)",
                (slot_key(owner), raw),
            )
            .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FavoritesStore {
        FavoritesStore::open_in_memory().unwrap()
    }

    #[test]
    fn empty_slot_lists_nothing() {
        assert!(store().list_all(1).unwrap().is_empty());
    }

    #[test]
    fn duplicate_save_keeps_first_position() {
        let store = store();
        assert!(store.add(1, "Soup").unwrap());
        assert!(store.add(1, "Pie").unwrap());
        assert!(!store.add(1, "Soup").unwrap());
        assert_eq!(store.list_all(1).unwrap(), vec!["Soup", "Pie"]);
    }

    #[test]
    fn removing_absent_name_changes_nothing() {
        let store = store();
        store.add(1, "Soup").unwrap();
        store.add(1, "Pie").unwrap();
        store.remove(1, "Cake").unwrap();
        assert_eq!(store.list_all(1).unwrap(), vec!["Soup", "Pie"]);
    }

    #[test]
    fn remove_keeps_order_of_the_rest() {
        let store = store();
        for name in ["A", "B", "C"] {
            store.add(1, name).unwrap();
        }
        store.remove(1, "B").unwrap();
        assert_eq!(store.list_all(1).unwrap(), vec!["A", "C"]);
    }

    #[test]
    fn chats_do_not_share_slots() {
        let store = store();
        store.add(1, "Soup").unwrap();
        assert!(store.list_all(2).unwrap().is_empty());
    }

    #[test]
    fn corrupt_slot_reads_as_empty() {
        let store = store();
        store.write_raw(1, "{not json");
        assert!(store.list_all(1).unwrap().is_empty());
        assert!(store.add(1, "Soup").unwrap());
        assert_eq!(store.list_all(1).unwrap(), vec!["Soup"]);
    }

    #[test]
    fn survives_reopen() {
        let dir = std::env::temp_dir().join(format!("meal-remix-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("favorites.sqlite3");
        let _ = std::fs::remove_file(&path);

        FavoritesStore::open(&path).unwrap().add(7, "Soup").unwrap();
        assert_eq!(FavoritesStore::open(&path).unwrap().list_all(7).unwrap(), vec!["Soup"]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
