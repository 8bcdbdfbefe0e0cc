// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! DuckDB persistence for the local driver.
//!
//! Two tables keyed by the same integer: `file_info` holds metadata and
//! `file_data` holds content. A directory's content is the JSON map of its
//! children's names to keys; a mount point's content is its JSON
//! [`MountRecord`]. Every mutation runs in a single transaction.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError, Weak};

use diagnostics::log_debug;
use duckdb::{Connection, params};
use wfs::{Children, EntryInfo, FileType, INODE_MIME, MountRecord, TEXT_PLAIN, Timestamp};

use crate::error::{Result, StoreError};

/// Key of the root directory created with a new database.
pub const ROOT_KEY: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS file_info (
    key BIGINT PRIMARY KEY,
    type VARCHAR NOT NULL,
    created_time VARCHAR NOT NULL,
    modified_time VARCHAR NOT NULL,
    mime_type VARCHAR
);
CREATE TABLE IF NOT EXISTS file_data (
    key BIGINT PRIMARY KEY,
    content BLOB NOT NULL
);
CREATE SEQUENCE IF NOT EXISTS file_keys START 2;
";

// DuckDB will not open one database file twice in a process.
static STORES: LazyLock<Mutex<HashMap<String, Weak<Store>>>> = LazyLock::new(Default::default);

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) type NameMap = BTreeMap<String, i64>;

#[derive(Debug, Clone)]
pub(crate) struct Info {
    pub entry_type: FileType,
    pub created: Timestamp,
    pub modified: Timestamp,
    pub mime_type: Option<String>,
}

#[derive(Debug)]
pub(crate) struct Row {
    pub info: Info,
    pub content: Vec<u8>,
}

impl Row {
    pub fn names(&self, key: i64) -> Result<NameMap> {
        if self.info.entry_type != FileType::Directory {
            return Err(StoreError::corrupt(key, "not a directory"));
        }
        Ok(serde_json::from_slice(&self.content)?)
    }
}

/// One open database.
pub struct Store {
    path: String,
    conn: Mutex<Connection>,
}

impl Store {
    /// Open the database at `path`, sharing the connection with any live handle.
    pub fn open(path: &str) -> Result<Arc<Self>> {
        let mut stores = lock(&STORES);
        if let Some(store) = stores.get(path).and_then(Weak::upgrade) {
            return Ok(store);
        }
        log_debug!("Opening local store {path}", path: path);
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        let store = Arc::new(Self {
            path: path.to_string(),
            conn: Mutex::new(conn),
        });
        _ = stores.insert(path.to_string(), Arc::downgrade(&store));
        Ok(store)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        lock(&self.conn)
    }

    /// Make sure directory `key` exists. Only the default root is created.
    pub fn ensure_root(&self, key: i64) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let count: i64 = tx.query_row(
            "SELECT count(*) FROM file_info WHERE key = ?",
            params![key],
            |row| row.get(0),
        )?;
        if count == 0 {
            if key != ROOT_KEY {
                return Err(StoreError::MissingKey { key });
            }
            let now = wfs::now();
            let info = Info {
                entry_type: FileType::Directory,
                created: now,
                modified: now,
                mime_type: None,
            };
            insert(&tx, key, &info, b"{}")?;
            log_debug!("Created root directory {key}", key: key);
        }
        tx.commit()?;
        Ok(())
    }

    pub(crate) fn load(&self, key: i64) -> Result<Row> {
        let conn = self.conn();
        let info = read_info(&conn, key)?;
        let content = read_content(&conn, key)?;
        Ok(Row { info, content })
    }

    pub(crate) fn children(&self, names: &NameMap) -> Result<Children> {
        let conn = self.conn();
        names
            .iter()
            .map(|(name, key)| Ok((name.clone(), child_info(&conn, *key)?)))
            .collect()
    }

    /// Add a new entry under directory `parent`. Returns the new key and the
    /// parent's new modified time.
    pub(crate) fn create_child(&self, parent: i64, name: &str, info: &Info, content: &[u8]) -> Result<(i64, Timestamp)> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut names = read_names(&tx, parent)?;
        let key: i64 = tx.query_row("SELECT nextval('file_keys')", [], |row| row.get(0))?;
        insert(&tx, key, info, content)?;
        _ = names.insert(name.to_string(), key);
        let modified = wfs::now();
        update_content(&tx, parent, &serde_json::to_vec(&names)?)?;
        touch(&tx, parent, &modified)?;
        tx.commit()?;
        log_debug!("Created {name} as key {key} in {parent}", name: name, key: key, parent: parent);
        Ok((key, modified))
    }

    /// Unlink `name` from `parent` and delete everything below it.
    ///
    /// Mount points are deleted without following them.
    pub(crate) fn remove_child(&self, parent: i64, name: &str) -> Result<Timestamp> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut names = read_names(&tx, parent)?;
        let key = names.remove(name).ok_or_else(|| StoreError::MissingName {
            name: name.to_string(),
        })?;
        let doomed = descendants(&tx, key)?;
        for k in &doomed {
            _ = tx.execute("DELETE FROM file_info WHERE key = ?", params![k])?;
            _ = tx.execute("DELETE FROM file_data WHERE key = ?", params![k])?;
        }
        let modified = wfs::now();
        update_content(&tx, parent, &serde_json::to_vec(&names)?)?;
        touch(&tx, parent, &modified)?;
        tx.commit()?;
        log_debug!("Removed {name} ({count} entries) from {parent}", name: name, count: doomed.len(), parent: parent);
        Ok(modified)
    }

    pub(crate) fn write_content(&self, key: i64, content: &[u8], modified: &Timestamp) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        update_content(&tx, key, content)?;
        touch(&tx, key, modified)?;
        tx.commit()?;
        log_debug!("Wrote {size} bytes to {key}", size: content.len(), key: key);
        Ok(())
    }
}

fn or_missing(key: i64) -> impl FnOnce(duckdb::Error) -> StoreError {
    move |err| match err {
        duckdb::Error::QueryReturnedNoRows => StoreError::MissingKey { key },
        other => other.into(),
    }
}

fn parse_time(key: i64, text: &str) -> Result<Timestamp> {
    wfs::parse_time(text).map_err(|e| StoreError::corrupt(key, e.to_string()))
}

fn read_info(conn: &Connection, key: i64) -> Result<Info> {
    let (entry_type, created, modified, mime_type) = conn
        .query_row(
            "SELECT type, created_time, modified_time, mime_type FROM file_info WHERE key = ?",
            params![key],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        )
        .map_err(or_missing(key))?;
    Ok(Info {
        entry_type: entry_type
            .parse()
            .map_err(|e: wfs::Error| StoreError::corrupt(key, e.to_string()))?,
        created: parse_time(key, &created)?,
        modified: parse_time(key, &modified)?,
        mime_type,
    })
}

fn read_content(conn: &Connection, key: i64) -> Result<Vec<u8>> {
    conn.query_row(
        "SELECT content FROM file_data WHERE key = ?",
        params![key],
        |row| row.get(0),
    )
    .map_err(or_missing(key))
}

fn content_len(conn: &Connection, key: i64) -> Result<u64> {
    let len: i64 = conn
        .query_row(
            "SELECT octet_length(content) FROM file_data WHERE key = ?",
            params![key],
            |row| row.get(0),
        )
        .map_err(or_missing(key))?;
    u64::try_from(len).map_err(|_| StoreError::corrupt(key, "negative content length"))
}

fn read_names(conn: &Connection, key: i64) -> Result<NameMap> {
    let info = read_info(conn, key)?;
    let row = Row {
        info,
        content: read_content(conn, key)?,
    };
    row.names(key)
}

fn child_info(conn: &Connection, key: i64) -> Result<EntryInfo> {
    let info = read_info(conn, key)?;
    Ok(match info.entry_type {
        FileType::File => EntryInfo {
            entry_type: FileType::File,
            mime_type: info.mime_type.unwrap_or_else(|| TEXT_PLAIN.to_string()),
            created_time: info.created,
            modified_time: info.modified,
            size: Some(content_len(conn, key)?),
            driver: None,
        },
        FileType::Directory => EntryInfo {
            entry_type: FileType::Directory,
            mime_type: INODE_MIME.to_string(),
            created_time: info.created,
            modified_time: info.modified,
            size: None,
            driver: None,
        },
        FileType::Mount => {
            let record = MountRecord::from_json(&read_content(conn, key)?)?;
            let mime_type = wfs::registry::mime_type_of(&record.driver)
                .map(str::to_string)
                .or(info.mime_type)
                .unwrap_or_else(|| INODE_MIME.to_string());
            EntryInfo {
                entry_type: FileType::Mount,
                mime_type,
                created_time: info.created,
                modified_time: info.modified,
                size: None,
                driver: Some(record.driver),
            }
        }
    })
}

fn descendants(conn: &Connection, key: i64) -> Result<Vec<i64>> {
    let mut found = Vec::new();
    let mut pending = vec![key];
    while let Some(next) = pending.pop() {
        found.push(next);
        let info = read_info(conn, next)?;
        if info.entry_type == FileType::Directory {
            let row = Row {
                info,
                content: read_content(conn, next)?,
            };
            pending.extend(row.names(next)?.into_values());
        }
    }
    Ok(found)
}

fn insert(conn: &Connection, key: i64, info: &Info, content: &[u8]) -> Result<()> {
    _ = conn.execute(
        "INSERT INTO file_info (key, type, created_time, modified_time, mime_type) VALUES (?, ?, ?, ?, ?)",
        params![
            key,
            info.entry_type.as_str(),
            wfs::format_time(&info.created),
            wfs::format_time(&info.modified),
            info.mime_type,
        ],
    )?;
    _ = conn.execute(
        "INSERT INTO file_data (key, content) VALUES (?, ?)",
        params![key, content],
    )?;
    Ok(())
}

fn update_content(conn: &Connection, key: i64, content: &[u8]) -> Result<()> {
    let changed = conn.execute(
        "UPDATE file_data SET content = ? WHERE key = ?",
        params![content, key],
    )?;
    if changed == 0 {
        return Err(StoreError::MissingKey { key });
    }
    Ok(())
}

fn touch(conn: &Connection, key: i64, modified: &Timestamp) -> Result<()> {
    _ = conn.execute(
        "UPDATE file_info SET modified_time = ? WHERE key = ?",
        params![wfs::format_time(modified), key],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_store() -> (TempDir, Arc<Store>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.duckdb");
        let store = Store::open(path.to_str().unwrap()).unwrap();
        store.ensure_root(ROOT_KEY).unwrap();
        (dir, store)
    }

    fn file_info() -> Info {
        let now = wfs::now();
        Info {
            entry_type: FileType::File,
            created: now,
            modified: now,
            mime_type: Some("text/csv".to_string()),
        }
    }

    fn dir_info() -> Info {
        Info {
            mime_type: None,
            entry_type: FileType::Directory,
            ..file_info()
        }
    }

    #[test]
    fn test_root_is_created_once() {
        let (_dir, store) = new_store();
        store.ensure_root(ROOT_KEY).unwrap();
        let root = store.load(ROOT_KEY).unwrap();
        assert_eq!(root.info.entry_type, FileType::Directory);
        assert!(root.names(ROOT_KEY).unwrap().is_empty());
    }

    #[test]
    fn test_other_roots_must_exist() {
        let (_dir, store) = new_store();
        assert!(matches!(store.ensure_root(42), Err(StoreError::MissingKey { key: 42 })));
    }

    #[test]
    fn test_same_path_shares_store() {
        let (dir, store) = new_store();
        let path = dir.path().join("store.duckdb");
        let again = Store::open(path.to_str().unwrap()).unwrap();
        assert!(Arc::ptr_eq(&store, &again));
    }

    #[test]
    fn test_create_child_updates_parent() {
        let (_dir, store) = new_store();
        let (key, _) = store.create_child(ROOT_KEY, "a.csv", &file_info(), b"x,y\n1,2\n").unwrap();
        assert!(key > ROOT_KEY);

        let names = store.load(ROOT_KEY).unwrap().names(ROOT_KEY).unwrap();
        assert_eq!(names.get("a.csv"), Some(&key));

        let children = store.children(&names).unwrap();
        let info = children.get("a.csv").unwrap();
        assert_eq!(info.size, Some(8));
        assert_eq!(info.mime_type, "text/csv");
    }

    #[test]
    fn test_remove_child_deletes_subtree() {
        let (_dir, store) = new_store();
        let (sub, _) = store.create_child(ROOT_KEY, "sub", &dir_info(), b"{}").unwrap();
        let (leaf, _) = store.create_child(sub, "leaf", &file_info(), b"data").unwrap();
        let (keep, _) = store.create_child(ROOT_KEY, "keep", &file_info(), b"").unwrap();

        store.remove_child(ROOT_KEY, "sub").unwrap();

        assert!(matches!(store.load(sub), Err(StoreError::MissingKey { .. })));
        assert!(matches!(store.load(leaf), Err(StoreError::MissingKey { .. })));
        assert!(store.load(keep).is_ok());
        let names = store.load(ROOT_KEY).unwrap().names(ROOT_KEY).unwrap();
        assert_eq!(names.keys().collect::<Vec<_>>(), vec!["keep"]);
    }

    #[test]
    fn test_remove_missing_name() {
        let (_dir, store) = new_store();
        assert!(matches!(
            store.remove_child(ROOT_KEY, "ghost"),
            Err(StoreError::MissingName { .. })
        ));
    }

    #[test]
    fn test_write_content() {
        let (_dir, store) = new_store();
        let (key, _) = store.create_child(ROOT_KEY, "f", &file_info(), b"old").unwrap();
        let later = wfs::now();
        store.write_content(key, b"newer", &later).unwrap();
        let row = store.load(key).unwrap();
        assert_eq!(row.content, b"newer");
        assert_eq!(row.info.modified, later);
    }
}
