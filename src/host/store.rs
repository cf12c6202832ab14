use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Result, SshelfError};
use crate::host::{HostProfile, HostRequest};

/// The one row of `active_host`.
const ACTIVE_SLOT: i64 = 1;

const HOST_COLUMNS: &str =
    "h.id, h.name, h.user_name, h.address, h.port, h.password, h.keypath, h.description, h.created_at, h.updated_at";

/// Fixed-interval retry applied when the database cannot be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Run `open` until it succeeds or the attempts are exhausted.
    ///
    /// `open` receives the 1-based attempt number.
    pub fn run<T, F>(&self, mut open: F) -> rusqlite::Result<T>
    where
        F: FnMut(u32) -> rusqlite::Result<T>,
    {
        let mut attempt = 1;
        loop {
            match open(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts => {
                    tracing::debug!("open attempt {} failed: {}", attempt, e);
                    std::thread::sleep(self.delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

pub struct HostStore {
    conn: Connection,
}

impl HostStore {
    pub fn db_path(workspace: &Path) -> PathBuf {
        workspace.join("sshelf.db")
    }

    /// Open (creating if needed) the database under `workspace`.
    pub fn open(workspace: &Path) -> Result<Self> {
        Self::open_with(&Self::db_path(workspace), RetryPolicy::default())
    }

    pub fn open_with(path: &Path, retry: RetryPolicy) -> Result<Self> {
        retry
            .run(|_| Connection::open(path).and_then(Self::from_connection))
            .map_err(SshelfError::store("open database"))
    }

    fn from_connection(conn: Connection) -> rusqlite::Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS hosts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                user_name TEXT NOT NULL,
                address TEXT NOT NULL,
                port INTEGER NOT NULL,
                password TEXT NOT NULL DEFAULT '',
                keypath TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS active_host (
                id INTEGER PRIMARY KEY,
                server_info_id INTEGER NOT NULL
            );",
        )?;
        Ok(Self { conn })
    }

    /// Insert a new host. Names are unique.
    pub fn save(&self, request: &HostRequest) -> Result<HostProfile> {
        let now = Utc::now();

        self.conn
            .execute(
                "INSERT INTO hosts (name, user_name, address, port, password, keypath, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    request.name,
                    request.user,
                    request.address,
                    request.port,
                    request.password,
                    request.key_path,
                    request.description,
                    now.to_rfc3339(),
                ],
            )
            .map_err(|e| unique_violation(e, &request.name, "save host"))?;

        let id = self.conn.last_insert_rowid();
        tracing::debug!("saved host {} as #{}", request.name, id);

        Ok(HostProfile {
            id,
            name: request.name.clone(),
            user: request.user.clone(),
            address: request.address.clone(),
            port: request.port,
            password: request.password.clone(),
            key_path: request.key_path.clone(),
            description: request.description.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn find_by_name(&self, name: &str) -> Result<HostProfile> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM hosts h WHERE h.name = ?1", HOST_COLUMNS),
                params![name],
                row_to_profile,
            )
            .optional()
            .map_err(SshelfError::store("find host"))?
            .ok_or_else(|| SshelfError::HostNotFound(name.to_string()))
    }

    pub fn find_all(&self) -> Result<Vec<HostProfile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM hosts h ORDER BY h.name", HOST_COLUMNS))
            .map_err(SshelfError::store("list hosts"))?;

        let hosts = stmt
            .query_map([], row_to_profile)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(SshelfError::store("list hosts"))?;

        Ok(hosts)
    }

    /// Replace every user field of host `id` with `request`.
    ///
    /// Nothing is merged: a blank field in `request` blanks the stored one.
    pub fn update(&self, id: i64, request: &HostRequest) -> Result<usize> {
        let rows = self
            .conn
            .execute(
                "UPDATE hosts
                 SET name = ?1, user_name = ?2, address = ?3, port = ?4, password = ?5,
                     keypath = ?6, description = ?7, updated_at = ?8
                 WHERE id = ?9",
                params![
                    request.name,
                    request.user,
                    request.address,
                    request.port,
                    request.password,
                    request.key_path,
                    request.description,
                    Utc::now().to_rfc3339(),
                    id,
                ],
            )
            .map_err(|e| unique_violation(e, &request.name, "update host"))?;

        if rows == 0 {
            return Err(SshelfError::HostNotFound(format!("#{}", id)));
        }
        Ok(rows)
    }

    /// Returns the number of deleted rows; 0 when no such host existed.
    pub fn delete_by_name(&self, name: &str) -> Result<usize> {
        self.conn
            .execute("DELETE FROM hosts WHERE name = ?1", params![name])
            .map_err(SshelfError::store("delete host"))
    }

    /// Point the active slot at `profile`, replacing any previous selection.
    pub fn set_active(&self, profile: &HostProfile) -> Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(SshelfError::store("set active host"))?;

        let exists = tx
            .query_row("SELECT 1 FROM hosts WHERE id = ?1", params![profile.id], |_| {
                Ok(())
            })
            .optional()
            .map_err(SshelfError::store("set active host"))?
            .is_some();
        if !exists {
            return Err(SshelfError::HostNotFound(profile.name.clone()));
        }

        tx.execute(
            "INSERT OR REPLACE INTO active_host (id, server_info_id) VALUES (?1, ?2)",
            params![ACTIVE_SLOT, profile.id],
        )
        .map_err(SshelfError::store("set active host"))?;

        tx.commit().map_err(SshelfError::store("set active host"))
    }

    /// The currently active host, read through to its live row.
    pub fn get_active(&self) -> Result<Option<HostProfile>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM active_host a JOIN hosts h ON h.id = a.server_info_id WHERE a.id = ?1",
                    HOST_COLUMNS
                ),
                params![ACTIVE_SLOT],
                row_to_profile,
            )
            .optional()
            .map_err(SshelfError::store("find active host"))
    }
}

fn unique_violation(err: rusqlite::Error, name: &str, op: &'static str) -> SshelfError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            SshelfError::DuplicateName(name.to_string())
        }
        _ => SshelfError::Store { op, source: err },
    }
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_profile(row: &Row<'_>) -> rusqlite::Result<HostProfile> {
    Ok(HostProfile {
        id: row.get(0)?,
        name: row.get(1)?,
        user: row.get(2)?,
        address: row.get(3)?,
        port: row.get(4)?,
        password: row.get(5)?,
        key_path: row.get(6)?,
        description: row.get(7)?,
        created_at: parse_timestamp(row, 8)?,
        updated_at: parse_timestamp(row, 9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> HostStore {
        HostStore::from_connection(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn create_test_request(name: &str) -> HostRequest {
        HostRequest {
            name: name.to_string(),
            user: "deploy".to_string(),
            address: "10.0.0.1".to_string(),
            port: 22,
            password: "secret".to_string(),
            key_path: String::new(),
            description: "test box".to_string(),
        }
    }

    fn busy() -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY), None)
    }

    #[test]
    fn test_save_and_find_by_name() {
        let store = create_test_store();
        let request = create_test_request("web-1");

        let saved = store.save(&request).unwrap();
        let found = store.find_by_name("web-1").unwrap();

        assert_eq!(found.id, saved.id);
        assert_eq!(found.to_request(), request);
    }

    #[test]
    fn test_find_missing_host() {
        let store = create_test_store();
        let err = store.find_by_name("nope").unwrap_err();
        assert!(matches!(err, SshelfError::HostNotFound(ref n) if n == "nope"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let store = create_test_store();
        store.save(&create_test_request("web-1")).unwrap();

        let mut second = create_test_request("web-1");
        second.address = "10.9.9.9".to_string();
        let err = store.save(&second).unwrap_err();
        assert!(matches!(err, SshelfError::DuplicateName(ref n) if n == "web-1"));

        // First record is untouched
        let found = store.find_by_name("web-1").unwrap();
        assert_eq!(found.address, "10.0.0.1");
        assert_eq!(store.find_all().unwrap().len(), 1);
    }

    #[test]
    fn test_find_all() {
        let store = create_test_store();
        assert!(store.find_all().unwrap().is_empty());

        store.save(&create_test_request("b")).unwrap();
        store.save(&create_test_request("a")).unwrap();
        store.save(&create_test_request("c")).unwrap();

        let names: Vec<_> = store.find_all().unwrap().into_iter().map(|h| h.name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_update_replaces_whole_row() {
        let store = create_test_store();
        let saved = store.save(&create_test_request("web-1")).unwrap();

        // Caller changed the port but forgot to carry the description forward
        let mut request = create_test_request("web-1");
        request.port = 2222;
        request.description = String::new();

        assert_eq!(store.update(saved.id, &request).unwrap(), 1);

        let found = store.find_by_name("web-1").unwrap();
        assert_eq!(found.port, 2222);
        assert_eq!(found.description, "");
        assert_eq!(found.password, "secret");
        assert_eq!(found.created_at.timestamp(), saved.created_at.timestamp());
        assert!(found.updated_at >= saved.updated_at);
    }

    #[test]
    fn test_update_can_rename() {
        let store = create_test_store();
        let saved = store.save(&create_test_request("old")).unwrap();

        store.update(saved.id, &create_test_request("new")).unwrap();

        assert!(store.find_by_name("old").is_err());
        assert_eq!(store.find_by_name("new").unwrap().id, saved.id);
    }

    #[test]
    fn test_update_missing_id() {
        let store = create_test_store();
        let err = store.update(42, &create_test_request("ghost")).unwrap_err();
        assert!(matches!(err, SshelfError::HostNotFound(_)));
    }

    #[test]
    fn test_update_rename_onto_existing_name() {
        let store = create_test_store();
        store.save(&create_test_request("a")).unwrap();
        let b = store.save(&create_test_request("b")).unwrap();

        let err = store.update(b.id, &create_test_request("a")).unwrap_err();
        assert!(matches!(err, SshelfError::DuplicateName(_)));
    }

    #[test]
    fn test_delete_by_name() {
        let store = create_test_store();
        store.save(&create_test_request("web-1")).unwrap();

        assert_eq!(store.delete_by_name("missing").unwrap(), 0);
        assert_eq!(store.delete_by_name("web-1").unwrap(), 1);
        assert!(matches!(
            store.find_by_name("web-1").unwrap_err(),
            SshelfError::HostNotFound(_)
        ));
    }

    #[test]
    fn test_get_active_none() {
        let store = create_test_store();
        assert!(store.get_active().unwrap().is_none());
    }

    #[test]
    fn test_active_last_write_wins() {
        let store = create_test_store();
        let a = store.save(&create_test_request("a")).unwrap();
        let b = store.save(&create_test_request("b")).unwrap();

        store.set_active(&a).unwrap();
        store.set_active(&b).unwrap();
        store.set_active(&b).unwrap();

        assert_eq!(store.get_active().unwrap().unwrap().name, "b");

        let slots: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM active_host", [], |row| row.get(0))
            .unwrap();
        assert_eq!(slots, 1);
    }

    #[test]
    fn test_active_reflects_updates() {
        let store = create_test_store();
        let a = store.save(&create_test_request("a")).unwrap();
        store.set_active(&a).unwrap();

        let mut request = a.to_request();
        request.address = "192.168.1.100".to_string();
        store.update(a.id, &request).unwrap();

        assert_eq!(store.get_active().unwrap().unwrap().address, "192.168.1.100");
    }

    #[test]
    fn test_set_active_unknown_host() {
        let store = create_test_store();
        let mut ghost = store.save(&create_test_request("ghost")).unwrap();
        store.delete_by_name("ghost").unwrap();
        ghost.id += 100;

        assert!(matches!(
            store.set_active(&ghost).unwrap_err(),
            SshelfError::HostNotFound(_)
        ));
        assert!(store.get_active().unwrap().is_none());
    }

    #[test]
    fn test_active_host_deleted() {
        let store = create_test_store();
        let a = store.save(&create_test_request("a")).unwrap();
        store.set_active(&a).unwrap();
        store.delete_by_name("a").unwrap();

        assert!(store.get_active().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_timestamp_is_store_error() {
        let store = create_test_store();
        store.save(&create_test_request("broken")).unwrap();
        store
            .conn
            .execute("UPDATE hosts SET created_at = 'yesterday' WHERE name = 'broken'", [])
            .unwrap();

        match store.find_by_name("broken").unwrap_err() {
            SshelfError::Store { op, .. } => assert_eq!(op, "find host"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(store.find_all().unwrap_err(), SshelfError::Store { .. }));
    }

    #[test]
    fn test_open_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = HostStore::open(dir.path()).unwrap();
            store.save(&create_test_request("persisted")).unwrap();
        }

        assert!(HostStore::db_path(dir.path()).exists());
        let reopened = HostStore::open(dir.path()).unwrap();
        assert_eq!(reopened.find_by_name("persisted").unwrap().user, "deploy");
    }

    #[test]
    fn test_retry_succeeds_on_last_attempt() {
        let policy = RetryPolicy {
            max_attempts: 10,
            delay: Duration::ZERO,
        };
        let mut calls = 0;

        let result = policy.run(|attempt| {
            calls += 1;
            if attempt < 10 {
                Err(busy())
            } else {
                Ok(attempt)
            }
        });

        assert_eq!(result.unwrap(), 10);
        assert_eq!(calls, 10);
    }

    #[test]
    fn test_retry_gives_up_after_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: 10,
            delay: Duration::ZERO,
        };
        let mut calls = 0;

        let result: rusqlite::Result<()> = policy.run(|_| {
            calls += 1;
            Err(busy())
        });

        assert!(result.is_err());
        assert_eq!(calls, 10);
    }

    #[test]
    fn test_default_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.delay, Duration::from_millis(500));
    }
}
