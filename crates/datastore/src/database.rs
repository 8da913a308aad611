//! The database wraps a rusqlite connection and implements [Store] over it.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::*;
use rusqlite::OptionalExtension;

use crate::{schema, AuthorField, AuthorRow, MessageRow, Result, Store, StoreError};

/// What to do with a database which already exists at the path being opened.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OpenMode {
    /// Delete the existing database (and its journal files) so that the log is indexed from scratch.
    #[default]
    Reindex,
    /// Keep existing rows.  Upserts make indexing the same log again harmless.
    Append,
}

/// SQL that we run as part of opening a connection.
///
/// - Enables the busy timeout.
/// - Raises the default cache size; the one sqlite sets up for us is only a couple megabytes.
/// - Sets up WAL, and keeps the WAL from growing without bound between our (large) batch commits.
const INITIAL_SQL: &str = r#"
PRAGMA busy_timeout = 1000;
PRAGMA cache_size = -100000;
pragma journal_mode = WAL;
PRAGMA wal_autocheckpoint = 10000;
"#;

const UPSERT_MESSAGE: &str = r#"
INSERT OR REPLACE INTO msgs (
    key, sequence, author, content, timestampReceived, timestampAsserted
) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;

const INSERT_AUTHOR: &str = "INSERT OR IGNORE INTO authors (key) VALUES (?1)";

const UPDATE_AUTHOR_TEMPLATE: &str = "UPDATE authors SET {{ column }} = ?1 WHERE key = ?2";

const SELECT_AUTHOR: &str = "SELECT key, name, description, image FROM authors WHERE key = ?1";

const SELECT_MESSAGE: &str = r#"
SELECT key, sequence, author, content, timestampReceived, timestampAsserted FROM msgs WHERE key = ?1
"#;

/// Files sqlite may leave next to a database, which a reindex must also remove.
const SIDECAR_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

/// Build one update statement per author attribute.
fn build_update_statements() -> Result<HashMap<AuthorField, String>> {
    let mut ret: HashMap<AuthorField, String> = Default::default();

    for field in AuthorField::ALL {
        let mut context = tera::Context::new();
        context.insert("column", field.column());
        let stmt = tera::Tera::one_off(UPDATE_AUTHOR_TEMPLATE, &context, false)
            .map_err(StoreError::unavailable)?;
        debug!("Update statement for {}: {}", field, stmt);
        ret.insert(field, stmt);
    }

    Ok(ret)
}

/// Delete `path` and any sidecar files, tolerating any of them being absent.
fn remove_existing(path: &Path) -> Result<()> {
    let mut candidates = vec![path.to_path_buf()];
    candidates.extend(SIDECAR_SUFFIXES.iter().map(|suffix| {
        let mut p = path.as_os_str().to_owned();
        p.push(suffix);
        PathBuf::from(p)
    }));

    for candidate in candidates {
        match std::fs::remove_file(&candidate) {
            Ok(()) => info!("Removed {} for reindexing", candidate.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::unavailable(e)),
        }
    }

    Ok(())
}

pub struct SqliteStore {
    conn: rusqlite::Connection,
    /// Maps each author field to its prebuilt update statement.
    update_statements: HashMap<AuthorField, String>,
    in_transaction: bool,
}

impl SqliteStore {
    pub fn open(path: &Path, mode: OpenMode) -> Result<Self> {
        if mode == OpenMode::Reindex {
            remove_existing(path)?;
        }

        info!("Opening database at {} ({:?})", path.display(), mode);
        let conn = rusqlite::Connection::open(path).map_err(StoreError::unavailable)?;
        SqliteStore::with_connection(conn)
    }

    /// A database which lives only as long as the store does.
    pub fn open_in_memory() -> Result<Self> {
        info!("Opening in-memory database");
        let conn = rusqlite::Connection::open_in_memory().map_err(StoreError::unavailable)?;
        SqliteStore::with_connection(conn)
    }

    /// Build a store from an already-existing connection.
    pub fn with_connection(conn: rusqlite::Connection) -> Result<Self> {
        conn.execute_batch(INITIAL_SQL)
            .map_err(StoreError::unavailable)?;
        Ok(SqliteStore {
            conn,
            update_statements: build_update_statements()?,
            in_transaction: false,
        })
    }

    fn count(&self, table: &str) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .map_err(StoreError::unavailable)?;
        Ok(n as u64)
    }
}

impl Store for SqliteStore {
    fn ensure_schema(&mut self) -> Result<()> {
        schema::ensure_tables(&mut self.conn).map_err(StoreError::unavailable)
    }

    fn begin(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(StoreError::TransactionAlreadyOpen);
        }

        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(StoreError::write_failed("begin"))?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(StoreError::NoTransaction("commit"));
        }

        // On failure the transaction stays open so that the caller can roll it back.
        self.conn
            .execute_batch("COMMIT")
            .map_err(StoreError::write_failed("commit"))?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(StoreError::NoTransaction("roll back"));
        }

        // Some errors make sqlite roll back on its own.
        if self.conn.is_autocommit() {
            warn!("Transaction was already rolled back by sqlite");
            self.in_transaction = false;
            return Ok(());
        }

        // If this fails sqlite still has the transaction, and so do we.
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(StoreError::write_failed("rollback"))?;
        self.in_transaction = false;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn upsert_message(&mut self, row: &MessageRow) -> Result<()> {
        let mut statement = self
            .conn
            .prepare_cached(UPSERT_MESSAGE)
            .map_err(StoreError::write_failed("message upsert"))?;
        statement
            .execute(rusqlite::params![
                row.key,
                row.sequence,
                row.author,
                row.content,
                row.timestamp_received,
                row.timestamp_asserted,
            ])
            .map_err(StoreError::write_failed("message upsert"))?;
        Ok(())
    }

    fn insert_author_if_absent(&mut self, key: &str) -> Result<()> {
        let mut statement = self
            .conn
            .prepare_cached(INSERT_AUTHOR)
            .map_err(StoreError::write_failed("author insert"))?;
        statement
            .execute([key])
            .map_err(StoreError::write_failed("author insert"))?;
        Ok(())
    }

    fn update_author_field(&mut self, field: AuthorField, value: &str, key: &str) -> Result<()> {
        let query_text = self
            .update_statements
            .get(&field)
            .expect("Statements are built for every author field");
        let mut statement = self
            .conn
            .prepare_cached(query_text)
            .map_err(StoreError::write_failed("author update"))?;
        statement
            .execute([value, key])
            .map_err(StoreError::write_failed("author update"))?;
        Ok(())
    }

    fn count_authors(&mut self) -> Result<u64> {
        self.count("authors")
    }

    fn count_messages(&mut self) -> Result<u64> {
        self.count("msgs")
    }

    fn get_author(&mut self, key: &str) -> Result<Option<AuthorRow>> {
        self.conn
            .query_row(SELECT_AUTHOR, [key], |r| {
                Ok(AuthorRow {
                    key: r.get(0)?,
                    name: r.get(1)?,
                    description: r.get(2)?,
                    image: r.get(3)?,
                })
            })
            .optional()
            .map_err(StoreError::unavailable)
    }

    fn get_message(&mut self, key: &str) -> Result<Option<MessageRow>> {
        self.conn
            .query_row(SELECT_MESSAGE, [key], |r| {
                Ok(MessageRow {
                    key: r.get(0)?,
                    sequence: r.get(1)?,
                    author: r.get(2)?,
                    content: r.get(3)?,
                    timestamp_received: r.get(4)?,
                    timestamp_asserted: r.get(5)?,
                })
            })
            .optional()
            .map_err(StoreError::unavailable)
    }
}
