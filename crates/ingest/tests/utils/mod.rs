//! Log builders, and a store and a reader which fail on demand.
#![allow(dead_code)]

use std::io::{self, BufRead, BufReader, Cursor, Read};

use feedidx_datastore::{AuthorField, AuthorRow, MemoryStore, MessageRow, Result, Store, StoreError};
use serde_json::{json, Value};

/// Build one log line.
pub fn record(key: &str, author: &str, sequence: i64, previous: Option<&str>, content: Value) -> String {
    json!({
        "key": key,
        "value": {
            "previous": previous,
            "author": author,
            "sequence": sequence,
            "timestamp": 1_580_000_000_000u64 + sequence as u64,
            "hash": "sha256",
            "content": content,
            "signature": "sig.sig.ed25519",
        },
        "timestamp": 1_590_000_000_000u64 + sequence as u64,
    })
    .to_string()
}

/// A feed of `count` plain posts by `author`, with a proper chain.
pub fn feed(author: &str, count: i64) -> Vec<String> {
    (1..=count)
        .map(|seq| {
            let previous = if seq == 1 {
                None
            } else {
                Some(format!("%{}-{}", author, seq - 1))
            };
            record(
                &format!("%{}-{}", author, seq),
                author,
                seq,
                previous.as_deref(),
                json!({"type": "post", "text": format!("post {}", seq)}),
            )
        })
        .collect()
}

pub fn about(key: &str, author: &str, sequence: i64, content: Value) -> String {
    let mut content = content;
    content["type"] = json!("about");
    record(key, author, sequence, Some("%prev"), content)
}

pub fn join(lines: &[String]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// A reader which yields `lines` and then fails, as a disk going away mid-read would.
pub fn failing_reader(lines: &[String]) -> impl BufRead {
    BufReader::new(Cursor::new(join(lines).into_bytes()).chain(Broken))
}

struct Broken;

impl Read for Broken {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "disk gone"))
    }
}

/// Wraps a [MemoryStore], failing the chosen operation.
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
    pub fail_schema: bool,
    /// Fail every author field update.
    pub fail_author_update: bool,
    /// Fail upserting the message with this key.
    pub fail_message: Option<String>,
    /// Fail the commit after this many successful ones.
    pub fail_commit_after: Option<u64>,
    pub rollbacks: u64,
}

impl FailingStore {
    fn injected(operation: &'static str) -> StoreError {
        StoreError::WriteFailed {
            operation,
            source: "injected failure".into(),
        }
    }
}

impl Store for FailingStore {
    fn ensure_schema(&mut self) -> Result<()> {
        if self.fail_schema {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        self.inner.ensure_schema()
    }

    fn begin(&mut self) -> Result<()> {
        self.inner.begin()
    }

    fn commit(&mut self) -> Result<()> {
        if self.fail_commit_after == Some(self.inner.commits()) {
            return Err(FailingStore::injected("commit"));
        }
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<()> {
        self.rollbacks += 1;
        self.inner.rollback()
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }

    fn upsert_message(&mut self, row: &MessageRow) -> Result<()> {
        if self.fail_message.as_deref() == Some(row.key.as_str()) {
            return Err(FailingStore::injected("message upsert"));
        }
        self.inner.upsert_message(row)
    }

    fn insert_author_if_absent(&mut self, key: &str) -> Result<()> {
        self.inner.insert_author_if_absent(key)
    }

    fn update_author_field(&mut self, field: AuthorField, value: &str, key: &str) -> Result<()> {
        if self.fail_author_update {
            return Err(FailingStore::injected("author update"));
        }
        self.inner.update_author_field(field, value, key)
    }

    fn count_authors(&mut self) -> Result<u64> {
        self.inner.count_authors()
    }

    fn count_messages(&mut self) -> Result<u64> {
        self.inner.count_messages()
    }

    fn get_author(&mut self, key: &str) -> Result<Option<AuthorRow>> {
        self.inner.get_author(key)
    }

    fn get_message(&mut self, key: &str) -> Result<Option<MessageRow>> {
        self.inner.get_message(key)
    }
}
