//! A store kept entirely in maps.
//!
//! Rollback is implemented with an undo log: every write inside a transaction records the row it displaced, and
//! rolling back replays those records in reverse.
use std::collections::BTreeMap;

use crate::{AuthorField, AuthorRow, MessageRow, Result, Store, StoreError};

#[derive(Debug)]
enum Undo {
    Message(String, Option<MessageRow>),
    Author(String, Option<AuthorRow>),
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    has_schema: bool,
    authors: BTreeMap<String, AuthorRow>,
    msgs: BTreeMap<String, MessageRow>,
    /// `Some` while a transaction is open.
    undo: Option<Vec<Undo>>,
    commits: u64,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        Default::default()
    }

    /// How many transactions have been committed over the life of this store.
    pub fn commits(&self) -> u64 {
        self.commits
    }

    pub fn iter_authors(&self) -> impl Iterator<Item = &AuthorRow> {
        self.authors.values()
    }

    pub fn iter_messages(&self) -> impl Iterator<Item = &MessageRow> {
        self.msgs.values()
    }

    fn check_schema(&self) -> Result<()> {
        if !self.has_schema {
            return Err(StoreError::unavailable("Tables have not been created"));
        }
        Ok(())
    }

    fn record(&mut self, undo: Undo) {
        if let Some(log) = self.undo.as_mut() {
            log.push(undo);
        }
    }
}

impl Store for MemoryStore {
    fn ensure_schema(&mut self) -> Result<()> {
        self.has_schema = true;
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        self.check_schema()?;
        if self.undo.is_some() {
            return Err(StoreError::TransactionAlreadyOpen);
        }
        self.undo = Some(vec![]);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.undo.take().is_none() {
            return Err(StoreError::NoTransaction("commit"));
        }
        self.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let log = self
            .undo
            .take()
            .ok_or(StoreError::NoTransaction("roll back"))?;

        for entry in log.into_iter().rev() {
            match entry {
                Undo::Message(key, Some(row)) => {
                    self.msgs.insert(key, row);
                }
                Undo::Message(key, None) => {
                    self.msgs.remove(&key);
                }
                Undo::Author(key, Some(row)) => {
                    self.authors.insert(key, row);
                }
                Undo::Author(key, None) => {
                    self.authors.remove(&key);
                }
            }
        }

        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.undo.is_some()
    }

    fn upsert_message(&mut self, row: &MessageRow) -> Result<()> {
        self.check_schema()?;
        let old = self.msgs.insert(row.key.clone(), row.clone());
        self.record(Undo::Message(row.key.clone(), old));
        Ok(())
    }

    fn insert_author_if_absent(&mut self, key: &str) -> Result<()> {
        self.check_schema()?;
        if self.authors.contains_key(key) {
            return Ok(());
        }
        self.authors.insert(key.to_string(), AuthorRow::new(key));
        self.record(Undo::Author(key.to_string(), None));
        Ok(())
    }

    fn update_author_field(&mut self, field: AuthorField, value: &str, key: &str) -> Result<()> {
        self.check_schema()?;
        let row = match self.authors.get_mut(key) {
            Some(r) => r,
            None => return Ok(()),
        };
        let old = row.clone();
        row.set(field, value.to_string());
        self.record(Undo::Author(key.to_string(), Some(old)));
        Ok(())
    }

    fn count_authors(&mut self) -> Result<u64> {
        self.check_schema()?;
        Ok(self.authors.len() as u64)
    }

    fn count_messages(&mut self) -> Result<u64> {
        self.check_schema()?;
        Ok(self.msgs.len() as u64)
    }

    fn get_author(&mut self, key: &str) -> Result<Option<AuthorRow>> {
        self.check_schema()?;
        Ok(self.authors.get(key).cloned())
    }

    fn get_message(&mut self, key: &str) -> Result<Option<MessageRow>> {
        self.check_schema()?;
        Ok(self.msgs.get(key).cloned())
    }
}
