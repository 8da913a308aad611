use crate::{AuthorField, AuthorRow, MessageRow, Result};

/// The operations the ingest pipeline runs against persisted state.
///
/// Writes are only meaningful between [Store::begin] and [Store::commit]; [Store::rollback] discards everything since
/// the last `begin`.  Implementations must make `upsert_message` replace any row with the same key and
/// `insert_author_if_absent` leave an existing author untouched, which is what makes re-running ingestion over the
/// same log safe.
pub trait Store {
    /// Create the `authors` and `msgs` tables if they don't exist.
    fn ensure_schema(&mut self) -> Result<()>;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// Whether a transaction opened by [Store::begin] is still open.
    fn in_transaction(&self) -> bool;

    /// Insert or replace the message keyed by `row.key`.
    fn upsert_message(&mut self, row: &MessageRow) -> Result<()>;

    /// Create an author with all attributes null, unless one already exists.
    fn insert_author_if_absent(&mut self, key: &str) -> Result<()>;

    /// Set one attribute of an existing author.  Updating an author which doesn't exist is a no-op.
    fn update_author_field(&mut self, field: AuthorField, value: &str, key: &str) -> Result<()>;

    fn count_authors(&mut self) -> Result<u64>;

    fn count_messages(&mut self) -> Result<u64>;

    fn get_author(&mut self, key: &str) -> Result<Option<AuthorRow>>;

    fn get_message(&mut self, key: &str) -> Result<Option<MessageRow>>;
}

impl<S: Store + ?Sized> Store for &mut S {
    fn ensure_schema(&mut self) -> Result<()> {
        (**self).ensure_schema()
    }

    fn begin(&mut self) -> Result<()> {
        (**self).begin()
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> Result<()> {
        (**self).rollback()
    }

    fn in_transaction(&self) -> bool {
        (**self).in_transaction()
    }

    fn upsert_message(&mut self, row: &MessageRow) -> Result<()> {
        (**self).upsert_message(row)
    }

    fn insert_author_if_absent(&mut self, key: &str) -> Result<()> {
        (**self).insert_author_if_absent(key)
    }

    fn update_author_field(&mut self, field: AuthorField, value: &str, key: &str) -> Result<()> {
        (**self).update_author_field(field, value, key)
    }

    fn count_authors(&mut self) -> Result<u64> {
        (**self).count_authors()
    }

    fn count_messages(&mut self) -> Result<u64> {
        (**self).count_messages()
    }

    fn get_author(&mut self, key: &str) -> Result<Option<AuthorRow>> {
        (**self).get_author(key)
    }

    fn get_message(&mut self, key: &str) -> Result<Option<MessageRow>> {
        (**self).get_message(key)
    }
}
