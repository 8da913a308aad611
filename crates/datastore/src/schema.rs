//! Table definitions.
//!
//! Both tables are keyed by the identifiers used in the log itself.  There is intentionally no foreign key from
//! `msgs.author` to `authors.key`: a message may be indexed before its author's first message has been seen, or
//! without it ever being seen.

/// Authors, one row per feed.  Attribute columns are nullable and only ever set from the author's own `about`
/// messages.
pub const AUTHORS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS authors (
    key VARCHAR(53) PRIMARY KEY,
    name TEXT,
    description TEXT,
    image TEXT
)"#;

/// Messages, one row per message key.  `content` is the canonical JSON of the message content.
pub const MSGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS msgs (
    key VARCHAR(52) NOT NULL PRIMARY KEY,
    sequence INTEGER NOT NULL,
    author VARCHAR(53) NOT NULL,
    content TEXT NOT NULL,
    timestampReceived NUMBER,
    timestampAsserted NUMBER NOT NULL
)"#;

/// `(name, ddl)` for every table, in creation order.
pub const TABLES: [(&str, &str); 2] = [("authors", AUTHORS_TABLE), ("msgs", MSGS_TABLE)];

/// Create any missing tables.  Safe to run against a database which already has them.
pub(crate) fn ensure_tables(conn: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    use itertools::Itertools;

    let transaction = conn.transaction()?;
    for (_, ddl) in TABLES.iter() {
        transaction.execute(ddl, [])?;
    }
    transaction.commit()?;

    log::debug!(
        "Ensured tables: {}",
        TABLES.iter().map(|(name, _)| name).join(", ")
    );
    Ok(())
}
