//! End to end runs of the ingestor against both stores.
mod utils;

use anyhow::Result;
use feedidx_datastore::{AuthorRow, MemoryStore, OpenMode, SqliteStore, Store};
use feedidx_ingest::{IngestConfig, IngestError, IngestReport, Ingestor, Stage};
use pretty_assertions::assert_eq;
use serde_json::json;

use utils::*;

fn run<S: Store>(store: S, config: IngestConfig, log: &str) -> Result<IngestReport, IngestError> {
    feedidx_logging::log_to_stderr_with_filter("debug");
    Ingestor::new(store, config).run(log.as_bytes())
}

fn run_default<S: Store>(store: S, log: &str) -> IngestReport {
    run(store, IngestConfig::default(), log).expect("Run should succeed")
}

#[test]
fn same_key_twice_keeps_the_second() -> Result<()> {
    let first = record("%m", "@a", 1, None, json!({"type": "post", "text": "one"}));
    let second = record("%m", "@a", 9, None, json!({"type": "post", "text": "two"}));

    let mut store = MemoryStore::new();
    let report = run_default(&mut store, &join(&[first, second]));
    assert_eq!(report.processed, 2);

    assert_eq!(store.count_messages()?, 1);
    let row = store.get_message("%m")?.expect("Row should exist");
    assert_eq!(row.sequence, 9);
    assert_eq!(row.content, r#"{"text":"two","type":"post"}"#);
    Ok(())
}

#[test]
fn only_self_descriptions_change_authors() -> Result<()> {
    let mut log = feed("@a", 1);
    log.extend(feed("@b", 1));
    log.push(about("%a-about-b", "@a", 2, json!({"about": "@b", "name": "not bob"})));
    log.push(about("%a-about-a", "@a", 3, json!({"about": "@a", "name": "alice"})));

    let mut store = MemoryStore::new();
    run_default(&mut store, &join(&log));

    assert_eq!(store.get_author("@b")?, Some(AuthorRow::new("@b")));
    let mut alice = AuthorRow::new("@a");
    alice.name = Some("alice".into());
    assert_eq!(store.get_author("@a")?, Some(alice));
    // Third party claims are still indexed as messages.
    assert!(store.get_message("%a-about-b")?.is_some());
    Ok(())
}

#[test]
fn partial_updates_leave_other_fields() -> Result<()> {
    let mut log = feed("@a", 1);
    log.push(about(
        "%2",
        "@a",
        2,
        json!({"about": "@a", "name": "alice", "image": {"link": "&img1"}}),
    ));
    log.push(about(
        "%3",
        "@a",
        3,
        json!({"about": "@a", "name": "", "description": "hello"}),
    ));

    let mut store = MemoryStore::new();
    run_default(&mut store, &join(&log));

    assert_eq!(
        store.get_author("@a")?,
        Some(AuthorRow {
            key: "@a".into(),
            name: Some("alice".into()),
            description: Some("hello".into()),
            image: Some("&img1".into()),
        })
    );
    Ok(())
}

#[test]
fn image_variants() -> Result<()> {
    let cases = [
        (json!({"link": "x"}), Some("x")),
        (json!("x"), Some("x")),
        (json!(""), Some("old")),
        (serde_json::Value::Null, Some("old")),
    ];

    for (image, expected) in cases {
        let mut log = feed("@a", 1);
        log.push(about("%2", "@a", 2, json!({"about": "@a", "image": "old"})));
        log.push(about("%3", "@a", 3, json!({"about": "@a", "image": image})));

        let mut store = SqliteStore::open_in_memory()?;
        run_default(&mut store, &join(&log));
        let author = store.get_author("@a")?.expect("Author should exist");
        assert_eq!(author.image.as_deref(), expected);
    }
    Ok(())
}

#[test]
fn chain_start_creates_authors_with_null_attributes() -> Result<()> {
    let mut store = SqliteStore::open_in_memory()?;
    let log = join(&feed("@new", 1));
    let report = run_default(&mut store, &log);

    assert_eq!(report.author_count, 1);
    assert_eq!(store.get_author("@new")?, Some(AuthorRow::new("@new")));
    Ok(())
}

#[test]
fn messages_without_a_chain_start_dont_create_authors() -> Result<()> {
    let mut store = MemoryStore::new();
    // Starts mid-feed: the author is referenced but never created.
    let log = join(&feed("@a", 3)[1..]);
    let report = run_default(&mut store, &log);

    assert_eq!(report.processed, 2);
    assert_eq!(store.count_authors()?, 0);
    assert_eq!(store.get_message("%@a-2")?.map(|m| m.author), Some("@a".into()));
    Ok(())
}

#[test]
fn storage_failure_keeps_committed_batches() -> Result<()> {
    let log = join(&feed("@a", 5));
    let mut store = FailingStore {
        fail_message: Some("%@a-5".into()),
        ..Default::default()
    };

    let err = run(&mut store, IngestConfig::new(100, 2)?, &log).expect_err("Run should fail");
    assert_eq!(err.stage(), Some(Stage::WritingMessage));

    assert_eq!(store.rollbacks, 1);
    assert!(!store.in_transaction());
    assert_eq!(store.inner.commits(), 2);
    let keys = store
        .inner
        .iter_messages()
        .map(|m| m.key.clone())
        .collect::<Vec<_>>();
    assert_eq!(keys, vec!["%@a-1", "%@a-2", "%@a-3", "%@a-4"]);
    Ok(())
}

#[test]
fn undecodable_last_line_keeps_earlier_batches() -> Result<()> {
    let mut lines = feed("@a", 4);
    lines.push("{\"key\": \"%5\", \"value\": ".to_string());

    let mut store = MemoryStore::new();
    let report = run(&mut store, IngestConfig::new(100, 2)?, &join(&lines))?;

    assert_eq!(report.processed, 4);
    assert_eq!(report.malformed, 1);
    assert_eq!(store.count_messages()?, 4);
    Ok(())
}

#[test]
fn commit_failure_rolls_back_the_batch() -> Result<()> {
    let log = join(&feed("@a", 5));
    let mut store = FailingStore {
        fail_commit_after: Some(1),
        ..Default::default()
    };

    let err = run(&mut store, IngestConfig::new(100, 2)?, &log).expect_err("Run should fail");
    assert!(matches!(
        err,
        IngestError::Store {
            stage: Stage::Committing,
            ..
        }
    ));
    assert!(err.to_string().contains("committing"), "{}", err);
    assert_eq!(store.inner.count_messages()?, 2);
    assert!(!store.in_transaction());
    Ok(())
}

#[test]
fn read_error_rolls_back_the_open_batch() -> Result<()> {
    let mut store = FailingStore::default();
    let reader = failing_reader(&feed("@a", 3));

    let err = Ingestor::new(&mut store, IngestConfig::new(100, 2)?)
        .run(reader)
        .expect_err("Run should fail");
    assert!(matches!(err, IngestError::Source { line: 4, .. }), "{}", err);
    assert_eq!(err.to_string(), "Could not read line 4 of the log: disk gone");
    assert_eq!(err.stage(), None);

    assert!(!store.in_transaction());
    assert_eq!(store.rollbacks, 1);
    assert_eq!(store.inner.commits(), 1);
    assert_eq!(store.inner.count_messages()?, 2);
    Ok(())
}

#[test]
fn schema_failure_is_fatal() -> Result<()> {
    let mut store = FailingStore {
        fail_schema: true,
        ..Default::default()
    };

    let err = run(&mut store, IngestConfig::default(), &join(&feed("@a", 2))).expect_err("Run should fail");
    assert_eq!(err.stage(), Some(Stage::EnsuringSchema));
    assert!(err.to_string().contains("ensuring schema"), "{}", err);

    assert!(!store.in_transaction());
    assert_eq!(store.rollbacks, 0);
    assert_eq!(store.inner.commits(), 0);
    assert_eq!(store.inner.iter_messages().count(), 0);
    Ok(())
}

#[test]
fn author_update_failure_rolls_back() -> Result<()> {
    let mut log = feed("@a", 3);
    log.push(about("%a-about", "@a", 4, json!({"about": "@a", "name": "alice"})));
    let mut store = FailingStore {
        fail_author_update: true,
        ..Default::default()
    };

    let err = run(&mut store, IngestConfig::new(100, 2)?, &join(&log)).expect_err("Run should fail");
    assert_eq!(err.stage(), Some(Stage::UpdatingAuthor));

    assert!(!store.in_transaction());
    assert_eq!(store.rollbacks, 1);
    assert_eq!(store.inner.commits(), 1);
    assert_eq!(store.inner.count_messages()?, 2);
    assert!(store.inner.get_message("%a-about")?.is_none());
    assert_eq!(store.inner.get_author("@a")?, Some(AuthorRow::new("@a")));
    Ok(())
}

#[test]
fn limit_stops_reading() -> Result<()> {
    let lines = feed("@a", 10);
    let log = join(&lines);
    let mut remaining = log.as_bytes();

    let mut store = MemoryStore::new();
    let report = Ingestor::new(&mut store, IngestConfig::new(3, 1000)?).run(&mut remaining)?;

    assert_eq!(report.processed, 3);
    assert!(report.limit_reached);
    assert_eq!(store.count_messages()?, 3);
    assert!(std::str::from_utf8(remaining)?.starts_with(&lines[3]));
    Ok(())
}

#[test]
fn limit_on_a_batch_boundary_commits_once() -> Result<()> {
    let mut store = MemoryStore::new();
    let report = run(&mut store, IngestConfig::new(4, 2)?, &join(&feed("@a", 10)))?;
    assert_eq!(report.processed, 4);
    assert_eq!(report.commits, 2);
    Ok(())
}

#[test]
fn malformed_lines_are_skipped() -> Result<()> {
    let lines = feed("@a", 3);
    let log = join(&[
        lines[0].clone(),
        "this is not json".to_string(),
        lines[1].clone(),
        r#"{"key": "%no-value"}"#.to_string(),
        lines[2].clone(),
    ]);

    let mut store = SqliteStore::open_in_memory()?;
    let report = run_default(&mut store, &log);

    assert_eq!(report.processed, 3);
    assert_eq!(report.malformed, 2);
    assert_eq!(report.lines_read, 5);
    assert_eq!(store.count_messages()?, 3);
    Ok(())
}

/// Indexing the same log twice into an appended database gives the same tables.
#[test]
fn reruns_are_idempotent() -> Result<()> {
    let tdir = tempfile::TempDir::new()?;
    let path = tdir.path().join("db.sqlite");

    let mut log = feed("@a", 3);
    log.extend(feed("@b", 2));
    log.push(about("%a-about", "@a", 4, json!({"about": "@a", "name": "alice"})));
    let log = join(&log);

    let first = {
        let mut store = SqliteStore::open(&path, OpenMode::Reindex)?;
        run(&mut store, IngestConfig::new(100, 2)?, &log)?;
        (
            store.get_author("@a")?,
            store.get_message("%@b-2")?,
            store.count_messages()?,
        )
    };

    let mut store = SqliteStore::open(&path, OpenMode::Append)?;
    let report = run(&mut store, IngestConfig::new(100, 3)?, &log)?;
    assert_eq!(report.author_count, 2);
    assert_eq!(
        (
            store.get_author("@a")?,
            store.get_message("%@b-2")?,
            store.count_messages()?,
        ),
        first
    );
    Ok(())
}
