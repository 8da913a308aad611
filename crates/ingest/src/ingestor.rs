//! The batch loop.
//!
//! One [Ingestor] indexes one log.  It owns the store for the duration of the run, so the open transaction can't be
//! touched by anything else, and it keeps all of the run's counters.
//!
//! Failure handling is split in two.  A line which doesn't decode is logged, counted, and skipped; the transaction
//! stays open.  Anything the store rejects ends the run, after rolling back the open transaction so that the store
//! is left at the last committed batch.
use std::io::BufRead;
use std::time::Instant;

use feedidx_datastore::{Store, StoreError};
use log::*;

use crate::{
    decode_bytes, project, write_message, IngestConfig, IngestError, IngestReport, Message, Result, Stage,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum BatchState {
    /// No transaction open.
    Idle,
    InBatch,
    Committing,
    Done,
}

fn store_err(stage: Stage) -> impl FnOnce(StoreError) -> IngestError {
    move |source| IngestError::Store { stage, source }
}

/// Strip the line terminator, which may be `\n` or `\r\n`.
fn trim_line_end(mut line: &[u8]) -> &[u8] {
    if let Some(rest) = line.strip_suffix(b"\n") {
        line = rest;
        if let Some(rest) = line.strip_suffix(b"\r") {
            line = rest;
        }
    }
    line
}

pub struct Ingestor<S> {
    store: S,
    config: IngestConfig,
    state: BatchState,

    /// Messages indexed since the last commit.
    in_batch: u64,
    processed: u64,
    malformed: u64,
    lines_read: u64,
    commits: u64,
    limit_reached: bool,
}

impl<S: Store> Ingestor<S> {
    pub fn new(store: S, config: IngestConfig) -> Ingestor<S> {
        Ingestor {
            store,
            config,
            state: BatchState::Idle,
            in_batch: 0,
            processed: 0,
            malformed: 0,
            lines_read: 0,
            commits: 0,
            limit_reached: false,
        }
    }

    /// Index every line of `reader`, up to the configured limit.
    ///
    /// Once the limit is reached no further lines are read, so a reader passed by reference is left positioned just
    /// after the last indexed message.
    pub fn run<R: BufRead>(mut self, mut reader: R) -> Result<IngestReport> {
        let start = Instant::now();
        info!(
            "Indexing up to {} messages, committing every {}",
            self.config.limit(),
            self.config.commit_every()
        );

        self.store
            .ensure_schema()
            .map_err(store_err(Stage::EnsuringSchema))?;
        self.begin()?;

        if let Err(e) = self.consume(&mut reader) {
            self.abort();
            return Err(e);
        }
        self.commit()?;
        self.state = BatchState::Done;

        let author_count = self
            .store
            .count_authors()
            .map_err(store_err(Stage::CountingAuthors))?;

        Ok(IngestReport {
            commit_every: self.config.commit_every(),
            processed: self.processed,
            malformed: self.malformed,
            lines_read: self.lines_read,
            commits: self.commits,
            limit_reached: self.limit_reached,
            elapsed: start.elapsed(),
            author_count,
        })
    }

    /// Read lines until the log ends or the limit is hit, committing at batch boundaries.
    ///
    /// Returns with a transaction still open; the caller commits it.
    fn consume<R: BufRead>(&mut self, reader: &mut R) -> Result<()> {
        let mut buf = vec![];

        loop {
            buf.clear();
            let line = self.lines_read + 1;
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|source| IngestError::Source { line, source })?;
            if read == 0 {
                debug!("End of log after {} lines", self.lines_read);
                return Ok(());
            }
            self.lines_read = line;

            let message = match decode_bytes(trim_line_end(&buf)) {
                Ok(m) => m,
                Err(e) => {
                    self.malformed += 1;
                    warn!("Skipping malformed line {}: {}", line, e);
                    continue;
                }
            };

            self.ingest(&message)?;
            self.processed += 1;
            self.in_batch += 1;

            if self.processed >= self.config.limit() {
                info!("Reached the limit of {} messages", self.config.limit());
                self.limit_reached = true;
                return Ok(());
            }

            if self.in_batch >= self.config.commit_every() {
                self.commit()?;
                self.begin()?;
            }
        }
    }

    /// Apply one message: create its author if this starts their feed, write it, then apply any profile updates.
    fn ingest(&mut self, message: &Message) -> Result<()> {
        debug_assert_eq!(self.state, BatchState::InBatch);
        let projection = project(message);

        if let Some(author) = projection.create.as_deref() {
            self.store
                .insert_author_if_absent(author)
                .map_err(store_err(Stage::CreatingAuthor))?;
        }

        write_message(&mut self.store, message).map_err(store_err(Stage::WritingMessage))?;

        for (field, value) in projection.updates.iter() {
            self.store
                .update_author_field(*field, value, &message.author)
                .map_err(store_err(Stage::UpdatingAuthor))?;
        }

        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        debug_assert_eq!(self.state, BatchState::Idle);
        self.store.begin().map_err(store_err(Stage::Beginning))?;
        self.state = BatchState::InBatch;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        debug_assert_eq!(self.state, BatchState::InBatch);
        self.state = BatchState::Committing;

        if let Err(e) = self.store.commit() {
            self.abort();
            return Err(store_err(Stage::Committing)(e));
        }

        self.commits += 1;
        debug!(
            "Committed {} messages ({} total)",
            self.in_batch, self.processed
        );
        self.in_batch = 0;
        self.state = BatchState::Idle;
        Ok(())
    }

    /// Roll back whatever is open so that the store is left at the last commit.
    fn abort(&mut self) {
        if self.store.in_transaction() {
            match self.store.rollback() {
                Ok(()) => warn!(
                    "Rolled back {} uncommitted messages; {} messages remain committed",
                    self.in_batch,
                    self.processed - self.in_batch
                ),
                Err(e) => error!("Rollback failed: {}", e),
            }
        }
        self.state = BatchState::Done;
    }
}
