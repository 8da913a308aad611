use std::time::Duration;

/// What a finished run did.  Purely informational.
#[derive(Clone, Debug, PartialEq)]
pub struct IngestReport {
    /// The batch size the run used.
    pub commit_every: u64,
    /// Messages indexed.
    pub processed: u64,
    /// Lines skipped because they couldn't be decoded.
    pub malformed: u64,
    /// Lines read from the log, including malformed ones.
    pub lines_read: u64,
    pub commits: u64,
    /// Whether the run stopped at its limit rather than at the end of the log.
    pub limit_reached: bool,
    pub elapsed: Duration,
    /// Authors in the store once the run finished.
    pub author_count: u64,
}

impl IngestReport {
    pub fn seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn messages_per_second(&self) -> f64 {
        let secs = self.seconds();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }

    pub fn ms_per_message(&self) -> f64 {
        if self.processed > 0 {
            self.seconds() * 1000.0 / self.processed as f64
        } else {
            0.0
        }
    }

    /// The summary printed at the end of a run, one entry per line.
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!("commit transaction every {} messages", self.commit_every),
            format!("{} total messages", self.processed),
            format!("{} malformed lines skipped", self.malformed),
            format!("{:.1} seconds", self.seconds()),
            format!("{:.1} messages per second", self.messages_per_second()),
            format!("{:.3} ms per message", self.ms_per_message()),
            format!("{} authors in table", self.author_count),
        ]
    }
}

impl std::fmt::Display for IngestReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary_lines().join("\n"))
    }
}
