use crate::{ConfigError, IngestError, Result};

pub const DEFAULT_LIMIT: u64 = 100_000;
pub const DEFAULT_COMMIT_EVERY: u64 = 1000;

/// Parameters of one ingestion run.
#[derive(Clone, Debug, PartialEq, Eq, derive_builder::Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct IngestConfig {
    /// Stop reading after this many messages have been indexed.
    ///
    /// Malformed lines don't count.
    #[builder(default = "DEFAULT_LIMIT")]
    limit: u64,

    /// Commit the open transaction, and open a new one, after this many messages.
    #[builder(default = "DEFAULT_COMMIT_EVERY")]
    commit_every: u64,
}

impl IngestConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.limit == Some(0) {
            return Err("limit must be at least 1".into());
        }
        if self.commit_every == Some(0) {
            return Err("commit_every must be at least 1".into());
        }
        Ok(())
    }
}

impl IngestConfig {
    pub fn new(limit: u64, commit_every: u64) -> Result<IngestConfig> {
        let config = IngestConfigBuilder::default()
            .limit(limit)
            .commit_every(commit_every)
            .build()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(config)
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn commit_every(&self) -> u64 {
        self.commit_every
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            limit: DEFAULT_LIMIT,
            commit_every: DEFAULT_COMMIT_EVERY,
        }
    }
}

/// Parse a limit or batch size given as text.
///
/// Anything which isn't a whole number of at least 1 is rejected.
pub fn parse_count(s: &str) -> Result<u64, ConfigError> {
    let n: i64 = s
        .trim()
        .parse()
        .map_err(|_| ConfigError::NotANumber(s.to_string()))?;
    if n < 1 {
        return Err(ConfigError::NotPositive(n));
    }
    Ok(n as u64)
}
