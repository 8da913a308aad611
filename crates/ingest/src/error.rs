use feedidx_datastore::StoreError;

/// A log line which couldn't be decoded into a [crate::Message].
///
/// These are never fatal: the ingestor counts them, logs them, and moves on to the next line.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum MalformedRecord {
    #[error("Line is not valid UTF-8")]
    NotUtf8,

    #[error("Line is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("Record is not a JSON object")]
    NotAnObject,

    #[error("Record is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("Field `{field}` should be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Expected a whole number, got {0:?}")]
    NotANumber(String),

    #[error("Expected a number of at least 1, got {0}")]
    NotPositive(i64),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where in a run a storage failure happened.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    EnsuringSchema,
    Beginning,
    CreatingAuthor,
    WritingMessage,
    UpdatingAuthor,
    Committing,
    CountingAuthors,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::EnsuringSchema => "ensuring schema",
            Stage::Beginning => "opening transaction",
            Stage::CreatingAuthor => "creating author",
            Stage::WritingMessage => "writing message",
            Stage::UpdatingAuthor => "updating author",
            Stage::Committing => "committing",
            Stage::CountingAuthors => "counting authors",
        };
        f.write_str(s)
    }
}

/// Errors which end a run.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum IngestError {
    #[error(transparent)]
    InvalidConfiguration(#[from] ConfigError),

    #[error("Storage failure while {stage}: {source}")]
    Store {
        stage: Stage,
        #[source]
        source: StoreError,
    },

    #[error("Could not read line {line} of the log: {source}")]
    Source {
        line: u64,
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    /// The stage a storage failure happened in, if this is one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            IngestError::Store { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
