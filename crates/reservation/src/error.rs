use thiserror::Error;

/// The concurrency-free reservation state machine's error taxonomy (§7):
/// validation and not-found are surfaced to the caller as a negative
/// status with no state change; `Storage` propagates structural/I/O
/// failures, which a caller should treat as fatal (§7: "the process is
/// expected to terminate, as there is no journaling").
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(&'static str),

    #[error("access denied")]
    Acl,

    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error(transparent)]
    Storage(#[from] storage::Error),

    #[error(transparent)]
    Date(#[from] model::DateError),

    #[error(transparent)]
    FixedStr(#[from] model::FixedStrError),
}

pub type Result<T> = std::result::Result<T, Error>;
