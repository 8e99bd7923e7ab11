use thiserror::Error;

/// Failures surfaced by the storage layer (§7: storage integrity / I/O failure).
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("record index {0} out of range")]
    OutOfRange(u64),

    #[error("info slot {0} out of range")]
    InfoSlotOutOfRange(usize),

    #[error("sub-range update exceeds stored array length (id={id}, len={len}, offset={offset}, n={n})")]
    VarIntRangeExceeded {
        id: u64,
        len: usize,
        offset: usize,
        n: usize,
    },

    #[error("dangling pointer: {0}")]
    DanglingPointer(String),

    #[error("inconsistent page: {0}")]
    InconsistentPage(String),
}

pub type Result<T> = std::result::Result<T, Error>;
