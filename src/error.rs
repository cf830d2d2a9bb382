use thiserror::Error;

/// Errors surfaced by the reader chain
#[derive(Error, Debug)]
pub enum Error {
    /// The byte source failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte source has no more data right now
    #[error("end of stream")]
    Eof,

    /// The codec rejected its input outright
    #[error("decoding error: {0}")]
    Decode(String),

    #[error("invalid checkpoint: stream offset {stream} is behind segment offset {segment}")]
    InvalidState { stream: u64, segment: u64 },

    #[error("checkpoint can only be applied before the first line is read")]
    ReaderStarted,

    #[error("checkpoint lies beyond the data available from the source")]
    CheckpointBeyondSource,

    /// A container log record could not be parsed. `bytes` is the raw byte
    /// count consumed by the failed call so callers can keep offsets moving.
    #[error("parse error: {reason}")]
    Parse { reason: String, bytes: usize },

    #[error("timeout waiting for the next line")]
    Timeout,

    #[error("timeout reader worker exited without reporting")]
    WorkerLost,

    #[error("configuration error: {0}")]
    Config(String),

    /// A checkpoint could not be loaded or persisted
    #[error("checkpoint store error: {0}")]
    Checkpoint(String),
}

impl Error {
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::Eof)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
