//! Error taxonomy of the listener core.
//!
//! Framing and sink failures are fatal to the pipeline. Projection failures
//! are recoverable unless they reveal a type mismatch. Payloads that are not
//! JSON never surface here: the event decoder logs and skips them.

use thiserror::Error;

/// Failure to reconstruct chunk boundaries from the byte source.
#[derive(Error, Debug)]
pub enum FramingError {
    /// Source ended before a complete length line, payload or terminator.
    #[error("stream closed while reading {0}")]
    StreamClosed(&'static str),

    /// Length line is not a base-16 integer.
    #[error("invalid chunk length line {0:?}")]
    InvalidLength(String),

    /// Length line did not end within the allowed number of bytes.
    #[error("chunk length line exceeds {0} bytes")]
    LengthLineTooLong(usize),

    /// Declared chunk length is larger than the configured maximum.
    #[error("chunk of {len} bytes exceeds maximum of {max} bytes")]
    ChunkTooLarge { len: u64, max: usize },

    /// Payload was not followed by CR LF.
    #[error("chunk payload not terminated by CRLF (got {0:?})")]
    MissingTerminator([u8; 2]),

    /// I/O error on the byte source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to project a raw event onto a [`Record`](crate::projector::Record).
#[derive(Error, Debug)]
pub enum ProjectionError {
    /// Required path absent (or null) in the event.
    #[error("missing field {0}")]
    MissingField(&'static str),

    /// `event.time` cannot be read as a millisecond timestamp.
    #[error("malformed timestamp {raw}: {reason}")]
    MalformedTimestamp { raw: String, reason: String },

    /// Field is present but holds an unexpected JSON type.
    #[error("type mismatch at {path}: expected {expected}")]
    TypeMismatch {
        path: &'static str,
        expected: &'static str,
    },
}

impl ProjectionError {
    /// Whether the pipeline may skip the event and keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ProjectionError::MissingField(_) | ProjectionError::MalformedTimestamp { .. }
        )
    }
}

/// Failure to persist a record.
#[derive(Error, Debug)]
pub enum SinkError {
    /// ClickHouse client error.
    #[error("ClickHouse error: {0}")]
    ClickHouse(#[from] clickhouse_rs::errors::Error),

    /// `execute` or `commit` called without an open transaction.
    #[error("no open transaction")]
    NoTransaction,

    /// Sink used after `close`.
    #[error("sink is closed")]
    Closed,

    /// Write rejected by an in-memory test sink.
    #[cfg(test)]
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Fatal condition that stops the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    #[error("projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}
