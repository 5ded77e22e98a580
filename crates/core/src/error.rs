//! Error types for the job-boundary parser.

use thiserror::Error;

/// Fatal outcomes of feeding a parse session.
///
/// Expected verdicts such as "not a PDF" or "need more data" are not
/// errors; they are reported through [`crate::FeedStatus`].
#[derive(Error, Debug)]
pub enum JobError {
    /// The spool sink rejected the bytes handed to it.
    #[error("spool error: {0}")]
    Spool(#[from] std::io::Error),

    /// Reading the input failed.
    #[error("read error: {0}")]
    Read(std::io::Error),

    #[error("structure stack overflow: depth {depth} exceeds limit {limit}")]
    StackOverflow { depth: usize, limit: usize },

    #[error("structure stack underflow")]
    StackUnderflow,

    /// The session already failed and must be discarded.
    #[error("parse session already failed")]
    Poisoned,
}

/// Convenience Result type alias for JobError.
pub type Result<T> = std::result::Result<T, JobError>;
