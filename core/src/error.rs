//! Error types for corpus parsing and the text formats read by the front ends.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A corpus record is missing a required region.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// The date encoded in an external id is not a calendar date.
    #[error("invalid date in document number {docno:?}: {reason}")]
    InvalidDate { docno: String, reason: String },

    /// Two records share an external id, which would break the id mapping.
    #[error("duplicate document number {0:?}")]
    DuplicateDocno(String),

    #[error("malformed result line {line}: {reason}")]
    MalformedRunLine { line: usize, reason: String },

    #[error("malformed relevance judgment line {line}: {reason}")]
    MalformedJudgment { line: usize, reason: String },

    #[error("malformed topics file: {0}")]
    MalformedTopics(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
