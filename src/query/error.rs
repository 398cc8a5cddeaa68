use crate::engine::ScanError;
use crate::records::RecordError;
use crate::resolver::ResolveError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("record source failed: {0}")]
    Source(#[from] RecordError),

    #[error("metadata lookup failed: {0}")]
    Resolver(#[from] ResolveError),

    #[error("failed to write output: {0}")]
    Output(std::io::Error),

    #[error("query was cancelled")]
    Cancelled,

    #[error("query timed out after {0:?}")]
    TimedOut(Duration),

    #[error("query task panicked: {0}")]
    Panicked(String),
}

impl From<ScanError> for QueryError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::Source(err) => QueryError::Source(err),
            ScanError::Cancelled { .. } => QueryError::Cancelled,
            ScanError::Sink(err) => QueryError::Output(err),
        }
    }
}
