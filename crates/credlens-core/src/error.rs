//! Error types shared across the pipeline.

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors produced by credlens-core.
///
/// Lookup errors (`LookupTimeout`, `LookupFailure`) only ever surface from the
/// knowledge-base adapters; the resolver turns them into unresolved entities.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unsupported entity type: {0}")]
    UnsupportedType(String),

    #[error("entity label is empty")]
    EmptyLabel,

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("lookup timed out after {0:?}")]
    LookupTimeout(Duration),

    #[error("lookup failed: {0}")]
    LookupFailure(String),

    #[error("invalid query parameter: {0}")]
    InvalidQuery(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// True for errors that degrade a resolution instead of failing a request.
    pub fn is_lookup_error(&self) -> bool {
        matches!(self, Error::LookupTimeout(_) | Error::LookupFailure(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
