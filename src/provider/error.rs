use std::time::Duration;

use super::BoxError;
use crate::{marshal, parameter};

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("unknown provider kind `{0}`")]
    UnknownKind(String),
    #[error("provider kind `{0}` already registered")]
    DuplicateKind(String),
    #[error("provider `{0}` already exists")]
    DuplicateId(String),
    #[error("provider `{0}` not found")]
    NotFound(String),
    #[error("invalid configuration for {kind} provider `{id}` :: {result}")]
    InvalidConfig {
        kind: String,
        id: String,
        result: parameter::ValidationResult,
    },
    #[error("malformed configuration for {kind} provider `{id}` :: {source}")]
    MalformedConfig {
        kind: String,
        id: String,
        #[source]
        source: marshal::Error,
    },
    #[error("unable to create {kind} provider `{id}` :: {cause}")]
    CreationFailed {
        kind: String,
        id: String,
        #[source]
        cause: BoxError,
    },
    #[error("creation of {kind} provider `{id}` cancelled after {timeout:?}")]
    Cancelled {
        kind: String,
        id: String,
        timeout: Duration,
    },
    #[error("concurrency error :: {0}")]
    ConcurrencyError(String),
}

impl ProviderError {
    /// Validation diagnostics carried by an [`ProviderError::InvalidConfig`],
    /// empty for every other error.
    pub fn violations(&self) -> &[parameter::Violation] {
        match self {
            Self::InvalidConfig { result, .. } => result.violations(),
            _ => &[],
        }
    }
}
