//! # Feature Writers
//!
//! Backends persist features through a [`FeatureWriter`], a resource that must
//! be closed after use whatever the outcome of the writes. Callers obtain one
//! wrapped in a [`ScopedWriter`] which guarantees the release.

mod writer;
pub use writer::*;

use crate::types::ResourceId;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io error :: {0}")]
    IoError(#[from] std::io::Error),
    #[error("serialization error :: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("resource `{0}` already exists")]
    DuplicateResource(ResourceId),
    #[error("writer already closed")]
    Closed,
    #[error("write cancelled by deadline after {} records", .written.len())]
    Cancelled { written: Vec<ResourceId> },
    #[error("`{0}` does not support writes")]
    Unsupported(String),
    #[error("backend error :: {0}")]
    BackendError(String),
}
