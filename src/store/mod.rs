//! # Built-in Stores
//!
//! Backends shipped with the daemon. Each one is a [`ProviderFactory`]
//! registered by [`crate::provider::Registry::with_builtin_factories`].
//!
//! | kind           | backing                                   |
//! |----------------|-------------------------------------------|
//! | `memory-store` | process memory, atomic batch writes       |
//! | `file-store`   | one JSON-lines file in a local directory  |

mod memory;
pub use memory::*;

mod file;
pub use file::*;

use std::path::PathBuf;
use std::sync::Arc;

use crate::parameter;
use crate::provider::ProviderFactory;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("parameter error :: {0}")]
    ParameterError(#[from] parameter::Error),
    #[error("empty `{0}` parameter")]
    EmptyParameter(String),
    #[error("unsupported url scheme `{0}`, expected `file`")]
    UnsupportedScheme(String),
    #[error("`{0}` does not denote a local path")]
    InvalidRoot(String),
    #[error("`{0}` is not a directory")]
    NotADirectory(PathBuf),
    #[error("io error :: {0}")]
    IoError(#[from] std::io::Error),
}

/// Factories of every built-in backend kind.
pub fn builtin_factories() -> Vec<Arc<dyn ProviderFactory>> {
    vec![
        Arc::new(MemoryStoreFactory::new()),
        Arc::new(FileStoreFactory::new()),
    ]
}
