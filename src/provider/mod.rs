//! # Providers
//!
//! A provider is a live backend instance (a database, a feature store, an
//! observation store) identified by an instance id. Providers are built by a
//! [`ProviderFactory`], one per backend kind, from a configuration validated
//! against the factory descriptor.
//!
//! The [`Registry`] keeps the factories, registered once at startup, and the
//! live instances, created and removed at runtime. A failure while creating
//! one instance is reported for that instance only: [`bring_up`] attempts
//! every configured provider and reports each outcome.

mod error;
pub use error::*;

mod factory;
pub use factory::*;

mod registry;
pub use registry::*;

mod bring_up;
pub use bring_up::*;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use crate::{parameter, query, rw, types};

pub type ProviderRef = Arc<dyn Provider>;

/// Error type produced by factories while building a provider.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A live backend handle.
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Instance identifier, unique in a registry.
    fn id(&self) -> &str;

    /// Backend kind of the factory that created this provider.
    fn kind(&self) -> &str;

    /// Configuration the provider was created with.
    fn config(&self) -> &parameter::ParameterValueGroup;

    /// Features matching `filter`, all of them when `None`.
    fn features(
        &self,
        filter: Option<&query::FilterNode>,
    ) -> Result<Vec<types::Feature>, rw::Error>;

    /// Quantities measured by this backend, if it serves observations.
    fn observed_properties(&self) -> Vec<types::ObservedProperty> {
        Vec::new()
    }

    /// Opens a write session. Read-only backends keep the default.
    fn writer(&self) -> Result<Box<dyn rw::FeatureWriter>, rw::Error> {
        Err(rw::Error::Unsupported(self.kind().to_owned()))
    }

    /// Releases backend resources once the provider has been removed from
    /// its registry.
    fn shutdown(&self) {}
}
