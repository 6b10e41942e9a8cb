use std::sync::Arc;

use futures::future::BoxFuture;

use super::{BoxError, ProviderRef};
use crate::parameter::{ParameterDescriptorGroup, ParameterValueGroup};

/// Builds providers of one backend kind.
///
/// `create` receives a configuration that already passed validation against
/// [`ProviderFactory::descriptor`]. It may perform I/O (opening files,
/// connecting to a database) and report any problem as an error, the
/// registry attributes it to the instance being created.
pub trait ProviderFactory: Send + Sync {
    /// Backend kind name, unique in a registry.
    fn kind(&self) -> &str;

    /// Schema of the configuration this factory accepts.
    fn descriptor(&self) -> Arc<ParameterDescriptorGroup>;

    fn create<'a>(
        &'a self,
        id: &'a str,
        config: &'a ParameterValueGroup,
    ) -> BoxFuture<'a, Result<ProviderRef, BoxError>>;
}
