use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use futures::FutureExt;
use log::{debug, error, info, trace, warn};

use super::{BoxError, ProviderError, ProviderFactory, ProviderRef};
use crate::{marshal, parameter, store};

pub type RegistryRef = Arc<Registry>;

/// State of an instance id.
enum Slot {
    /// A creation is in flight for this id.
    Reserved,
    Live(ProviderRef),
}

type Instances = HashMap<String, Slot>;

/// Factories by backend kind and live providers by instance id.
///
/// Factories are registered through `&mut self` before the registry is
/// shared, so kind lookups need no locking. Instances live behind a lock
/// that is never held while a factory runs.
pub struct Registry {
    factories: HashMap<String, Arc<dyn ProviderFactory>>,
    instances: RwLock<Instances>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates a registry without any factory.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a registry holding every built-in backend kind.
    pub fn with_builtin_factories() -> Result<Self, ProviderError> {
        let mut registry = Self::new();
        for factory in store::builtin_factories() {
            registry.register_factory(factory)?;
        }
        Ok(registry)
    }

    pub fn register_factory(
        &mut self,
        factory: Arc<dyn ProviderFactory>,
    ) -> Result<(), ProviderError> {
        let kind = factory.kind().to_owned();
        if self.factories.contains_key(&kind) {
            return Err(ProviderError::DuplicateKind(kind));
        }

        debug!("registered provider kind `{}`", kind);
        self.factories.insert(kind, factory);
        Ok(())
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn factory(&self, kind: &str) -> Option<Arc<dyn ProviderFactory>> {
        self.factories.get(kind).cloned()
    }

    pub fn descriptor(&self, kind: &str) -> Option<Arc<parameter::ParameterDescriptorGroup>> {
        self.factories.get(kind).map(|f| f.descriptor())
    }

    /// Validates `config` and creates a provider of `kind` registered as `id`.
    ///
    /// Errors raised by the factory, panics included, are reported as
    /// [`ProviderError::CreationFailed`] for this instance.
    pub async fn create_provider(
        &self,
        kind: &str,
        id: &str,
        config: &parameter::ParameterValueGroup,
    ) -> Result<ProviderRef, ProviderError> {
        let factory = self
            .factory(kind)
            .ok_or_else(|| ProviderError::UnknownKind(kind.to_owned()))?;

        let result = parameter::validate(&factory.descriptor(), config);
        if !result.is_valid() {
            warn!("invalid configuration for {} provider `{}`: {}", kind, id, result);
            return Err(ProviderError::InvalidConfig {
                kind: kind.to_owned(),
                id: id.to_owned(),
                result,
            });
        }

        let reservation = self.reserve(id)?;
        trace!("id `{}` reserved, invoking `{}` factory", id, kind);

        let provider = invoke(factory.as_ref(), id, config).await.map_err(|cause| {
            error!("[PROVIDER]> unable to create {} provider `{}`: {}", kind, id, cause);
            ProviderError::CreationFailed {
                kind: kind.to_owned(),
                id: id.to_owned(),
                cause,
            }
        })?;

        reservation.commit(provider.clone());
        info!("[PROVIDER]> {} provider `{}` created", kind, id);

        Ok(provider)
    }

    /// Same as [`Self::create_provider`], giving up after `timeout`.
    ///
    /// On timeout the pending creation is dropped and the id released.
    pub async fn create_provider_with_timeout(
        &self,
        kind: &str,
        id: &str,
        config: &parameter::ParameterValueGroup,
        timeout: Duration,
    ) -> Result<ProviderRef, ProviderError> {
        tokio::time::timeout(timeout, self.create_provider(kind, id, config))
            .await
            .map_err(|_| {
                error!("[PROVIDER]> {} provider `{}` creation timed out", kind, id);
                ProviderError::Cancelled {
                    kind: kind.to_owned(),
                    id: id.to_owned(),
                    timeout,
                }
            })?
    }

    /// Builds the value tree for `config` from its JSON form, then creates
    /// the provider with a `timeout` deadline.
    pub async fn create_provider_from_json(
        &self,
        kind: &str,
        id: &str,
        config: &serde_json::Value,
        timeout: Duration,
    ) -> Result<ProviderRef, ProviderError> {
        let descriptor = self
            .descriptor(kind)
            .ok_or_else(|| ProviderError::UnknownKind(kind.to_owned()))?;

        let values = marshal::value_group_from_json(descriptor, config).map_err(|source| {
            ProviderError::MalformedConfig {
                kind: kind.to_owned(),
                id: id.to_owned(),
                source,
            }
        })?;

        self.create_provider_with_timeout(kind, id, &values, timeout)
            .await
    }

    pub fn get_provider(&self, id: &str) -> Option<ProviderRef> {
        match self.read_instances().get(id) {
            Some(Slot::Live(p)) => Some(p.clone()),
            _ => None,
        }
    }

    /// Removes a live provider and hands it back. The caller is in charge of
    /// releasing its resources. Ids whose creation is still in flight are
    /// left alone.
    pub fn remove_provider(&self, id: &str) -> Option<ProviderRef> {
        let mut instances = self.write_instances();
        if !matches!(instances.get(id), Some(Slot::Live(_))) {
            return None;
        }
        match instances.remove(id) {
            Some(Slot::Live(p)) => Some(p),
            _ => None,
        }
    }

    /// Removes a live provider and shuts it down.
    pub fn shutdown_provider(&self, id: &str) -> Result<(), ProviderError> {
        let provider = self
            .remove_provider(id)
            .ok_or_else(|| ProviderError::NotFound(id.to_owned()))?;

        provider.shutdown();
        info!("[PROVIDER]> {} provider `{}` shut down", provider.kind(), id);
        Ok(())
    }

    /// Ids of live providers, sorted.
    pub fn provider_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .read_instances()
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Live(_)))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Configuration of a live provider, in its JSON form.
    pub fn provider_config(&self, id: &str) -> Option<serde_json::Value> {
        self.get_provider(id)
            .map(|p| marshal::value_group_to_json(p.config()))
    }

    fn reserve(&self, id: &str) -> Result<Reservation<'_>, ProviderError> {
        let mut instances = self.write_instances();
        if instances.contains_key(id) {
            return Err(ProviderError::DuplicateId(id.to_owned()));
        }
        instances.insert(id.to_owned(), Slot::Reserved);

        Ok(Reservation {
            instances: &self.instances,
            id: id.to_owned(),
            committed: false,
        })
    }

    // The instance map is left consistent by every critical section, so a
    // poisoned lock is still safe to use.
    fn read_instances(&self) -> RwLockReadGuard<'_, Instances> {
        self.instances.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_instances(&self) -> RwLockWriteGuard<'_, Instances> {
        self.instances.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds an id while its provider is being created. Dropping it without
/// committing frees the id.
struct Reservation<'a> {
    instances: &'a RwLock<Instances>,
    id: String,
    committed: bool,
}

impl Reservation<'_> {
    fn commit(mut self, provider: ProviderRef) {
        let mut instances = self.instances.write().unwrap_or_else(PoisonError::into_inner);
        instances.insert(self.id.clone(), Slot::Live(provider));
        self.committed = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        let mut instances = self.instances.write().unwrap_or_else(PoisonError::into_inner);
        if matches!(instances.get(&self.id), Some(Slot::Reserved)) {
            instances.remove(&self.id);
            trace!("id `{}` released", self.id);
        }
    }
}

/// Runs the factory, turning panics into errors.
async fn invoke(
    factory: &dyn ProviderFactory,
    id: &str,
    config: &parameter::ParameterValueGroup,
) -> Result<ProviderRef, BoxError> {
    let creation = std::panic::catch_unwind(AssertUnwindSafe(|| factory.create(id, config)))
        .map_err(panic_message)?;

    AssertUnwindSafe(creation)
        .catch_unwind()
        .await
        .map_err(panic_message)?
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> BoxError {
    let msg = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    };
    format!("factory panicked: {}", msg).into()
}
