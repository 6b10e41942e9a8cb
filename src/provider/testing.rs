//! Factories with scripted behavior, used by registry and bring-up tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;

use super::{BoxError, Provider, ProviderFactory, ProviderRef, Registry};
use crate::parameter::{
    GeneralDescriptor, ParameterDescriptor, ParameterDescriptorGroup, ParameterValueGroup,
    TypeTag,
};
use crate::{query, rw, types};

#[derive(Debug)]
pub struct TestProvider {
    id: String,
    kind: String,
    config: ParameterValueGroup,
}

impl Provider for TestProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn config(&self) -> &ParameterValueGroup {
        &self.config
    }

    fn features(
        &self,
        _filter: Option<&query::FilterNode>,
    ) -> Result<Vec<types::Feature>, rw::Error> {
        Ok(Vec::new())
    }
}

#[derive(Clone, Copy)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
    Sleep(Duration),
}

pub struct TestFactory {
    kind: String,
    descriptor: Arc<ParameterDescriptorGroup>,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl TestFactory {
    /// Factory whose descriptor requires a single text parameter `name`.
    pub fn new(kind: &str, behavior: Behavior) -> Self {
        let members: [GeneralDescriptor; 2] = [
            ParameterDescriptor::fixed_identifier(kind).into(),
            ParameterDescriptor::required("name", TypeTag::Text).into(),
        ];

        Self {
            kind: kind.to_owned(),
            descriptor: Arc::new(ParameterDescriptorGroup::try_new(kind, true, members).unwrap()),
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProviderFactory for TestFactory {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn descriptor(&self) -> Arc<ParameterDescriptorGroup> {
        self.descriptor.clone()
    }

    fn create<'a>(
        &'a self,
        id: &'a str,
        config: &'a ParameterValueGroup,
    ) -> BoxFuture<'a, Result<ProviderRef, BoxError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        Box::pin(async move {
            match self.behavior {
                Behavior::Succeed => {}
                Behavior::Fail => return Err("backend unreachable".into()),
                Behavior::Panic => panic!("factory exploded"),
                Behavior::Sleep(d) => tokio::time::sleep(d).await,
            }

            let provider: ProviderRef = Arc::new(TestProvider {
                id: id.to_owned(),
                kind: self.kind.clone(),
                config: config.clone(),
            });
            Ok(provider)
        })
    }
}

/// Valid configuration for a [`TestFactory`] registered in `registry`.
pub fn config_for(registry: &Registry, kind: &str, name: &str) -> ParameterValueGroup {
    let descriptor = registry.descriptor(kind).unwrap();
    ParameterValueGroup::new(descriptor).with("name", name).unwrap()
}
