use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::BoxFuture;
use log::{debug, trace};

use super::Error;
use crate::parameter::{
    GeneralDescriptor, ParameterDescriptor, ParameterDescriptorGroup, ParameterValueGroup,
    TypeTag,
};
use crate::provider::{BoxError, Provider, ProviderFactory, ProviderRef};
use crate::types::{Feature, ObservedProperty, ResourceId};
use crate::{parameter, query, rw};

pub const MEMORY_STORE: &str = "memory-store";

const PATH: &str = "path";
const OBSERVED_PROPERTY: &str = "observed-property";
const DEFAULT_UOM: &str = "unitless";

#[derive(Default)]
struct Records {
    features: Vec<Feature>,
    ids: HashSet<ResourceId>,
}

type SharedRecords = Arc<RwLock<Records>>;

/// Features kept in process memory.
#[derive(Debug)]
pub struct MemoryStore {
    id: String,
    config: ParameterValueGroup,
    observed: Vec<ObservedProperty>,
    records: SharedRecords,
}

impl std::fmt::Debug for Records {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Records")
            .field("len", &self.features.len())
            .finish()
    }
}

impl MemoryStore {
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .features
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Provider for MemoryStore {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        MEMORY_STORE
    }

    fn config(&self) -> &ParameterValueGroup {
        &self.config
    }

    fn features(
        &self,
        filter: Option<&query::FilterNode>,
    ) -> Result<Vec<Feature>, rw::Error> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records
            .features
            .iter()
            .filter(|f| filter.is_none_or(|flt| flt.evaluate(f)))
            .cloned()
            .collect())
    }

    fn observed_properties(&self) -> Vec<ObservedProperty> {
        self.observed.clone()
    }

    fn writer(&self) -> Result<Box<dyn rw::FeatureWriter>, rw::Error> {
        Ok(Box::new(MemoryWriter {
            records: Some(self.records.clone()),
        }))
    }

    fn shutdown(&self) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        debug!(
            "dropping {} features held by `{}`",
            records.features.len(),
            self.id
        );
        *records = Records::default();
    }
}

/// Commits each `add` call as a whole: either every feature the call consumes
/// is stored or none is.
struct MemoryWriter {
    records: Option<SharedRecords>,
}

impl rw::FeatureWriter for MemoryWriter {
    fn add(
        &mut self,
        features: &mut dyn Iterator<Item = Feature>,
    ) -> Result<Vec<ResourceId>, rw::Error> {
        let shared = self.records.as_ref().ok_or(rw::Error::Closed)?;

        let mut staged = Vec::new();
        let mut ids = Vec::new();
        for mut feature in features {
            let id = feature.resource_id();
            feature.id = Some(id.to_string());
            staged.push(feature);
            ids.push(id);
        }

        let mut records = shared.write().unwrap_or_else(PoisonError::into_inner);

        let mut batch = HashSet::with_capacity(ids.len());
        for id in &ids {
            if records.ids.contains(id) || !batch.insert(id) {
                return Err(rw::Error::DuplicateResource(id.clone()));
            }
        }

        records.ids.extend(ids.iter().cloned());
        records.features.extend(staged);
        trace!("committed {} features", ids.len());

        Ok(ids)
    }

    fn close(&mut self) {
        self.records = None;
    }
}

pub struct MemoryStoreFactory {
    descriptor: Arc<ParameterDescriptorGroup>,
}

impl Default for MemoryStoreFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreFactory {
    pub fn new() -> Self {
        Self {
            descriptor: Arc::new(Self::describe().expect("BUG: memory store descriptor")),
        }
    }

    fn describe() -> Result<ParameterDescriptorGroup, parameter::Error> {
        let observed_property = ParameterDescriptorGroup::try_new(
            OBSERVED_PROPERTY,
            false,
            [
                ParameterDescriptor::required("id", TypeTag::Text).into(),
                ParameterDescriptor::required("name", TypeTag::Text).into(),
                ParameterDescriptor::optional("uom", TypeTag::Text)
                    .try_with_default(DEFAULT_UOM)?
                    .with_remarks("unit of measure")
                    .into(),
            ],
        )?;

        let members: [GeneralDescriptor; 3] = [
            ParameterDescriptor::fixed_identifier(MEMORY_STORE).into(),
            ParameterDescriptor::required(PATH, TypeTag::Text)
                .with_remarks("logical location of the store")
                .into(),
            observed_property.into(),
        ];

        Ok(ParameterDescriptorGroup::try_new(MEMORY_STORE, true, members)?
            .with_remarks("features kept in process memory"))
    }

    fn build(&self, id: &str, config: &ParameterValueGroup) -> Result<MemoryStore, Error> {
        if config.text(PATH)?.is_empty() {
            return Err(Error::EmptyParameter(PATH.to_owned()));
        }

        let observed = match config.group(OBSERVED_PROPERTY) {
            Some(g) => vec![ObservedProperty::new(
                g.text("id")?,
                g.text("name")?,
                g.text("uom")?,
            )],
            None => Vec::new(),
        };

        Ok(MemoryStore {
            id: id.to_owned(),
            config: config.clone(),
            observed,
            records: SharedRecords::default(),
        })
    }
}

impl ProviderFactory for MemoryStoreFactory {
    fn kind(&self) -> &str {
        MEMORY_STORE
    }

    fn descriptor(&self) -> Arc<ParameterDescriptorGroup> {
        self.descriptor.clone()
    }

    fn create<'a>(
        &'a self,
        id: &'a str,
        config: &'a ParameterValueGroup,
    ) -> BoxFuture<'a, Result<ProviderRef, BoxError>> {
        Box::pin(async move {
            let store: ProviderRef = Arc::new(self.build(id, config)?);
            Ok(store)
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::provider::{ProviderError, Registry};
    use crate::query::{BinaryOp, FilterNode};

    fn registry() -> Registry {
        Registry::with_builtin_factories().unwrap()
    }

    fn config(json: serde_json::Value) -> ParameterValueGroup {
        crate::marshal::value_group_from_json(MemoryStoreFactory::new().descriptor(), &json)
            .unwrap()
    }

    #[tokio::test]
    async fn create_lookup_and_duplicates() {
        let r = registry();

        r.create_provider(MEMORY_STORE, "inst-1", &config(json!({ "path": "/data" })))
            .await
            .unwrap();
        assert!(r.get_provider("inst-1").is_some());

        let err = r
            .create_provider(MEMORY_STORE, "inst-1", &config(json!({ "path": "/data2" })))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::DuplicateId(_)));

        let err = r
            .create_provider_from_json(
                "unknown-kind",
                "inst-2",
                &json!({}),
                std::time::Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownKind(_)));
    }

    #[tokio::test]
    async fn empty_path_fails_creation() {
        let r = registry();
        let err = r
            .create_provider(MEMORY_STORE, "m1", &config(json!({ "path": "" })))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::CreationFailed { .. }));
        assert!(r.get_provider("m1").is_none());
    }

    #[tokio::test]
    async fn foreign_identifier_is_rejected() {
        let r = registry();
        let err = r
            .create_provider(
                MEMORY_STORE,
                "m1",
                &config(json!({ "identifier": "file-store", "path": "/data" })),
            )
            .await
            .unwrap_err();
        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.violations()[0].path, "memory-store.identifier");
    }

    #[tokio::test]
    async fn observed_properties() {
        let r = registry();
        let p = r
            .create_provider(
                MEMORY_STORE,
                "m1",
                &config(json!({
                    "path": "/data",
                    "observed-property": { "id": "urn:temp", "name": "temperature" }
                })),
            )
            .await
            .unwrap();

        assert_eq!(
            p.observed_properties(),
            vec![ObservedProperty::new("urn:temp", "temperature", "unitless")]
        );
    }

    #[test]
    fn atomic_batches() {
        let store = MemoryStoreFactory::new()
            .build("m1", &config(json!({ "path": "/data" })))
            .unwrap();
        let mut writer = store.writer().unwrap();

        let ids = writer
            .add(&mut vec![Feature::new().with_id("a"), Feature::new()].into_iter())
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].as_str(), "a");
        assert_eq!(store.len(), 2);

        let err = writer
            .add(&mut vec![Feature::new().with_id("b"), Feature::new().with_id("a")].into_iter())
            .unwrap_err();
        assert!(matches!(err, rw::Error::DuplicateResource(id) if id.as_str() == "a"));
        assert_eq!(store.len(), 2);

        let err = writer
            .add(&mut vec![Feature::new().with_id("c"), Feature::new().with_id("c")].into_iter())
            .unwrap_err();
        assert!(matches!(err, rw::Error::DuplicateResource(_)));
        assert_eq!(store.len(), 2);

        writer.close();
        writer.close();
        assert!(matches!(
            writer.add(&mut std::iter::empty::<Feature>()),
            Err(rw::Error::Closed)
        ));
    }

    #[test]
    fn deadline_reports_committed_ids() {
        let store = MemoryStoreFactory::new()
            .build("m1", &config(json!({ "path": "/data" })))
            .unwrap();
        let mut writer = rw::ScopedWriter::new(store.writer().unwrap());

        let deadline = std::time::Instant::now() + std::time::Duration::from_millis(50);
        let features = (0..5).map(|i| {
            if i == 2 {
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
            Feature::new().with_id(format!("f{i}"))
        });

        let written = match writer.add_until(features, deadline) {
            Err(rw::Error::Cancelled { written }) => written,
            other => panic!("unexpected result {other:?}"),
        };

        let written: Vec<&str> = written.iter().map(ResourceId::as_str).collect();
        assert_eq!(written, vec!["f0", "f1"]);

        let stored: Vec<String> = store
            .features(None)
            .unwrap()
            .into_iter()
            .filter_map(|f| f.id)
            .collect();
        assert_eq!(stored, written);
    }

    #[test]
    fn filtered_reads() {
        let store = MemoryStoreFactory::new()
            .build("m1", &config(json!({ "path": "/data" })))
            .unwrap();
        let mut writer = store.writer().unwrap();
        writer
            .add(
                &mut vec![
                    Feature::new().with_id("s1").with_property("depth", 10_i64),
                    Feature::new().with_id("s2").with_property("depth", 40_i64),
                ]
                .into_iter(),
            )
            .unwrap();

        let deep = store
            .features(Some(&FilterNode::compare(BinaryOp::Gt, "depth", 20_i64)))
            .unwrap();
        assert_eq!(deep.len(), 1);
        assert_eq!(deep[0].id.as_deref(), Some("s2"));
        assert_eq!(store.features(None).unwrap().len(), 2);

        store.shutdown();
        assert!(store.is_empty());
    }
}
