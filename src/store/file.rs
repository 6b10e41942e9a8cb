use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use log::{debug, info, trace};

use super::Error;
use crate::parameter::{
    GeneralDescriptor, ParameterDescriptor, ParameterDescriptorGroup, ParameterValueGroup,
    TypeTag,
};
use crate::provider::{BoxError, Provider, ProviderFactory, ProviderRef};
use crate::types::{Feature, ResourceId};
use crate::{parameter, params, query, rw};

pub const FILE_STORE: &str = "file-store";

const ROOT: &str = "root";
const CREATE_MISSING: &str = "create-missing";
const FILE_NAME: &str = "file-name";
const DEFAULT_FILE_NAME: &str = "features.jsonl";

/// Features appended as JSON lines to a single file.
#[derive(Debug)]
pub struct FileStore {
    id: String,
    config: ParameterValueGroup,
    file: PathBuf,
}

impl FileStore {
    pub fn file(&self) -> &Path {
        &self.file
    }
}

impl Provider for FileStore {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        FILE_STORE
    }

    fn config(&self) -> &ParameterValueGroup {
        &self.config
    }

    fn features(
        &self,
        filter: Option<&query::FilterNode>,
    ) -> Result<Vec<Feature>, rw::Error> {
        if !self.file.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.file)?;
        let mut features = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let feature: Feature = serde_json::from_str(line)?;
            if filter.is_none_or(|f| f.evaluate(&feature)) {
                features.push(feature);
            }
        }

        trace!("read {} features from {:?}", features.len(), self.file);
        Ok(features)
    }

    fn writer(&self) -> Result<Box<dyn rw::FeatureWriter>, rw::Error> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)?;

        Ok(Box::new(FileWriter {
            out: Some(BufWriter::new(file)),
        }))
    }

    fn shutdown(&self) {
        debug!("file store `{}` released {:?}", self.id, self.file);
    }
}

/// Appends records one line at a time. Records written before a failure stay
/// in the file.
struct FileWriter {
    out: Option<BufWriter<File>>,
}

impl FileWriter {
    fn append(out: &mut BufWriter<File>, mut feature: Feature) -> Result<ResourceId, rw::Error> {
        let id = feature.resource_id();
        feature.id = Some(id.to_string());

        serde_json::to_writer(&mut *out, &feature)?;
        out.write_all(b"\n")?;

        Ok(id)
    }
}

impl rw::FeatureWriter for FileWriter {
    fn add(
        &mut self,
        features: &mut dyn Iterator<Item = Feature>,
    ) -> Result<Vec<ResourceId>, rw::Error> {
        let out = self.out.as_mut().ok_or(rw::Error::Closed)?;

        let mut ids = Vec::new();
        for feature in features {
            match Self::append(out, feature) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    out.flush()?;
                    return Err(e);
                }
            }
        }
        out.flush()?;

        Ok(ids)
    }

    fn close(&mut self) {
        if let Some(mut out) = self.out.take() {
            if let Err(e) = out.flush() {
                debug!("unable to flush on close: {}", e);
            }
        }
    }
}

pub struct FileStoreFactory {
    descriptor: Arc<ParameterDescriptorGroup>,
}

impl Default for FileStoreFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl FileStoreFactory {
    pub fn new() -> Self {
        Self {
            descriptor: Arc::new(Self::describe().expect("BUG: file store descriptor")),
        }
    }

    fn describe() -> Result<ParameterDescriptorGroup, parameter::Error> {
        let members: [GeneralDescriptor; 4] = [
            ParameterDescriptor::fixed_identifier(FILE_STORE).into(),
            ParameterDescriptor::required(ROOT, TypeTag::Url)
                .with_remarks("directory holding the store, as a `file:` url")
                .into(),
            ParameterDescriptor::optional(CREATE_MISSING, TypeTag::Boolean)
                .try_with_default(false)?
                .into(),
            ParameterDescriptor::optional(FILE_NAME, TypeTag::Text)
                .try_with_default(DEFAULT_FILE_NAME)?
                .into(),
        ];

        Ok(ParameterDescriptorGroup::try_new(FILE_STORE, true, members)?
            .with_remarks("features appended to a JSON-lines file"))
    }

    async fn build(&self, id: &str, config: &ParameterValueGroup) -> Result<FileStore, Error> {
        let root = config.url(ROOT)?;
        if root.scheme() != "file" {
            return Err(Error::UnsupportedScheme(root.scheme().to_owned()));
        }
        let root = root
            .to_file_path()
            .map_err(|_| Error::InvalidRoot(root.to_string()))?;

        match tokio::fs::metadata(&root).await {
            Ok(m) if m.is_dir() => {}
            Ok(_) => return Err(Error::NotADirectory(root)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if !config.boolean(CREATE_MISSING)? {
                    return Err(Error::NotADirectory(root));
                }
                tokio::fs::create_dir_all(&root).await?;
                info!("created store directory {:?}", root);
            }
            Err(e) => return Err(e.into()),
        }

        let file_name = config.text(FILE_NAME)?;
        if file_name.is_empty() {
            return Err(Error::EmptyParameter(FILE_NAME.to_owned()));
        }
        let mut file = root.join(file_name);
        if file.extension().is_none() {
            file.set_extension(params::ext::JSONL);
        }

        Ok(FileStore {
            id: id.to_owned(),
            config: config.clone(),
            file,
        })
    }
}

impl ProviderFactory for FileStoreFactory {
    fn kind(&self) -> &str {
        FILE_STORE
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
            let store: ProviderRef = Arc::new(self.build(id, config).await?);
            Ok(store)
        })
    }
}
