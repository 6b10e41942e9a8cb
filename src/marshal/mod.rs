//! # Marshalling
//!
//! Conversions between JSON documents and parameter value trees, plus the
//! format of the provider configuration file read by the daemon:
//!
//! ```json
//! { "providers": [ { "kind": "memory-store", "id": "m1", "config": { "path": "/tmp" } } ] }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::parameter::{
    self, GeneralDescriptor, ParameterDescriptor, ParameterDescriptorGroup, ParameterValueGroup,
    TypeTag, Value,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("expected a JSON object for group `{0}`")]
    NotAnObject(String),
    #[error("unsupported JSON value for `{0}`")]
    UnsupportedValue(String),
    #[error("parameter error :: {0}")]
    ParameterError(#[from] parameter::Error),
    #[error("json error :: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("io error :: {0}")]
    IoError(#[from] std::io::Error),
}

fn empty_config() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// One provider instance to bring up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub kind: String,
    pub id: String,
    #[serde(default = "empty_config")]
    pub config: serde_json::Value,
}

/// Content of a provider configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvidersFile {
    pub providers: Vec<ProviderSpec>,
}

impl ProvidersFile {
    pub fn try_from_str(s: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(s)?)
    }

    pub async fn read(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::try_from_str(&content)
    }
}

/// Builds a value tree bound to `descriptor` from a JSON object.
///
/// Keys without a matching member are dropped and `null` counts as absent.
/// No validation is performed here: a value of the wrong type is kept as is
/// and left to [`parameter::validate`] to report.
pub fn value_group_from_json(
    descriptor: Arc<ParameterDescriptorGroup>,
    json: &serde_json::Value,
) -> Result<ParameterValueGroup, Error> {
    let object = json
        .as_object()
        .ok_or_else(|| Error::NotAnObject(descriptor.name().to_owned()))?;

    let mut group = ParameterValueGroup::new(descriptor.clone());

    for (key, value) in object {
        if value.is_null() {
            continue;
        }

        match descriptor.member(key) {
            None => {
                debug!(
                    "dropping unknown key `{}` for group `{}`",
                    key,
                    descriptor.name()
                );
            }
            Some(GeneralDescriptor::Group(g)) if value.is_object() => {
                group.set_group(key, value_group_from_json(g.clone(), value)?)?;
            }
            Some(GeneralDescriptor::Group(_)) => {
                group.set(key, scalar(key, value, TypeTag::Text)?)?;
            }
            Some(GeneralDescriptor::Parameter(p)) => {
                group.set(key, leaf(p, value)?)?;
            }
        }
    }

    Ok(group)
}

fn leaf(descriptor: &ParameterDescriptor, value: &serde_json::Value) -> Result<Value, Error> {
    scalar(descriptor.name(), value, descriptor.value_type())
}

/// Converts a JSON scalar, using `hint` to pick the representation of strings.
fn scalar(name: &str, value: &serde_json::Value, hint: TypeTag) -> Result<Value, Error> {
    match value {
        serde_json::Value::Bool(b) => Ok(Value::Boolean(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Float(f))
            } else {
                Err(Error::UnsupportedValue(name.to_owned()))
            }
        }
        serde_json::Value::String(s) => Ok(match hint {
            TypeTag::Path => Value::Path(PathBuf::from(s)),
            TypeTag::Url => match url::Url::parse(s) {
                Ok(u) => Value::Url(u),
                Err(e) => {
                    debug!("`{}` is not a valid url ({}), keeping it as text", s, e);
                    Value::Text(s.clone())
                }
            },
            _ => Value::Text(s.clone()),
        }),
        _ => Err(Error::UnsupportedValue(name.to_owned())),
    }
}

/// Renders the entries of a value tree as a JSON object. Defaults that were
/// never supplied are not included.
pub fn value_group_to_json(group: &ParameterValueGroup) -> serde_json::Value {
    let mut object = serde_json::Map::new();

    for (name, entry) in group.entries() {
        let value = match entry {
            parameter::Entry::Value(v) => value_to_json(v),
            parameter::Entry::Group(g) => value_group_to_json(g),
        };
        object.insert(name.to_owned(), value);
    }

    serde_json::Value::Object(object)
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Path(p) => serde_json::Value::String(p.to_string_lossy().into_owned()),
        Value::Url(u) => serde_json::Value::String(u.to_string()),
    }
}

impl ParameterValueGroup {
    /// Shorthand for [`value_group_to_json`].
    pub fn to_json(&self) -> serde_json::Value {
        value_group_to_json(self)
    }
}
