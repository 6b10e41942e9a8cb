use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use super::Error;
use crate::params;

/// Runtime type expected by a leaf parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    Text,
    Integer,
    Float,
    Boolean,
    Path,
    Url,
}

impl TypeTag {
    /// Returns true if a value of type `found` conforms to this type.
    ///
    /// Integers are accepted where floats are expected.
    pub fn accepts(&self, found: TypeTag) -> bool {
        *self == found || (*self == TypeTag::Float && found == TypeTag::Integer)
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Path => "path",
            Self::Url => "url",
        };
        write!(f, "{}", s)
    }
}

/// A leaf parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Path(PathBuf),
    Url(url::Url),
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::Text(_) => TypeTag::Text,
            Self::Integer(_) => TypeTag::Integer,
            Self::Float(_) => TypeTag::Float,
            Self::Boolean(_) => TypeTag::Boolean,
            Self::Path(_) => TypeTag::Path,
            Self::Url(_) => TypeTag::Url,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<PathBuf> for Value {
    fn from(p: PathBuf) -> Self {
        Value::Path(p)
    }
}

impl From<url::Url> for Value {
    fn from(u: url::Url) -> Self {
        Value::Url(u)
    }
}

/// Describes a single leaf parameter. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDescriptor {
    name: String,
    required: bool,
    value_type: TypeTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remarks: Option<String>,
}

impl ParameterDescriptor {
    pub fn required(name: impl Into<String>, value_type: TypeTag) -> Self {
        Self::new(name.into(), true, value_type)
    }

    pub fn optional(name: impl Into<String>, value_type: TypeTag) -> Self {
        Self::new(name.into(), false, value_type)
    }

    fn new(name: String, required: bool, value_type: TypeTag) -> Self {
        Self {
            name,
            required,
            value_type,
            default_value: None,
            valid_values: None,
            remarks: None,
        }
    }

    /// The `identifier` leaf each backend descriptor starts with. It defaults to
    /// the backend kind and accepts no other value, so a configuration written
    /// for another backend is rejected before anything gets instantiated.
    pub fn fixed_identifier(kind: &str) -> Self {
        let mut identifier = Self::optional(params::IDENTIFIER, TypeTag::Text)
            .with_valid_values([Value::from(kind)])
            .with_remarks("backend kind this configuration is written for");
        identifier.default_value = Some(Value::from(kind));
        identifier
    }

    /// Sets the value used when none is supplied. The default must conform to
    /// the parameter type.
    pub fn try_with_default(mut self, value: impl Into<Value>) -> Result<Self, Error> {
        let value = value.into();
        if !self.value_type.accepts(value.type_tag()) {
            return Err(Error::WrongType {
                name: self.name,
                expected: self.value_type,
            });
        }
        self.default_value = Some(value);
        Ok(self)
    }

    pub fn with_valid_values(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.valid_values = Some(values.into_iter().collect());
        self
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn value_type(&self) -> TypeTag {
        self.value_type
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    pub fn valid_values(&self) -> Option<&[Value]> {
        self.valid_values.as_deref()
    }

    pub fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }
}

/// A member of a [`ParameterDescriptorGroup`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneralDescriptor {
    Parameter(ParameterDescriptor),
    Group(Arc<ParameterDescriptorGroup>),
}

impl GeneralDescriptor {
    pub fn name(&self) -> &str {
        match self {
            Self::Parameter(p) => p.name(),
            Self::Group(g) => g.name(),
        }
    }

    pub fn is_required(&self) -> bool {
        match self {
            Self::Parameter(p) => p.is_required(),
            Self::Group(g) => g.is_required(),
        }
    }
}

impl From<ParameterDescriptor> for GeneralDescriptor {
    fn from(value: ParameterDescriptor) -> Self {
        Self::Parameter(value)
    }
}

impl From<ParameterDescriptorGroup> for GeneralDescriptor {
    fn from(value: ParameterDescriptorGroup) -> Self {
        Self::Group(Arc::new(value))
    }
}

impl From<Arc<ParameterDescriptorGroup>> for GeneralDescriptor {
    fn from(value: Arc<ParameterDescriptorGroup>) -> Self {
        Self::Group(value)
    }
}

/// A named, ordered set of parameter and group descriptors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDescriptorGroup {
    name: String,
    required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    remarks: Option<String>,
    members: Vec<GeneralDescriptor>,
}

impl ParameterDescriptorGroup {
    /// Builds a group, failing if two members share a name.
    pub fn try_new(
        name: impl Into<String>,
        required: bool,
        members: impl IntoIterator<Item = GeneralDescriptor>,
    ) -> Result<Self, Error> {
        let name = name.into();
        let mut checked: Vec<GeneralDescriptor> = Vec::new();

        for member in members {
            if checked.iter().any(|m| m.name() == member.name()) {
                return Err(Error::DuplicateMember {
                    group: name,
                    member: member.name().to_owned(),
                });
            }
            checked.push(member);
        }

        Ok(Self {
            name,
            required,
            remarks: None,
            members: checked,
        })
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }

    /// Members in declaration order.
    pub fn members(&self) -> &[GeneralDescriptor] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&GeneralDescriptor> {
        self.members.iter().find(|m| m.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_member() {
        let res = ParameterDescriptorGroup::try_new(
            "store",
            true,
            [
                ParameterDescriptor::required("path", TypeTag::Text).into(),
                ParameterDescriptor::optional("path", TypeTag::Path).into(),
            ],
        );

        assert_eq!(
            res.unwrap_err(),
            Error::DuplicateMember {
                group: "store".to_owned(),
                member: "path".to_owned()
            }
        );
    }

    #[test]
    fn same_name_in_different_groups() {
        let inner = ParameterDescriptorGroup::try_new(
            "inner",
            false,
            [ParameterDescriptor::required("path", TypeTag::Text).into()],
        )
        .unwrap();

        let outer = ParameterDescriptorGroup::try_new(
            "outer",
            true,
            [
                ParameterDescriptor::required("path", TypeTag::Text).into(),
                inner.into(),
            ],
        )
        .unwrap();

        assert_eq!(outer.members().len(), 2);
        assert!(matches!(
            outer.member("inner"),
            Some(GeneralDescriptor::Group(_))
        ));
    }

    #[test]
    fn type_acceptance() {
        assert!(TypeTag::Float.accepts(TypeTag::Integer));
        assert!(!TypeTag::Integer.accepts(TypeTag::Float));
        assert!(!TypeTag::Path.accepts(TypeTag::Text));
        assert!(TypeTag::Url.accepts(TypeTag::Url));
    }

    #[test]
    fn fixed_identifier() {
        let id = ParameterDescriptor::fixed_identifier("memory-store");
        assert_eq!(id.name(), params::IDENTIFIER);
        assert!(!id.is_required());
        assert_eq!(id.default_value(), Some(&Value::from("memory-store")));
        assert_eq!(id.valid_values(), Some(&[Value::from("memory-store")][..]));
    }

    #[test]
    fn serialize_descriptor() {
        let group = ParameterDescriptorGroup::try_new(
            "store",
            true,
            [ParameterDescriptor::optional("retries", TypeTag::Integer)
                .try_with_default(3_i64)
                .unwrap()
                .into()],
        )
        .unwrap();

        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["name"], "store");
        assert_eq!(json["members"][0]["kind"], "parameter");
        assert_eq!(json["members"][0]["value_type"], "integer");
        assert_eq!(json["members"][0]["default_value"], 3);
    }

    #[test]
    fn default_must_conform() {
        let err = ParameterDescriptor::required("n", TypeTag::Integer)
            .try_with_default("x")
            .unwrap_err();
        assert_eq!(
            err,
            Error::WrongType {
                name: "n".to_owned(),
                expected: TypeTag::Integer,
            }
        );

        let ratio = ParameterDescriptor::optional("ratio", TypeTag::Float)
            .try_with_default(1_i64)
            .unwrap();
        assert_eq!(ratio.default_value(), Some(&Value::Integer(1)));
    }
}
