use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::{Error, GeneralDescriptor, ParameterDescriptorGroup, TypeTag, Value};

/// A value supplied for a group member: a leaf value or a nested group.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Value(Value),
    Group(ParameterValueGroup),
}

/// Runtime configuration bound to a [`ParameterDescriptorGroup`].
///
/// Keys always name a member of the descriptor. Values are not type checked on
/// insertion, that is the job of [`super::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterValueGroup {
    descriptor: Arc<ParameterDescriptorGroup>,
    entries: BTreeMap<String, Entry>,
}

impl ParameterValueGroup {
    pub fn new(descriptor: Arc<ParameterDescriptorGroup>) -> Self {
        Self {
            descriptor,
            entries: BTreeMap::new(),
        }
    }

    pub fn descriptor(&self) -> &Arc<ParameterDescriptorGroup> {
        &self.descriptor
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_member(&self, name: &str) -> Result<&GeneralDescriptor, Error> {
        self.descriptor
            .member(name)
            .ok_or_else(|| Error::UnknownMember {
                group: self.descriptor.name().to_owned(),
                member: name.to_owned(),
            })
    }

    /// Sets a leaf value, replacing any previous entry.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self, Error> {
        self.check_member(name)?;
        self.entries.insert(name.to_owned(), Entry::Value(value.into()));
        Ok(self)
    }

    /// Consuming variant of [`Self::set`], handy to build trees inline.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self, Error> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Returns the sub-group stored under `name`, creating an empty one from
    /// the member descriptor if needed.
    pub fn add_group(&mut self, name: &str) -> Result<&mut ParameterValueGroup, Error> {
        let descriptor = match self.check_member(name)? {
            GeneralDescriptor::Group(g) => g.clone(),
            GeneralDescriptor::Parameter(_) => return Err(Error::NotAGroup(name.to_owned())),
        };

        let entry = self
            .entries
            .entry(name.to_owned())
            .or_insert_with(|| Entry::Group(ParameterValueGroup::new(descriptor.clone())));

        if !matches!(entry, Entry::Group(_)) {
            *entry = Entry::Group(ParameterValueGroup::new(descriptor));
        }

        match entry {
            Entry::Group(g) => Ok(g),
            Entry::Value(_) => Err(Error::NotAGroup(name.to_owned())),
        }
    }

    /// Stores an already built sub-group under `name`.
    pub fn set_group(
        &mut self,
        name: &str,
        group: ParameterValueGroup,
    ) -> Result<&mut Self, Error> {
        self.check_member(name)?;
        self.entries.insert(name.to_owned(), Entry::Group(group));
        Ok(self)
    }

    pub fn unset(&mut self, name: &str) -> Option<Entry> {
        self.entries.remove(name)
    }

    /// Returns the supplied value for `name`, or the descriptor default.
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.entries.get(name) {
            Some(Entry::Value(v)) => Some(v),
            Some(Entry::Group(_)) => None,
            None => match self.descriptor.member(name) {
                Some(GeneralDescriptor::Parameter(p)) => p.default_value(),
                _ => None,
            },
        }
    }

    pub fn group(&self, name: &str) -> Option<&ParameterValueGroup> {
        match self.entries.get(name) {
            Some(Entry::Group(g)) => Some(g),
            _ => None,
        }
    }

    fn require(&self, name: &str) -> Result<&Value, Error> {
        self.value(name).ok_or_else(|| Error::MissingValue(name.to_owned()))
    }

    fn wrong_type(name: &str, expected: TypeTag) -> Error {
        Error::WrongType {
            name: name.to_owned(),
            expected,
        }
    }

    pub fn text(&self, name: &str) -> Result<&str, Error> {
        match self.require(name)? {
            Value::Text(v) => Ok(v),
            _ => Err(Self::wrong_type(name, TypeTag::Text)),
        }
    }

    pub fn integer(&self, name: &str) -> Result<i64, Error> {
        match self.require(name)? {
            Value::Integer(v) => Ok(*v),
            _ => Err(Self::wrong_type(name, TypeTag::Integer)),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64, Error> {
        match self.require(name)? {
            Value::Float(v) => Ok(*v),
            Value::Integer(v) => Ok(*v as f64),
            _ => Err(Self::wrong_type(name, TypeTag::Float)),
        }
    }

    pub fn boolean(&self, name: &str) -> Result<bool, Error> {
        match self.require(name)? {
            Value::Boolean(v) => Ok(*v),
            _ => Err(Self::wrong_type(name, TypeTag::Boolean)),
        }
    }

    pub fn path(&self, name: &str) -> Result<&Path, Error> {
        match self.require(name)? {
            Value::Path(v) => Ok(v),
            _ => Err(Self::wrong_type(name, TypeTag::Path)),
        }
    }

    pub fn url(&self, name: &str) -> Result<&url::Url, Error> {
        match self.require(name)? {
            Value::Url(v) => Ok(v),
            _ => Err(Self::wrong_type(name, TypeTag::Url)),
        }
    }
}
