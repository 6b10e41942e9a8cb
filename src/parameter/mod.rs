//! # Configuration Parameters
//!
//! Every backend kind describes the configuration it accepts with a
//! [`ParameterDescriptorGroup`], a tree of named leaf parameters and nested
//! groups. A runtime configuration is a [`ParameterValueGroup`] bound to such a
//! descriptor, and [`validate`] checks one against the other.
//!
//! -   _Descriptor_: shape and constraints (required flag, expected
//!     [`TypeTag`], default value, allowed values).
//!
//! -   _Value tree_: the supplied values, keyed by member name, mirroring the
//!     descriptor tree.
//!
//! -   _Validation_: a recursive pass collecting every violation found, so a
//!     caller gets the complete diagnostic set at once.

mod descriptor;
pub use descriptor::*;

mod value;
pub use value::*;

mod validation;
pub use validation::*;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("duplicate member `{member}` in group `{group}`")]
    DuplicateMember { group: String, member: String },
    #[error("group `{group}` has no member named `{member}`")]
    UnknownMember { group: String, member: String },
    #[error("member `{0}` is not a parameter group")]
    NotAGroup(String),
    #[error("no value nor default for parameter `{0}`")]
    MissingValue(String),
    #[error("parameter `{name}` is not of type {expected}")]
    WrongType { name: String, expected: TypeTag },
}
