use log::trace;

use super::{Entry, GeneralDescriptor, ParameterDescriptorGroup, ParameterValueGroup, Value};

/// Why a single parameter failed validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("missing required parameter")]
    MissingRequired,
    #[error("type mismatch, expected {expected} but found {found}")]
    TypeMismatch { expected: String, found: String },
    #[error("value `{0}` is not allowed")]
    NotAllowed(String),
}

/// A validation failure located by its dotted path from the root group.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub path: String,
    pub error: ValidationError,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.error)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Valid,
    Invalid(Vec<Violation>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Valid => &[],
            Self::Invalid(v) => v,
        }
    }
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Invalid(violations) => {
                let msgs: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", msgs.join("; "))
            }
        }
    }
}

impl ParameterValueGroup {
    /// Validates this tree against its own descriptor.
    pub fn validate(&self) -> ValidationResult {
        validate(self.descriptor(), self)
    }
}

/// Checks `values` against `descriptor`, collecting every violation.
///
/// Keys not declared by the descriptor are ignored. A required group that was
/// not supplied is validated as if it were empty: it passes when none of its
/// descendants is required without a default, otherwise each of those
/// descendants is reported as missing.
pub fn validate(
    descriptor: &ParameterDescriptorGroup,
    values: &ParameterValueGroup,
) -> ValidationResult {
    let mut violations = Vec::new();

    validate_group(descriptor, Some(values), descriptor.name(), &mut violations);

    if violations.is_empty() {
        ValidationResult::Valid
    } else {
        trace!(
            "`{}` validation found {} violations",
            descriptor.name(),
            violations.len()
        );
        ValidationResult::Invalid(violations)
    }
}

fn validate_group(
    descriptor: &ParameterDescriptorGroup,
    values: Option<&ParameterValueGroup>,
    path: &str,
    out: &mut Vec<Violation>,
) {
    for member in descriptor.members() {
        let member_path = format!("{}.{}", path, member.name());
        let entry = values.and_then(|v| v.entry(member.name()));

        match (member, entry) {
            (GeneralDescriptor::Parameter(p), None) => {
                if p.is_required() && p.default_value().is_none() {
                    out.push(Violation {
                        path: member_path,
                        error: ValidationError::MissingRequired,
                    });
                }
            }

            (GeneralDescriptor::Parameter(p), Some(Entry::Value(v))) => {
                let found = v.type_tag();
                if !p.value_type().accepts(found) {
                    out.push(Violation {
                        path: member_path,
                        error: ValidationError::TypeMismatch {
                            expected: p.value_type().to_string(),
                            found: found.to_string(),
                        },
                    });
                } else if let Some(allowed) = p.valid_values() {
                    if !allowed.iter().any(|a| same_value(a, v)) {
                        out.push(Violation {
                            path: member_path,
                            error: ValidationError::NotAllowed(display_value(v)),
                        });
                    }
                }
            }

            (GeneralDescriptor::Parameter(p), Some(Entry::Group(_))) => {
                out.push(Violation {
                    path: member_path,
                    error: ValidationError::TypeMismatch {
                        expected: p.value_type().to_string(),
                        found: "group".to_owned(),
                    },
                });
            }

            (GeneralDescriptor::Group(g), None) => {
                if g.is_required() {
                    validate_group(g, None, &member_path, out);
                }
            }

            (GeneralDescriptor::Group(g), Some(Entry::Group(v))) => {
                validate_group(g, Some(v), &member_path, out);
            }

            (GeneralDescriptor::Group(_), Some(Entry::Value(v))) => {
                out.push(Violation {
                    path: member_path,
                    error: ValidationError::TypeMismatch {
                        expected: "group".to_owned(),
                        found: v.type_tag().to_string(),
                    },
                });
            }
        }
    }
}

/// Equality where integers and floats compare by numeric value.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(x), Value::Float(y)) | (Value::Float(y), Value::Integer(x)) => {
            *x as f64 == *y
        }
        _ => a == b,
    }
}

fn display_value(v: &Value) -> String {
    match v {
        Value::Text(s) => s.clone(),
        Value::Integer(n) => n.to_string(),
        Value::Float(n) => n.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Path(p) => p.to_string_lossy().into_owned(),
        Value::Url(u) => u.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::parameter::{ParameterDescriptor, TypeTag};

    fn group(
        name: &str,
        required: bool,
        members: Vec<GeneralDescriptor>,
    ) -> ParameterDescriptorGroup {
        ParameterDescriptorGroup::try_new(name, required, members).unwrap()
    }

    /// store
    /// ├── identifier (fixed)
    /// ├── path: text, required
    /// ├── port: integer, required
    /// ├── timeout: float, optional
    /// ├── debug: boolean, required, default false
    /// └── auth (required group)
    ///     ├── user: text, required
    ///     └── password: text, optional
    fn store_descriptor() -> Arc<ParameterDescriptorGroup> {
        let auth = group(
            "auth",
            true,
            vec![
                ParameterDescriptor::required("user", TypeTag::Text).into(),
                ParameterDescriptor::optional("password", TypeTag::Text).into(),
            ],
        );

        Arc::new(group(
            "store",
            true,
            vec![
                ParameterDescriptor::fixed_identifier("store").into(),
                ParameterDescriptor::required("path", TypeTag::Text).into(),
                ParameterDescriptor::required("port", TypeTag::Integer).into(),
                ParameterDescriptor::optional("timeout", TypeTag::Float).into(),
                ParameterDescriptor::required("debug", TypeTag::Boolean)
                    .try_with_default(false)
                    .unwrap()
                    .into(),
                auth.into(),
            ],
        ))
    }

    fn paths(res: &ValidationResult) -> Vec<&str> {
        res.violations().iter().map(|v| v.path.as_str()).collect()
    }

    #[test]
    fn valid_tree() {
        let mut values = ParameterValueGroup::new(store_descriptor());
        values.set("path", "/data").unwrap();
        values.set("port", 5432_i64).unwrap();
        values.set("timeout", 10_i64).unwrap();
        values.add_group("auth").unwrap().set("user", "admin").unwrap();

        assert_eq!(values.validate(), ValidationResult::Valid);
    }

    #[test]
    fn collects_every_violation() {
        let mut values = ParameterValueGroup::new(store_descriptor());
        // path missing, port missing, auth.user missing
        values.set("timeout", "soon").unwrap(); // mismatch
        values.set("debug", "yes").unwrap(); // mismatch
        values.add_group("auth").unwrap().set("password", 1234_i64).unwrap(); // mismatch

        let res = values.validate();
        assert_eq!(res.violations().len(), 6);

        let missing = res
            .violations()
            .iter()
            .filter(|v| v.error == ValidationError::MissingRequired)
            .count();
        let mismatch = res
            .violations()
            .iter()
            .filter(|v| matches!(v.error, ValidationError::TypeMismatch { .. }))
            .count();
        assert_eq!(missing, 3);
        assert_eq!(mismatch, 3);

        // declaration order
        assert_eq!(
            paths(&res),
            vec![
                "store.path",
                "store.port",
                "store.timeout",
                "store.debug",
                "store.auth.user",
                "store.auth.password"
            ]
        );
    }

    #[test]
    fn mismatch_details() {
        let mut values = ParameterValueGroup::new(store_descriptor());
        values.set("path", "/data").unwrap();
        values.set("port", 1.5).unwrap();
        values.add_group("auth").unwrap().set("user", "u").unwrap();

        let res = values.validate();
        assert_eq!(
            res.violations(),
            &[Violation {
                path: "store.port".to_owned(),
                error: ValidationError::TypeMismatch {
                    expected: "integer".to_owned(),
                    found: "float".to_owned()
                }
            }]
        );
        assert_eq!(
            res.to_string(),
            "store.port: type mismatch, expected integer but found float"
        );
    }

    #[test]
    fn group_and_leaf_confusion() {
        let mut values = ParameterValueGroup::new(store_descriptor());
        values.set("path", "/data").unwrap();
        values.set("port", 1_i64).unwrap();
        values.set("auth", "admin").unwrap();

        let res = values.validate();
        assert_eq!(paths(&res), vec!["store.auth"]);
        assert_eq!(
            res.violations()[0].error,
            ValidationError::TypeMismatch {
                expected: "group".to_owned(),
                found: "text".to_owned()
            }
        );
    }

    #[test]
    fn identifier_of_another_backend() {
        let mut values = ParameterValueGroup::new(store_descriptor());
        values.set("identifier", "file-store").unwrap();
        values.set("path", "/data").unwrap();
        values.set("port", 1_i64).unwrap();
        values.add_group("auth").unwrap().set("user", "u").unwrap();

        let res = values.validate();
        assert_eq!(
            res.violations()[0],
            Violation {
                path: "store.identifier".to_owned(),
                error: ValidationError::NotAllowed("file-store".to_owned())
            }
        );
    }

    #[test]
    fn required_group_absent_with_required_descendants() {
        let mut values = ParameterValueGroup::new(store_descriptor());
        values.set("path", "/data").unwrap();
        values.set("port", 1_i64).unwrap();

        let res = values.validate();
        assert_eq!(paths(&res), vec!["store.auth.user"]);
    }

    #[test]
    fn required_group_absent_without_required_descendants() {
        let options = group(
            "options",
            true,
            vec![
                ParameterDescriptor::optional("verbose", TypeTag::Boolean).into(),
                ParameterDescriptor::required("level", TypeTag::Integer)
                    .try_with_default(1_i64)
                    .unwrap()
                    .into(),
            ],
        );
        let root = Arc::new(group("root", true, vec![options.into()]));

        let values = ParameterValueGroup::new(root);
        assert!(values.validate().is_valid());
    }

    #[test]
    fn optional_group_absent_is_skipped() {
        let inner = group(
            "inner",
            false,
            vec![ParameterDescriptor::required("name", TypeTag::Text).into()],
        );
        let root = Arc::new(group("root", true, vec![inner.into()]));

        assert!(ParameterValueGroup::new(root.clone()).validate().is_valid());

        // once supplied, its content is checked
        let mut values = ParameterValueGroup::new(root);
        values.add_group("inner").unwrap();
        assert_eq!(paths(&values.validate()), vec!["root.inner.name"]);
    }

    #[test]
    fn validate_against_other_descriptor() {
        let other = Arc::new(group(
            "other",
            true,
            vec![ParameterDescriptor::required("name", TypeTag::Text).into()],
        ));

        let mut values = ParameterValueGroup::new(store_descriptor());
        values.set("path", "/data").unwrap();

        // keys unknown to `other` are ignored, its own members are checked
        let res = validate(&other, &values);
        assert_eq!(paths(&res), vec!["other.name"]);
    }

    #[test]
    fn allowed_values_compare_numerically() {
        let limits = Arc::new(group(
            "limits",
            true,
            vec![
                ParameterDescriptor::required("ratio", TypeTag::Float)
                    .with_valid_values([Value::Float(0.5), Value::Float(1.0)])
                    .into(),
            ],
        ));

        let mut values = ParameterValueGroup::new(limits.clone());
        values.set("ratio", 1_i64).unwrap();
        assert!(values.validate().is_valid());

        values.set("ratio", 2_i64).unwrap();
        assert_eq!(
            values.validate().violations()[0].error,
            ValidationError::NotAllowed("2".to_owned())
        );
    }
}
