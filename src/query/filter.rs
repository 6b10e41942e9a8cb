//! # Filter Trees
//!
//! Query filters are expression trees over feature properties, built from
//! four kinds of nodes:
//!
//! -   _Leaves_: a [`FilterNode::Literal`] holding a [`Value`], or a
//!     [`FilterNode::PropertyReference`] naming a feature property by path.
//!
//! -   _Unary operations_ ([`UnaryOp`]): negation and null checks.
//!
//! -   _Binary operations_ ([`BinaryOp`]): comparisons (`Eq`, `Lt`, ...) and
//!     pattern matching (`Like`).
//!
//! -   _N-ary operations_ ([`NAryOp`]): logical `And`/`Or` over any number of
//!     children.
//!
//! Trees are immutable: every transformation returns a new tree.

use serde::{Deserialize, Serialize};

/// Floating point value type alias
pub type Float = f64;
/// Integer value type alias
pub type Integer = i64;
/// Literal type alias
pub type Text = String;

/// A wrapper enum to allow heterogeneous values (Numbers and Strings)
/// to coexist in filter literals and feature properties.
#[derive(Debug, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(Integer),
    Float(Float),
    Text(Text),
    Boolean(bool),
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

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

/// A trait that indicates which operations are supported by an
/// implementing type.
///
/// Each method corresponds to a capability check for a particular
/// operation. By default, all operations are unsupported (`false`).
/// Implementors should override the methods for the operations they
/// support.
///
/// These checks are performed at **runtime**.
pub trait IsSupportedOp {
    fn support_eq(&self) -> bool {
        false
    }
    fn support_ordering(&self) -> bool {
        false
    }
    fn support_match(&self) -> bool {
        false
    }
}

impl IsSupportedOp for Value {
    fn support_eq(&self) -> bool {
        true
    }

    fn support_ordering(&self) -> bool {
        match self {
            Self::Text(_) => false,
            Self::Boolean(_) => false,
            Self::Integer(_) => true,
            Self::Float(_) => true,
        }
    }

    fn support_match(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// Logical negation
    Not,
    /// True when the operand does not resolve to a value
    IsNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    /// Equal
    Eq,
    /// Not equal
    Neq,
    /// Lower then
    Lt,
    /// Less than or equal
    Leq,
    /// Greater then
    Gt,
    /// Greater then or equal
    Geq,
    /// Matches a pattern, `%` stands for any sequence and `_` for any character
    Like,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NAryOp {
    And,
    Or,
}

/// A node of a filter expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterNode {
    Literal(Value),
    PropertyReference(String),
    Unary {
        op: UnaryOp,
        child: Box<FilterNode>,
    },
    Binary {
        op: BinaryOp,
        left: Box<FilterNode>,
        right: Box<FilterNode>,
    },
    NAry {
        op: NAryOp,
        children: Vec<FilterNode>,
    },
}

impl FilterNode {
    pub fn literal(v: impl Into<Value>) -> Self {
        Self::Literal(v.into())
    }

    pub fn property(path: impl Into<String>) -> Self {
        Self::PropertyReference(path.into())
    }

    pub fn unary(op: UnaryOp, child: FilterNode) -> Self {
        Self::Unary {
            op,
            child: Box::new(child),
        }
    }

    pub fn binary(op: BinaryOp, left: FilterNode, right: FilterNode) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn nary(op: NAryOp, children: Vec<FilterNode>) -> Self {
        Self::NAry { op, children }
    }

    /// Shorthand for `property <op> literal`, the most common comparison.
    pub fn compare(op: BinaryOp, path: impl Into<String>, v: impl Into<Value>) -> Self {
        Self::binary(op, Self::property(path), Self::literal(v))
    }

    pub fn and(children: Vec<FilterNode>) -> Self {
        Self::nary(NAryOp::And, children)
    }

    pub fn or(children: Vec<FilterNode>) -> Self {
        Self::nary(NAryOp::Or, children)
    }

    pub fn not(child: FilterNode) -> Self {
        Self::unary(UnaryOp::Not, child)
    }

    /// Returns a copy of this tree where every property reference for which
    /// `f` returns a new path is replaced. Everything else is duplicated as is.
    pub fn map_references<F>(&self, f: &F) -> FilterNode
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            Self::Literal(v) => Self::Literal(v.clone()),
            Self::PropertyReference(path) => {
                Self::PropertyReference(f(path).unwrap_or_else(|| path.clone()))
            }
            Self::Unary { op, child } => Self::unary(*op, child.map_references(f)),
            Self::Binary { op, left, right } => {
                Self::binary(*op, left.map_references(f), right.map_references(f))
            }
            Self::NAry { op, children } => Self::nary(
                *op,
                children.iter().map(|c| c.map_references(f)).collect(),
            ),
        }
    }

    /// Collects all property reference paths, depth first.
    pub fn property_references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Literal(_) => {}
            Self::PropertyReference(path) => out.push(path),
            Self::Unary { child, .. } => child.collect_references(out),
            Self::Binary { left, right, .. } => {
                left.collect_references(out);
                right.collect_references(out);
            }
            Self::NAry { children, .. } => {
                for c in children {
                    c.collect_references(out);
                }
            }
        }
    }
}
