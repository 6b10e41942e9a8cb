use std::cmp::Ordering;

use super::{BinaryOp, FilterNode, IsSupportedOp, NAryOp, UnaryOp, Value};
use crate::types::Feature;

impl FilterNode {
    /// Evaluates this tree against the properties of `feature`.
    ///
    /// Property references resolve to the property with the same path;
    /// missing properties make every comparison false. Ordering is only
    /// defined between numbers.
    pub fn evaluate(&self, feature: &Feature) -> bool {
        truthy(self.resolve(feature).as_ref())
    }

    fn resolve(&self, feature: &Feature) -> Option<Value> {
        match self {
            Self::Literal(v) => Some(v.clone()),
            Self::PropertyReference(path) => feature.property(path).cloned(),
            Self::Unary { op, child } => {
                let operand = child.resolve(feature);
                let res = match op {
                    UnaryOp::Not => !truthy(operand.as_ref()),
                    UnaryOp::IsNull => operand.is_none(),
                };
                Some(Value::Boolean(res))
            }
            Self::Binary { op, left, right } => {
                let l = left.resolve(feature);
                let r = right.resolve(feature);
                let res = match (l, r) {
                    (Some(l), Some(r)) => apply(*op, &l, &r),
                    _ => false,
                };
                Some(Value::Boolean(res))
            }
            Self::NAry { op, children } => {
                let res = match op {
                    NAryOp::And => children.iter().all(|c| c.evaluate(feature)),
                    NAryOp::Or => children.iter().any(|c| c.evaluate(feature)),
                };
                Some(Value::Boolean(res))
            }
        }
    }
}

fn truthy(v: Option<&Value>) -> bool {
    matches!(v, Some(Value::Boolean(true)))
}

fn apply(op: BinaryOp, l: &Value, r: &Value) -> bool {
    match op {
        BinaryOp::Eq => comparable(l, r) && equals(l, r),
        BinaryOp::Neq => comparable(l, r) && !equals(l, r),
        BinaryOp::Lt => ordering(l, r) == Some(Ordering::Less),
        BinaryOp::Leq => matches!(ordering(l, r), Some(Ordering::Less | Ordering::Equal)),
        BinaryOp::Gt => ordering(l, r) == Some(Ordering::Greater),
        BinaryOp::Geq => matches!(ordering(l, r), Some(Ordering::Greater | Ordering::Equal)),
        BinaryOp::Like => match (l, r) {
            (Value::Text(text), Value::Text(pattern)) if l.support_match() => {
                let text: Vec<char> = text.chars().collect();
                let pattern: Vec<char> = pattern.chars().collect();
                like(&text, &pattern)
            }
            _ => false,
        },
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Integer(n) => Some(*n as f64),
        Value::Float(n) => Some(*n),
        _ => None,
    }
}

fn comparable(l: &Value, r: &Value) -> bool {
    l.support_eq() && r.support_eq()
}

fn equals(l: &Value, r: &Value) -> bool {
    match (as_number(l), as_number(r)) {
        (Some(a), Some(b)) => a == b,
        _ => l == r,
    }
}

fn ordering(l: &Value, r: &Value) -> Option<Ordering> {
    if !(l.support_ordering() && r.support_ordering()) {
        return None;
    }
    as_number(l)?.partial_cmp(&as_number(r)?)
}

/// Matches `text` against a pattern where `%` stands for any sequence and
/// `_` for any character. Backtracking only returns to the last `%` seen, so
/// the work is bounded by the product of both lengths.
fn like(text: &[char], pattern: &[char]) -> bool {
    let (mut t, mut p) = (0, 0);
    // pattern position after the last `%`, and the text position it resumes from
    let mut resume: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                p += 1;
                resume = Some((p, t));
            }
            Some(c) if *c == '_' || *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match resume {
                Some((rp, rt)) => {
                    p = rp;
                    t = rt + 1;
                    resume = Some((rp, t));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '%')
}
