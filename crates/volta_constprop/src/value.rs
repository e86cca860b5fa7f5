//! Values produced by propagation.

use std::fmt;
use volta_common::Range;
use volta_ir::{DesignPath, ValueLit};

/// Why a value could not be computed.
#[derive(Clone, PartialEq, Debug)]
pub enum ErrorValue {
    /// The error originated here.
    Message(String),
    /// Resolving the path led back to itself with no other defining edge.
    Cycle(DesignPath),
    /// An operand was already an error.
    Propagated,
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorValue::Message(desc) => write!(f, "{desc}"),
            ErrorValue::Cycle(path) => write!(f, "cyclic dependency in evaluating {path}"),
            ErrorValue::Propagated => write!(f, "(propagated)"),
        }
    }
}

/// A resolved parameter value.
///
/// Resolution returns `Option<Value>`: `None` means nothing is known yet, which
/// is distinct from both zero and an error.
#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A float.
    Float(f64),
    /// An interval known exactly.
    Range(Range),
    /// A bound the final interval must lie within. It may still shrink.
    Subset(Range),
    /// A string.
    Text(String),
    /// An array of values.
    Array(Vec<Value>),
    /// A failed evaluation. It poisons every expression that reads it.
    Error(ErrorValue),
}

impl Value {
    /// An error value carrying `desc`.
    pub fn error(desc: impl Into<String>) -> Self {
        Value::Error(ErrorValue::Message(desc.into()))
    }

    /// Whether this is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Converts a literal.
    pub fn from_lit(lit: &ValueLit) -> Self {
        match lit {
            ValueLit::Bool(b) => Value::Bool(*b),
            ValueLit::Int(i) => Value::Int(*i),
            ValueLit::Float(f) => Value::Float(*f),
            ValueLit::Range(r) => Value::Range(*r),
            ValueLit::Text(s) => Value::Text(s.clone()),
            ValueLit::Array(elts) => Value::Array(elts.iter().map(Value::from_lit).collect()),
        }
    }

    /// The literal form of this value. Subsets are written as their current
    /// bound; errors have no literal form.
    pub fn to_lit(&self) -> Option<ValueLit> {
        Some(match self {
            Value::Bool(b) => ValueLit::Bool(*b),
            Value::Int(i) => ValueLit::Int(*i),
            Value::Float(f) => ValueLit::Float(*f),
            Value::Range(r) | Value::Subset(r) => ValueLit::Range(*r),
            Value::Text(s) => ValueLit::Text(s.clone()),
            Value::Array(elts) => {
                ValueLit::Array(elts.iter().map(Value::to_lit).collect::<Option<Vec<_>>>()?)
            }
            Value::Error(_) => return None,
        })
    }

    /// The boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The numeric value of an integer or float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The interval of an exact range or subset.
    pub fn as_range(&self) -> Option<Range> {
        match self {
            Value::Range(r) | Value::Subset(r) => Some(*r),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Range(r) => write!(f, "{r}"),
            Value::Subset(r) => write!(f, "within {r}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Array(elts) => {
                write!(f, "[")?;
                for (i, elt) in elts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{elt}")?;
                }
                write!(f, "]")
            }
            Value::Error(err) => write!(f, "error: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_conversion() {
        let lit = ValueLit::Array(vec![ValueLit::Int(1), ValueLit::Range(Range::exact(2.0))]);
        let value = Value::from_lit(&lit);
        assert_eq!(
            value,
            Value::Array(vec![Value::Int(1), Value::Range(Range::exact(2.0))])
        );
        assert_eq!(value.to_lit(), Some(lit));
    }

    #[test]
    fn subsets_write_their_bound() {
        let r = Range::new(1.0, 2.0).unwrap();
        assert_eq!(Value::Subset(r).to_lit(), Some(ValueLit::Range(r)));
        assert_eq!(Value::error("x").to_lit(), None);
        assert_eq!(
            Value::Array(vec![Value::Int(1), Value::Error(ErrorValue::Propagated)]).to_lit(),
            None
        );
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Value::Text("a".into())), "\"a\"");
        assert_eq!(format!("{}", Value::error("bad")), "error: bad");
        assert_eq!(
            format!("{}", Value::Error(ErrorValue::Propagated)),
            "error: (propagated)"
        );
    }
}
