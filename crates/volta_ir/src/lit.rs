//! Literal values and parameter types.

use serde::{Deserialize, Serialize};
use std::fmt;
use volta_common::Range;

/// The declared type of a parameter or expression.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ParamType {
    /// Boolean.
    Bool,
    /// Signed integer.
    Int,
    /// Floating point.
    Float,
    /// Closed interval of floats.
    Range,
    /// String.
    Text,
    /// Homogeneous array.
    Array(Box<ParamType>),
}

impl ParamType {
    /// Whether values of this type take part in arithmetic.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ParamType::Int | ParamType::Float | ParamType::Range)
    }

    /// The element type of an array type.
    pub fn element(&self) -> Option<&ParamType> {
        match self {
            ParamType::Array(elt) => Some(elt),
            _ => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Bool => write!(f, "bool"),
            ParamType::Int => write!(f, "int"),
            ParamType::Float => write!(f, "float"),
            ParamType::Range => write!(f, "range"),
            ParamType::Text => write!(f, "string"),
            ParamType::Array(elt) => write!(f, "array<{elt}>"),
        }
    }
}

/// A literal parameter value.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum ValueLit {
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// Range literal.
    Range(Range),
    /// String literal.
    Text(String),
    /// Array literal.
    Array(Vec<ValueLit>),
}

impl ValueLit {
    /// The type of this literal. Empty arrays report an array of floats.
    pub fn param_type(&self) -> ParamType {
        match self {
            ValueLit::Bool(_) => ParamType::Bool,
            ValueLit::Int(_) => ParamType::Int,
            ValueLit::Float(_) => ParamType::Float,
            ValueLit::Range(_) => ParamType::Range,
            ValueLit::Text(_) => ParamType::Text,
            ValueLit::Array(elts) => ParamType::Array(Box::new(
                elts.first()
                    .map(ValueLit::param_type)
                    .unwrap_or(ParamType::Float),
            )),
        }
    }

    /// Whether this literal can initialize a parameter of type `ty`.
    ///
    /// Integers widen to floats; everything else must match exactly.
    pub fn conforms_to(&self, ty: &ParamType) -> bool {
        match (self, ty) {
            (ValueLit::Int(_), ParamType::Float) => true,
            (ValueLit::Array(elts), ParamType::Array(elt_ty)) => {
                elts.iter().all(|e| e.conforms_to(elt_ty))
            }
            _ => self.param_type() == *ty,
        }
    }

    /// The boolean value, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ValueLit::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The numeric value, if this is an integer or float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ValueLit::Int(i) => Some(*i as f64),
            ValueLit::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The integer value, if this is an integer or an integral float.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ValueLit::Int(i) => Some(*i),
            ValueLit::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    /// The range value, if this is a range.
    pub fn as_range(&self) -> Option<Range> {
        match self {
            ValueLit::Range(r) => Some(*r),
            _ => None,
        }
    }

    /// The string value, if this is a string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ValueLit::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The elements, if this is an array.
    pub fn as_array(&self) -> Option<&[ValueLit]> {
        match self {
            ValueLit::Array(elts) => Some(elts),
            _ => None,
        }
    }
}

impl From<bool> for ValueLit {
    fn from(value: bool) -> Self {
        ValueLit::Bool(value)
    }
}

impl From<i64> for ValueLit {
    fn from(value: i64) -> Self {
        ValueLit::Int(value)
    }
}

impl From<f64> for ValueLit {
    fn from(value: f64) -> Self {
        ValueLit::Float(value)
    }
}

impl From<Range> for ValueLit {
    fn from(value: Range) -> Self {
        ValueLit::Range(value)
    }
}

impl From<&str> for ValueLit {
    fn from(value: &str) -> Self {
        ValueLit::Text(value.to_string())
    }
}

impl From<String> for ValueLit {
    fn from(value: String) -> Self {
        ValueLit::Text(value)
    }
}

impl fmt::Display for ValueLit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueLit::Bool(b) => write!(f, "{b}"),
            ValueLit::Int(i) => write!(f, "{i}"),
            ValueLit::Float(x) => write!(f, "{x}"),
            ValueLit::Range(r) => write!(f, "{r}"),
            ValueLit::Text(s) => write!(f, "\"{s}\""),
            ValueLit::Array(elts) => {
                write!(f, "[")?;
                for (i, elt) in elts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{elt}")?;
                }
                write!(f, "]")
            }
        }
    }
}
