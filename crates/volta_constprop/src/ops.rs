//! Operator semantics over partially known values.
//!
//! Every operation takes and returns `Option<Value>`, where `None` is an
//! unknown value. Errors in an operand become [`ErrorValue::Propagated`] so the
//! root cause is reported once, where it originated.

use crate::value::{ErrorValue, Value};
use volta_common::Range;
use volta_ir::{BinaryOp, BinarySetOp, ReductionOp, UnaryOp};

fn propagated() -> Value {
    Value::Error(ErrorValue::Propagated)
}

/// An interval view of a numeric operand.
#[derive(Clone, Copy, Debug)]
enum Numeric {
    Scalar(f64),
    Exact(Range),
    Subset(Range),
}

impl Numeric {
    fn of(value: &Value) -> Option<Numeric> {
        match value {
            Value::Int(i) => Some(Numeric::Scalar(*i as f64)),
            Value::Float(f) => Some(Numeric::Scalar(*f)),
            Value::Range(r) => Some(Numeric::Exact(*r)),
            Value::Subset(r) => Some(Numeric::Subset(*r)),
            _ => None,
        }
    }

    fn range(self) -> Range {
        match self {
            Numeric::Scalar(v) => Range::exact(v),
            Numeric::Exact(r) | Numeric::Subset(r) => r,
        }
    }

    fn is_subset(self) -> bool {
        matches!(self, Numeric::Subset(_))
    }

    fn is_scalar(self) -> bool {
        matches!(self, Numeric::Scalar(_))
    }
}

/// Wraps an interval result in the kind its operands call for.
fn shaped(lhs: Numeric, rhs: Numeric, out: Range) -> Value {
    if lhs.is_subset() || rhs.is_subset() {
        Value::Subset(out)
    } else if lhs.is_scalar() && rhs.is_scalar() {
        Value::Float(out.lower)
    } else {
        Value::Range(out)
    }
}

/// Applies a unary operator.
pub fn unary(op: UnaryOp, value: &Value) -> Option<Value> {
    if value.is_error() {
        return Some(propagated());
    }
    let out = match (op, value) {
        (UnaryOp::Not, Value::Bool(b)) => Value::Bool(!b),
        (UnaryOp::Negate, Value::Int(i)) => match i.checked_neg() {
            Some(n) => Value::Int(n),
            None => Value::error(format!("overflow negating {i}")),
        },
        (UnaryOp::Negate, Value::Float(f)) => Value::Float(-f),
        (UnaryOp::Negate, Value::Range(r)) => Value::Range(-*r),
        (UnaryOp::Negate, Value::Subset(r)) => Value::Subset(-*r),
        (UnaryOp::Invert, Value::Int(_) | Value::Float(_)) => {
            let v = value.as_float().unwrap_or_default();
            if v == 0.0 {
                Value::error("division by zero")
            } else {
                Value::Float(1.0 / v)
            }
        }
        (UnaryOp::Invert, Value::Range(r)) => match r.invert() {
            Ok(inv) => Value::Range(inv),
            Err(err) => Value::error(err.to_string()),
        },
        (UnaryOp::Invert, Value::Subset(r)) => match r.invert() {
            Ok(inv) => Value::Subset(inv),
            Err(err) => Value::error(err.to_string()),
        },
        (UnaryOp::Min, Value::Range(r)) => Value::Float(r.lower),
        (UnaryOp::Max, Value::Range(r)) => Value::Float(r.upper),
        (UnaryOp::Center, Value::Range(r)) => Value::Float(r.center()),
        (UnaryOp::Width, Value::Range(r)) => Value::Float(r.width()),
        // a subset may still shrink, so its bounds are not yet final
        (UnaryOp::Min | UnaryOp::Max | UnaryOp::Center | UnaryOp::Width, Value::Subset(_)) => {
            return None
        }
        (op, value) => Value::error(format!("cannot apply {op:?} to {value}")),
    };
    Some(out)
}

/// Whether an unknown operand can be dropped, leaving the other one as the result.
fn absorbs_unknown(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::Add | BinaryOp::Max | BinaryOp::Min | BinaryOp::Intersection
    )
}

/// Applies a binary operator.
pub fn binary(op: BinaryOp, lhs: Option<Value>, rhs: Option<Value>) -> Option<Value> {
    let (lhs, rhs) = match (lhs, rhs) {
        (None, None) => return None,
        (Some(known), None) | (None, Some(known)) => {
            return absorbs_unknown(op).then_some(known);
        }
        (Some(lhs), Some(rhs)) => (lhs, rhs),
    };
    if lhs.is_error() || rhs.is_error() {
        return Some(propagated());
    }
    match (&lhs, &rhs) {
        (Value::Bool(a), Value::Bool(b)) => Some(bool_op(op, *a, *b)),
        (Value::Text(a), Value::Text(b)) => Some(match op {
            BinaryOp::Eq => Value::Bool(a == b),
            BinaryOp::Neq => Value::Bool(a != b),
            _ => Value::error(format!("cannot apply {op:?} to strings")),
        }),
        (Value::Int(a), Value::Int(b)) => int_op(op, *a, *b).or_else(|| numeric_op(op, &lhs, &rhs)),
        (Value::Array(a), Value::Array(b)) => Some(match op {
            BinaryOp::Eq => Value::Bool(a == b),
            BinaryOp::Neq => Value::Bool(a != b),
            _ => Value::error(format!("cannot apply {op:?} to arrays")),
        }),
        _ => numeric_op(op, &lhs, &rhs),
    }
}

fn bool_op(op: BinaryOp, a: bool, b: bool) -> Value {
    match op {
        BinaryOp::And => Value::Bool(a && b),
        BinaryOp::Or => Value::Bool(a || b),
        BinaryOp::Xor => Value::Bool(a ^ b),
        BinaryOp::Implies => Value::Bool(!a || b),
        BinaryOp::Eq => Value::Bool(a == b),
        BinaryOp::Neq => Value::Bool(a != b),
        _ => Value::error(format!("cannot apply {op:?} to booleans")),
    }
}

/// Integer-preserving operators. Others fall through to the float rules.
fn int_op(op: BinaryOp, a: i64, b: i64) -> Option<Value> {
    let overflow = || Value::error(format!("integer overflow in {a} {op:?} {b}"));
    Some(match op {
        BinaryOp::Add => a.checked_add(b).map(Value::Int).unwrap_or_else(overflow),
        BinaryOp::Mult => a.checked_mul(b).map(Value::Int).unwrap_or_else(overflow),
        BinaryOp::Eq => Value::Bool(a == b),
        BinaryOp::Neq => Value::Bool(a != b),
        BinaryOp::Gt => Value::Bool(a > b),
        BinaryOp::Gte => Value::Bool(a >= b),
        BinaryOp::Lt => Value::Bool(a < b),
        BinaryOp::Lte => Value::Bool(a <= b),
        BinaryOp::Max => Value::Int(a.max(b)),
        BinaryOp::Min => Value::Int(a.min(b)),
        _ => return None,
    })
}

fn numeric_op(op: BinaryOp, lhs: &Value, rhs: &Value) -> Option<Value> {
    let (Some(l), Some(r)) = (Numeric::of(lhs), Numeric::of(rhs)) else {
        return Some(Value::error(format!(
            "cannot apply {op:?} to {lhs} and {rhs}"
        )));
    };
    let (lr, rr) = (l.range(), r.range());
    let out = match op {
        BinaryOp::Add => shaped(l, r, lr + rr),
        BinaryOp::Mult => shaped(l, r, lr * rr),
        BinaryOp::Range => match (l, r) {
            (Numeric::Scalar(lower), Numeric::Scalar(upper)) => match Range::new(lower, upper) {
                Ok(range) => Value::Range(range),
                Err(err) => Value::error(err.to_string()),
            },
            _ => Value::error(format!("range bounds must be numbers, not {lhs} and {rhs}")),
        },
        BinaryOp::Intersection => match lr.intersect(&rr) {
            Ok(common) if l.is_subset() || r.is_subset() => Value::Subset(common),
            Ok(common) => Value::Range(common),
            Err(err) => Value::error(err.to_string()),
        },
        BinaryOp::Hull => {
            if l.is_subset() || r.is_subset() {
                return None;
            }
            Value::Range(lr.hull(&rr))
        }
        BinaryOp::Max | BinaryOp::Min => {
            if l.is_subset() || r.is_subset() {
                return None;
            }
            let pick = |a: f64, b: f64| {
                if op == BinaryOp::Max {
                    a.max(b)
                } else {
                    a.min(b)
                }
            };
            let out = Range {
                lower: pick(lr.lower, rr.lower),
                upper: pick(lr.upper, rr.upper),
            };
            shaped(l, r, out)
        }
        BinaryOp::Within => {
            if r.is_subset() {
                return None;
            }
            Value::Bool(rr.contains(&lr))
        }
        BinaryOp::Eq | BinaryOp::Neq | BinaryOp::Gt | BinaryOp::Gte | BinaryOp::Lt | BinaryOp::Lte => {
            if l.is_subset() || r.is_subset() {
                return None;
            }
            Value::Bool(match op {
                BinaryOp::Eq => lr == rr,
                BinaryOp::Neq => lr != rr,
                BinaryOp::Gt => lr.lower > rr.upper,
                BinaryOp::Gte => lr.lower >= rr.upper,
                BinaryOp::Lt => lr.upper < rr.lower,
                _ => lr.upper <= rr.lower,
            })
        }
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor | BinaryOp::Implies => {
            Value::error(format!("cannot apply {op:?} to {lhs} and {rhs}"))
        }
    };
    Some(out)
}

/// Divides `lhs` by `rhs` as interval division, the evaluation of
/// `Mult(lhs, Invert(rhs))`.
///
/// Unlike multiplying by the reciprocal this sees both operands, so a zero
/// bound over a zero bound is reported instead of vanishing into `0 * inf`.
pub fn divide(lhs: Option<Value>, rhs: Option<Value>) -> Option<Value> {
    let (lhs, rhs) = (lhs?, rhs?);
    if lhs.is_error() || rhs.is_error() {
        return Some(propagated());
    }
    let (Some(l), Some(r)) = (Numeric::of(&lhs), Numeric::of(&rhs)) else {
        return Some(Value::error(format!("cannot divide {lhs} by {rhs}")));
    };
    if let Numeric::Scalar(divisor) = r {
        if l.is_scalar() && divisor == 0.0 {
            return Some(Value::error("division by zero"));
        }
    }
    Some(match l.range().checked_div(&r.range()) {
        Ok(out) => shaped(l, r, out),
        Err(err) => Value::error(err.to_string()),
    })
}

/// Applies an elementwise array-with-scalar operator.
pub fn binary_set(op: BinarySetOp, set: Option<Value>, rhs: Option<Value>) -> Option<Value> {
    let (set, rhs) = (set?, rhs?);
    if set.is_error() || rhs.is_error() {
        return Some(propagated());
    }
    let Value::Array(elts) = set else {
        return Some(Value::error(format!("{set} is not an array")));
    };
    let op = match op {
        BinarySetOp::Add => BinaryOp::Add,
        BinarySetOp::Mult => BinaryOp::Mult,
    };
    elts.into_iter()
        .map(|elt| binary(op, Some(elt), Some(rhs.clone())))
        .collect::<Option<Vec<_>>>()
        .map(Value::Array)
}

/// Applies a reduction.
pub fn reduce(op: ReductionOp, vals: Option<Value>) -> Option<Value> {
    match vals? {
        Value::Error(_) => Some(propagated()),
        Value::Range(r) => Some(match op {
            ReductionOp::Maximum => Value::Float(r.upper),
            ReductionOp::Minimum => Value::Float(r.lower),
            _ => Value::error(format!("cannot reduce range {r} with {op:?}")),
        }),
        Value::Subset(r) => match op {
            ReductionOp::Maximum | ReductionOp::Minimum => None,
            _ => Some(Value::error(format!("cannot reduce subset {r} with {op:?}"))),
        },
        Value::Array(elts) => reduce_array(op, elts),
        other => Some(Value::error(format!("cannot reduce {other}"))),
    }
}

fn reduce_array(op: ReductionOp, elts: Vec<Value>) -> Option<Value> {
    if elts.is_empty() {
        return None;
    }
    if elts.iter().any(Value::is_error) {
        return Some(propagated());
    }
    let out = match op {
        ReductionOp::Sum => return fold(BinaryOp::Add, elts),
        ReductionOp::Intersection => return fold(BinaryOp::Intersection, elts),
        ReductionOp::Hull => return fold(BinaryOp::Hull, elts),
        ReductionOp::AllTrue | ReductionOp::AnyTrue => {
            let Some(bools) = elts.iter().map(Value::as_bool).collect::<Option<Vec<_>>>() else {
                return Some(Value::error(format!("cannot reduce non-booleans with {op:?}")));
            };
            if op == ReductionOp::AllTrue {
                Value::Bool(bools.iter().all(|b| *b))
            } else {
                Value::Bool(bools.iter().any(|b| *b))
            }
        }
        ReductionOp::AllEq => Value::Bool(elts.iter().all(|e| *e == elts[0])),
        ReductionOp::AllUnique => Value::Bool(
            elts.iter()
                .enumerate()
                .all(|(i, e)| !elts[i + 1..].contains(e)),
        ),
        ReductionOp::SetExtract => {
            if elts.iter().all(|e| *e == elts[0]) {
                elts[0].clone()
            } else {
                Value::error("set extraction over differing values")
            }
        }
        ReductionOp::Maximum | ReductionOp::Minimum => return extreme(op, &elts),
        ReductionOp::Negate | ReductionOp::Invert => {
            let unary_op = if op == ReductionOp::Negate {
                UnaryOp::Negate
            } else {
                UnaryOp::Invert
            };
            return elts
                .iter()
                .map(|e| unary(unary_op, e))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array);
        }
    };
    Some(out)
}

fn fold(op: BinaryOp, elts: Vec<Value>) -> Option<Value> {
    let mut iter = elts.into_iter();
    let first = iter.next();
    iter.fold(first, |acc, elt| binary(op, acc, Some(elt)))
}

/// The largest upper bound or smallest lower bound across numbers and ranges.
fn extreme(op: ReductionOp, elts: &[Value]) -> Option<Value> {
    if let Some(ints) = elts
        .iter()
        .map(|e| match e {
            Value::Int(i) => Some(*i),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
    {
        let picked = if op == ReductionOp::Maximum {
            ints.iter().max()
        } else {
            ints.iter().min()
        };
        return picked.copied().map(Value::Int);
    }
    let mut nums = Vec::with_capacity(elts.len());
    for elt in elts {
        match Numeric::of(elt) {
            Some(Numeric::Subset(_)) => return None,
            Some(num) => nums.push(num.range()),
            None => return Some(Value::error(format!("cannot reduce {elt} with {op:?}"))),
        }
    }
    let picked = if op == ReductionOp::Maximum {
        nums.iter().map(|r| r.upper).fold(f64::NEG_INFINITY, f64::max)
    } else {
        nums.iter().map(|r| r.lower).fold(f64::INFINITY, f64::min)
    };
    Some(Value::Float(picked))
}

/// Merges the values every contributor gives one parameter.
///
/// Errors win over everything; a cycle keeps its identity, other errors become
/// [`ErrorValue::Propagated`]. Distinct exact values conflict. Otherwise the
/// subset bounds are intersected. With nothing known the result is unknown.
pub fn merge(results: impl IntoIterator<Item = Option<Value>>) -> Option<Value> {
    let mut exact: Vec<Value> = Vec::new();
    let mut subsets: Vec<Range> = Vec::new();
    for value in results.into_iter().flatten() {
        match value {
            // a cycle is reported on every parameter along it
            Value::Error(ErrorValue::Cycle(path)) => {
                return Some(Value::Error(ErrorValue::Cycle(path)))
            }
            Value::Error(_) => return Some(propagated()),
            Value::Subset(r) => subsets.push(r),
            value => {
                if !exact.contains(&value) {
                    exact.push(value);
                }
            }
        }
    }
    if exact.len() > 1 {
        let listed: Vec<String> = exact.iter().map(ToString::to_string).collect();
        return Some(Value::error(format!(
            "multiple assign values {}",
            listed.join(", ")
        )));
    }
    if let Some(value) = exact.pop() {
        return Some(value);
    }
    let (first, rest) = subsets.split_first()?;
    let merged = rest
        .iter()
        .try_fold(*first, |acc, r| acc.intersect(r));
    Some(match merged {
        Ok(bound) => Value::Subset(bound),
        Err(err) => Value::error(err.to_string()),
    })
}
