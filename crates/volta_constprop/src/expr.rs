//! Expressions with every reference resolved to an absolute path.

use crate::ops;
use crate::value::{ErrorValue, Value};
use volta_ir::{BinaryOp, BinarySetOp, DesignPath, ReductionOp, UnaryOp};

/// A value expression located in the design.
///
/// References were followed when the expression was added to the graph, so
/// evaluation only needs a way to resolve absolute paths. A reference to a
/// port path asks whether the port is connected.
#[derive(Clone, PartialEq, Debug)]
pub(crate) enum PropExpr {
    Literal(Value),
    Param(DesignPath),
    /// A reference that leads nowhere, such as the link of an unconnected port.
    Unknown,
    Unary {
        op: UnaryOp,
        val: Box<PropExpr>,
    },
    Reduce {
        op: ReductionOp,
        vals: Box<PropExpr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<PropExpr>,
        rhs: Box<PropExpr>,
    },
    BinarySet {
        op: BinarySetOp,
        lhset: Box<PropExpr>,
        rhs: Box<PropExpr>,
    },
    IfThenElse {
        cond: Box<PropExpr>,
        tru: Box<PropExpr>,
        fal: Box<PropExpr>,
    },
    Array(Vec<PropExpr>),
    /// One expression per vector element. Unknown elements are left out.
    MapExtract(Vec<PropExpr>),
}

impl PropExpr {
    pub(crate) fn eval(&self, resolve: &mut dyn FnMut(&DesignPath) -> Option<Value>) -> Option<Value> {
        match self {
            PropExpr::Literal(value) => Some(value.clone()),
            PropExpr::Param(path) => resolve(path),
            PropExpr::Unknown => None,
            PropExpr::Unary { op, val } => ops::unary(*op, &val.eval(resolve)?),
            PropExpr::Reduce { op, vals } => ops::reduce(*op, vals.eval(resolve)),
            PropExpr::Binary { op, lhs, rhs } => {
                // division is written as multiplying by the reciprocal
                if let (BinaryOp::Mult, PropExpr::Unary { op: UnaryOp::Invert, val }) = (op, &**rhs) {
                    let lhs = lhs.eval(resolve);
                    return ops::divide(lhs, val.eval(resolve));
                }
                let lhs = lhs.eval(resolve);
                let rhs = rhs.eval(resolve);
                ops::binary(*op, lhs, rhs)
            }
            PropExpr::BinarySet { op, lhset, rhs } => {
                let lhset = lhset.eval(resolve);
                let rhs = rhs.eval(resolve);
                ops::binary_set(*op, lhset, rhs)
            }
            PropExpr::IfThenElse { cond, tru, fal } => match cond.eval(resolve)? {
                Value::Bool(true) => tru.eval(resolve),
                Value::Bool(false) => fal.eval(resolve),
                Value::Error(_) => Some(Value::Error(ErrorValue::Propagated)),
                other => Some(Value::error(format!("non-boolean condition {other}"))),
            },
            PropExpr::Array(elts) => {
                let mut out = Vec::with_capacity(elts.len());
                for elt in elts {
                    out.push(elt.eval(resolve)?);
                }
                Some(Value::Array(out))
            }
            PropExpr::MapExtract(elts) => Some(Value::Array(
                elts.iter().filter_map(|elt| elt.eval(resolve)).collect(),
            )),
        }
    }
}
