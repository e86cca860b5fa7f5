//! Value expressions: the constraint language of the IR.
//!
//! Subtraction and division have no operators of their own. They are encoded as
//! `Add(x, Negate(y))` and `Mult(x, Invert(y))`.

use crate::lit::ValueLit;
use crate::path::LocalPath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Single-operand operators.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Negate,
    /// Boolean not.
    Not,
    /// Reciprocal.
    Invert,
    /// Lower bound of a range.
    Min,
    /// Upper bound of a range.
    Max,
    /// Midpoint of a range.
    Center,
    /// Width of a range.
    Width,
}

/// Operators collapsing an array.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ReductionOp {
    /// Sum of the elements.
    Sum,
    /// Whether every element is true.
    AllTrue,
    /// Whether any element is true.
    AnyTrue,
    /// Whether every element is equal.
    AllEq,
    /// Whether no two elements are equal.
    AllUnique,
    /// Largest element (largest upper bound for ranges).
    Maximum,
    /// Smallest element (smallest lower bound for ranges).
    Minimum,
    /// The single value shared by every element.
    SetExtract,
    /// Intersection of range elements.
    Intersection,
    /// Hull of range elements.
    Hull,
    /// Elementwise negation.
    Negate,
    /// Elementwise reciprocal.
    Invert,
}

/// Two-operand operators.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Multiplication.
    Mult,
    /// Boolean and.
    And,
    /// Boolean or.
    Or,
    /// Boolean exclusive or.
    Xor,
    /// Boolean implication.
    Implies,
    /// Equality.
    Eq,
    /// Inequality.
    Neq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Larger operand.
    Max,
    /// Smaller operand.
    Min,
    /// Range intersection.
    Intersection,
    /// Range hull.
    Hull,
    /// Left operand lies within the right range.
    Within,
    /// Range from a lower and an upper float.
    Range,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Mult => "*",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Xor => "^",
            BinaryOp::Implies => "=>",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Max => "max",
            BinaryOp::Min => "min",
            BinaryOp::Intersection => "intersect",
            BinaryOp::Hull => "hull",
            BinaryOp::Within => "within",
            BinaryOp::Range => "to",
        }
    }
}

/// Elementwise array-with-scalar operators.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum BinarySetOp {
    /// Adds the scalar to every element.
    Add,
    /// Multiplies every element by the scalar.
    Mult,
}

/// A value expression or a connection statement.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum ValueExpr {
    /// A literal value.
    Literal(ValueLit),
    /// A reference to a parameter or pseudo-parameter.
    Ref(LocalPath),
    /// A unary operation.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        val: Box<ValueExpr>,
    },
    /// A reduction over an array.
    Reduce {
        /// Operator.
        op: ReductionOp,
        /// Array operand.
        vals: Box<ValueExpr>,
    },
    /// A binary operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<ValueExpr>,
        /// Right operand.
        rhs: Box<ValueExpr>,
    },
    /// An elementwise array-with-scalar operation.
    BinarySet {
        /// Operator.
        op: BinarySetOp,
        /// Array operand.
        lhset: Box<ValueExpr>,
        /// Scalar operand.
        rhs: Box<ValueExpr>,
    },
    /// A conditional.
    IfThenElse {
        /// Condition.
        cond: Box<ValueExpr>,
        /// Value when true.
        tru: Box<ValueExpr>,
        /// Value when false.
        fal: Box<ValueExpr>,
    },
    /// An array built from expressions.
    Array(Vec<ValueExpr>),
    /// The array of `path` taken in each element of the vector `container`.
    MapExtract {
        /// Vector port.
        container: LocalPath,
        /// Path within each element.
        path: LocalPath,
    },
    /// A directed assignment.
    Assign {
        /// Destination parameter.
        dst: LocalPath,
        /// Source value.
        src: Box<ValueExpr>,
    },
    /// A block port joined to a link port.
    Connected {
        /// Port on a sub-block.
        block_port: LocalPath,
        /// Port on a link.
        link_port: LocalPath,
    },
    /// An interior port exported to the enclosing element's own port.
    Exported {
        /// Port of the enclosing element.
        exterior_port: LocalPath,
        /// Port inside the enclosing element.
        internal_block_port: LocalPath,
    },
    /// A block vector port joined element-by-element to a link or link array port.
    ConnectedArray {
        /// Vector port on a sub-block.
        block_port: LocalPath,
        /// Port on a link or link array.
        link_port: LocalPath,
    },
    /// A vector port exported element-by-element.
    ExportedArray {
        /// Vector port of the enclosing element.
        exterior_port: LocalPath,
        /// Vector port inside the enclosing element.
        internal_block_port: LocalPath,
    },
}

impl ValueExpr {
    /// A reference expression.
    pub fn reference(path: LocalPath) -> Self {
        ValueExpr::Ref(path)
    }

    /// A literal expression.
    pub fn literal(lit: impl Into<ValueLit>) -> Self {
        ValueExpr::Literal(lit.into())
    }

    /// A binary expression.
    pub fn binary(op: BinaryOp, lhs: ValueExpr, rhs: ValueExpr) -> Self {
        ValueExpr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// The referenced path, if this is a plain reference.
    pub fn as_ref_path(&self) -> Option<&LocalPath> {
        match self {
            ValueExpr::Ref(path) => Some(path),
            _ => None,
        }
    }

    /// Whether this is a connection statement rather than a value.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            ValueExpr::Connected { .. }
                | ValueExpr::Exported { .. }
                | ValueExpr::ConnectedArray { .. }
                | ValueExpr::ExportedArray { .. }
        )
    }

    /// Collects every path this expression reads, in traversal order.
    pub fn collect_refs<'a>(&'a self, out: &mut Vec<&'a LocalPath>) {
        match self {
            ValueExpr::Literal(_) => {}
            ValueExpr::Ref(path) => out.push(path),
            ValueExpr::Unary { val, .. } => val.collect_refs(out),
            ValueExpr::Reduce { vals, .. } => vals.collect_refs(out),
            ValueExpr::Binary { lhs, rhs, .. } => {
                lhs.collect_refs(out);
                rhs.collect_refs(out);
            }
            ValueExpr::BinarySet { lhset, rhs, .. } => {
                lhset.collect_refs(out);
                rhs.collect_refs(out);
            }
            ValueExpr::IfThenElse { cond, tru, fal } => {
                cond.collect_refs(out);
                tru.collect_refs(out);
                fal.collect_refs(out);
            }
            ValueExpr::Array(elts) => elts.iter().for_each(|e| e.collect_refs(out)),
            ValueExpr::MapExtract { container, .. } => out.push(container),
            ValueExpr::Assign { dst, src } => {
                out.push(dst);
                src.collect_refs(out);
            }
            ValueExpr::Connected {
                block_port,
                link_port,
            }
            | ValueExpr::ConnectedArray {
                block_port,
                link_port,
            } => {
                out.push(block_port);
                out.push(link_port);
            }
            ValueExpr::Exported {
                exterior_port,
                internal_block_port,
            }
            | ValueExpr::ExportedArray {
                exterior_port,
                internal_block_port,
            } => {
                out.push(exterior_port);
                out.push(internal_block_port);
            }
        }
    }

    /// Applies `f` to every path in the expression, in the order
    /// [`collect_refs`](Self::collect_refs) lists them.
    pub fn rewrite_refs(&mut self, f: &mut dyn FnMut(&mut LocalPath)) {
        match self {
            ValueExpr::Literal(_) => {}
            ValueExpr::Ref(path) => f(path),
            ValueExpr::Unary { val, .. } => val.rewrite_refs(f),
            ValueExpr::Reduce { vals, .. } => vals.rewrite_refs(f),
            ValueExpr::Binary { lhs, rhs, .. } | ValueExpr::BinarySet { lhset: lhs, rhs, .. } => {
                lhs.rewrite_refs(f);
                rhs.rewrite_refs(f);
            }
            ValueExpr::IfThenElse { cond, tru, fal } => {
                cond.rewrite_refs(f);
                tru.rewrite_refs(f);
                fal.rewrite_refs(f);
            }
            ValueExpr::Array(elts) => elts.iter_mut().for_each(|e| e.rewrite_refs(f)),
            ValueExpr::MapExtract { container, .. } => f(container),
            ValueExpr::Assign { dst, src } => {
                f(dst);
                src.rewrite_refs(f);
            }
            ValueExpr::Connected {
                block_port,
                link_port,
            }
            | ValueExpr::ConnectedArray {
                block_port,
                link_port,
            } => {
                f(block_port);
                f(link_port);
            }
            ValueExpr::Exported {
                exterior_port,
                internal_block_port,
            }
            | ValueExpr::ExportedArray {
                exterior_port,
                internal_block_port,
            } => {
                f(exterior_port);
                f(internal_block_port);
            }
        }
    }
}

impl fmt::Display for ValueExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueExpr::Literal(lit) => write!(f, "{lit}"),
            ValueExpr::Ref(path) => write!(f, "{path}"),
            ValueExpr::Unary { op, val } => match op {
                UnaryOp::Negate => write!(f, "-{val}"),
                UnaryOp::Not => write!(f, "!{val}"),
                UnaryOp::Invert => write!(f, "1/{val}"),
                UnaryOp::Min => write!(f, "lower({val})"),
                UnaryOp::Max => write!(f, "upper({val})"),
                UnaryOp::Center => write!(f, "center({val})"),
                UnaryOp::Width => write!(f, "width({val})"),
            },
            ValueExpr::Reduce { op, vals } => write!(f, "{op:?}({vals})"),
            ValueExpr::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            ValueExpr::BinarySet { op, lhset, rhs } => {
                let symbol = match op {
                    BinarySetOp::Add => "+",
                    BinarySetOp::Mult => "*",
                };
                write!(f, "({lhset} .{symbol} {rhs})")
            }
            ValueExpr::IfThenElse { cond, tru, fal } => write!(f, "({cond} ? {tru} : {fal})"),
            ValueExpr::Array(elts) => {
                write!(f, "[")?;
                for (i, elt) in elts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{elt}")?;
                }
                write!(f, "]")
            }
            ValueExpr::MapExtract { container, path } => write!(f, "map({container}, {path})"),
            ValueExpr::Assign { dst, src } => write!(f, "{dst} := {src}"),
            ValueExpr::Connected {
                block_port,
                link_port,
            } => write!(f, "connected({block_port}, {link_port})"),
            ValueExpr::Exported {
                exterior_port,
                internal_block_port,
            } => write!(f, "exported({exterior_port}, {internal_block_port})"),
            ValueExpr::ConnectedArray {
                block_port,
                link_port,
            } => write!(f, "connected_array({block_port}, {link_port})"),
            ValueExpr::ExportedArray {
                exterior_port,
                internal_block_port,
            } => write!(f, "exported_array({exterior_port}, {internal_block_port})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{LocalStep, ReservedParam};

    fn r(name: &str) -> ValueExpr {
        ValueExpr::reference(LocalPath::names(&[name]))
    }

    #[test]
    fn display_subtraction_encoding() {
        let sub = ValueExpr::binary(
            BinaryOp::Add,
            r("a"),
            ValueExpr::Unary {
                op: UnaryOp::Negate,
                val: Box::new(r("b")),
            },
        );
        assert_eq!(format!("{sub}"), "(a + -b)");
    }

    #[test]
    fn display_reduce_and_map() {
        let sum = ValueExpr::Reduce {
            op: ReductionOp::Sum,
            vals: Box::new(ValueExpr::MapExtract {
                container: LocalPath::names(&["sinks"]),
                path: LocalPath::names(&["current_draw"]),
            }),
        };
        assert_eq!(format!("{sum}"), "Sum(map(sinks, current_draw))");
    }

    #[test]
    fn rewrite_refs_reaches_connections() {
        let mut conn = ValueExpr::Connected {
            block_port: LocalPath::names(&["a", "pwr"]),
            link_port: LocalPath::names(&["net", "sinks"]).with(LocalStep::Allocate(None)),
        };
        conn.rewrite_refs(&mut |path| {
            for step in path.0.iter_mut() {
                if matches!(step, LocalStep::Allocate(None)) {
                    *step = LocalStep::Name("0".into());
                }
            }
        });
        assert_eq!(format!("{conn}"), "connected(a.pwr, net.sinks.0)");
    }

    #[test]
    fn collect_refs_in_order() {
        let expr = ValueExpr::IfThenElse {
            cond: Box::new(ValueExpr::reference(
                LocalPath::names(&["pwr"]).with(LocalStep::Reserved(ReservedParam::IsConnected)),
            )),
            tru: Box::new(r("x")),
            fal: Box::new(ValueExpr::literal(0.0)),
        };
        let mut refs = Vec::new();
        expr.collect_refs(&mut refs);
        assert_eq!(refs.len(), 2);
        assert_eq!(format!("{}", refs[1]), "x");
    }

    #[test]
    fn connection_detection() {
        let conn = ValueExpr::Connected {
            block_port: LocalPath::names(&["a", "pwr"]),
            link_port: LocalPath::names(&["net", "source"]),
        };
        assert!(conn.is_connection());
        assert!(!r("a").is_connection());
        assert_eq!(format!("{conn}"), "connected(a.pwr, net.source)");
    }
}
