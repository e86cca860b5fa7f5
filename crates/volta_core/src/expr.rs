//! Explicit expression constructors and their typing rules.
//!
//! An [`Expr`] names an operator and its operands; [`BlockBuilder::expr`]
//! checks the operand types and allocates a new node whose binding refers to
//! the operands. Subtraction and division have no node of their own: they
//! lower to addition of a negation and multiplication by an inverse.
//!
//! [`BlockBuilder::expr`]: crate::builder::BlockBuilder::expr

use crate::binding::{Binding, ExprNode};
use crate::context::BuildContext;
use crate::error::{BuildError, BuildResult};
use crate::ids::NodeId;
use volta_common::Range;
use volta_ir::{BinaryOp, BinarySetOp, ParamType, ReductionOp, UnaryOp, ValueLit};

/// An operand: either an existing node or a literal to materialize.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprArg {
    /// A literal value.
    Lit(ValueLit),
    /// A node from the current elaboration.
    Node(NodeId),
}

impl From<NodeId> for ExprArg {
    fn from(node: NodeId) -> Self {
        ExprArg::Node(node)
    }
}

impl From<ValueLit> for ExprArg {
    fn from(value: ValueLit) -> Self {
        ExprArg::Lit(value)
    }
}

impl From<bool> for ExprArg {
    fn from(value: bool) -> Self {
        ExprArg::Lit(ValueLit::Bool(value))
    }
}

impl From<i64> for ExprArg {
    fn from(value: i64) -> Self {
        ExprArg::Lit(ValueLit::Int(value))
    }
}

impl From<f64> for ExprArg {
    fn from(value: f64) -> Self {
        ExprArg::Lit(ValueLit::Float(value))
    }
}

impl From<Range> for ExprArg {
    fn from(value: Range) -> Self {
        ExprArg::Lit(ValueLit::Range(value))
    }
}

impl From<&str> for ExprArg {
    fn from(value: &str) -> Self {
        ExprArg::Lit(ValueLit::Text(value.to_string()))
    }
}

impl From<String> for ExprArg {
    fn from(value: String) -> Self {
        ExprArg::Lit(ValueLit::Text(value))
    }
}

/// An expression to build.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// `a + b`.
    Add(ExprArg, ExprArg),
    /// `a - b`.
    Sub(ExprArg, ExprArg),
    /// `a * b`.
    Mul(ExprArg, ExprArg),
    /// `a / b`.
    Div(ExprArg, ExprArg),
    /// `-a`.
    Neg(ExprArg),
    /// `1 / a`.
    Invert(ExprArg),
    /// Boolean negation.
    Not(ExprArg),
    /// Boolean and.
    And(ExprArg, ExprArg),
    /// Boolean or.
    Or(ExprArg, ExprArg),
    /// Boolean exclusive or.
    Xor(ExprArg, ExprArg),
    /// Boolean implication.
    Implies(ExprArg, ExprArg),
    /// Equality.
    Eq(ExprArg, ExprArg),
    /// Inequality.
    Ne(ExprArg, ExprArg),
    /// `a > b`.
    Gt(ExprArg, ExprArg),
    /// `a >= b`.
    Ge(ExprArg, ExprArg),
    /// `a < b`.
    Lt(ExprArg, ExprArg),
    /// `a <= b`.
    Le(ExprArg, ExprArg),
    /// Larger of two values.
    Max(ExprArg, ExprArg),
    /// Smaller of two values.
    Min(ExprArg, ExprArg),
    /// `a` lies within range `b`.
    Within(ExprArg, ExprArg),
    /// Range `a` contains `b`.
    Contains(ExprArg, ExprArg),
    /// Intersection of two ranges.
    Intersect(ExprArg, ExprArg),
    /// Smallest range containing both.
    Hull(ExprArg, ExprArg),
    /// Lower bound of a range.
    Lower(ExprArg),
    /// Upper bound of a range.
    Upper(ExprArg),
    /// Midpoint of a range.
    Center(ExprArg),
    /// Width of a range.
    Width(ExprArg),
    /// The range `[a, b]` from two numbers.
    Range(ExprArg, ExprArg),
    /// `if c then a else b`.
    IfThenElse(ExprArg, ExprArg, ExprArg),
    /// An array of values of one type.
    Array(Vec<ExprArg>),
    /// A reduction over an array.
    Reduce(ReductionOp, ExprArg),
    /// Adds a scalar to every element of an array.
    ArrayAdd(ExprArg, ExprArg),
    /// Multiplies every element of an array by a scalar.
    ArrayMul(ExprArg, ExprArg),
}

/// Materializes an operand in `ctx`, rejecting handles from other elaborations.
pub(crate) fn operand(ctx: &mut BuildContext, class: &str, arg: &ExprArg) -> BuildResult<NodeId> {
    match arg {
        ExprArg::Lit(value) => Ok(ctx.literal(value.clone())),
        ExprArg::Node(node) if ctx.owns(*node) => Ok(*node),
        ExprArg::Node(_) => Err(BuildError::ForeignExpression {
            class: class.to_string(),
        }),
    }
}

fn mismatch(op: &str, types: &[&ParamType]) -> BuildError {
    let detail = types
        .iter()
        .map(|ty| ty.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    BuildError::TypeMismatch {
        op: op.to_string(),
        detail,
    }
}

/// Result type of an arithmetic operator: ranges dominate, then floats.
fn arith_type(op: &str, lhs: &ParamType, rhs: &ParamType) -> BuildResult<ParamType> {
    match (lhs, rhs) {
        (ParamType::Int, ParamType::Int) => Ok(ParamType::Int),
        (ParamType::Range, r) | (r, ParamType::Range) if r.is_numeric() => Ok(ParamType::Range),
        (l, r) if l.is_numeric() && r.is_numeric() => Ok(ParamType::Float),
        _ => Err(mismatch(op, &[lhs, rhs])),
    }
}

/// Whether two types may be compared for equality or share a conditional.
pub(crate) fn compatible(lhs: &ParamType, rhs: &ParamType) -> bool {
    lhs == rhs
        || matches!(
            (lhs, rhs),
            (ParamType::Int, ParamType::Float) | (ParamType::Float, ParamType::Int)
        )
}

fn is_scalar_number(ty: &ParamType) -> bool {
    matches!(ty, ParamType::Int | ParamType::Float)
}

struct Lowering<'c> {
    ctx: &'c mut BuildContext,
    class: &'c str,
}

impl Lowering<'_> {
    fn arg(&mut self, arg: &ExprArg) -> BuildResult<NodeId> {
        operand(self.ctx, self.class, arg)
    }

    fn ty(&self, node: NodeId) -> ParamType {
        self.ctx.node(node).ty.clone()
    }

    fn alloc(&mut self, ty: ParamType, binding: Binding) -> NodeId {
        self.ctx.alloc_node(ExprNode::new(ty, binding))
    }

    fn unary(&mut self, op: UnaryOp, val: NodeId) -> BuildResult<NodeId> {
        let ty = self.ty(val);
        let out = match op {
            UnaryOp::Negate if ty.is_numeric() => ty,
            UnaryOp::Invert if ty == ParamType::Range => ParamType::Range,
            UnaryOp::Invert if is_scalar_number(&ty) => ParamType::Float,
            UnaryOp::Not if ty == ParamType::Bool => ParamType::Bool,
            UnaryOp::Min | UnaryOp::Max | UnaryOp::Center | UnaryOp::Width
                if ty == ParamType::Range =>
            {
                ParamType::Float
            }
            _ => return Err(mismatch(&format!("{op:?}"), &[&ty])),
        };
        Ok(self.alloc(out, Binding::Unary(op, val)))
    }

    fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> BuildResult<NodeId> {
        let (l, r) = (self.ty(lhs), self.ty(rhs));
        let name = format!("{op:?}");
        let out = match op {
            BinaryOp::Add | BinaryOp::Mult | BinaryOp::Max | BinaryOp::Min => {
                arith_type(&name, &l, &r)?
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor | BinaryOp::Implies => {
                if l != ParamType::Bool || r != ParamType::Bool {
                    return Err(mismatch(&name, &[&l, &r]));
                }
                ParamType::Bool
            }
            BinaryOp::Eq | BinaryOp::Neq => {
                if !compatible(&l, &r) {
                    return Err(mismatch(&name, &[&l, &r]));
                }
                ParamType::Bool
            }
            BinaryOp::Gt | BinaryOp::Gte | BinaryOp::Lt | BinaryOp::Lte => {
                if !l.is_numeric() || !r.is_numeric() {
                    return Err(mismatch(&name, &[&l, &r]));
                }
                ParamType::Bool
            }
            BinaryOp::Within => {
                if !l.is_numeric() || r != ParamType::Range {
                    return Err(mismatch(&name, &[&l, &r]));
                }
                ParamType::Bool
            }
            BinaryOp::Intersection | BinaryOp::Hull => {
                if l != ParamType::Range || r != ParamType::Range {
                    return Err(mismatch(&name, &[&l, &r]));
                }
                ParamType::Range
            }
            BinaryOp::Range => {
                if !is_scalar_number(&l) || !is_scalar_number(&r) {
                    return Err(mismatch(&name, &[&l, &r]));
                }
                ParamType::Range
            }
        };
        Ok(self.alloc(out, Binding::Binary(op, lhs, rhs)))
    }

    fn reduce(&mut self, op: ReductionOp, vals: NodeId) -> BuildResult<NodeId> {
        let ty = self.ty(vals);
        let name = format!("{op:?}");
        let elt = ty.element().cloned().ok_or_else(|| mismatch(&name, &[&ty]))?;
        let out = match op {
            ReductionOp::Sum if elt.is_numeric() => elt,
            ReductionOp::AllTrue | ReductionOp::AnyTrue if elt == ParamType::Bool => {
                ParamType::Bool
            }
            ReductionOp::AllEq | ReductionOp::AllUnique => ParamType::Bool,
            ReductionOp::Maximum | ReductionOp::Minimum if elt == ParamType::Range => {
                ParamType::Float
            }
            ReductionOp::Maximum | ReductionOp::Minimum if is_scalar_number(&elt) => elt,
            ReductionOp::SetExtract => elt,
            ReductionOp::Intersection | ReductionOp::Hull if elt == ParamType::Range => {
                ParamType::Range
            }
            ReductionOp::Negate if elt.is_numeric() => ty.clone(),
            ReductionOp::Invert if elt == ParamType::Range => ty.clone(),
            ReductionOp::Invert if is_scalar_number(&elt) => {
                ParamType::Array(Box::new(ParamType::Float))
            }
            _ => return Err(mismatch(&name, &[&ty])),
        };
        Ok(self.alloc(out, Binding::Reduce(op, vals)))
    }

    fn binary_set(&mut self, op: BinarySetOp, lhset: NodeId, rhs: NodeId) -> BuildResult<NodeId> {
        let (l, r) = (self.ty(lhset), self.ty(rhs));
        let name = format!("{op:?}");
        let elt = l.element().ok_or_else(|| mismatch(&name, &[&l, &r]))?;
        let out = ParamType::Array(Box::new(arith_type(&name, elt, &r)?));
        Ok(self.alloc(out, Binding::BinarySet(op, lhset, rhs)))
    }

    fn lower(&mut self, expr: &Expr) -> BuildResult<NodeId> {
        match expr {
            Expr::Add(a, b) => self.lower_binary(BinaryOp::Add, a, b),
            Expr::Mul(a, b) => self.lower_binary(BinaryOp::Mult, a, b),
            Expr::Sub(a, b) => {
                let (a, b) = (self.arg(a)?, self.arg(b)?);
                let neg = self.unary(UnaryOp::Negate, b)?;
                self.binary(BinaryOp::Add, a, neg)
            }
            Expr::Div(a, b) => {
                let (a, b) = (self.arg(a)?, self.arg(b)?);
                let inv = self.unary(UnaryOp::Invert, b)?;
                self.binary(BinaryOp::Mult, a, inv)
            }
            Expr::Neg(a) => self.lower_unary(UnaryOp::Negate, a),
            Expr::Invert(a) => self.lower_unary(UnaryOp::Invert, a),
            Expr::Not(a) => self.lower_unary(UnaryOp::Not, a),
            Expr::Lower(a) => self.lower_unary(UnaryOp::Min, a),
            Expr::Upper(a) => self.lower_unary(UnaryOp::Max, a),
            Expr::Center(a) => self.lower_unary(UnaryOp::Center, a),
            Expr::Width(a) => self.lower_unary(UnaryOp::Width, a),
            Expr::And(a, b) => self.lower_binary(BinaryOp::And, a, b),
            Expr::Or(a, b) => self.lower_binary(BinaryOp::Or, a, b),
            Expr::Xor(a, b) => self.lower_binary(BinaryOp::Xor, a, b),
            Expr::Implies(a, b) => self.lower_binary(BinaryOp::Implies, a, b),
            Expr::Eq(a, b) => self.lower_binary(BinaryOp::Eq, a, b),
            Expr::Ne(a, b) => self.lower_binary(BinaryOp::Neq, a, b),
            Expr::Gt(a, b) => self.lower_binary(BinaryOp::Gt, a, b),
            Expr::Ge(a, b) => self.lower_binary(BinaryOp::Gte, a, b),
            Expr::Lt(a, b) => self.lower_binary(BinaryOp::Lt, a, b),
            Expr::Le(a, b) => self.lower_binary(BinaryOp::Lte, a, b),
            Expr::Max(a, b) => self.lower_binary(BinaryOp::Max, a, b),
            Expr::Min(a, b) => self.lower_binary(BinaryOp::Min, a, b),
            Expr::Within(a, b) => self.lower_binary(BinaryOp::Within, a, b),
            Expr::Contains(a, b) => self.lower_binary(BinaryOp::Within, b, a),
            Expr::Intersect(a, b) => self.lower_binary(BinaryOp::Intersection, a, b),
            Expr::Hull(a, b) => self.lower_binary(BinaryOp::Hull, a, b),
            Expr::Range(a, b) => self.lower_binary(BinaryOp::Range, a, b),
            Expr::IfThenElse(c, t, f) => {
                let (c, t, f) = (self.arg(c)?, self.arg(t)?, self.arg(f)?);
                let (ct, tt, ft) = (self.ty(c), self.ty(t), self.ty(f));
                if ct != ParamType::Bool || !compatible(&tt, &ft) {
                    return Err(mismatch("IfThenElse", &[&ct, &tt, &ft]));
                }
                let out = if tt == ft { tt } else { ParamType::Float };
                Ok(self.alloc(out, Binding::IfThenElse(c, t, f)))
            }
            Expr::Array(elts) => {
                let nodes = elts
                    .iter()
                    .map(|elt| self.arg(elt))
                    .collect::<BuildResult<Vec<_>>>()?;
                let first = nodes.first().ok_or_else(|| BuildError::TypeMismatch {
                    op: "Array".into(),
                    detail: "an array literal needs at least one element".into(),
                })?;
                let ty = self.ty(*first);
                if let Some(bad) = nodes.iter().map(|n| self.ty(*n)).find(|t| *t != ty) {
                    return Err(mismatch("Array", &[&ty, &bad]));
                }
                Ok(self.alloc(ParamType::Array(Box::new(ty)), Binding::Array(nodes)))
            }
            Expr::Reduce(op, vals) => {
                let vals = self.arg(vals)?;
                self.reduce(*op, vals)
            }
            Expr::ArrayAdd(a, b) => {
                let (a, b) = (self.arg(a)?, self.arg(b)?);
                self.binary_set(BinarySetOp::Add, a, b)
            }
            Expr::ArrayMul(a, b) => {
                let (a, b) = (self.arg(a)?, self.arg(b)?);
                self.binary_set(BinarySetOp::Mult, a, b)
            }
        }
    }

    fn lower_unary(&mut self, op: UnaryOp, a: &ExprArg) -> BuildResult<NodeId> {
        let a = self.arg(a)?;
        self.unary(op, a)
    }

    fn lower_binary(&mut self, op: BinaryOp, a: &ExprArg, b: &ExprArg) -> BuildResult<NodeId> {
        let (a, b) = (self.arg(a)?, self.arg(b)?);
        self.binary(op, a, b)
    }
}

/// Type-checks `expr` and allocates its node in `ctx`.
pub(crate) fn build(ctx: &mut BuildContext, class: &str, expr: &Expr) -> BuildResult<NodeId> {
    Lowering { ctx, class }.lower(expr)
}
