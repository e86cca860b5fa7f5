//! Expression nodes and how their values are produced.

use crate::ids::{BlockId, NodeId, PortId};
use volta_ir::{
    BinaryOp, BinarySetOp, LocalPath, ParamType, ReductionOp, ReservedParam, UnaryOp, ValueLit,
};

/// The element a declared parameter belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Owner {
    Block(BlockId),
    Port(PortId),
}

/// Where the initializer of a declared parameter is evaluated.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum InitScope {
    /// In the element declaring the parameter.
    Own,
    /// In the parent of the block declaring the parameter (a lifted constructor argument).
    Parent,
}

/// A parameter initializer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct Initializer {
    pub value: NodeId,
    pub scope: InitScope,
}

/// How the value of a node is computed.
#[derive(Clone, PartialEq, Debug)]
pub(crate) enum Binding {
    /// A declared parameter.
    Param { owner: Owner, name: String },
    Literal(ValueLit),
    Unary(UnaryOp, NodeId),
    Reduce(ReductionOp, NodeId),
    Binary(BinaryOp, NodeId, NodeId),
    BinarySet(BinarySetOp, NodeId, NodeId),
    IfThenElse(NodeId, NodeId, NodeId),
    Array(Vec<NodeId>),
    /// A pseudo-parameter of a port: connectivity, vector length, allocated names, or name.
    Reserved(PortId, ReservedParam),
    /// The array of `path` taken in each element of a vector port.
    MapExtract { container: PortId, path: LocalPath },
    /// A parameter of the link a port is attached to.
    LinkParam { port: PortId, path: LocalPath },
}

/// One node of the expression graph.
#[derive(Clone, Debug)]
pub(crate) struct ExprNode {
    pub ty: ParamType,
    pub binding: Binding,
    /// Only declared parameters carry one.
    pub initializer: Option<Initializer>,
}

impl ExprNode {
    pub fn new(ty: ParamType, binding: Binding) -> Self {
        Self {
            ty,
            binding,
            initializer: None,
        }
    }

    pub fn is_param(&self) -> bool {
        matches!(self.binding, Binding::Param { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_nodes_have_no_initializer() {
        let node = ExprNode::new(ParamType::Bool, Binding::Literal(ValueLit::Bool(true)));
        assert!(node.initializer.is_none());
        assert!(!node.is_param());
    }
}
