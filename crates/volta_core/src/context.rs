//! Arena-backed state of one block elaboration.
//!
//! [`BuildContext`] owns every expression node, port, and block created while
//! one class is elaborated: the root block, the sub-blocks whose `init` ran to
//! expose their interfaces, and the links and bridges inferred from
//! connections. Paths into the emitted IR are computed relative to a block
//! from the ownership edges recorded here.

use crate::arena::Arena;
use crate::binding::{Binding, ExprNode, InitScope, Owner};
use crate::block::{BlockKind, BlockState, DynBlock};
use crate::error::{BuildError, BuildResult};
use crate::generator::GeneratorValues;
use crate::ids::{fresh_generation, BlockId, NodeId, NodeIndex, PortId};
use crate::port::{Port, PortTemplate};
use linked_hash_map::LinkedHashMap;
use std::rc::Rc;
use volta_ir::{LocalPath, LocalStep, ParamType, ReservedParam, ValueExpr, ValueLit};

/// What a port is attached to.
#[derive(Clone, PartialEq, Eq, Debug)]
pub(crate) enum PortParent {
    /// A port declared on a block or link.
    Block(BlockId, String),
    /// A member of a bundle.
    Member(PortId, String),
    /// An element declared on a vector port.
    Element(PortId, String),
    /// An element allocated on a vector port by a connection.
    Allocated(PortId, Option<String>),
    /// The typing stand-in for the elements of a vector port.
    Sample(PortId),
    /// The root of a port class elaboration.
    Template,
}

pub(crate) struct PortNode {
    pub template: Rc<dyn Port>,
    pub class: String,
    pub vector: bool,
    pub parent: PortParent,
    pub params: LinkedHashMap<String, NodeId>,
    pub members: LinkedHashMap<String, PortId>,
    /// Declared elements of a vector; `None` while sized by its connections.
    pub elements: Option<LinkedHashMap<String, PortId>>,
    pub sample: Option<PortId>,
    pub optional: bool,
}

impl PortNode {
    pub fn template(&self) -> PortTemplate {
        if self.vector {
            PortTemplate::Vector(self.template.clone())
        } else {
            PortTemplate::Single(self.template.clone())
        }
    }
}

/// Whether a child sits among the blocks or the links of its parent.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum ChildRole {
    Block,
    Link,
}

/// A constraint recorded by `require` or `assign`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Constraint {
    Require(NodeId),
    Assign(NodeId, NodeId),
}

/// A growing set of joined ports.
#[derive(Clone, Debug, Default)]
pub(crate) struct Connection {
    pub ports: Vec<PortId>,
    pub flatten: bool,
    pub name: Option<String>,
    /// Set once merged into an earlier connection.
    pub absorbed: bool,
}

pub(crate) struct BlockNode {
    pub def: Rc<dyn DynBlock>,
    pub class: String,
    pub kind: BlockKind,
    pub parent: Option<(BlockId, String, ChildRole)>,
    pub state: BlockState,
    pub params: LinkedHashMap<String, NodeId>,
    pub ports: LinkedHashMap<String, PortId>,
    pub blocks: LinkedHashMap<String, BlockId>,
    pub connections: Vec<Connection>,
    pub constraints: LinkedHashMap<String, Constraint>,
    pub anon_constraints: usize,
    pub generator: Option<Vec<NodeId>>,
    /// Literal constructor arguments of the root, emitted for top-level designs.
    pub top_init: LinkedHashMap<String, ValueLit>,
}

/// All entities of one elaboration.
pub(crate) struct BuildContext {
    generation: u32,
    pub nodes: Arena<NodeIndex, ExprNode>,
    pub ports: Arena<PortId, PortNode>,
    pub blocks: Arena<BlockId, BlockNode>,
    /// Solved inputs, present when running `generate`.
    pub generator_values: Option<GeneratorValues>,
    /// Whether the root is elaborated as the top of a design.
    pub top: bool,
    /// Port and block definitions referenced by the elaborated element.
    pub port_defs: Vec<Rc<dyn Port>>,
    pub block_defs: Vec<Rc<dyn DynBlock>>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self {
            generation: fresh_generation(),
            nodes: Arena::new(),
            ports: Arena::new(),
            blocks: Arena::new(),
            generator_values: None,
            top: false,
            port_defs: Vec::new(),
            block_defs: Vec::new(),
        }
    }

    /// Whether `id` was created by this context.
    pub fn owns(&self, id: NodeId) -> bool {
        id.generation == self.generation && self.nodes.contains(id.index)
    }

    pub fn node(&self, id: NodeId) -> &ExprNode {
        &self.nodes[id.index]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut ExprNode {
        &mut self.nodes[id.index]
    }

    pub fn alloc_node(&mut self, node: ExprNode) -> NodeId {
        NodeId {
            generation: self.generation,
            index: self.nodes.alloc(node),
        }
    }

    pub fn literal(&mut self, value: ValueLit) -> NodeId {
        self.alloc_node(ExprNode::new(value.param_type(), Binding::Literal(value)))
    }

    pub fn alloc_block(
        &mut self,
        def: Rc<dyn DynBlock>,
        parent: Option<(BlockId, String, ChildRole)>,
    ) -> BlockId {
        let class = def.class_name();
        let kind = def.kind();
        self.blocks.alloc(BlockNode {
            def,
            class,
            kind,
            parent,
            state: BlockState::PreInit,
            params: LinkedHashMap::new(),
            ports: LinkedHashMap::new(),
            blocks: LinkedHashMap::new(),
            connections: Vec::new(),
            constraints: LinkedHashMap::new(),
            anon_constraints: 0,
            generator: None,
            top_init: LinkedHashMap::new(),
        })
    }

    /// Creates a port and its parameters, members, and element stand-in.
    pub fn instantiate_port(
        &mut self,
        template: &PortTemplate,
        parent: PortParent,
        optional: bool,
    ) -> BuildResult<PortId> {
        let port = template.port().clone();
        self.note_port_def(&port);
        let id = self.ports.alloc(PortNode {
            template: port.clone(),
            class: port.class_name(),
            vector: template.is_vector(),
            parent,
            params: LinkedHashMap::new(),
            members: LinkedHashMap::new(),
            elements: None,
            sample: None,
            optional,
        });
        if template.is_vector() {
            let sample = self.instantiate_port(
                &PortTemplate::Single(port),
                PortParent::Sample(id),
                false,
            )?;
            self.ports[id].sample = Some(sample);
        } else {
            let mut builder = crate::builder::PortBuilder { ctx: self, port: id };
            port.declare(&mut builder)?;
        }
        Ok(id)
    }

    /// Drops the initializers of every parameter in `port`, members included.
    pub fn strip_initializers(&mut self, port: PortId) {
        let node = &self.ports[port];
        let params: Vec<NodeId> = node.params.values().copied().collect();
        let members: Vec<PortId> = node.members.values().copied().collect();
        for param in params {
            self.node_mut(param).initializer = None;
        }
        for member in members {
            self.strip_initializers(member);
        }
    }

    fn note_port_def(&mut self, port: &Rc<dyn Port>) {
        let class = port.class_name();
        if !self.port_defs.iter().any(|p| p.class_name() == class) {
            self.port_defs.push(port.clone());
        }
    }

    pub fn note_block_def(&mut self, def: &Rc<dyn DynBlock>) {
        let class = def.class_name();
        if !self.block_defs.iter().any(|d| d.class_name() == class) {
            self.block_defs.push(def.clone());
        }
    }

    /// The block or link a port ultimately belongs to.
    pub fn port_owner(&self, port: PortId) -> Option<BlockId> {
        match &self.ports[port].parent {
            PortParent::Block(block, _) => Some(*block),
            PortParent::Member(parent, _)
            | PortParent::Element(parent, _)
            | PortParent::Allocated(parent, _)
            | PortParent::Sample(parent) => self.port_owner(*parent),
            PortParent::Template => None,
        }
    }

    /// The topmost port containing `port`.
    pub fn port_root(&self, port: PortId) -> PortId {
        match &self.ports[port].parent {
            PortParent::Member(parent, _)
            | PortParent::Element(parent, _)
            | PortParent::Allocated(parent, _)
            | PortParent::Sample(parent) => self.port_root(*parent),
            PortParent::Block(..) | PortParent::Template => port,
        }
    }

    /// Path of `block` as seen from `root`: empty for the root itself, one
    /// step for its direct children, `None` otherwise.
    fn block_prefix(&self, root: BlockId, block: BlockId) -> Option<LocalPath> {
        if block == root {
            return Some(LocalPath::default());
        }
        match &self.blocks[block].parent {
            Some((parent, name, _)) if *parent == root => Some(LocalPath::names(&[name])),
            _ => None,
        }
    }

    /// Path of `port` relative to `root`, if `root` can address it.
    pub fn port_path(&self, root: BlockId, port: PortId) -> Option<LocalPath> {
        match &self.ports[port].parent {
            PortParent::Block(block, name) => {
                Some(self.block_prefix(root, *block)?.with_name(name.clone()))
            }
            PortParent::Member(parent, name) | PortParent::Element(parent, name) => {
                Some(self.port_path(root, *parent)?.with_name(name.clone()))
            }
            PortParent::Allocated(parent, requested) => Some(
                self.port_path(root, *parent)?
                    .with(LocalStep::Allocate(requested.clone())),
            ),
            PortParent::Sample(_) | PortParent::Template => None,
        }
    }

    /// Path of a declared parameter relative to `root`.
    pub fn param_path(&self, root: BlockId, node: NodeId) -> Option<LocalPath> {
        match &self.node(node).binding {
            Binding::Param {
                owner: Owner::Block(block),
                name,
            } => Some(self.block_prefix(root, *block)?.with_name(name.clone())),
            Binding::Param {
                owner: Owner::Port(port),
                name,
            } => Some(self.port_path(root, *port)?.with_name(name.clone())),
            _ => None,
        }
    }

    /// Path of a node that names a value (a parameter or a pseudo-parameter).
    pub fn value_path(&self, root: BlockId, node: NodeId) -> Option<LocalPath> {
        match &self.node(node).binding {
            Binding::Param { .. } => self.param_path(root, node),
            Binding::Reserved(port, param) => Some(
                self.port_path(root, *port)?
                    .with(LocalStep::Reserved(*param)),
            ),
            Binding::LinkParam { port, path } => Some(
                self.port_path(root, *port)?
                    .with(LocalStep::Reserved(ReservedParam::ConnectedLink))
                    .join(path),
            ),
            _ => None,
        }
    }

    /// Serializes a node relative to `root`.
    ///
    /// Fails with [`BuildError::UnboundExpression`] if any parameter or port it
    /// reads has no path from `root`.
    pub fn to_value_expr(&self, root: BlockId, node: NodeId) -> BuildResult<ValueExpr> {
        let unbound = || BuildError::UnboundExpression(self.describe(node));
        let expr = match &self.node(node).binding {
            Binding::Param { .. } | Binding::Reserved(..) | Binding::LinkParam { .. } => {
                ValueExpr::Ref(self.value_path(root, node).ok_or_else(unbound)?)
            }
            Binding::Literal(value) => ValueExpr::Literal(value.clone()),
            Binding::Unary(op, val) => ValueExpr::Unary {
                op: *op,
                val: Box::new(self.to_value_expr(root, *val)?),
            },
            Binding::Reduce(op, vals) => ValueExpr::Reduce {
                op: *op,
                vals: Box::new(self.to_value_expr(root, *vals)?),
            },
            Binding::Binary(op, lhs, rhs) => ValueExpr::Binary {
                op: *op,
                lhs: Box::new(self.to_value_expr(root, *lhs)?),
                rhs: Box::new(self.to_value_expr(root, *rhs)?),
            },
            Binding::BinarySet(op, lhset, rhs) => ValueExpr::BinarySet {
                op: *op,
                lhset: Box::new(self.to_value_expr(root, *lhset)?),
                rhs: Box::new(self.to_value_expr(root, *rhs)?),
            },
            Binding::IfThenElse(cond, tru, fal) => ValueExpr::IfThenElse {
                cond: Box::new(self.to_value_expr(root, *cond)?),
                tru: Box::new(self.to_value_expr(root, *tru)?),
                fal: Box::new(self.to_value_expr(root, *fal)?),
            },
            Binding::Array(elts) => ValueExpr::Array(
                elts.iter()
                    .map(|elt| self.to_value_expr(root, *elt))
                    .collect::<BuildResult<_>>()?,
            ),
            Binding::MapExtract { container, path } => ValueExpr::MapExtract {
                container: self.port_path(root, *container).ok_or_else(unbound)?,
                path: path.clone(),
            },
        };
        Ok(expr)
    }

    /// Dotted location of a block for messages; empty for the outermost block.
    pub fn block_label(&self, block: BlockId) -> String {
        let mut names = Vec::new();
        let mut current = block;
        while let Some((parent, name, _)) = &self.blocks[current].parent {
            names.push(name.clone());
            current = *parent;
        }
        names.reverse();
        names.join(".")
    }

    /// Dotted location of a port for messages.
    pub fn port_label(&self, port: PortId) -> String {
        let (prefix, step) = match &self.ports[port].parent {
            PortParent::Block(block, name) => (self.block_label(*block), name.clone()),
            PortParent::Member(parent, name) | PortParent::Element(parent, name) => {
                (self.port_label(*parent), name.clone())
            }
            PortParent::Allocated(parent, requested) => (
                self.port_label(*parent),
                LocalStep::Allocate(requested.clone()).to_string(),
            ),
            PortParent::Sample(parent) => (self.port_label(*parent), "(elt)".to_string()),
            PortParent::Template => (String::new(), self.ports[port].class.clone()),
        };
        if prefix.is_empty() {
            step
        } else {
            format!("{prefix}.{step}")
        }
    }

    /// Short description of a node for messages.
    pub fn describe(&self, node: NodeId) -> String {
        match &self.node(node).binding {
            Binding::Param {
                owner: Owner::Block(block),
                name,
            } => {
                let label = self.block_label(*block);
                if label.is_empty() {
                    format!("{}.{name}", self.blocks[*block].class)
                } else {
                    format!("{label}.{name}")
                }
            }
            Binding::Param {
                owner: Owner::Port(port),
                name,
            } => format!("{}.{name}", self.port_label(*port)),
            Binding::Reserved(port, param) => {
                format!("{}.({})", self.port_label(*port), param.as_str())
            }
            Binding::LinkParam { port, path } => {
                format!("{}.(link).{path}", self.port_label(*port))
            }
            Binding::MapExtract { container, path } => {
                format!("map({}, {path})", self.port_label(*container))
            }
            Binding::Literal(value) => value.to_string(),
            _ => format!("<{}>", self.node(node).ty),
        }
    }

    /// Every declared parameter with an own-scope initializer in `port` and
    /// its members and declared elements, paired with the path of its port
    /// relative to that port.
    pub fn port_initializers(&self, port: PortId) -> Vec<(LocalPath, String, NodeId)> {
        let mut out = Vec::new();
        self.collect_port_initializers(port, LocalPath::default(), &mut out);
        out
    }

    fn collect_port_initializers(
        &self,
        port: PortId,
        prefix: LocalPath,
        out: &mut Vec<(LocalPath, String, NodeId)>,
    ) {
        let node = &self.ports[port];
        for (name, param) in node.params.iter() {
            if let Some(init) = self.node(*param).initializer {
                if init.scope == InitScope::Own {
                    out.push((prefix.clone(), name.clone(), init.value));
                }
            }
        }
        for (name, member) in node.members.iter() {
            self.collect_port_initializers(*member, prefix.with_name(name.clone()), out);
        }
        if let Some(elements) = &node.elements {
            for (name, elt) in elements.iter() {
                self.collect_port_initializers(*elt, prefix.with_name(name.clone()), out);
            }
        }
    }

    /// Type of a parameter reached from `port` through member names.
    pub fn param_type_at(&self, port: PortId, path: &[String]) -> Option<ParamType> {
        let (last, members) = path.split_last()?;
        let mut current = port;
        for name in members {
            current = *self.ports[current].members.get(name)?;
        }
        let param = self.ports[current].params.get(last)?;
        Some(self.node(*param).ty.clone())
    }
}
