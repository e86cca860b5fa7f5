//! Builders handed to block and port definitions.
//!
//! A [`BlockBuilder`] carries the elaboration arena and the index of the block
//! being built. Every declaration is an explicit call returning a handle;
//! each call checks that the block's lifecycle phase allows it.

use crate::binding::{Binding, ExprNode, InitScope, Initializer, Owner};
use crate::block::{Block, BlockKind, BlockState, DynBlock, SubBlock};
use crate::connect;
use crate::context::{BuildContext, ChildRole, Constraint, PortNode, PortParent};
use crate::error::{BuildError, BuildResult};
use crate::expr::{self, Expr, ExprArg};
use crate::ids::{BlockId, NodeId, PortId};
use crate::port::PortTemplate;
use std::any::Any;
use std::rc::Rc;
use volta_common::Range;
use volta_ir::{LocalPath, ParamType, ReservedParam, ValueLit};

const INIT: &[BlockState] = &[BlockState::Init];
const STRUCTURE: &[BlockState] = &[BlockState::Init, BlockState::Contents, BlockState::Generate];
const CONNECT: &[BlockState] = &[BlockState::Contents, BlockState::Generate];
const GENERATOR: &[BlockState] = &[BlockState::Init, BlockState::Contents];
const GENERATE: &[BlockState] = &[BlockState::Generate];

/// Runs one lifecycle phase of `block`, moving it from `from` through
/// `during` to `after`.
pub(crate) fn run_phase<R>(
    ctx: &mut BuildContext,
    block: BlockId,
    (from, during, after): (BlockState, BlockState, BlockState),
    body: impl FnOnce(&mut BlockBuilder<'_>) -> BuildResult<R>,
) -> BuildResult<R> {
    let state = ctx.blocks[block].state;
    if state != from {
        return Err(BuildError::Lifecycle {
            class: ctx.blocks[block].class.clone(),
            call: phase_call(during),
            state,
        });
    }
    ctx.blocks[block].state = during;
    let result = body(&mut BlockBuilder {
        ctx: &mut *ctx,
        block,
    })?;
    ctx.blocks[block].state = after;
    Ok(result)
}

fn phase_call(state: BlockState) -> &'static str {
    match state {
        BlockState::Init => "init",
        BlockState::Contents => "contents",
        _ => "generate",
    }
}

pub(crate) const INIT_PHASE: (BlockState, BlockState, BlockState) =
    (BlockState::PreInit, BlockState::Init, BlockState::PostInit);
pub(crate) const CONTENTS_PHASE: (BlockState, BlockState, BlockState) =
    (BlockState::PostInit, BlockState::Contents, BlockState::PostContents);
pub(crate) const GENERATE_PHASE: (BlockState, BlockState, BlockState) = (
    BlockState::PostContents,
    BlockState::Generate,
    BlockState::PostGenerate,
);

/// Creates a child of `parent` from a type-erased definition and runs its `init`.
pub(crate) fn instantiate_child(
    ctx: &mut BuildContext,
    parent: BlockId,
    name: &str,
    def: Rc<dyn DynBlock>,
    role: ChildRole,
) -> BuildResult<(BlockId, Box<dyn Any>)> {
    ctx.note_block_def(&def);
    let child = ctx.alloc_block(def.clone(), Some((parent, name.to_string(), role)));
    if role == ChildRole::Block {
        ctx.blocks[parent].blocks.insert(name.to_string(), child);
    }
    let io = run_phase(ctx, child, INIT_PHASE, |b| def.init_dyn(b))?;
    Ok((child, io))
}

fn check_init_type(name: &str, ty: &ParamType, value: &ParamType) -> BuildResult<()> {
    if value == ty || (*value == ParamType::Int && *ty == ParamType::Float) {
        Ok(())
    } else {
        Err(BuildError::TypeMismatch {
            op: format!("initializer of {name}"),
            detail: format!("expected {ty}, found {value}"),
        })
    }
}

fn check_port_handle(ctx: &BuildContext, class: &str, port: PortId) -> BuildResult<()> {
    if ctx.ports.contains(port) {
        Ok(())
    } else {
        Err(BuildError::structural(
            class,
            "port handle belongs to another elaboration",
        ))
    }
}

/// Builder for one block during its `init`, `contents`, and `generate` phases.
pub struct BlockBuilder<'a> {
    pub(crate) ctx: &'a mut BuildContext,
    pub(crate) block: BlockId,
}

impl BlockBuilder<'_> {
    /// The block being built.
    pub fn id(&self) -> BlockId {
        self.block
    }

    fn class(&self) -> String {
        self.ctx.blocks[self.block].class.clone()
    }

    fn check_phase(&self, call: &'static str, allowed: &[BlockState]) -> BuildResult<()> {
        let state = self.ctx.blocks[self.block].state;
        if allowed.contains(&state) {
            Ok(())
        } else {
            Err(BuildError::Lifecycle {
                class: self.class(),
                call,
                state,
            })
        }
    }

    fn check_name(&self, name: &str) -> BuildResult<()> {
        let node = &self.ctx.blocks[self.block];
        if name.is_empty() || name.contains('.') {
            return Err(BuildError::structural(
                self.class(),
                format!("invalid element name {name:?}"),
            ));
        }
        if node.params.contains_key(name)
            || node.ports.contains_key(name)
            || node.blocks.contains_key(name)
        {
            return Err(BuildError::structural(
                self.class(),
                format!("{name} is already declared"),
            ));
        }
        Ok(())
    }

    fn port_node(&self, port: PortId) -> BuildResult<&PortNode> {
        check_port_handle(self.ctx, &self.class(), port)?;
        Ok(&self.ctx.ports[port])
    }

    fn vector_node(&self, port: PortId, call: &str) -> BuildResult<&PortNode> {
        let node = self.port_node(port)?;
        if node.vector {
            Ok(node)
        } else {
            Err(BuildError::TypeMismatch {
                op: call.to_string(),
                detail: format!("{} is not a vector port", self.ctx.port_label(port)),
            })
        }
    }

    fn alloc_param(&mut self, owner: Owner, name: &str, ty: ParamType) -> NodeId {
        self.ctx.alloc_node(ExprNode::new(
            ty,
            Binding::Param {
                owner,
                name: name.to_string(),
            },
        ))
    }

    /// Declares a parameter with no initializer.
    pub fn declare_param(&mut self, name: &str, ty: ParamType) -> BuildResult<NodeId> {
        self.check_phase("declare_param", INIT)?;
        self.check_name(name)?;
        let node = self.alloc_param(Owner::Block(self.block), name, ty);
        self.ctx.blocks[self.block]
            .params
            .insert(name.to_string(), node);
        Ok(node)
    }

    /// Declares a parameter initialized from an expression in this block.
    pub fn declare_param_init(
        &mut self,
        name: &str,
        ty: ParamType,
        init: impl Into<ExprArg>,
    ) -> BuildResult<NodeId> {
        let value = expr::operand(self.ctx, &self.class(), &init.into())?;
        check_init_type(name, &ty, &self.ctx.node(value).ty)?;
        let node = self.declare_param(name, ty)?;
        self.ctx.node_mut(node).initializer = Some(Initializer {
            value,
            scope: InitScope::Own,
        });
        Ok(node)
    }

    /// Declares a parameter from a constructor argument.
    ///
    /// The argument belongs to whoever constructed the block: when this block
    /// is a sub-block, it becomes an initializer evaluated in the parent; when
    /// this block is the top of a design, a literal argument is recorded as a
    /// top-level initializer and an expression argument is an error. The
    /// library element of the class keeps no argument.
    pub fn lift_to_parameter(
        &mut self,
        name: &str,
        ty: ParamType,
        arg: impl Into<ExprArg>,
    ) -> BuildResult<NodeId> {
        self.check_phase("lift_to_parameter", INIT)?;
        self.check_name(name)?;
        let arg = arg.into();
        let is_root = self.ctx.blocks[self.block].parent.is_none();
        let node = self.alloc_param(Owner::Block(self.block), name, ty.clone());
        match arg {
            ExprArg::Lit(value) if is_root => {
                check_init_type(name, &ty, &value.param_type())?;
                self.ctx.blocks[self.block]
                    .top_init
                    .insert(name.to_string(), value);
            }
            ExprArg::Node(_) if is_root && self.ctx.top => {
                return Err(BuildError::structural(
                    self.class(),
                    format!("top-level argument `{name}` must be a literal"),
                ));
            }
            // a class element does not carry the arguments of one instance
            ExprArg::Node(_) if is_root => {}
            arg => {
                let value = expr::operand(self.ctx, &self.class(), &arg)?;
                check_init_type(name, &ty, &self.ctx.node(value).ty)?;
                self.ctx.node_mut(node).initializer = Some(Initializer {
                    value,
                    scope: InitScope::Parent,
                });
            }
        }
        self.ctx.blocks[self.block]
            .params
            .insert(name.to_string(), node);
        Ok(node)
    }

    fn declare_port_impl(
        &mut self,
        call: &'static str,
        name: &str,
        template: PortTemplate,
        optional: bool,
    ) -> BuildResult<PortId> {
        self.check_phase(call, INIT)?;
        self.check_name(name)?;
        let port = self.ctx.instantiate_port(
            &template,
            PortParent::Block(self.block, name.to_string()),
            optional,
        )?;
        self.ctx.blocks[self.block]
            .ports
            .insert(name.to_string(), port);
        Ok(port)
    }

    /// Declares a required port.
    pub fn declare_port(
        &mut self,
        name: &str,
        template: impl Into<PortTemplate>,
    ) -> BuildResult<PortId> {
        self.declare_port_impl("declare_port", name, template.into(), false)
    }

    /// Declares a port that may be left unconnected.
    pub fn declare_optional_port(
        &mut self,
        name: &str,
        template: impl Into<PortTemplate>,
    ) -> BuildResult<PortId> {
        self.declare_port_impl("declare_optional_port", name, template.into(), true)
    }

    /// Declares an element of one of this block's own vector ports.
    ///
    /// Elements are named by their index unless a name is given. A vector
    /// with declared elements has a fixed size.
    pub fn append_elt(&mut self, vector: PortId, name: Option<&str>) -> BuildResult<PortId> {
        self.check_phase("append_elt", INIT)?;
        let node = self.vector_node(vector, "append_elt")?;
        if !matches!(node.parent, PortParent::Block(owner, _) if owner == self.block) {
            return Err(BuildError::structural(
                self.class(),
                format!(
                    "append_elt on {}, which is not a port of this block",
                    self.ctx.port_label(vector)
                ),
            ));
        }
        let count = node.elements.as_ref().map_or(0, |e| e.len());
        let name = name.map_or_else(|| count.to_string(), str::to_string);
        if node
            .elements
            .as_ref()
            .is_some_and(|e| e.contains_key(&name))
        {
            return Err(BuildError::structural(
                self.class(),
                format!("element {name} is already declared"),
            ));
        }
        let template = PortTemplate::Single(node.template.clone());
        let elt = self.ctx.instantiate_port(
            &template,
            PortParent::Element(vector, name.clone()),
            false,
        )?;
        self.ctx.ports[vector]
            .elements
            .get_or_insert_with(Default::default)
            .insert(name, elt);
        Ok(elt)
    }

    /// Declares a boundary port of the same type as a sub-block port and
    /// connects the two. The boundary port carries no initializers.
    pub fn export(&mut self, name: &str, interior: PortId) -> BuildResult<PortId> {
        self.check_phase("export", INIT)?;
        let node = self.port_node(interior)?;
        let template = node.template();
        let owner = self.ctx.port_owner(interior);
        if owner == Some(self.block) || self.ctx.port_path(self.block, interior).is_none() {
            return Err(BuildError::InaccessiblePort {
                port: self.ctx.port_label(interior),
                class: self.class(),
            });
        }
        let boundary = self.declare_port_impl("export", name, template, false)?;
        self.ctx.strip_initializers(boundary);
        connect::add_connection(self.ctx, self.block, &[boundary, interior], false, None)?;
        Ok(boundary)
    }

    /// Declares a sub-block and runs its `init`.
    pub fn declare_block<T: Block>(&mut self, name: &str, def: T) -> BuildResult<SubBlock<T::Io>> {
        self.check_phase("declare_block", STRUCTURE)?;
        self.check_name(name)?;
        self.check_sub_block_kind(def.kind())?;
        let def = Rc::new(def);
        let erased: Rc<dyn DynBlock> = def.clone();
        self.ctx.note_block_def(&erased);
        let child = self.ctx.alloc_block(
            erased,
            Some((self.block, name.to_string(), ChildRole::Block)),
        );
        self.ctx.blocks[self.block]
            .blocks
            .insert(name.to_string(), child);
        let io = run_phase(self.ctx, child, INIT_PHASE, |b| def.init(b))?;
        Ok(SubBlock { id: child, io })
    }

    /// Declares a sub-block from a type-erased definition.
    pub fn declare_block_dyn(&mut self, name: &str, def: Rc<dyn DynBlock>) -> BuildResult<BlockId> {
        self.check_phase("declare_block", STRUCTURE)?;
        self.check_name(name)?;
        self.check_sub_block_kind(def.kind())?;
        let (child, _) = instantiate_child(self.ctx, self.block, name, def, ChildRole::Block)?;
        Ok(child)
    }

    fn check_sub_block_kind(&self, kind: BlockKind) -> BuildResult<()> {
        if self.ctx.blocks[self.block].kind == BlockKind::Link {
            return Err(BuildError::structural(
                self.class(),
                "links cannot contain sub-blocks",
            ));
        }
        if kind == BlockKind::Link {
            return Err(BuildError::structural(
                self.class(),
                "links are inferred from connections and cannot be declared as sub-blocks",
            ));
        }
        Ok(())
    }

    /// A port of a sub-block, by name.
    pub fn block_port(&self, block: BlockId, name: &str) -> BuildResult<PortId> {
        self.ctx.blocks[block]
            .ports
            .get(name)
            .copied()
            .ok_or_else(|| {
                BuildError::structural(
                    self.class(),
                    format!("{} has no port {name}", self.ctx.blocks[block].class),
                )
            })
    }

    /// A parameter of a sub-block, by name.
    pub fn block_param(&self, block: BlockId, name: &str) -> BuildResult<NodeId> {
        self.ctx.blocks[block]
            .params
            .get(name)
            .copied()
            .ok_or_else(|| {
                BuildError::structural(
                    self.class(),
                    format!("{} has no parameter {name}", self.ctx.blocks[block].class),
                )
            })
    }

    /// Joins ports into one connection.
    pub fn connect(&mut self, ports: &[PortId]) -> BuildResult<()> {
        self.check_phase("connect", CONNECT)?;
        self.check_ports(ports)?;
        connect::add_connection(self.ctx, self.block, ports, false, None)
    }

    /// Joins ports into one connection with a fixed name.
    pub fn connect_named(&mut self, name: &str, ports: &[PortId]) -> BuildResult<()> {
        self.check_phase("connect", CONNECT)?;
        self.check_ports(ports)?;
        connect::add_connection(self.ctx, self.block, ports, false, Some(name))
    }

    /// Joins ports, treating every element of the vector ports among them as
    /// an independent single connection into one link.
    pub fn connect_flatten(&mut self, ports: &[PortId]) -> BuildResult<()> {
        self.check_phase("connect_flatten", CONNECT)?;
        self.check_ports(ports)?;
        connect::add_connection(self.ctx, self.block, ports, true, None)
    }

    fn check_ports(&self, ports: &[PortId]) -> BuildResult<()> {
        let class = self.class();
        ports
            .iter()
            .try_for_each(|port| check_port_handle(self.ctx, &class, *port))
    }

    /// Allocates a new element on a vector port, optionally with a requested name.
    pub fn allocate(&mut self, vector: PortId, name: Option<&str>) -> BuildResult<PortId> {
        self.check_phase("allocate", CONNECT)?;
        let node = self.vector_node(vector, "allocate")?;
        let template = PortTemplate::Single(node.template.clone());
        if self.ctx.port_path(self.block, vector).is_none() {
            return Err(BuildError::InaccessiblePort {
                port: self.ctx.port_label(vector),
                class: self.class(),
            });
        }
        self.ctx.instantiate_port(
            &template,
            PortParent::Allocated(vector, name.map(str::to_string)),
            false,
        )
    }

    /// Converts `port` to `target_class` through one of its adapters.
    ///
    /// The adapter becomes a sub-block named `(adapter){port}` whose `src` is
    /// connected to `port`; its `dst` is returned.
    pub fn adapt_to(&mut self, port: PortId, target_class: &str) -> BuildResult<PortId> {
        self.check_phase("adapt_to", CONNECT)?;
        let node = self.port_node(port)?;
        let adapter = node
            .template
            .adapter_types()
            .into_iter()
            .find(|(class, _)| class == target_class)
            .map(|(_, def)| def);
        let Some(adapter) = adapter else {
            return Err(BuildError::Unconnectable {
                port: self.ctx.port_label(port),
                reason: format!("no adapter to {target_class}"),
            });
        };
        if adapter.kind() != BlockKind::Adapter {
            return Err(BuildError::structural(
                adapter.class_name(),
                "adapter definitions must be of adapter kind",
            ));
        }
        let path = self
            .ctx
            .port_path(self.block, port)
            .ok_or_else(|| BuildError::InaccessiblePort {
                port: self.ctx.port_label(port),
                class: self.class(),
            })?;
        let name = format!("(adapter){}", path_key(&path));
        let child = self.declare_block_dyn(&name, adapter)?;
        let src = self.block_port(child, "src")?;
        let dst = self.block_port(child, "dst")?;
        connect::add_connection(self.ctx, self.block, &[port, src], false, None)?;
        Ok(dst)
    }

    /// Builds an expression node.
    pub fn expr(&mut self, expr: Expr) -> BuildResult<NodeId> {
        expr::build(self.ctx, &self.class(), &expr)
    }

    /// A literal node.
    pub fn lit(&mut self, value: impl Into<ValueLit>) -> NodeId {
        self.ctx.literal(value.into())
    }

    /// A literal range node.
    pub fn range(&mut self, lower: f64, upper: f64) -> BuildResult<NodeId> {
        let range = Range::new(lower, upper).map_err(|err| BuildError::TypeMismatch {
            op: "range".into(),
            detail: err.to_string(),
        })?;
        Ok(self.ctx.literal(ValueLit::Range(range)))
    }

    /// A parameter of a port, by name.
    pub fn param(&self, port: PortId, name: &str) -> BuildResult<NodeId> {
        self.port_node(port)?
            .params
            .get(name)
            .copied()
            .ok_or_else(|| {
                BuildError::structural(
                    self.class(),
                    format!("{} has no parameter {name}", self.ctx.port_label(port)),
                )
            })
    }

    /// A member of a bundle port, by name.
    pub fn member(&self, port: PortId, name: &str) -> BuildResult<PortId> {
        self.port_node(port)?
            .members
            .get(name)
            .copied()
            .ok_or_else(|| {
                BuildError::structural(
                    self.class(),
                    format!("{} has no member {name}", self.ctx.port_label(port)),
                )
            })
    }

    /// The declared elements of one of this block's vector ports.
    pub fn elements(&self, vector: PortId) -> BuildResult<Vec<PortId>> {
        let node = self.vector_node(vector, "elements")?;
        Ok(node
            .elements
            .as_ref()
            .map(|e| e.values().copied().collect())
            .unwrap_or_default())
    }

    fn reserved(&mut self, port: PortId, param: ReservedParam, ty: ParamType) -> NodeId {
        self.ctx
            .alloc_node(ExprNode::new(ty, Binding::Reserved(port, param)))
    }

    /// Whether `port` is connected.
    pub fn is_connected(&mut self, port: PortId) -> BuildResult<NodeId> {
        self.port_node(port)?;
        Ok(self.reserved(port, ReservedParam::IsConnected, ParamType::Bool))
    }

    /// The number of elements of a vector port.
    pub fn length(&mut self, vector: PortId) -> BuildResult<NodeId> {
        self.vector_node(vector, "length")?;
        Ok(self.reserved(vector, ReservedParam::Length, ParamType::Int))
    }

    /// The names of the elements allocated on a vector port.
    pub fn allocated(&mut self, vector: PortId) -> BuildResult<NodeId> {
        self.vector_node(vector, "allocated")?;
        Ok(self.reserved(
            vector,
            ReservedParam::Allocated,
            ParamType::Array(Box::new(ParamType::Text)),
        ))
    }

    /// The name of a port within its parent.
    pub fn port_name(&mut self, port: PortId) -> BuildResult<NodeId> {
        self.port_node(port)?;
        Ok(self.reserved(port, ReservedParam::Name, ParamType::Text))
    }

    /// A parameter of the link `port` is attached to.
    pub fn link_param(&mut self, port: PortId, name: &str, ty: ParamType) -> BuildResult<NodeId> {
        self.port_node(port)?;
        Ok(self.ctx.alloc_node(ExprNode::new(
            ty,
            Binding::LinkParam {
                port,
                path: LocalPath::names(&[name]),
            },
        )))
    }

    /// The array of a parameter taken in every element of a vector port.
    ///
    /// `path` names bundle members down to the parameter.
    pub fn map_extract(&mut self, vector: PortId, path: &[&str]) -> BuildResult<NodeId> {
        let node = self.vector_node(vector, "map_extract")?;
        let sample = node.sample.ok_or_else(|| {
            BuildError::structural(self.class(), "vector port has no element type")
        })?;
        let steps: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        let ty = self.ctx.param_type_at(sample, &steps).ok_or_else(|| {
            BuildError::structural(
                self.class(),
                format!(
                    "elements of {} have no parameter {}",
                    self.ctx.port_label(vector),
                    steps.join(".")
                ),
            )
        })?;
        Ok(self.ctx.alloc_node(ExprNode::new(
            ParamType::Array(Box::new(ty)),
            Binding::MapExtract {
                container: vector,
                path: LocalPath::names(&steps),
            },
        )))
    }

    fn check_reachable(&self, node: NodeId) -> BuildResult<()> {
        self.ctx
            .to_value_expr(self.block, node)
            .map(|_| ())
            .map_err(|err| match err {
                BuildError::UnboundExpression(param) => BuildError::UnreachableParameter {
                    class: self.class(),
                    param,
                },
                other => other,
            })
    }

    fn add_constraint(&mut self, name: Option<&str>, constraint: Constraint) -> BuildResult<()> {
        let class = self.class();
        let block = &mut self.ctx.blocks[self.block];
        let name = match name {
            Some(name) => name.to_string(),
            None => {
                block.anon_constraints += 1;
                format!("(constr){}", block.anon_constraints - 1)
            }
        };
        if block.constraints.contains_key(&name) {
            return Err(BuildError::structural(
                class,
                format!("constraint {name} is already declared"),
            ));
        }
        block.constraints.insert(name, constraint);
        Ok(())
    }

    fn require_impl(&mut self, name: Option<&str>, cond: NodeId) -> BuildResult<()> {
        self.check_phase("require", STRUCTURE)?;
        let cond = expr::operand(self.ctx, &self.class(), &cond.into())?;
        let ty = &self.ctx.node(cond).ty;
        if *ty != ParamType::Bool {
            return Err(BuildError::TypeMismatch {
                op: "require".into(),
                detail: format!("expected bool, found {ty}"),
            });
        }
        self.check_reachable(cond)?;
        self.add_constraint(name, Constraint::Require(cond))
    }

    /// Adds a boolean constraint.
    pub fn require(&mut self, cond: NodeId) -> BuildResult<()> {
        self.require_impl(None, cond)
    }

    /// Adds a named boolean constraint.
    pub fn require_named(&mut self, name: &str, cond: NodeId) -> BuildResult<()> {
        self.require_impl(Some(name), cond)
    }

    fn assign_impl(&mut self, name: Option<&str>, dst: NodeId, src: ExprArg) -> BuildResult<()> {
        self.check_phase("assign", STRUCTURE)?;
        let class = self.class();
        let dst = expr::operand(self.ctx, &class, &dst.into())?;
        if !self.ctx.node(dst).is_param() {
            return Err(BuildError::structural(
                class,
                "assignment target must be a declared parameter",
            ));
        }
        let src = expr::operand(self.ctx, &class, &src)?;
        let dst_ty = self.ctx.node(dst).ty.clone();
        check_init_type(&self.ctx.describe(dst), &dst_ty, &self.ctx.node(src).ty)?;
        self.check_reachable(dst)?;
        self.check_reachable(src)?;
        self.add_constraint(name, Constraint::Assign(dst, src))
    }

    /// Assigns a value to a parameter.
    pub fn assign(&mut self, dst: NodeId, src: impl Into<ExprArg>) -> BuildResult<()> {
        self.assign_impl(None, dst, src.into())
    }

    /// Assigns a value to a parameter under a fixed constraint name.
    pub fn assign_named(
        &mut self,
        name: &str,
        dst: NodeId,
        src: impl Into<ExprArg>,
    ) -> BuildResult<()> {
        self.assign_impl(Some(name), dst, src.into())
    }

    /// Declares this block a generator whose `generate` reads `required`.
    ///
    /// Inputs must be parameters of this block or of its own ports, or
    /// pseudo-parameters of its own ports.
    pub fn generator(&mut self, required: &[NodeId]) -> BuildResult<()> {
        self.check_phase("generator", GENERATOR)?;
        let class = self.class();
        if self.ctx.blocks[self.block].generator.is_some() {
            return Err(BuildError::structural(class, "generator is already declared"));
        }
        for node in required {
            let node = expr::operand(self.ctx, &class, &(*node).into())?;
            let own = match &self.ctx.node(node).binding {
                Binding::Param {
                    owner: Owner::Block(block),
                    ..
                } => *block == self.block,
                Binding::Param {
                    owner: Owner::Port(port),
                    ..
                }
                | Binding::Reserved(port, _) => self.ctx.port_owner(*port) == Some(self.block),
                _ => false,
            };
            if !own {
                return Err(BuildError::structural(
                    class,
                    format!(
                        "generator input {} is not a parameter of this block or its ports",
                        self.ctx.describe(node)
                    ),
                ));
            }
        }
        self.ctx.blocks[self.block].generator = Some(required.to_vec());
        Ok(())
    }

    /// The solved value of a declared generator input.
    pub fn get(&self, node: NodeId) -> BuildResult<ValueLit> {
        self.check_phase("get", GENERATE)?;
        let class = self.class();
        let declared = self.ctx.blocks[self.block]
            .generator
            .as_deref()
            .unwrap_or_default();
        let path = self
            .ctx
            .owns(node)
            .then(|| self.ctx.value_path(self.block, node))
            .flatten();
        let is_declared = path.as_ref().is_some_and(|path| {
            declared
                .iter()
                .any(|d| self.ctx.value_path(self.block, *d).as_ref() == Some(path))
        });
        let Some(path) = path.filter(|_| is_declared) else {
            return Err(BuildError::UndeclaredGeneratorInput {
                class,
                path: if self.ctx.owns(node) {
                    self.ctx.describe(node)
                } else {
                    "<foreign expression>".into()
                },
            });
        };
        self.ctx
            .generator_values
            .as_ref()
            .and_then(|values| values.get(&path))
            .cloned()
            .ok_or_else(|| BuildError::MissingGeneratorInput {
                class,
                path: path.to_string(),
            })
    }

    fn get_as<T>(
        &self,
        node: NodeId,
        expected: &str,
        convert: impl FnOnce(&ValueLit) -> Option<T>,
    ) -> BuildResult<T> {
        let value = self.get(node)?;
        convert(&value).ok_or_else(|| BuildError::TypeMismatch {
            op: "get".into(),
            detail: format!("expected {expected}, found {}", value.param_type()),
        })
    }

    /// A declared boolean input.
    pub fn get_bool(&self, node: NodeId) -> BuildResult<bool> {
        self.get_as(node, "bool", ValueLit::as_bool)
    }

    /// A declared integer input.
    pub fn get_int(&self, node: NodeId) -> BuildResult<i64> {
        self.get_as(node, "int", ValueLit::as_int)
    }

    /// A declared numeric input.
    pub fn get_float(&self, node: NodeId) -> BuildResult<f64> {
        self.get_as(node, "float", ValueLit::as_float)
    }

    /// A declared range input.
    pub fn get_range(&self, node: NodeId) -> BuildResult<Range> {
        self.get_as(node, "range", ValueLit::as_range)
    }

    /// A declared string input.
    pub fn get_text(&self, node: NodeId) -> BuildResult<String> {
        self.get_as(node, "text", |v| v.as_text().map(str::to_string))
    }

    /// A declared array input, such as the allocated names of a vector port.
    pub fn get_array(&self, node: NodeId) -> BuildResult<Vec<ValueLit>> {
        self.get_as(node, "array", |v| v.as_array().map(<[ValueLit]>::to_vec))
    }
}

/// Joins the steps of a path with `_`, for synthesized element names.
pub(crate) fn path_key(path: &LocalPath) -> String {
    path.steps()
        .iter()
        .map(|step| step.to_string())
        .collect::<Vec<_>>()
        .join("_")
}

/// Builder for one port during its `declare`.
pub struct PortBuilder<'a> {
    pub(crate) ctx: &'a mut BuildContext,
    pub(crate) port: PortId,
}

impl PortBuilder<'_> {
    fn class(&self) -> String {
        self.ctx.ports[self.port].class.clone()
    }

    fn check_name(&self, name: &str) -> BuildResult<()> {
        let node = &self.ctx.ports[self.port];
        if name.is_empty() || name.contains('.') {
            return Err(BuildError::structural(
                self.class(),
                format!("invalid element name {name:?}"),
            ));
        }
        if node.params.contains_key(name) || node.members.contains_key(name) {
            return Err(BuildError::structural(
                self.class(),
                format!("{name} is already declared"),
            ));
        }
        Ok(())
    }

    /// Declares a port parameter with no initializer.
    pub fn declare_param(&mut self, name: &str, ty: ParamType) -> BuildResult<NodeId> {
        self.check_name(name)?;
        let node = self.ctx.alloc_node(ExprNode::new(
            ty,
            Binding::Param {
                owner: Owner::Port(self.port),
                name: name.to_string(),
            },
        ));
        self.ctx.ports[self.port]
            .params
            .insert(name.to_string(), node);
        Ok(node)
    }

    /// Declares a port parameter initialized by the block that declares the port.
    pub fn declare_param_init(
        &mut self,
        name: &str,
        ty: ParamType,
        init: impl Into<ExprArg>,
    ) -> BuildResult<NodeId> {
        let value = expr::operand(self.ctx, &self.class(), &init.into())?;
        check_init_type(name, &ty, &self.ctx.node(value).ty)?;
        let node = self.declare_param(name, ty)?;
        self.ctx.node_mut(node).initializer = Some(Initializer {
            value,
            scope: InitScope::Own,
        });
        Ok(node)
    }

    /// Declares a member of a bundle.
    pub fn declare_member(
        &mut self,
        name: &str,
        template: impl Into<PortTemplate>,
    ) -> BuildResult<PortId> {
        self.check_name(name)?;
        let template = template.into();
        if template.is_vector() {
            return Err(BuildError::structural(
                self.class(),
                "bundle members cannot be vectors",
            ));
        }
        let member = self.ctx.instantiate_port(
            &template,
            PortParent::Member(self.port, name.to_string()),
            false,
        )?;
        self.ctx.ports[self.port]
            .members
            .insert(name.to_string(), member);
        Ok(member)
    }
}
