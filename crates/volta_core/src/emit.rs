//! Lowering a built block into its IR library element.

use crate::binding::InitScope;
use crate::block::BlockKind;
use crate::connect;
use crate::context::{BuildContext, Constraint};
use crate::error::{BuildError, BuildResult};
use crate::ids::{BlockId, PortId};
use volta_ir::{
    BinaryOp, BlockLike, Bundle, GeneratorInfo, HierarchyBlock, LibraryElement, LibraryPath, Link,
    LinkArray, LinkLike, LocalPath, LocalStep, Metadata, OrderedMap, ParamType, Port, PortArray,
    PortLike, ReservedParam, ValueExpr, ValueLit,
};

/// The IR reference to a port: its class, or for vectors the element class
/// and any declared elements.
pub(crate) fn port_ref(ctx: &BuildContext, port: PortId) -> PortLike {
    let node = &ctx.ports[port];
    let class = LibraryPath::new(node.class.clone());
    if node.vector {
        PortLike::Array(PortArray {
            self_class: class.clone(),
            ports: node.elements.as_ref().map(|elements| {
                elements
                    .iter()
                    .map(|(name, _)| (name.clone(), PortLike::LibElem(class.clone())))
                    .collect()
            }),
        })
    } else {
        PortLike::LibElem(class)
    }
}

/// The class element of a port: a single port or a bundle.
pub(crate) fn port_element(ctx: &BuildContext, port: PortId) -> LibraryElement {
    let node = &ctx.ports[port];
    let self_class = LibraryPath::new(node.class.clone());
    let params = node
        .params
        .iter()
        .map(|(name, param)| (name.clone(), ctx.node(*param).ty.clone()))
        .collect();
    if node.members.is_empty() {
        LibraryElement::Port(Port { self_class, params })
    } else {
        LibraryElement::Bundle(Bundle {
            self_class,
            params,
            ports: node
                .members
                .iter()
                .map(|(name, member)| (name.clone(), port_ref(ctx, *member)))
                .collect(),
        })
    }
}

fn required_port(ctx: &BuildContext, name: &str, port: PortId) -> ValueExpr {
    let path = LocalPath::names(&[name]);
    if ctx.ports[port].vector {
        ValueExpr::binary(
            BinaryOp::Gt,
            ValueExpr::Ref(path.with(LocalStep::Reserved(ReservedParam::Length))),
            ValueExpr::Literal(ValueLit::Int(0)),
        )
    } else {
        ValueExpr::Ref(path.with(LocalStep::Reserved(ReservedParam::IsConnected)))
    }
}

struct Emitter<'c> {
    ctx: &'c mut BuildContext,
    root: BlockId,
    constraints: OrderedMap<ValueExpr>,
}

impl Emitter<'_> {
    fn push(&mut self, name: String, expr: ValueExpr) -> BuildResult<()> {
        if self.constraints.contains_key(&name) {
            return Err(BuildError::structural(
                self.ctx.blocks[self.root].class.clone(),
                format!("constraint {name} is emitted twice"),
            ));
        }
        self.constraints.insert(name, expr);
        Ok(())
    }

    fn assign(dst: LocalPath, src: ValueExpr) -> ValueExpr {
        ValueExpr::Assign {
            dst,
            src: Box::new(src),
        }
    }

    fn required_ports(&mut self) -> BuildResult<()> {
        let ports: Vec<(String, PortId)> = self.ctx.blocks[self.root]
            .ports
            .iter()
            .map(|(n, p)| (n.clone(), *p))
            .collect();
        for (name, port) in ports {
            if !self.ctx.ports[port].optional {
                let expr = required_port(self.ctx, &name, port);
                self.push(format!("(reqd){name}"), expr)?;
            }
        }
        Ok(())
    }

    fn top_initializers(&mut self) -> BuildResult<()> {
        let values: Vec<(String, ValueLit)> = self.ctx.blocks[self.root]
            .top_init
            .iter()
            .map(|(n, v)| (n.clone(), v.clone()))
            .collect();
        for (name, value) in values {
            let expr = Self::assign(LocalPath::names(&[&name]), ValueExpr::Literal(value));
            self.push(format!("(top_init){name}"), expr)?;
        }
        Ok(())
    }

    fn own_initializers(&mut self) -> BuildResult<()> {
        let params: Vec<_> = self.ctx.blocks[self.root]
            .params
            .iter()
            .filter_map(|(name, param)| {
                let init = self.ctx.node(*param).initializer?;
                (init.scope == InitScope::Own).then(|| (name.clone(), init.value))
            })
            .collect();
        for (name, value) in params {
            let src = self.ctx.to_value_expr(self.root, value)?;
            self.push(
                format!("(init){name}"),
                Self::assign(LocalPath::names(&[&name]), src),
            )?;
        }
        Ok(())
    }

    fn port_initializers(&mut self) -> BuildResult<()> {
        let ports: Vec<(String, PortId)> = self.ctx.blocks[self.root]
            .ports
            .iter()
            .map(|(n, p)| (n.clone(), *p))
            .collect();
        for (port_name, port) in ports {
            for (prefix, param, value) in self.ctx.port_initializers(port) {
                let dst = LocalPath::names(&[&port_name]).join(&prefix).with_name(param);
                let src = self.ctx.to_value_expr(self.root, value)?;
                self.push(format!("(init){dst}"), Self::assign(dst, src))?;
            }
        }
        Ok(())
    }

    fn block_initializers(&mut self) -> BuildResult<()> {
        let blocks: Vec<(String, BlockId)> = self.ctx.blocks[self.root]
            .blocks
            .iter()
            .map(|(n, b)| (n.clone(), *b))
            .collect();
        for (block_name, block) in blocks {
            let params: Vec<_> = self.ctx.blocks[block]
                .params
                .iter()
                .filter_map(|(name, param)| {
                    let init = self.ctx.node(*param).initializer?;
                    (init.scope == InitScope::Parent).then(|| (name.clone(), init.value))
                })
                .collect();
            for (name, value) in params {
                let src = self.ctx.to_value_expr(self.root, value)?;
                let dst = LocalPath::names(&[&block_name, &name]);
                self.push(format!("(init){dst}"), Self::assign(dst, src))?;
            }
        }
        Ok(())
    }

    fn user_constraints(&mut self) -> BuildResult<()> {
        let constraints: Vec<(String, Constraint)> = self.ctx.blocks[self.root]
            .constraints
            .iter()
            .map(|(n, c)| (n.clone(), *c))
            .collect();
        for (name, constraint) in constraints {
            let expr = match constraint {
                Constraint::Require(cond) => self.ctx.to_value_expr(self.root, cond)?,
                Constraint::Assign(dst, src) => {
                    let dst_path = self
                        .ctx
                        .param_path(self.root, dst)
                        .ok_or_else(|| BuildError::UnboundExpression(self.ctx.describe(dst)))?;
                    Self::assign(dst_path, self.ctx.to_value_expr(self.root, src)?)
                }
            };
            self.push(name, expr)?;
        }
        Ok(())
    }
}

/// Emits the library element of `root`.
///
/// Connections are resolved first, which may add links and bridges. In
/// `top` mode literal constructor arguments become `(top_init)` assignments;
/// `generated` marks a generator as having run.
pub(crate) fn emit(
    ctx: &mut BuildContext,
    root: BlockId,
    top: bool,
    generated: bool,
) -> BuildResult<LibraryElement> {
    let resolved = connect::resolve(ctx, root)?;
    let kind = ctx.blocks[root].kind;
    let mut emitter = Emitter {
        ctx: &mut *ctx,
        root,
        constraints: OrderedMap::new(),
    };
    if kind != BlockKind::Link {
        emitter.required_ports()?;
    }
    if top {
        emitter.top_initializers()?;
    }
    emitter.own_initializers()?;
    emitter.port_initializers()?;
    emitter.block_initializers()?;
    for (name, expr) in resolved.constraints {
        emitter.push(name, expr)?;
    }
    emitter.user_constraints()?;
    let constraints = emitter.constraints;

    let node = &ctx.blocks[root];
    let self_class = LibraryPath::new(node.class.clone());
    let superclasses = node
        .def
        .superclasses()
        .into_iter()
        .map(LibraryPath::new)
        .collect();
    let params: OrderedMap<ParamType> = node
        .params
        .iter()
        .map(|(name, param)| (name.clone(), ctx.node(*param).ty.clone()))
        .collect();
    let ports: OrderedMap<PortLike> = node
        .ports
        .iter()
        .map(|(name, port)| (name.clone(), port_ref(ctx, *port)))
        .collect();
    let links: OrderedMap<LinkLike> = resolved
        .links
        .iter()
        .map(|(name, link, array)| {
            let class = LibraryPath::new(ctx.blocks[*link].class.clone());
            let link = if *array {
                LinkLike::Array(LinkArray {
                    self_class: class,
                    links: OrderedMap::new(),
                })
            } else {
                LinkLike::LibElem(class)
            };
            (name.clone(), link)
        })
        .collect();
    let meta = Metadata {
        doc: node.def.description(),
        ..Metadata::default()
    };

    if kind == BlockKind::Link {
        if node.generator.is_some() {
            return Err(BuildError::structural(
                node.class.clone(),
                "links cannot be generators",
            ));
        }
        return Ok(LibraryElement::Link(Link {
            self_class,
            superclasses,
            params,
            ports,
            links,
            constraints,
            meta,
        }));
    }

    let blocks: OrderedMap<BlockLike> = node
        .blocks
        .iter()
        .map(|(name, block)| {
            let class = LibraryPath::new(ctx.blocks[*block].class.clone());
            (name.clone(), BlockLike::LibElem(class))
        })
        .collect();
    let generator = match &node.generator {
        Some(required) => Some(GeneratorInfo {
            required: required
                .iter()
                .map(|input| {
                    ctx.value_path(root, *input)
                        .ok_or_else(|| BuildError::UnboundExpression(ctx.describe(*input)))
                })
                .collect::<BuildResult<_>>()?,
            done: generated,
        }),
        None => None,
    };
    Ok(LibraryElement::Block(HierarchyBlock {
        self_class,
        superclasses,
        params,
        ports,
        blocks,
        links,
        constraints,
        generator,
        meta,
    }))
}
