//! Building the parameter graph from an instantiated design.

use crate::expr::PropExpr;
use crate::value::{ErrorValue, Value};
use linked_hash_map::LinkedHashMap;
use std::cell::RefCell;
use std::collections::HashMap;
use volta_ir::{
    follow_partial, instantiated_links, sub_blocks, BinaryOp, Design, DesignPath, EltRef,
    HierarchyBlock, Link, LinkLike, LocalPath, LocalStep, PortLike, ReservedParam, ValueExpr,
    ValueLit,
};

/// How a contributor constrains its parameter.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum EdgeKind {
    /// The parameter equals the expression.
    Assign,
    /// The parameter lies within the expression's interval.
    Subset,
}

/// One expression contributing to a parameter's value.
#[derive(Clone, Debug)]
pub(crate) struct Contributor {
    pub(crate) kind: EdgeKind,
    pub(crate) expr: PropExpr,
    /// Where the contribution came from, for diagnostics.
    pub(crate) name: String,
    /// Elements whose constraints produced this edge; `None` for a forced value.
    pub(crate) origins: Vec<Option<DesignPath>>,
}

// Identity ignores the sources so the same edge from two places is kept once.
impl PartialEq for Contributor {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.expr == other.expr
    }
}

impl Contributor {
    /// The assignment back to `path`, excluded while resolving through an
    /// assignment out of `path`.
    pub(crate) fn backedge(path: &DesignPath) -> Self {
        Self {
            kind: EdgeKind::Assign,
            expr: PropExpr::Param(path.clone()),
            name: "backedge".into(),
            origins: Vec::new(),
        }
    }

    pub(crate) fn eval(
        &self,
        resolve: &mut dyn FnMut(&DesignPath) -> Option<Value>,
    ) -> Option<Value> {
        let value = self.expr.eval(resolve)?;
        match (self.kind, value) {
            (EdgeKind::Assign, value) => Some(value),
            (EdgeKind::Subset, Value::Range(r) | Value::Subset(r)) => Some(Value::Subset(r)),
            (EdgeKind::Subset, Value::Error(_)) => Some(Value::Error(ErrorValue::Propagated)),
            (EdgeKind::Subset, other) => {
                Some(Value::error(format!("cannot bound a parameter by {other}")))
            }
        }
    }
}

/// The constant propagator.
///
/// Blocks and links are added in preorder, parents before children, since a
/// child's references through `(link)` steps need the parent's connections.
/// Each addition invalidates the resolution cache.
#[derive(Default)]
pub struct ConstProp {
    pub(crate) params: HashMap<DesignPath, Vec<Contributor>>,
    /// Boolean constraints to check, by owning element and constraint name.
    pub(crate) checks: LinkedHashMap<DesignPath, LinkedHashMap<String, Vec<PropExpr>>>,
    /// Element names of every vector port.
    pub(crate) port_arrays: HashMap<DesignPath, Vec<String>>,
    /// Next step from a port toward its link.
    pub(crate) connects: HashMap<DesignPath, DesignPath>,
    pub(crate) reverse_connects: HashMap<DesignPath, DesignPath>,
    pub(crate) cache: RefCell<HashMap<DesignPath, Option<Value>>>,
}

impl ConstProp {
    /// An empty propagator.
    pub fn new() -> Self {
        Self::default()
    }

    /// A propagator holding every block and link of `design`.
    pub fn from_design(design: &Design) -> Self {
        let mut prop = Self::new();
        prop.add_subtree(design, &DesignPath::root());
        prop
    }

    /// Adds the block at `path` and everything below it, replacing whatever
    /// an earlier call added for the same subtree.
    ///
    /// Used incrementally when a generated block is spliced into a design, so
    /// the generator stub's constraints leave with it.
    pub fn add_subtree(&mut self, design: &Design, path: &DesignPath) {
        self.remove_subtree(path);
        match design.block(path) {
            Some(block) => self.visit_block(design, path, block),
            None => log::debug!("no instantiated block at {path}"),
        }
    }

    /// Drops every edge and check contributed by the block at `path` or the
    /// blocks and links below it. Forced values stay.
    pub fn remove_subtree(&mut self, path: &DesignPath) {
        self.invalidate();
        let inside = |origin: &Option<DesignPath>| {
            origin
                .as_ref()
                .is_some_and(|origin| origin.blocks.starts_with(&path.blocks))
        };
        self.params.retain(|_, contributors| {
            contributors.retain_mut(|edge| {
                edge.origins.retain(|origin| !inside(origin));
                !edge.origins.is_empty()
            });
            !contributors.is_empty()
        });
        let owners: Vec<DesignPath> = self
            .checks
            .keys()
            .filter(|owner| owner.blocks.starts_with(&path.blocks))
            .cloned()
            .collect();
        for owner in owners {
            self.checks.remove(&owner);
        }
    }

    /// Forces a parameter to a literal value.
    pub fn set_value(&mut self, path: DesignPath, value: &ValueLit) {
        let name = format!("set {path} = {value}");
        self.add_edge(
            path,
            EdgeKind::Assign,
            PropExpr::Literal(Value::from_lit(value)),
            name,
            None,
        );
    }

    fn invalidate(&mut self) {
        self.cache.get_mut().clear();
    }

    fn add_edge(
        &mut self,
        path: DesignPath,
        kind: EdgeKind,
        expr: PropExpr,
        name: String,
        origin: Option<&DesignPath>,
    ) {
        self.invalidate();
        let contributors = self.params.entry(path).or_default();
        let origin = origin.cloned();
        let edge = Contributor {
            kind,
            expr,
            name,
            origins: vec![origin.clone()],
        };
        match contributors.iter_mut().find(|existing| **existing == edge) {
            Some(existing) => existing.origins.push(origin),
            None => contributors.push(edge),
        }
    }

    fn add_check(&mut self, owner: &DesignPath, name: &str, expr: PropExpr) {
        let exprs = self
            .checks
            .entry(owner.clone())
            .or_insert_with(LinkedHashMap::new)
            .entry(name.to_string())
            .or_insert_with(Vec::new);
        if !exprs.contains(&expr) {
            exprs.push(expr);
        }
    }

    fn visit_block(&mut self, design: &Design, path: &DesignPath, block: &HierarchyBlock) {
        log::trace!("propagation graph: block {path}");
        self.invalidate();
        let elt = EltRef::Block(block);
        for (name, port) in block.ports.iter() {
            self.record_ports(path.append_port(name), port);
        }
        for (name, constraint) in block.constraints.iter() {
            self.process_connected(design, path, elt, constraint, name);
        }
        for (name, constraint) in block.constraints.iter() {
            self.process_constraint(design, path, elt, constraint, name);
        }
        for (name, link) in instantiated_links(&block.links) {
            self.visit_link_like(design, &path.append_link(name), link);
        }
        for (name, sub) in sub_blocks(block) {
            self.visit_block(design, &path.append_block(name), sub);
        }
    }

    fn visit_link_like(&mut self, design: &Design, path: &DesignPath, link: &LinkLike) {
        match link {
            LinkLike::Link(link) => self.visit_link(design, path, link),
            LinkLike::Array(array) => {
                for (name, elt) in array.links.iter() {
                    self.visit_link(design, &path.append_link(name), elt);
                }
            }
            LinkLike::LibElem(class) => log::debug!("skipping uninstantiated link {path}: {class}"),
        }
    }

    fn visit_link(&mut self, design: &Design, path: &DesignPath, link: &Link) {
        log::trace!("propagation graph: link {path}");
        self.invalidate();
        let elt = EltRef::Link(link);
        for (name, port) in link.ports.iter() {
            self.record_ports(path.append_port(name), port);
        }
        for (name, constraint) in link.constraints.iter() {
            self.process_connected(design, path, elt, constraint, name);
        }
        for (name, constraint) in link.constraints.iter() {
            self.process_constraint(design, path, elt, constraint, name);
        }
        for (name, inner) in instantiated_links(&link.links) {
            self.visit_link_like(design, &path.append_link(name), inner);
        }
    }

    fn record_ports(&mut self, path: DesignPath, port: &PortLike) {
        match port {
            PortLike::Array(array) => {
                let Some(elements) = &array.ports else {
                    return;
                };
                self.port_arrays
                    .insert(path.clone(), elements.keys().cloned().collect());
                for (name, elt) in elements.iter() {
                    self.record_ports(path.append_port(name), elt);
                }
            }
            PortLike::Bundle(bundle) => {
                for (name, member) in bundle.ports.iter() {
                    self.record_ports(path.append_port(name), member);
                }
            }
            PortLike::Port(_) | PortLike::LibElem(_) => {}
        }
    }

    /// Follows `steps` from `elt`, continuing through `(link)` steps to the
    /// link a port is connected to.
    pub(crate) fn follow<'d>(
        &self,
        design: &'d Design,
        at: &DesignPath,
        elt: EltRef<'d>,
        steps: &[LocalStep],
    ) -> Option<(DesignPath, EltRef<'d>)> {
        let followed = follow_partial(at.clone(), elt, steps);
        match followed.remaining.split_first() {
            None => Some((followed.path, followed.elt)),
            Some((LocalStep::Reserved(ReservedParam::ConnectedLink), rest)) => {
                let link_port = self.port_link(&followed.path)?;
                let link_path = link_port.link_component();
                let link = design.link(&link_path)?;
                self.follow(design, &link_path, EltRef::Link(link), rest)
            }
            Some(_) => None,
        }
    }

    /// The parameter a plain reference names, if it names one.
    fn param_target(
        &self,
        design: &Design,
        at: &DesignPath,
        elt: EltRef<'_>,
        expr: &ValueExpr,
    ) -> Option<DesignPath> {
        let path = expr.as_ref_path()?;
        match self.follow(design, at, elt, path.steps())? {
            (target, EltRef::Param(_)) => Some(target),
            _ => None,
        }
    }

    /// Locates a reference, including the reserved pseudo-parameters.
    pub(crate) fn compile_ref(
        &self,
        design: &Design,
        at: &DesignPath,
        elt: EltRef<'_>,
        path: &LocalPath,
    ) -> PropExpr {
        match path.steps().split_last() {
            Some((LocalStep::Reserved(ReservedParam::IsConnected), port)) => {
                match self.follow(design, at, elt, port) {
                    Some((port_path, _)) if port_path.is_port() => PropExpr::Param(port_path),
                    _ => PropExpr::Unknown,
                }
            }
            Some((LocalStep::Reserved(reserved), target))
                if *reserved != ReservedParam::ConnectedLink =>
            {
                match self.follow(design, at, elt, target) {
                    Some((target_path, target_elt)) => {
                        structural(*reserved, &target_path, target_elt)
                            .map(PropExpr::Literal)
                            .unwrap_or(PropExpr::Unknown)
                    }
                    None => PropExpr::Unknown,
                }
            }
            _ => match self.follow(design, at, elt, path.steps()) {
                Some((param, EltRef::Param(_))) => PropExpr::Param(param),
                _ => PropExpr::Unknown,
            },
        }
    }

    /// Converts a value expression in the context of the element at `at`.
    pub(crate) fn compile(
        &self,
        design: &Design,
        at: &DesignPath,
        elt: EltRef<'_>,
        expr: &ValueExpr,
    ) -> PropExpr {
        let boxed = |e: &ValueExpr| Box::new(self.compile(design, at, elt, e));
        match expr {
            ValueExpr::Literal(lit) => PropExpr::Literal(Value::from_lit(lit)),
            ValueExpr::Ref(path) => self.compile_ref(design, at, elt, path),
            ValueExpr::Unary { op, val } => PropExpr::Unary {
                op: *op,
                val: boxed(val),
            },
            ValueExpr::Reduce { op, vals } => PropExpr::Reduce {
                op: *op,
                vals: boxed(vals),
            },
            ValueExpr::Binary { op, lhs, rhs } => PropExpr::Binary {
                op: *op,
                lhs: boxed(lhs),
                rhs: boxed(rhs),
            },
            ValueExpr::BinarySet { op, lhset, rhs } => PropExpr::BinarySet {
                op: *op,
                lhset: boxed(lhset),
                rhs: boxed(rhs),
            },
            ValueExpr::IfThenElse { cond, tru, fal } => PropExpr::IfThenElse {
                cond: boxed(cond),
                tru: boxed(tru),
                fal: boxed(fal),
            },
            ValueExpr::Array(elts) => PropExpr::Array(
                elts.iter()
                    .map(|e| self.compile(design, at, elt, e))
                    .collect(),
            ),
            ValueExpr::MapExtract { container, path } => {
                match self.follow(design, at, elt, container.steps()) {
                    Some((_, EltRef::PortArray(array))) => {
                        let names = array.ports.iter().flat_map(|ports| ports.keys());
                        PropExpr::MapExtract(
                            names
                                .map(|name| {
                                    let elt_path = container.with_name(name.clone()).join(path);
                                    self.compile_ref(design, at, elt, &elt_path)
                                })
                                .collect(),
                        )
                    }
                    Some((_, EltRef::LinkArray(array))) => PropExpr::MapExtract(
                        array
                            .links
                            .keys()
                            .map(|name| {
                                let elt_path = container.with_name(name.clone()).join(path);
                                self.compile_ref(design, at, elt, &elt_path)
                            })
                            .collect(),
                    ),
                    _ => PropExpr::Unknown,
                }
            }
            ValueExpr::Assign { .. }
            | ValueExpr::Connected { .. }
            | ValueExpr::Exported { .. }
            | ValueExpr::ConnectedArray { .. }
            | ValueExpr::ExportedArray { .. } => PropExpr::Unknown,
        }
    }

    fn process_constraint(
        &mut self,
        design: &Design,
        at: &DesignPath,
        elt: EltRef<'_>,
        constraint: &ValueExpr,
        name: &str,
    ) {
        let source = format!("{at}:{name}");
        match constraint {
            ValueExpr::Binary {
                op: BinaryOp::And,
                lhs,
                rhs,
            } => {
                self.process_constraint(design, at, elt, lhs, name);
                self.process_constraint(design, at, elt, rhs, name);
            }
            ValueExpr::Binary {
                op: op @ (BinaryOp::Eq | BinaryOp::Within),
                lhs,
                rhs,
            } => {
                let lhs_param = self.param_target(design, at, elt, lhs);
                let rhs_param = self.param_target(design, at, elt, rhs);
                match (*op, lhs_param, rhs_param) {
                    (BinaryOp::Eq, Some(l), Some(r)) => {
                        self.add_edge(l.clone(), EdgeKind::Assign, PropExpr::Param(r.clone()), source.clone(), Some(at));
                        self.add_edge(r, EdgeKind::Assign, PropExpr::Param(l), source, Some(at));
                    }
                    (BinaryOp::Eq, Some(l), None) => {
                        let expr = self.compile(design, at, elt, rhs);
                        self.add_edge(l, EdgeKind::Assign, expr, source, Some(at));
                    }
                    (BinaryOp::Eq, None, Some(r)) => {
                        let expr = self.compile(design, at, elt, lhs);
                        self.add_edge(r, EdgeKind::Assign, expr, source, Some(at));
                    }
                    (BinaryOp::Within, Some(l), _) => {
                        let bound = self.compile(design, at, elt, rhs);
                        self.add_edge(l, EdgeKind::Subset, bound, source, Some(at));
                        let check = self.compile(design, at, elt, constraint);
                        self.add_check(at, name, check);
                    }
                    _ => {
                        let check = self.compile(design, at, elt, constraint);
                        self.add_check(at, name, check);
                    }
                }
            }
            ValueExpr::Assign { dst, src } => {
                let Some(dst_param) = self.param_target(design, at, elt, &ValueExpr::Ref(dst.clone()))
                else {
                    log::debug!("assignment {source} targets no parameter: {dst}");
                    return;
                };
                match self.param_target(design, at, elt, src) {
                    Some(src_param) => {
                        self.add_edge(
                            dst_param.clone(),
                            EdgeKind::Assign,
                            PropExpr::Param(src_param.clone()),
                            source.clone(),
                            Some(at),
                        );
                        self.add_edge(src_param, EdgeKind::Assign, PropExpr::Param(dst_param), source, Some(at));
                    }
                    None => {
                        let expr = self.compile(design, at, elt, src);
                        self.add_edge(dst_param, EdgeKind::Assign, expr, source, Some(at));
                    }
                }
            }
            constraint if constraint.is_connection() => {}
            constraint => {
                let check = self.compile(design, at, elt, constraint);
                self.add_check(at, name, check);
            }
        }
    }

    fn process_connected(
        &mut self,
        design: &Design,
        at: &DesignPath,
        elt: EltRef<'_>,
        constraint: &ValueExpr,
        name: &str,
    ) {
        let (src, dst) = match constraint {
            ValueExpr::Connected {
                block_port,
                link_port,
            } => (block_port, link_port),
            // inside a link the export runs from the link's own port inward
            ValueExpr::Exported {
                exterior_port,
                internal_block_port,
            } if matches!(elt, EltRef::Link(_)) => (exterior_port, internal_block_port),
            ValueExpr::Exported {
                exterior_port,
                internal_block_port,
            } => (internal_block_port, exterior_port),
            ValueExpr::ConnectedArray { .. } | ValueExpr::ExportedArray { .. } => {
                log::debug!("unexpanded array connection {at}:{name}");
                return;
            }
            _ => return,
        };
        let src = follow_partial(at.clone(), elt, src.steps());
        let dst = follow_partial(at.clone(), elt, dst.steps());
        if !src.remaining.is_empty() || !dst.remaining.is_empty() {
            log::debug!("unresolved connection {at}:{name}");
            return;
        }
        let example = src.elt;
        let (src_path, dst_path) = (src.path, dst.path);

        let mut src_ports = Vec::new();
        let mut dst_ports = Vec::new();
        subports(&src_path, example, &mut src_ports);
        subports(&dst_path, example, &mut dst_ports);
        for (s, d) in src_ports.into_iter().zip(dst_ports) {
            self.reverse_connects.insert(d.clone(), s.clone());
            self.connects.insert(s, d);
        }

        let source = format!("{at}:{name} (connect {src_path} to {dst_path})");
        let mut src_params = Vec::new();
        let mut dst_params = Vec::new();
        port_params(&src_path, example, &mut src_params);
        port_params(&dst_path, example, &mut dst_params);
        for (s, d) in src_params.into_iter().zip(dst_params) {
            self.add_edge(s.clone(), EdgeKind::Assign, PropExpr::Param(d.clone()), source.clone(), Some(at));
            self.add_edge(d, EdgeKind::Assign, PropExpr::Param(s), source.clone(), Some(at));
        }
    }
}

/// The port itself followed by every bundle member, in declaration order.
fn subports(path: &DesignPath, port: EltRef<'_>, out: &mut Vec<DesignPath>) {
    match port {
        EltRef::Port(_) => out.push(path.clone()),
        EltRef::Bundle(bundle) => {
            out.push(path.clone());
            for (name, member) in bundle.ports.iter() {
                subports(&path.append_port(name), EltRef::from_port(member), out);
            }
        }
        _ => {}
    }
}

/// Every parameter of a port and its bundle members, in declaration order.
fn port_params(path: &DesignPath, port: EltRef<'_>, out: &mut Vec<DesignPath>) {
    if let Some(params) = port.params() {
        out.extend(params.keys().map(|name| path.append_param(name)));
    }
    if let EltRef::Bundle(bundle) = port {
        for (name, member) in bundle.ports.iter() {
            port_params(&path.append_port(name), EltRef::from_port(member), out);
        }
    }
}

/// The value of a structural pseudo-parameter.
fn structural(reserved: ReservedParam, path: &DesignPath, elt: EltRef<'_>) -> Option<Value> {
    let names: Option<Vec<&String>> = match elt {
        EltRef::PortArray(array) => array.ports.as_ref().map(|ports| ports.keys().collect()),
        EltRef::LinkArray(array) => Some(array.links.keys().collect()),
        _ => None,
    };
    match reserved {
        ReservedParam::Length => Some(Value::Int(names?.len() as i64)),
        ReservedParam::Allocated => Some(Value::Array(
            names?
                .into_iter()
                .map(|name| Value::Text(name.clone()))
                .collect(),
        )),
        ReservedParam::Name => path.last_name().map(|name| Value::Text(name.to_string())),
        ReservedParam::IsConnected | ReservedParam::ConnectedLink => None,
    }
}
