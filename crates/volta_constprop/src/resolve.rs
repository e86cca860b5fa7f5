//! Lazy resolution of parameters and connectivity queries.

use crate::graph::{ConstProp, Contributor, EdgeKind};
use crate::ops;
use crate::value::{ErrorValue, Value};
use std::collections::HashSet;
use volta_ir::{Design, DesignPath, EltRef, LocalPath, LocalStep, PortLike, ReservedParam};

impl ConstProp {
    /// Resolves a parameter, or for a port path whether the port is connected.
    ///
    /// `None` means nothing constrains the value yet.
    pub fn resolve(&self, path: &DesignPath) -> Option<Value> {
        self.resolve_excluding(path, None, &HashSet::new())
    }

    fn resolve_excluding(
        &self,
        path: &DesignPath,
        backedge: Option<&Contributor>,
        seen: &HashSet<DesignPath>,
    ) -> Option<Value> {
        if path.is_port() {
            return Some(Value::Bool(self.is_connected(path)));
        }
        let contributors = self.params.get(path)?;
        let cached = self.cache.borrow().get(path).cloned();
        if let Some(cached) = cached {
            return cached;
        }
        if seen.contains(path) {
            return Some(Value::Error(ErrorValue::Cycle(path.clone())));
        }

        let mut seen = seen.clone();
        seen.insert(path.clone());
        let back = Contributor::backedge(path);
        let results: Vec<Option<Value>> = contributors
            .iter()
            .filter(|c| Some(*c) != backedge)
            .map(|c| {
                let exclude = (c.kind == EdgeKind::Assign).then_some(&back);
                c.eval(&mut |sub: &DesignPath| self.resolve_excluding(sub, exclude, &seen))
            })
            .collect();
        let merged = ops::merge(results);

        // only a complete evaluation is a reusable answer
        if backedge.is_none() && seen.len() == 1 {
            self.cache.borrow_mut().insert(path.clone(), merged.clone());
        }
        merged
    }

    /// Resolves a path relative to the block at `block`, the way a generator
    /// names its required values.
    pub fn resolve_at(&self, design: &Design, block: &DesignPath, path: &LocalPath) -> Option<Value> {
        let elt = EltRef::Block(design.block(block)?);
        let expr = self.compile_ref(design, block, elt, path);
        expr.eval(&mut |sub: &DesignPath| self.resolve(sub))
    }

    /// The port of the innermost link that `port` reaches through its
    /// connections and exports.
    pub fn port_link(&self, port: &DesignPath) -> Option<DesignPath> {
        let mut current = port;
        // every step moves one connection closer to a link, so this is bounded
        for _ in 0..=self.connects.len() {
            match self.connects.get(current) {
                Some(next) => current = next,
                None => return self.is_link_port(current).then(|| current.clone()),
            }
        }
        None
    }

    /// Whether `path` is a top-level port of a link or an element of one.
    fn is_link_port(&self, path: &DesignPath) -> bool {
        if !path.in_link() || !path.params.is_empty() {
            return false;
        }
        match path.ports.as_slice() {
            [_] => true,
            [array, _] => {
                let mut container = path.clone();
                container.ports = vec![array.clone()];
                self.port_arrays.contains_key(&container)
            }
            _ => false,
        }
    }

    /// Whether a port is connected: a block port must reach a link, a link
    /// port must have something joined to it.
    pub fn is_connected(&self, port: &DesignPath) -> bool {
        if port.in_link() {
            self.reverse_connects.contains_key(port)
        } else {
            self.port_link(port).is_some()
        }
    }

    /// Every known value reachable from the block or link at `path`: its
    /// parameters, the connection state and parameters of its ports, and with
    /// `recurse_links` the parameters of each port's link under `(link)`.
    pub fn solved_params(
        &self,
        design: &Design,
        path: &DesignPath,
        recurse_links: bool,
    ) -> Vec<(LocalPath, Value)> {
        let mut out = Vec::new();
        let Some(elt) = design.element(path) else {
            return out;
        };
        if let Some(params) = elt.params() {
            for name in params.keys() {
                self.push_solved(&path.append_param(name), LocalPath::names(&[name]), &mut out);
            }
        }
        if let Some(ports) = elt.ports() {
            for (name, port) in ports.iter() {
                self.solved_port(
                    design,
                    &path.append_port(name),
                    &LocalPath::names(&[name]),
                    port,
                    recurse_links,
                    &mut out,
                );
            }
        }
        out
    }

    fn push_solved(&self, path: &DesignPath, rel: LocalPath, out: &mut Vec<(LocalPath, Value)>) {
        if let Some(value) = self.resolve(path) {
            out.push((rel, value));
        }
    }

    fn solved_port(
        &self,
        design: &Design,
        path: &DesignPath,
        rel: &LocalPath,
        port: &PortLike,
        recurse_links: bool,
        out: &mut Vec<(LocalPath, Value)>,
    ) {
        let single = matches!(port, PortLike::Port(_) | PortLike::Bundle(_));
        if single && !path.in_link() {
            let connected = rel.with(LocalStep::Reserved(ReservedParam::IsConnected));
            match self.port_link(path) {
                Some(link_port) => {
                    out.push((connected, Value::Bool(true)));
                    let link_path = link_port.link_component();
                    if let (true, Some(link)) = (recurse_links, design.link(&link_path)) {
                        let link_rel = rel.with(LocalStep::Reserved(ReservedParam::ConnectedLink));
                        for name in link.params.keys() {
                            self.push_solved(
                                &link_path.append_param(name),
                                link_rel.with_name(name.clone()),
                                out,
                            );
                        }
                    }
                }
                None => out.push((connected, Value::Bool(false))),
            }
        }
        if let Some(params) = port.params() {
            for name in params.keys() {
                self.push_solved(&path.append_param(name), rel.with_name(name.clone()), out);
            }
        }
        let members = match port {
            PortLike::Bundle(bundle) => Some(&bundle.ports),
            PortLike::Array(array) => array.ports.as_ref(),
            PortLike::Port(_) | PortLike::LibElem(_) => None,
        };
        for (name, member) in members.into_iter().flat_map(|m| m.iter()) {
            self.solved_port(
                design,
                &path.append_port(name),
                &rel.with_name(name.clone()),
                member,
                recurse_links,
                out,
            );
        }
    }
}
