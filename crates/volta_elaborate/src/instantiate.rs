//! The instantiation transform: turns library references into instances.
//!
//! A design fresh from the library refers to its sub-blocks, ports, and links
//! by class. [`Instantiator`] walks the design parents first and replaces each
//! reference with a copy of the library element, after applying class and
//! instance refinements. Along the way it expands the connection forms whose
//! shape depends on how many elements a vector has:
//!
//! - `(alloc)` steps in connection paths become element names, handed out per
//!   vector in connection order;
//! - vector-to-vector connections and exports become one constraint per
//!   element, creating link array elements as needed.
//!
//! A vector on a generator that has not run has no known elements, so
//! connections to it are left as they are until the generator has produced
//! its contents and [`Instantiator::expand_pending`] revisits the parent.

use crate::error::{ElaborateError, ElaborateResult};
use crate::errors;
use std::collections::{HashMap, HashSet};
use volta_common::InternalError;
use volta_core::LibrarySource;
use volta_diagnostics::DiagnosticSink;
use volta_ir::{
    BlockLike, Design, DesignPath, HierarchyBlock, LibraryElement, LibraryPath, Link, LinkLike,
    LocalPath, LocalStep, OrderedMap, PortLike, Refinements, ValueExpr,
};

/// Instantiates designs against a library.
///
/// One instantiator serves a whole compilation: it remembers which vector
/// elements have been allocated so that blocks re-instantiated after their
/// generator has run see the same element names.
pub struct Instantiator<'a> {
    library: &'a dyn LibrarySource,
    refinements: &'a Refinements,
    sink: &'a DiagnosticSink,
    elements: HashMap<LibraryPath, LibraryElement>,
    /// Element names handed out on each vector port, in allocation order.
    allocations: HashMap<DesignPath, Vec<String>>,
    /// Vector connections and exports inside each link, kept so elements
    /// allocated after the link was first visited are expanded too.
    link_arrays: HashMap<DesignPath, OrderedMap<ValueExpr>>,
    /// Vector ports whose elements come from allocations rather than the class.
    open_vectors: HashSet<DesignPath>,
    /// Instance refinements that matched a block.
    applied: HashSet<DesignPath>,
}

impl<'a> Instantiator<'a> {
    /// Creates an instantiator applying `refinements`.
    pub fn new(
        library: &'a dyn LibrarySource,
        refinements: &'a Refinements,
        sink: &'a DiagnosticSink,
    ) -> Self {
        Self {
            library,
            refinements,
            sink,
            elements: HashMap::new(),
            allocations: HashMap::new(),
            link_arrays: HashMap::new(),
            open_vectors: HashSet::new(),
            applied: HashSet::new(),
        }
    }

    /// Instantiates every element of `design`.
    pub fn instantiate(&mut self, design: &mut Design) -> ElaborateResult<()> {
        self.visit_block(&DesignPath::root(), &mut design.contents)
    }

    /// Returns an instantiated copy of `design`.
    pub fn transform(&mut self, design: &Design) -> ElaborateResult<Design> {
        let mut out = design.clone();
        self.instantiate(&mut out)?;
        Ok(out)
    }

    /// Instantiates the block at `path` and everything below it.
    ///
    /// Allocations made by the block's own constraints are forgotten first,
    /// so a block replaced by its generated contents allocates afresh.
    pub fn instantiate_at(&mut self, design: &mut Design, path: &DesignPath) -> ElaborateResult<()> {
        self.allocations.retain(|array, _| !made_inside(path, array));
        self.link_arrays.retain(|link, _| !made_inside(path, link));
        self.open_vectors.retain(|array| !made_inside(path, array));
        let block = block_at(design, path)?;
        self.visit_block(path, block)
    }

    /// Expands the connections of the block at `path` that were waiting for
    /// a generator, and instantiates the link elements they create. Vector
    /// exports inside its links are extended to elements allocated since.
    pub fn expand_pending(&mut self, design: &mut Design, path: &DesignPath) -> ElaborateResult<()> {
        let block = block_at(design, path)?;
        self.expand_block_constraints(path, block)?;
        for (name, link) in block.links.iter_mut() {
            self.visit_link_like(&path.append_link(name), link)?;
        }
        Ok(())
    }

    /// The element names allocated on the vector at `array`.
    pub fn allocated(&self, array: &DesignPath) -> &[String] {
        self.allocations.get(array).map(Vec::as_slice).unwrap_or_default()
    }

    /// Reports instance refinements that matched no block.
    pub fn finish(&self) {
        for (path, class) in &self.refinements.instances {
            if !self.applied.contains(path) {
                self.sink
                    .emit(errors::warn_unused_instance(&path.to_string(), &class.name));
            }
        }
    }

    fn visit_block(&mut self, path: &DesignPath, block: &mut HierarchyBlock) -> ElaborateResult<()> {
        log::trace!("instantiating {path} ({})", block.self_class);
        for (name, port) in block.ports.iter_mut() {
            self.instantiate_port(&path.append_port(name), port)?;
        }
        for (name, child) in block.blocks.iter_mut() {
            if let BlockLike::LibElem(class) = child {
                let class = class.clone();
                let instance = self.child_block(&path.append_block(name), &class)?;
                *child = BlockLike::Block(Box::new(instance));
            }
        }
        self.link_shells(path, &mut block.links)?;
        self.expand_block_constraints(path, block)?;

        for (name, link) in block.links.iter_mut() {
            self.visit_link_like(&path.append_link(name), link)?;
        }
        for (name, child) in block.blocks.iter_mut() {
            if let BlockLike::Block(child) = child {
                self.visit_block(&path.append_block(name), child)?;
            }
        }
        Ok(())
    }

    fn visit_link_like(&mut self, path: &DesignPath, link: &mut LinkLike) -> ElaborateResult<()> {
        match link {
            LinkLike::Link(link) => self.visit_link(path, link),
            LinkLike::Array(array) => {
                for (name, elt) in array.links.iter_mut() {
                    self.visit_link(&path.append_link(name), elt)?;
                }
                Ok(())
            }
            LinkLike::LibElem(class) => {
                let class = class.clone();
                let mut instance = self.library_link(path, &class)?;
                self.visit_link(path, &mut instance)?;
                *link = LinkLike::Link(Box::new(instance));
                Ok(())
            }
        }
    }

    fn visit_link(&mut self, path: &DesignPath, link: &mut Link) -> ElaborateResult<()> {
        for (name, port) in link.ports.iter_mut() {
            self.instantiate_port(&path.append_port(name), port)?;
        }
        self.link_shells(path, &mut link.links)?;

        let mut constraints = OrderedMap::new();
        let mut arrays = self.link_arrays.remove(path).unwrap_or_default();
        for (name, expr) in std::mem::take(&mut link.constraints) {
            match expr {
                ValueExpr::ConnectedArray { .. } | ValueExpr::ExportedArray { .. } => {
                    arrays.insert(name, expr);
                }
                expr => {
                    constraints.insert(name, expr);
                }
            }
        }
        let mut scope = Scope {
            path,
            ports: &link.ports,
            blocks: None,
            links: &mut link.links,
            pending: HashSet::new(),
            expanded: constraints.keys().cloned().collect(),
        };
        let mut expanded = self.expand_constraints(&mut scope, constraints)?;
        for (name, expr) in self.expand_constraints(&mut scope, arrays.clone())? {
            expanded.insert(name, expr);
        }
        link.constraints = expanded;
        if !arrays.is_empty() {
            self.link_arrays.insert(path.clone(), arrays);
        }

        for (name, inner) in link.links.iter_mut() {
            self.visit_link_like(&path.append_link(name), inner)?;
        }
        Ok(())
    }

    /// Replaces link references with unvisited instances, so connections
    /// can be resolved against their ports.
    fn link_shells(
        &mut self,
        parent: &DesignPath,
        links: &mut OrderedMap<LinkLike>,
    ) -> ElaborateResult<()> {
        for (name, link) in links.iter_mut() {
            if let LinkLike::LibElem(class) = link {
                let class = class.clone();
                let instance = self.library_link(&parent.append_link(name), &class)?;
                *link = LinkLike::Link(Box::new(instance));
            }
        }
        Ok(())
    }

    fn instantiate_port(&mut self, path: &DesignPath, port: &mut PortLike) -> ElaborateResult<()> {
        if let PortLike::LibElem(class) = port {
            let class = class.clone();
            *port = match self.element(path, &class)? {
                LibraryElement::Port(single) => PortLike::Port(single),
                LibraryElement::Bundle(bundle) => PortLike::Bundle(bundle),
                other => return Err(wrong_kind(path, &class, "port", &other)),
            };
        }
        match port {
            PortLike::Bundle(bundle) => {
                for (name, member) in bundle.ports.iter_mut() {
                    self.instantiate_port(&path.append_port(name), member)?;
                }
            }
            PortLike::Array(array) => {
                if array.ports.is_none() {
                    self.open_vectors.insert(path.clone());
                }
                let class = array.self_class.clone();
                let elements = array.ports.get_or_insert_with(OrderedMap::new);
                for name in self.allocated(path) {
                    if !elements.contains_key(name) {
                        elements.insert(name.clone(), PortLike::LibElem(class.clone()));
                    }
                }
                for (name, elt) in elements.iter_mut() {
                    self.instantiate_port(&path.append_port(name), elt)?;
                }
            }
            PortLike::Port(_) | PortLike::LibElem(_) => {}
        }
        Ok(())
    }

    fn child_block(&mut self, path: &DesignPath, class: &LibraryPath) -> ElaborateResult<HierarchyBlock> {
        if self.refinements.instances.contains_key(path) {
            self.applied.insert(path.clone());
        }
        let refined = self
            .refinements
            .refine(path, class)
            .filter(|refined| *refined != class)
            .cloned();
        let target = refined.as_ref().unwrap_or(class);
        let mut block = match self.element(path, target)? {
            LibraryElement::Block(block) => block,
            other => return Err(wrong_kind(path, target, "block", &other)),
        };
        if let Some(refined) = refined {
            log::debug!("refining {path}: {class} -> {refined}");
            if !block.superclasses.contains(class) {
                self.sink.emit(errors::warn_not_subclass(
                    &path.to_string(),
                    &class.name,
                    &refined.name,
                ));
            }
            block.meta.refinement_original = Some(class.clone());
        }
        Ok(block)
    }

    fn library_link(&mut self, path: &DesignPath, class: &LibraryPath) -> ElaborateResult<Link> {
        match self.element(path, class)? {
            LibraryElement::Link(link) => Ok(link),
            other => Err(wrong_kind(path, class, "link", &other)),
        }
    }

    fn element(&mut self, path: &DesignPath, class: &LibraryPath) -> ElaborateResult<LibraryElement> {
        if let Some(element) = self.elements.get(class) {
            return Ok(element.clone());
        }
        let element = self
            .library
            .element(class)
            .map_err(|source| ElaborateError::Library {
                path: path.clone(),
                class: class.clone(),
                source,
            })?;
        self.elements.insert(class.clone(), element.clone());
        Ok(element)
    }

    fn expand_block_constraints(
        &mut self,
        path: &DesignPath,
        block: &mut HierarchyBlock,
    ) -> ElaborateResult<()> {
        let pending = block
            .blocks
            .iter()
            .filter(|(_, child)| child.as_block().is_some_and(|b| b.generator_pending()))
            .map(|(name, _)| name.clone())
            .collect();
        let constraints = std::mem::take(&mut block.constraints);
        let mut scope = Scope {
            path,
            ports: &block.ports,
            blocks: Some(&block.blocks),
            links: &mut block.links,
            pending,
            expanded: HashSet::new(),
        };
        block.constraints = self.expand_constraints(&mut scope, constraints)?;
        Ok(())
    }

    fn expand_constraints(
        &mut self,
        scope: &mut Scope<'_>,
        constraints: OrderedMap<ValueExpr>,
    ) -> ElaborateResult<OrderedMap<ValueExpr>> {
        let mut out = OrderedMap::new();
        for (name, expr) in constraints {
            for (name, expr) in self.expand(scope, &name, expr)? {
                out.insert(name, expr);
            }
        }
        Ok(out)
    }

    fn expand(
        &mut self,
        scope: &mut Scope<'_>,
        name: &str,
        expr: ValueExpr,
    ) -> ElaborateResult<Vec<(String, ValueExpr)>> {
        let expanded = match expr {
            ValueExpr::ConnectedArray {
                block_port,
                link_port,
            } => {
                if scope.waits_on_generator(&block_port) {
                    log::debug!("{}: `{name}` waits for its generator", scope.path);
                    vec![(
                        name.to_string(),
                        ValueExpr::ConnectedArray {
                            block_port,
                            link_port,
                        },
                    )]
                } else {
                    self.expand_vector(scope, name, &block_port, &link_port, |block_port, link_port| {
                        ValueExpr::Connected {
                            block_port,
                            link_port,
                        }
                    })?
                }
            }
            ValueExpr::ExportedArray {
                exterior_port,
                internal_block_port,
            } => self.expand_vector(
                scope,
                name,
                &exterior_port,
                &internal_block_port,
                |exterior_port, internal_block_port| ValueExpr::Exported {
                    exterior_port,
                    internal_block_port,
                },
            )?,
            ValueExpr::Connected {
                block_port,
                link_port,
            } => vec![(
                name.to_string(),
                ValueExpr::Connected {
                    block_port: self.allocate_steps(scope, name, &block_port)?,
                    link_port: self.allocate_steps(scope, name, &link_port)?,
                },
            )],
            ValueExpr::Exported {
                exterior_port,
                internal_block_port,
            } => vec![(
                name.to_string(),
                ValueExpr::Exported {
                    exterior_port: self.allocate_steps(scope, name, &exterior_port)?,
                    internal_block_port: self.allocate_steps(scope, name, &internal_block_port)?,
                },
            )],
            mut expr => {
                let mut unnamed = None;
                expr.rewrite_refs(&mut |path: &mut LocalPath| {
                    if path.steps().contains(&LocalStep::Allocate(None)) {
                        unnamed = Some(path.to_string());
                    }
                    for step in path.0.iter_mut() {
                        if let LocalStep::Allocate(Some(requested)) = step {
                            *step = LocalStep::Name(requested.clone());
                        }
                    }
                });
                match unnamed {
                    // nothing says which element an unnamed allocation would be
                    Some(path) => {
                        let err = scope.fail(
                            name,
                            format!("`{path}` reads an unnamed allocation outside a connection"),
                        );
                        log::warn!("dropping constraint: {err}");
                        self.sink.emit(err.to_diagnostic());
                        Vec::new()
                    }
                    None => vec![(name.to_string(), expr)],
                }
            }
        };
        Ok(expanded)
    }

    /// One constraint per element of the vector at `vector`, pairing
    /// `vector.<e>` with the matching end of `other`.
    fn expand_vector(
        &mut self,
        scope: &mut Scope<'_>,
        name: &str,
        vector: &LocalPath,
        other: &LocalPath,
        make: impl Fn(LocalPath, LocalPath) -> ValueExpr,
    ) -> ElaborateResult<Vec<(String, ValueExpr)>> {
        let names = plain_names(vector).ok_or_else(|| {
            scope.fail(name, format!("vector `{vector}` is named through an allocation"))
        })?;
        let (array, declared) = scope.vector(&names).map_err(|reason| scope.fail(name, reason))?;
        let elements = declared.unwrap_or_else(|| self.allocated(&array).to_vec());
        log::trace!("{}: expanding `{name}` over {} elements", scope.path, elements.len());

        let mut out = Vec::with_capacity(elements.len());
        for elt in elements {
            let elt_name = format!("{name}_{elt}");
            if scope.expanded.contains(&elt_name) {
                continue;
            }
            let end = self.element_end(scope, name, other, &elt)?;
            out.push((elt_name, make(vector.with_name(elt.clone()), end)));
        }
        Ok(out)
    }

    /// The end of a vector connection that pairs with element `elt`: the
    /// matching element of a link array, a fresh allocation on a single link,
    /// or element `elt` of a sub-block vector.
    fn element_end(
        &mut self,
        scope: &mut Scope<'_>,
        name: &str,
        other: &LocalPath,
        elt: &str,
    ) -> ElaborateResult<LocalPath> {
        let Some(LocalStep::Name(first)) = other.steps().first() else {
            return Err(scope.fail(name, format!("`{other}` does not start with a name")));
        };
        match scope.links.get(first) {
            Some(LinkLike::Array(_)) => {}
            Some(_) if other.has_allocate() => return self.allocate_steps(scope, name, other),
            Some(_) => {
                return Err(scope.fail(
                    name,
                    format!("vector joined to the single link port `{other}`"),
                ))
            }
            None => {
                let names = plain_names(other)
                    .ok_or_else(|| scope.fail(name, format!("`{other}` is not a vector port")))?;
                let (array, declared) =
                    scope.vector(&names).map_err(|reason| scope.fail(name, reason))?;
                self.allocate(&array, Some(elt), declared.as_deref())
                    .map_err(|reason| scope.fail(name, reason))?;
                return Ok(other.with_name(elt.to_string()));
            }
        }

        let path = scope.path.append_link(first).append_link(elt);
        if let Some(LinkLike::Array(array)) = scope.links.get_mut(first) {
            if !array.links.contains_key(elt) {
                log::trace!("creating link array element {path}");
                let link = self.library_link(&path, &array.self_class)?;
                array.links.insert(elt.to_string(), link);
            }
        }
        let mut steps = vec![LocalStep::Name(first.clone()), LocalStep::Name(elt.to_string())];
        steps.extend(other.steps()[1..].iter().cloned());
        self.allocate_steps(scope, name, &LocalPath(steps))
    }

    /// Replaces every `(alloc)` step of `path` with the element it allocates.
    fn allocate_steps(
        &mut self,
        scope: &Scope<'_>,
        name: &str,
        path: &LocalPath,
    ) -> ElaborateResult<LocalPath> {
        let mut out = LocalPath(Vec::with_capacity(path.steps().len()));
        for step in path.steps() {
            let step = match step {
                LocalStep::Allocate(requested) => {
                    let names = plain_names(&out).ok_or_else(|| {
                        scope.fail(name, format!("cannot allocate on `{out}`"))
                    })?;
                    let (array, declared) =
                        scope.vector(&names).map_err(|reason| scope.fail(name, reason))?;
                    let elt = self
                        .allocate(&array, requested.as_deref(), declared.as_deref())
                        .map_err(|reason| scope.fail(name, reason))?;
                    LocalStep::Name(elt)
                }
                other => other.clone(),
            };
            out.0.push(step);
        }
        Ok(out)
    }

    /// Hands out an element of the vector at `array`: the requested one, the
    /// next declared one, or the next free index.
    fn allocate(
        &mut self,
        array: &DesignPath,
        requested: Option<&str>,
        declared: Option<&[String]>,
    ) -> Result<String, String> {
        let declared = declared.filter(|_| !self.open_vectors.contains(array));
        let taken = self.allocations.entry(array.clone()).or_default();
        let elt = match (requested, declared) {
            (Some(elt), Some(declared)) if !declared.iter().any(|d| d == elt) => {
                return Err(format!("{array} has no element `{elt}`"));
            }
            (Some(elt), _) => {
                if taken.iter().any(|t| t == elt) {
                    return Err(format!("element `{elt}` of {array} is allocated twice"));
                }
                elt.to_string()
            }
            (None, Some(declared)) => declared
                .iter()
                .find(|d| !taken.contains(*d))
                .cloned()
                .ok_or_else(|| format!("every element of {array} is already allocated"))?,
            (None, None) => {
                let mut index = taken.len();
                while taken.contains(&index.to_string()) {
                    index += 1;
                }
                index.to_string()
            }
        };
        taken.push(elt.clone());
        Ok(elt)
    }
}

/// What connection paths inside one block or link resolve against.
struct Scope<'s> {
    path: &'s DesignPath,
    ports: &'s OrderedMap<PortLike>,
    blocks: Option<&'s OrderedMap<BlockLike>>,
    links: &'s mut OrderedMap<LinkLike>,
    /// Sub-blocks that are generators yet to run.
    pending: HashSet<String>,
    /// Constraints already expanded on an earlier visit.
    expanded: HashSet<String>,
}

impl Scope<'_> {
    fn fail(&self, name: &str, reason: impl Into<String>) -> ElaborateError {
        ElaborateError::Connection {
            path: self.path.clone(),
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    fn waits_on_generator(&self, port: &LocalPath) -> bool {
        matches!(port.steps().first(), Some(LocalStep::Name(first)) if self.pending.contains(first))
    }

    /// The vector port named by `names` and its declared elements, if any.
    fn vector(&self, names: &[String]) -> Result<(DesignPath, Option<Vec<String>>), String> {
        match self.port(names) {
            Some((path, PortLike::Array(array))) => {
                let declared = array
                    .ports
                    .as_ref()
                    .map(|elements| elements.keys().cloned().collect());
                Ok((path, declared))
            }
            Some((path, _)) => Err(format!("{path} is not a vector port")),
            None => Err(format!("`{}` names no port", names.join("."))),
        }
    }

    /// Finds a port of this element, of a sub-block, or of a link.
    fn port(&self, names: &[String]) -> Option<(DesignPath, &PortLike)> {
        let (first, rest) = names.split_first()?;
        if let Some(port) = self.ports.get(first) {
            return descend(self.path.append_port(first), port, rest);
        }
        if let Some(child) = self.blocks.and_then(|blocks| blocks.get(first)) {
            let (port, rest) = rest.split_first()?;
            let block = child.as_block()?;
            let path = self.path.append_block(first).append_port(port);
            return descend(path, block.ports.get(port)?, rest);
        }
        let (path, link, rest) = match self.links.get(first)? {
            LinkLike::Link(link) => (self.path.append_link(first), &**link, rest),
            LinkLike::Array(array) => {
                let (elt, rest) = rest.split_first()?;
                let path = self.path.append_link(first).append_link(elt);
                (path, array.links.get(elt)?, rest)
            }
            LinkLike::LibElem(_) => return None,
        };
        let (port, rest) = rest.split_first()?;
        descend(path.append_port(port), link.ports.get(port)?, rest)
    }
}

fn descend<'p>(
    path: DesignPath,
    port: &'p PortLike,
    rest: &[String],
) -> Option<(DesignPath, &'p PortLike)> {
    let Some((name, rest)) = rest.split_first() else {
        return Some((path, port));
    };
    let member = match port {
        PortLike::Bundle(bundle) => bundle.ports.get(name)?,
        PortLike::Array(array) => array.ports.as_ref()?.get(name)?,
        PortLike::Port(_) | PortLike::LibElem(_) => return None,
    };
    descend(path.append_port(name), member, rest)
}

fn plain_names(path: &LocalPath) -> Option<Vec<String>> {
    path.steps()
        .iter()
        .map(|step| match step {
            LocalStep::Name(name) => Some(name.clone()),
            LocalStep::Reserved(_) | LocalStep::Allocate(_) => None,
        })
        .collect()
}

/// Whether the vector at `array` belongs to something inside `block`, so its
/// allocations were made by `block`'s own constraints.
fn made_inside(block: &DesignPath, array: &DesignPath) -> bool {
    array.blocks.starts_with(&block.blocks)
        && (array.blocks.len() > block.blocks.len() || !array.links.is_empty())
}

fn block_at<'d>(design: &'d mut Design, path: &DesignPath) -> ElaborateResult<&'d mut HierarchyBlock> {
    design
        .block_mut(path)
        .ok_or_else(|| InternalError::new(format!("no block at {path}")).into())
}

fn wrong_kind(
    path: &DesignPath,
    class: &LibraryPath,
    expected: &'static str,
    found: &LibraryElement,
) -> ElaborateError {
    let found = match found {
        LibraryElement::Port(_) => "port",
        LibraryElement::Bundle(_) => "bundle",
        LibraryElement::Block(_) => "block",
        LibraryElement::Link(_) => "link",
    };
    ElaborateError::WrongKind {
        path: path.clone(),
        class: class.clone(),
        expected,
        found,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volta_core::{BuildError, BuildResult, GeneratorValues};
    use volta_ir::{Port, PortArray};

    /// A library answering from a fixed set of elements.
    struct Fixed(Vec<LibraryElement>);

    impl LibrarySource for Fixed {
        fn index_module(&self, _module: &str) -> BuildResult<Vec<LibraryPath>> {
            Ok(self.0.iter().map(|e| e.self_class().clone()).collect())
        }

        fn element(&self, path: &LibraryPath) -> BuildResult<LibraryElement> {
            self.0
                .iter()
                .find(|e| e.self_class() == path)
                .cloned()
                .ok_or_else(|| BuildError::UnknownClass(path.name.clone()))
        }

        fn top(&self, path: &LibraryPath) -> BuildResult<(HierarchyBlock, Refinements)> {
            match self.element(path)? {
                LibraryElement::Block(block) => Ok((block, Refinements::default())),
                _ => Err(BuildError::structural(path.name.clone(), "not a block")),
            }
        }

        fn generate(&self, path: &LibraryPath, _values: &GeneratorValues) -> BuildResult<HierarchyBlock> {
            Err(BuildError::generator(path.name.clone(), "not a generator"))
        }
    }

    fn class(name: &str) -> LibraryPath {
        LibraryPath::new(name)
    }

    fn pin() -> LibraryElement {
        LibraryElement::Port(Port {
            self_class: class("t.Pin"),
            params: OrderedMap::new(),
        })
    }

    fn net() -> LibraryElement {
        let mut link = Link::new(class("t.Net"));
        link.ports.insert(
            "pins".into(),
            PortLike::Array(PortArray {
                self_class: class("t.Pin"),
                ports: None,
            }),
        );
        LibraryElement::Link(link)
    }

    fn part() -> LibraryElement {
        let mut block = HierarchyBlock::new(class("t.Part"));
        block.ports.insert("pin".into(), PortLike::LibElem(class("t.Pin")));
        LibraryElement::Block(block)
    }

    fn names(path: &[&str]) -> LocalPath {
        LocalPath::names(path)
    }

    fn board(parts: usize) -> Design {
        let mut top = HierarchyBlock::new(class("t.Board"));
        top.links.insert("net".into(), LinkLike::LibElem(class("t.Net")));
        for i in 0..parts {
            let name = format!("p{i}");
            top.blocks.insert(name.clone(), BlockLike::LibElem(class("t.Part")));
            top.constraints.insert(
                format!("(conn)net_d{i}"),
                ValueExpr::Connected {
                    block_port: names(&[&name, "pin"]),
                    link_port: names(&["net", "pins"]).with(LocalStep::Allocate(None)),
                },
            );
        }
        Design::new(top)
    }

    #[test]
    fn allocations_number_link_slots() {
        let library = Fixed(vec![pin(), net(), part()]);
        let refinements = Refinements::default();
        let sink = DiagnosticSink::new();
        let mut design = board(3);
        let mut inst = Instantiator::new(&library, &refinements, &sink);
        inst.instantiate(&mut design).unwrap();

        let link = design.link(&DesignPath::root().append_link("net")).unwrap();
        let PortLike::Array(pins) = &link.ports["pins"] else {
            panic!("pins should stay a vector");
        };
        let elements: Vec<_> = pins.ports.as_ref().unwrap().keys().cloned().collect();
        assert_eq!(elements, vec!["0", "1", "2"]);
        assert!(matches!(
            &design.contents.constraints["(conn)net_d2"],
            ValueExpr::Connected { link_port, .. } if link_port.to_string() == "net.pins.2"
        ));
        assert!(design.block(&DesignPath::of_blocks(&["p1"])).is_some());
    }

    #[test]
    fn declared_elements_bound_allocations() {
        let mut link = Link::new(class("t.Pair"));
        let mut declared = OrderedMap::new();
        declared.insert("a".to_string(), PortLike::LibElem(class("t.Pin")));
        declared.insert("b".to_string(), PortLike::LibElem(class("t.Pin")));
        link.ports.insert(
            "pins".into(),
            PortLike::Array(PortArray {
                self_class: class("t.Pin"),
                ports: Some(declared),
            }),
        );
        let library = Fixed(vec![pin(), part(), LibraryElement::Link(link)]);
        let refinements = Refinements::default();
        let sink = DiagnosticSink::new();

        let mut design = board(3);
        design
            .contents
            .links
            .insert("net".into(), LinkLike::LibElem(class("t.Pair")));
        let err = Instantiator::new(&library, &refinements, &sink)
            .instantiate(&mut design)
            .unwrap_err();
        assert!(matches!(err, ElaborateError::Connection { ref reason, .. } if reason.contains("already allocated")));

        let mut design = board(2);
        design
            .contents
            .links
            .insert("net".into(), LinkLike::LibElem(class("t.Pair")));
        Instantiator::new(&library, &refinements, &sink)
            .instantiate(&mut design)
            .unwrap();
        assert!(matches!(
            &design.contents.constraints["(conn)net_d1"],
            ValueExpr::Connected { link_port, .. } if link_port.to_string() == "net.pins.b"
        ));
    }

    #[test]
    fn named_allocation_is_rewritten_in_values() {
        let library = Fixed(vec![pin(), net(), part()]);
        let refinements = Refinements::default();
        let sink = DiagnosticSink::new();
        let mut design = board(1);
        design.contents.constraints.insert(
            "first_pin".into(),
            ValueExpr::reference(
                names(&["net", "pins"]).with(LocalStep::Allocate(Some("0".into()))),
            ),
        );
        Instantiator::new(&library, &refinements, &sink)
            .instantiate(&mut design)
            .unwrap();
        assert_eq!(
            design.contents.constraints["first_pin"],
            ValueExpr::reference(names(&["net", "pins", "0"]))
        );
    }

    #[test]
    fn unnamed_allocation_in_values_is_reported() {
        let library = Fixed(vec![pin(), net(), part()]);
        let refinements = Refinements::default();
        let sink = DiagnosticSink::new();
        let mut design = board(1);
        design.contents.constraints.insert(
            "any_pin".into(),
            ValueExpr::reference(names(&["net", "pins"]).with(LocalStep::Allocate(None))),
        );
        Instantiator::new(&library, &refinements, &sink)
            .instantiate(&mut design)
            .unwrap();
        assert!(!design.contents.constraints.contains_key("any_pin"));
        assert!(design.contents.constraints.contains_key("(conn)net_d0"));
        let diags = sink.take_all();
        assert_eq!(diags.len(), 1, "{diags:?}");
        assert_eq!(diags[0].code, errors::E206);
        assert!(diags[0].message.contains("any_pin"), "{}", diags[0].message);
    }

    /// A link passing each of its pins through to an inner net.
    fn bus() -> LibraryElement {
        let mut link = Link::new(class("t.Bus"));
        link.ports.insert(
            "pins".into(),
            PortLike::Array(PortArray {
                self_class: class("t.Pin"),
                ports: None,
            }),
        );
        link.links.insert("net".into(), LinkLike::LibElem(class("t.Net")));
        link.constraints.insert(
            "(export)pins".into(),
            ValueExpr::ExportedArray {
                exterior_port: names(&["pins"]),
                internal_block_port: names(&["net", "pins"]).with(LocalStep::Allocate(None)),
            },
        );
        LibraryElement::Link(link)
    }

    fn joins_bus(part: &str) -> ValueExpr {
        ValueExpr::Connected {
            block_port: names(&[part, "pin"]),
            link_port: names(&["bus", "pins"]).with(LocalStep::Allocate(None)),
        }
    }

    #[test]
    fn link_exports_follow_late_allocations() {
        let library = Fixed(vec![pin(), net(), part(), bus()]);
        let refinements = Refinements::default();
        let sink = DiagnosticSink::new();
        let mut top = HierarchyBlock::new(class("t.Board"));
        top.links.insert("bus".into(), LinkLike::LibElem(class("t.Bus")));
        top.blocks.insert("p0".into(), BlockLike::LibElem(class("t.Part")));
        top.constraints.insert("(conn)bus_d0".into(), joins_bus("p0"));
        let mut design = Design::new(top);
        let mut inst = Instantiator::new(&library, &refinements, &sink);
        inst.instantiate(&mut design).unwrap();

        // a second part joins once the board has been visited
        let p1 = match library.element(&class("t.Part")).unwrap() {
            LibraryElement::Block(block) => block,
            other => panic!("expected a block, got {other:?}"),
        };
        design
            .contents
            .blocks
            .insert("p1".into(), BlockLike::Block(Box::new(p1)));
        design
            .contents
            .constraints
            .insert("(conn)bus_d1".into(), joins_bus("p1"));
        inst.expand_pending(&mut design, &DesignPath::root()).unwrap();

        let bus_path = DesignPath::root().append_link("bus");
        let net_pins = bus_path.append_link("net").append_port("pins");
        assert_eq!(inst.allocated(&net_pins), ["0", "1"]);
        let bus = design.link(&bus_path).unwrap();
        assert_eq!(
            bus.constraints["(export)pins_1"],
            ValueExpr::Exported {
                exterior_port: names(&["pins", "1"]),
                internal_block_port: names(&["net", "pins", "1"]),
            }
        );
        assert!(bus.constraints.contains_key("(export)pins_0"));
        assert!(!bus.constraints.contains_key("(export)pins"));
        let LinkLike::Link(net) = &bus.links["net"] else {
            panic!("net should be instantiated");
        };
        let PortLike::Array(pins) = &net.ports["pins"] else {
            panic!("pins should stay a vector");
        };
        let elements: Vec<_> = pins.ports.as_ref().unwrap().keys().cloned().collect();
        assert_eq!(elements, vec!["0", "1"]);
    }

    #[test]
    fn wrong_kind_is_reported() {
        let library = Fixed(vec![pin(), net(), part()]);
        let refinements = Refinements::default();
        let sink = DiagnosticSink::new();
        let mut top = HierarchyBlock::new(class("t.Board"));
        top.blocks.insert("oops".into(), BlockLike::LibElem(class("t.Net")));
        let err = Instantiator::new(&library, &refinements, &sink)
            .instantiate(&mut Design::new(top))
            .unwrap_err();
        assert!(matches!(
            err,
            ElaborateError::WrongKind { expected: "block", found: "link", .. }
        ));
    }

    #[test]
    fn made_inside_excludes_own_ports() {
        let gen = DesignPath::of_blocks(&["gen"]);
        assert!(!made_inside(&gen, &gen.append_port("outs")));
        assert!(made_inside(&gen, &gen.append_block("p0").append_port("pin")));
        assert!(made_inside(&gen, &gen.append_link("net").append_port("pins")));
        assert!(!made_inside(&gen, &DesignPath::of_blocks(&["other"]).append_port("pin")));
    }
}
