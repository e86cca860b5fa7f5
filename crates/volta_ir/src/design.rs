//! Designs, libraries, and refinement directives.

use crate::elem::{BlockLike, Bundle, HierarchyBlock, Link, LinkLike, Port, PortLike};
use crate::follow::{follow_partial, EltRef};
use crate::lit::ValueLit;
use crate::path::{DesignPath, LibraryPath, LocalStep};
use crate::OrderedMap;
use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};

/// A complete design rooted at one block.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Design {
    /// The top-level block.
    pub contents: HierarchyBlock,
}

impl Design {
    /// Wraps a top-level block.
    pub fn new(contents: HierarchyBlock) -> Self {
        Self { contents }
    }

    /// The instantiated block at `path`, following only its block steps.
    pub fn block(&self, path: &DesignPath) -> Option<&HierarchyBlock> {
        let mut block = &self.contents;
        for name in &path.blocks {
            block = block.blocks.get(name)?.as_block()?;
        }
        Some(block)
    }

    /// The instantiated block at `path`, mutably.
    pub fn block_mut(&mut self, path: &DesignPath) -> Option<&mut HierarchyBlock> {
        let mut block = &mut self.contents;
        for name in &path.blocks {
            block = block.blocks.get_mut(name)?.as_block_mut()?;
        }
        Some(block)
    }

    /// The instantiated link at `path`, following its block and link steps.
    ///
    /// Elements of link arrays are addressed by an extra link step.
    pub fn link(&self, path: &DesignPath) -> Option<&Link> {
        let block = self.block(path)?;
        let (first, rest) = path.links.split_first()?;
        let mut elt = EltRef::from_link(block.links.get(first)?);
        for name in rest {
            elt = match elt {
                EltRef::Link(link) => EltRef::from_link(link.links.get(name)?),
                EltRef::LinkArray(array) => EltRef::Link(array.links.get(name)?),
                _ => return None,
            };
        }
        match elt {
            EltRef::Link(link) => Some(link),
            _ => None,
        }
    }

    /// The instantiated link at `path`, mutably.
    pub fn link_mut(&mut self, path: &DesignPath) -> Option<&mut Link> {
        let block = self.block_mut(path)?;
        let (first, rest) = path.links.split_first()?;
        descend_links(block.links.get_mut(first)?, rest)
    }

    /// The element at an absolute path.
    pub fn element(&self, path: &DesignPath) -> Option<EltRef<'_>> {
        let steps: Vec<LocalStep> = path
            .steps()
            .map(|s| LocalStep::Name(s.to_string()))
            .collect();
        let followed = follow_partial(DesignPath::root(), EltRef::Block(&self.contents), &steps);
        if followed.remaining.is_empty() && followed.path == *path {
            Some(followed.elt)
        } else {
            None
        }
    }

    /// Resolves a dotted path such as `reg.fb.r1.resistance` against the tree.
    pub fn resolve_dotted(&self, dotted: &str) -> Option<DesignPath> {
        let steps: Vec<LocalStep> = dotted
            .split('.')
            .filter(|s| !s.is_empty())
            .map(|s| LocalStep::Name(s.to_string()))
            .collect();
        let followed = follow_partial(DesignPath::root(), EltRef::Block(&self.contents), &steps);
        followed.remaining.is_empty().then_some(followed.path)
    }
}

fn descend_links<'a>(slot: &'a mut LinkLike, rest: &[String]) -> Option<&'a mut Link> {
    match slot {
        LinkLike::Link(link) => match rest.split_first() {
            None => Some(link),
            Some((name, tail)) => descend_links(link.links.get_mut(name)?, tail),
        },
        LinkLike::Array(array) => {
            let (elt, tail) = rest.split_first()?;
            let link = array.links.get_mut(elt)?;
            match tail.split_first() {
                None => Some(link),
                Some((name, tail)) => descend_links(link.links.get_mut(name)?, tail),
            }
        }
        LinkLike::LibElem(_) => None,
    }
}

/// A library element definition.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum LibraryElement {
    /// A port class.
    Port(Port),
    /// A bundle class.
    Bundle(Bundle),
    /// A block class.
    Block(HierarchyBlock),
    /// A link class.
    Link(Link),
}

impl LibraryElement {
    /// The class of this element.
    pub fn self_class(&self) -> &LibraryPath {
        match self {
            LibraryElement::Port(port) => &port.self_class,
            LibraryElement::Bundle(bundle) => &bundle.self_class,
            LibraryElement::Block(block) => &block.self_class,
            LibraryElement::Link(link) => &link.self_class,
        }
    }

    /// Classes this element refers to by name, in first-reference order.
    pub fn referenced_classes(&self) -> Vec<LibraryPath> {
        let mut out = Vec::new();
        match self {
            LibraryElement::Port(_) => {}
            LibraryElement::Bundle(bundle) => collect_ports(&bundle.ports, &mut out),
            LibraryElement::Block(block) => {
                collect_ports(&block.ports, &mut out);
                for (_, sub) in block.blocks.iter() {
                    match sub {
                        BlockLike::LibElem(class) => push_class(&mut out, class),
                        BlockLike::Block(sub) => push_class(&mut out, &sub.self_class),
                    }
                }
                for (_, link) in block.links.iter() {
                    push_class(&mut out, link.self_class());
                }
            }
            LibraryElement::Link(link) => {
                collect_ports(&link.ports, &mut out);
                for (_, inner) in link.links.iter() {
                    push_class(&mut out, inner.self_class());
                }
            }
        }
        out
    }
}

fn push_class(out: &mut Vec<LibraryPath>, class: &LibraryPath) {
    if !out.contains(class) {
        out.push(class.clone());
    }
}

fn collect_ports(ports: &OrderedMap<PortLike>, out: &mut Vec<LibraryPath>) {
    for (_, port) in ports.iter() {
        push_class(out, port.self_class());
        match port {
            PortLike::Bundle(bundle) => collect_ports(&bundle.ports, out),
            PortLike::Array(array) => {
                if let Some(elements) = &array.ports {
                    collect_ports(elements, out);
                }
            }
            PortLike::LibElem(_) | PortLike::Port(_) => {}
        }
    }
}

/// All classes a design can reference, keyed by class name.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Library {
    /// Elements in definition order.
    pub elements: OrderedMap<LibraryElement>,
}

impl Library {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an element.
    pub fn insert(&mut self, path: LibraryPath, element: LibraryElement) {
        self.elements.insert(path.name, element);
    }

    /// Looks up an element.
    pub fn get(&self, path: &LibraryPath) -> Option<&LibraryElement> {
        self.elements.get(&path.name)
    }

    /// Looks up a block class.
    pub fn block(&self, path: &LibraryPath) -> Option<&HierarchyBlock> {
        match self.get(path)? {
            LibraryElement::Block(block) => Some(block),
            _ => None,
        }
    }

    /// Looks up a link class.
    pub fn link(&self, path: &LibraryPath) -> Option<&Link> {
        match self.get(path)? {
            LibraryElement::Link(link) => Some(link),
            _ => None,
        }
    }

    /// Looks up a port or bundle class as a port slot.
    pub fn port(&self, path: &LibraryPath) -> Option<PortLike> {
        match self.get(path)? {
            LibraryElement::Port(port) => Some(PortLike::Port(port.clone())),
            LibraryElement::Bundle(bundle) => Some(PortLike::Bundle(bundle.clone())),
            _ => None,
        }
    }

    /// Whether `class` is `ancestor` or lists it among its superclasses.
    pub fn is_subclass(&self, class: &LibraryPath, ancestor: &LibraryPath) -> bool {
        if class == ancestor {
            return true;
        }
        match self.get(class) {
            Some(LibraryElement::Block(block)) => block.superclasses.contains(ancestor),
            Some(LibraryElement::Link(link)) => link.superclasses.contains(ancestor),
            _ => false,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the library is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Substitutions and overrides applied while instantiating a design.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Refinements {
    /// Every use of a class is replaced by another class.
    pub classes: LinkedHashMap<LibraryPath, LibraryPath>,
    /// One block instance is replaced by a class. Wins over class substitutions.
    pub instances: LinkedHashMap<DesignPath, LibraryPath>,
    /// Parameters forced to literal values.
    pub values: LinkedHashMap<DesignPath, ValueLit>,
}

impl Refinements {
    /// Whether no directive is present.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.instances.is_empty() && self.values.is_empty()
    }

    /// Adds every directive of `other`, replacing directives for the same key.
    pub fn merge(&mut self, other: &Refinements) {
        for (k, v) in &other.classes {
            self.classes.insert(k.clone(), v.clone());
        }
        for (k, v) in &other.instances {
            self.instances.insert(k.clone(), v.clone());
        }
        for (k, v) in &other.values {
            self.values.insert(k.clone(), v.clone());
        }
    }

    /// The class a block at `path`, defined as `class`, is replaced by.
    pub fn refine(&self, path: &DesignPath, class: &LibraryPath) -> Option<&LibraryPath> {
        self.instances
            .get(path)
            .or_else(|| self.classes.get(class))
    }
}

/// Iterates over the instantiated sub-blocks of a block.
pub fn sub_blocks(block: &HierarchyBlock) -> impl Iterator<Item = (&String, &HierarchyBlock)> {
    block
        .blocks
        .iter()
        .filter_map(|(name, b)| b.as_block().map(|b| (name, b)))
}

/// Iterates over the instantiated links of a block or link.
pub fn instantiated_links(
    links: &OrderedMap<LinkLike>,
) -> impl Iterator<Item = (&String, &LinkLike)> {
    links
        .iter()
        .filter(|(_, l)| !matches!(l, LinkLike::LibElem(_)))
}

impl From<HierarchyBlock> for BlockLike {
    fn from(block: HierarchyBlock) -> Self {
        BlockLike::Block(Box::new(block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elem::LinkArray;
    use crate::lit::ParamType;
    use volta_common::Range;

    fn design() -> Design {
        let mut link = Link::new(LibraryPath::new("lib.PowerLink"));
        link.params.insert("voltage".into(), ParamType::Range);
        let mut array = LinkArray {
            self_class: LibraryPath::new("lib.PowerLink"),
            links: OrderedMap::new(),
        };
        array.links.insert("0".into(), link.clone());

        let mut sub = HierarchyBlock::new(LibraryPath::new("lib.Reg"));
        sub.links.insert("vout".into(), LinkLike::Link(Box::new(link)));
        sub.links.insert("bus".into(), LinkLike::Array(array));
        sub.params.insert("v".into(), ParamType::Float);

        let mut top = HierarchyBlock::new(LibraryPath::new("lib.Top"));
        top.blocks.insert("reg".into(), sub.into());
        Design::new(top)
    }

    #[test]
    fn block_and_link_lookup() {
        let d = design();
        let reg = DesignPath::of_blocks(&["reg"]);
        assert_eq!(d.block(&reg).unwrap().self_class.name, "lib.Reg");
        assert!(d.link(&reg.append_link("vout")).is_some());
        assert!(d.link(&reg.append_link("bus").append_link("0")).is_some());
        assert!(d.link(&reg.append_link("bus")).is_none());
        let mut d = d;
        let elt = reg.append_link("bus").append_link("0");
        d.link_mut(&elt).unwrap().meta.doc = Some("first".into());
        assert_eq!(d.link(&elt).unwrap().meta.doc.as_deref(), Some("first"));
        assert!(d.block(&DesignPath::of_blocks(&["nope"])).is_none());
    }

    #[test]
    fn resolve_dotted_paths() {
        let d = design();
        let path = d.resolve_dotted("reg.vout.voltage").unwrap();
        assert_eq!(path.links, vec!["vout".to_string()]);
        assert_eq!(path.params, vec!["voltage".to_string()]);
        assert!(d.resolve_dotted("reg.missing").is_none());
        assert!(matches!(d.element(&path), Some(EltRef::Param(_))));
    }

    #[test]
    fn referenced_classes_in_order() {
        let mut block = HierarchyBlock::new(LibraryPath::new("lib.Top"));
        block.ports.insert(
            "pwr".into(),
            PortLike::LibElem(LibraryPath::new("lib.VoltageSink")),
        );
        block
            .blocks
            .insert("reg".into(), BlockLike::LibElem(LibraryPath::new("lib.Reg")));
        block.links.insert(
            "vout".into(),
            LinkLike::LibElem(LibraryPath::new("lib.PowerLink")),
        );
        block.ports.insert(
            "gnd".into(),
            PortLike::LibElem(LibraryPath::new("lib.VoltageSink")),
        );
        let names: Vec<_> = LibraryElement::Block(block)
            .referenced_classes()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["lib.VoltageSink", "lib.Reg", "lib.PowerLink"]);
    }

    #[test]
    fn refinement_priority() {
        let mut refinements = Refinements::default();
        let class = LibraryPath::new("lib.R");
        refinements
            .classes
            .insert(class.clone(), LibraryPath::new("lib.R0603"));
        let path = DesignPath::of_blocks(&["r1"]);
        refinements
            .instances
            .insert(path.clone(), LibraryPath::new("lib.R0805"));
        assert_eq!(refinements.refine(&path, &class).unwrap().name, "lib.R0805");
        assert_eq!(
            refinements
                .refine(&DesignPath::of_blocks(&["r2"]), &class)
                .unwrap()
                .name,
            "lib.R0603"
        );
    }

    #[test]
    fn merge_replaces() {
        let path = DesignPath::of_blocks(&["r1"]).append_param("resistance");
        let mut a = Refinements::default();
        a.values.insert(path.clone(), ValueLit::Float(1.0));
        let mut b = Refinements::default();
        b.values
            .insert(path.clone(), ValueLit::Range(Range::exact(2.0)));
        a.merge(&b);
        assert_eq!(a.values[&path], ValueLit::Range(Range::exact(2.0)));
    }

    #[test]
    fn library_subclass() {
        let mut lib = Library::new();
        let mut block = HierarchyBlock::new(LibraryPath::new("lib.R0603"));
        block.superclasses.push(LibraryPath::new("lib.R"));
        lib.insert(LibraryPath::new("lib.R0603"), LibraryElement::Block(block));
        assert!(lib.is_subclass(&LibraryPath::new("lib.R0603"), &LibraryPath::new("lib.R")));
        assert!(!lib.is_subclass(&LibraryPath::new("lib.R"), &LibraryPath::new("lib.R0603")));
    }
}
