//! Design elements: ports, blocks, and links.

use crate::expr::ValueExpr;
use crate::lit::ParamType;
use crate::path::{LibraryPath, LocalPath};
use crate::OrderedMap;
use serde::{Deserialize, Serialize};

/// Documentation and bookkeeping attached to an element.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Doc string of the defining class.
    pub doc: Option<String>,
    /// The class this element had before a refinement replaced it.
    pub refinement_original: Option<LibraryPath>,
    /// Errors recorded against this element, keyed by the stage that found them.
    pub errors: OrderedMap<String>,
}

/// A single port with its parameters.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Port {
    /// Port class.
    pub self_class: LibraryPath,
    /// Declared parameters.
    pub params: OrderedMap<ParamType>,
}

/// A fixed, named group of ports sharing one link type.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Bundle {
    /// Bundle class.
    pub self_class: LibraryPath,
    /// Declared parameters.
    pub params: OrderedMap<ParamType>,
    /// Member ports.
    pub ports: OrderedMap<PortLike>,
}

/// A vector of ports of one element class.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct PortArray {
    /// Class of each element.
    pub self_class: LibraryPath,
    /// Elements, once known. `None` while the vector is still sized by its connections.
    pub ports: Option<OrderedMap<PortLike>>,
}

/// Any port-shaped element.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum PortLike {
    /// A reference to a library port class, not yet instantiated.
    LibElem(LibraryPath),
    /// A single port.
    Port(Port),
    /// A bundle.
    Bundle(Bundle),
    /// A vector.
    Array(PortArray),
}

impl PortLike {
    /// The class of this port (the element class for vectors).
    pub fn self_class(&self) -> &LibraryPath {
        match self {
            PortLike::LibElem(class) => class,
            PortLike::Port(port) => &port.self_class,
            PortLike::Bundle(bundle) => &bundle.self_class,
            PortLike::Array(array) => &array.self_class,
        }
    }

    /// Whether this is a vector.
    pub fn is_array(&self) -> bool {
        matches!(self, PortLike::Array(_))
    }

    /// The declared parameters of a single port or bundle.
    pub fn params(&self) -> Option<&OrderedMap<ParamType>> {
        match self {
            PortLike::Port(port) => Some(&port.params),
            PortLike::Bundle(bundle) => Some(&bundle.params),
            _ => None,
        }
    }
}

/// Generator bookkeeping on a block whose contents depend on solved values.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct GeneratorInfo {
    /// Paths, relative to the block, whose values the generator needs.
    pub required: Vec<LocalPath>,
    /// Whether the generator has run (or was given up on).
    pub done: bool,
}

/// A block with ports, parameters, and internal structure.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct HierarchyBlock {
    /// Block class.
    pub self_class: LibraryPath,
    /// Classes this block derives from, nearest first.
    pub superclasses: Vec<LibraryPath>,
    /// Declared parameters.
    pub params: OrderedMap<ParamType>,
    /// Boundary ports.
    pub ports: OrderedMap<PortLike>,
    /// Sub-blocks.
    pub blocks: OrderedMap<BlockLike>,
    /// Internal links.
    pub links: OrderedMap<LinkLike>,
    /// Named constraints and connections.
    pub constraints: OrderedMap<ValueExpr>,
    /// Present when this block is a generator.
    pub generator: Option<GeneratorInfo>,
    /// Metadata.
    pub meta: Metadata,
}

impl HierarchyBlock {
    /// An empty block of the given class.
    pub fn new(self_class: LibraryPath) -> Self {
        Self {
            self_class,
            superclasses: Vec::new(),
            params: OrderedMap::new(),
            ports: OrderedMap::new(),
            blocks: OrderedMap::new(),
            links: OrderedMap::new(),
            constraints: OrderedMap::new(),
            generator: None,
            meta: Metadata::default(),
        }
    }

    /// Whether this is a generator that has not run yet.
    pub fn generator_pending(&self) -> bool {
        matches!(&self.generator, Some(info) if !info.done)
    }
}

/// A block slot: either a library reference or an instantiated block.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum BlockLike {
    /// A reference to a library block class.
    LibElem(LibraryPath),
    /// An instantiated block.
    Block(Box<HierarchyBlock>),
}

impl BlockLike {
    /// The instantiated block, if any.
    pub fn as_block(&self) -> Option<&HierarchyBlock> {
        match self {
            BlockLike::Block(block) => Some(block),
            BlockLike::LibElem(_) => None,
        }
    }

    /// The instantiated block, mutably, if any.
    pub fn as_block_mut(&mut self) -> Option<&mut HierarchyBlock> {
        match self {
            BlockLike::Block(block) => Some(block),
            BlockLike::LibElem(_) => None,
        }
    }
}

/// A link mediating one net.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Link {
    /// Link class.
    pub self_class: LibraryPath,
    /// Classes this link derives from.
    pub superclasses: Vec<LibraryPath>,
    /// Declared parameters.
    pub params: OrderedMap<ParamType>,
    /// Ports that can be joined through this link.
    pub ports: OrderedMap<PortLike>,
    /// Inner links joining members of bundle ports.
    pub links: OrderedMap<LinkLike>,
    /// Named constraints and exports.
    pub constraints: OrderedMap<ValueExpr>,
    /// Metadata.
    pub meta: Metadata,
}

impl Link {
    /// An empty link of the given class.
    pub fn new(self_class: LibraryPath) -> Self {
        Self {
            self_class,
            superclasses: Vec::new(),
            params: OrderedMap::new(),
            ports: OrderedMap::new(),
            links: OrderedMap::new(),
            constraints: OrderedMap::new(),
            meta: Metadata::default(),
        }
    }
}

/// A vector of links, one per element of the joined vector ports.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct LinkArray {
    /// Class of each element link.
    pub self_class: LibraryPath,
    /// Element links, filled in by instantiation.
    pub links: OrderedMap<Link>,
}

/// A link slot.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum LinkLike {
    /// A reference to a library link class.
    LibElem(LibraryPath),
    /// An instantiated link.
    Link(Box<Link>),
    /// A link array.
    Array(LinkArray),
}

impl LinkLike {
    /// The class of this link (the element class for arrays).
    pub fn self_class(&self) -> &LibraryPath {
        match self {
            LinkLike::LibElem(class) => class,
            LinkLike::Link(link) => &link.self_class,
            LinkLike::Array(array) => &array.self_class,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_pending() {
        let mut block = HierarchyBlock::new(LibraryPath::new("lib.Gen"));
        assert!(!block.generator_pending());
        block.generator = Some(GeneratorInfo {
            required: vec![LocalPath::names(&["n"])],
            done: false,
        });
        assert!(block.generator_pending());
        block.generator.as_mut().unwrap().done = true;
        assert!(!block.generator_pending());
    }

    #[test]
    fn port_like_class() {
        let array = PortLike::Array(PortArray {
            self_class: LibraryPath::new("lib.Sink"),
            ports: None,
        });
        assert!(array.is_array());
        assert_eq!(array.self_class().name, "lib.Sink");
        assert!(array.params().is_none());
    }
}
