//! Walking local paths through the element tree.

use crate::elem::{BlockLike, Bundle, HierarchyBlock, Link, LinkArray, LinkLike, Port, PortArray, PortLike};
use crate::lit::ParamType;
use crate::path::{DesignPath, LibraryPath, LocalStep};
use crate::OrderedMap;

/// A borrowed reference to any element of the tree.
#[derive(Clone, Copy, Debug)]
pub enum EltRef<'a> {
    /// A block.
    Block(&'a HierarchyBlock),
    /// A link.
    Link(&'a Link),
    /// A link array.
    LinkArray(&'a LinkArray),
    /// A single port.
    Port(&'a Port),
    /// A bundle.
    Bundle(&'a Bundle),
    /// A port vector.
    PortArray(&'a PortArray),
    /// A parameter.
    Param(&'a ParamType),
    /// An uninstantiated library reference.
    LibElem(&'a LibraryPath),
}

impl<'a> EltRef<'a> {
    /// Wraps a port slot.
    pub fn from_port(port: &'a PortLike) -> Self {
        match port {
            PortLike::LibElem(class) => EltRef::LibElem(class),
            PortLike::Port(port) => EltRef::Port(port),
            PortLike::Bundle(bundle) => EltRef::Bundle(bundle),
            PortLike::Array(array) => EltRef::PortArray(array),
        }
    }

    /// Wraps a link slot.
    pub fn from_link(link: &'a LinkLike) -> Self {
        match link {
            LinkLike::LibElem(class) => EltRef::LibElem(class),
            LinkLike::Link(link) => EltRef::Link(link),
            LinkLike::Array(array) => EltRef::LinkArray(array),
        }
    }

    /// Wraps a block slot.
    pub fn from_block(block: &'a BlockLike) -> Self {
        match block {
            BlockLike::LibElem(class) => EltRef::LibElem(class),
            BlockLike::Block(block) => EltRef::Block(block),
        }
    }

    /// Declared parameters, for elements that have them.
    pub fn params(&self) -> Option<&'a OrderedMap<ParamType>> {
        match *self {
            EltRef::Block(b) => Some(&b.params),
            EltRef::Link(l) => Some(&l.params),
            EltRef::Port(p) => Some(&p.params),
            EltRef::Bundle(b) => Some(&b.params),
            _ => None,
        }
    }

    /// Member ports, for elements that have them.
    pub fn ports(&self) -> Option<&'a OrderedMap<PortLike>> {
        match *self {
            EltRef::Block(b) => Some(&b.ports),
            EltRef::Link(l) => Some(&l.ports),
            EltRef::Bundle(b) => Some(&b.ports),
            EltRef::PortArray(a) => a.ports.as_ref(),
            _ => None,
        }
    }

    fn step(&self, path: &DesignPath, name: &str) -> Option<(DesignPath, EltRef<'a>)> {
        match *self {
            EltRef::Block(block) => {
                if let Some(port) = block.ports.get(name) {
                    Some((path.append_port(name), EltRef::from_port(port)))
                } else if let Some(sub) = block.blocks.get(name) {
                    Some((path.append_block(name), EltRef::from_block(sub)))
                } else if let Some(link) = block.links.get(name) {
                    Some((path.append_link(name), EltRef::from_link(link)))
                } else {
                    block
                        .params
                        .get(name)
                        .map(|ty| (path.append_param(name), EltRef::Param(ty)))
                }
            }
            EltRef::Link(link) => {
                if let Some(port) = link.ports.get(name) {
                    Some((path.append_port(name), EltRef::from_port(port)))
                } else if let Some(inner) = link.links.get(name) {
                    Some((path.append_link(name), EltRef::from_link(inner)))
                } else {
                    link.params
                        .get(name)
                        .map(|ty| (path.append_param(name), EltRef::Param(ty)))
                }
            }
            EltRef::LinkArray(array) => array
                .links
                .get(name)
                .map(|link| (path.append_link(name), EltRef::Link(link))),
            EltRef::Port(port) => port
                .params
                .get(name)
                .map(|ty| (path.append_param(name), EltRef::Param(ty))),
            EltRef::Bundle(bundle) => {
                if let Some(port) = bundle.ports.get(name) {
                    Some((path.append_port(name), EltRef::from_port(port)))
                } else {
                    bundle
                        .params
                        .get(name)
                        .map(|ty| (path.append_param(name), EltRef::Param(ty)))
                }
            }
            EltRef::PortArray(array) => array
                .ports
                .as_ref()
                .and_then(|ports| ports.get(name))
                .map(|port| (path.append_port(name), EltRef::from_port(port))),
            EltRef::Param(_) | EltRef::LibElem(_) => None,
        }
    }
}

/// The result of following a path as far as the tree allows.
#[derive(Debug)]
pub struct Followed<'a, 's> {
    /// Absolute path of the element reached.
    pub path: DesignPath,
    /// The element reached.
    pub elt: EltRef<'a>,
    /// Steps that could not be followed: reserved steps, allocations, or unknown names.
    pub remaining: &'s [LocalStep],
}

/// Follows named steps from `elt` (located at `path`) until a step cannot be taken.
pub fn follow_partial<'a, 's>(
    path: DesignPath,
    elt: EltRef<'a>,
    steps: &'s [LocalStep],
) -> Followed<'a, 's> {
    let mut path = path;
    let mut elt = elt;
    for (i, step) in steps.iter().enumerate() {
        let next = match step {
            LocalStep::Name(name) => elt.step(&path, name),
            LocalStep::Reserved(_) | LocalStep::Allocate(_) => None,
        };
        match next {
            Some((next_path, next_elt)) => {
                path = next_path;
                elt = next_elt;
            }
            None => {
                return Followed {
                    path,
                    elt,
                    remaining: &steps[i..],
                }
            }
        }
    }
    Followed {
        path,
        elt,
        remaining: &[],
    }
}
