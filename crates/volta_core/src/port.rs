//! Port type definitions.

use crate::block::DynBlock;
use crate::builder::PortBuilder;
use crate::error::BuildResult;
use std::rc::Rc;

/// A port type.
///
/// `declare` adds the port's parameters, or, for a bundle, its member ports.
/// The link type names the link this port can join; the bridge type carries a
/// boundary port onto such a link from inside its block; adapters convert the
/// port to other port types on demand.
pub trait Port: 'static {
    /// Fully qualified class name, e.g. `power.VoltageSink`.
    fn class_name(&self) -> String;

    /// Declares parameters and bundle members.
    fn declare(&self, _p: &mut PortBuilder<'_>) -> BuildResult<()> {
        Ok(())
    }

    /// The link this port joins.
    fn link_type(&self) -> Option<Rc<dyn DynBlock>> {
        None
    }

    /// The bridge used when this port sits on a block boundary.
    fn bridge_type(&self) -> Option<Rc<dyn DynBlock>> {
        None
    }

    /// Adapters from this port, keyed by the class of their `dst` port.
    fn adapter_types(&self) -> Vec<(String, Rc<dyn DynBlock>)> {
        Vec::new()
    }
}

/// How a port is declared: singly, or as a dynamically sized vector.
#[derive(Clone)]
pub enum PortTemplate {
    /// A single port or bundle.
    Single(Rc<dyn Port>),
    /// A vector of ports of one type.
    Vector(Rc<dyn Port>),
}

impl PortTemplate {
    /// The port type (the element type for vectors).
    pub fn port(&self) -> &Rc<dyn Port> {
        match self {
            PortTemplate::Single(port) | PortTemplate::Vector(port) => port,
        }
    }

    /// Whether this is a vector.
    pub fn is_vector(&self) -> bool {
        matches!(self, PortTemplate::Vector(_))
    }
}

impl<P: Port> From<P> for PortTemplate {
    fn from(port: P) -> Self {
        PortTemplate::Single(Rc::new(port))
    }
}

/// Declares a vector of ports.
pub struct Vector;

impl Vector {
    /// A vector whose elements are `elt`.
    pub fn of<P: Port>(elt: P) -> PortTemplate {
        PortTemplate::Vector(Rc::new(elt))
    }
}
