//! Library sources and the in-process block library.
//!
//! A [`LibrarySource`] answers the three questions the instantiation driver
//! asks: which classes a module holds, what one class's IR element is, and
//! what a generator produces for given inputs. [`BlockLibrary`] answers them
//! from registered Rust definitions, discovering referenced definitions as it
//! elaborates and caching every element it emits.

use crate::block::{Block, DynBlock};
use crate::elaborate::{elaborate_block, elaborate_port, ElabMode, Elaborated};
use crate::error::{BuildError, BuildResult};
use crate::generator::GeneratorValues;
use crate::port::Port;
use linked_hash_map::LinkedHashMap;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex as GraphIndex};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use volta_ir::{HierarchyBlock, Library, LibraryElement, LibraryPath, Refinements};

/// Where library elements come from.
pub trait LibrarySource {
    /// Classes defined in `module`, a dotted class-name prefix.
    fn index_module(&self, module: &str) -> BuildResult<Vec<LibraryPath>>;

    /// The IR element of one class.
    fn element(&self, path: &LibraryPath) -> BuildResult<LibraryElement>;

    /// A block class as the top of a design, with its default refinements.
    fn top(&self, path: &LibraryPath) -> BuildResult<(HierarchyBlock, Refinements)>;

    /// Runs a generator with solved values for its required inputs.
    fn generate(&self, path: &LibraryPath, values: &GeneratorValues)
        -> BuildResult<HierarchyBlock>;
}

/// A library of Rust block and port definitions.
///
/// The first definition seen for a class name is the one used; every class
/// is elaborated once.
#[derive(Default)]
pub struct BlockLibrary {
    blocks: RefCell<LinkedHashMap<String, Rc<dyn DynBlock>>>,
    ports: RefCell<LinkedHashMap<String, Rc<dyn Port>>>,
    cache: RefCell<HashMap<LibraryPath, LibraryElement>>,
}

impl BlockLibrary {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a block, link, bridge, or adapter definition.
    pub fn register_block<T: Block>(&mut self, def: T) {
        self.register_block_dyn(Rc::new(def));
    }

    /// Registers a type-erased block definition.
    pub fn register_block_dyn(&mut self, def: Rc<dyn DynBlock>) {
        let class = def.class_name();
        let blocks = self.blocks.get_mut();
        if blocks.contains_key(&class) {
            log::debug!("ignoring second definition of {class}");
        } else {
            blocks.insert(class, def);
        }
    }

    /// Registers a port or bundle definition.
    pub fn register_port<P: Port>(&mut self, def: P) {
        let class = def.class_name();
        let ports = self.ports.get_mut();
        if !ports.contains_key(&class) {
            ports.insert(class, Rc::new(def));
        }
    }

    /// Number of known classes, registered or discovered.
    pub fn len(&self) -> usize {
        self.blocks.borrow().len() + self.ports.borrow().len()
    }

    /// Whether no class is known.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn block_def(&self, path: &LibraryPath) -> Option<Rc<dyn DynBlock>> {
        self.blocks.borrow().get(&path.name).cloned()
    }

    fn absorb(&self, elaborated: &Elaborated) {
        let mut blocks = self.blocks.borrow_mut();
        for def in &elaborated.block_defs {
            let class = def.class_name();
            if !blocks.contains_key(&class) {
                blocks.insert(class, def.clone());
            }
        }
        let mut ports = self.ports.borrow_mut();
        for def in &elaborated.port_defs {
            let class = def.class_name();
            if !ports.contains_key(&class) {
                ports.insert(class, def.clone());
            }
        }
    }

    /// Every element reachable from `top`, in an order where each element
    /// precedes the elements it contains.
    ///
    /// Fails with [`BuildError::CyclicDefinition`] if a class contains itself.
    pub fn closure(&self, top: &LibraryPath) -> BuildResult<Library> {
        let mut graph: DiGraph<LibraryPath, ()> = DiGraph::new();
        let mut index: HashMap<LibraryPath, GraphIndex> = HashMap::new();
        let mut elements: HashMap<LibraryPath, LibraryElement> = HashMap::new();
        let mut queue = VecDeque::from([top.clone()]);
        index.insert(top.clone(), graph.add_node(top.clone()));
        while let Some(path) = queue.pop_front() {
            let element = self.element(&path)?;
            let from = index[&path];
            for class in element.referenced_classes() {
                let to = *index.entry(class.clone()).or_insert_with(|| {
                    queue.push_back(class.clone());
                    graph.add_node(class.clone())
                });
                graph.update_edge(from, to, ());
            }
            elements.insert(path, element);
        }
        let order = toposort(&graph, None)
            .map_err(|cycle| BuildError::CyclicDefinition(graph[cycle.node_id()].name.clone()))?;
        let mut library = Library::new();
        for node in order {
            let path = graph[node].clone();
            if let Some(element) = elements.remove(&path) {
                library.insert(path, element);
            }
        }
        Ok(library)
    }
}

impl LibrarySource for BlockLibrary {
    fn index_module(&self, module: &str) -> BuildResult<Vec<LibraryPath>> {
        let prefix = format!("{module}.");
        let blocks = self.blocks.borrow();
        let ports = self.ports.borrow();
        Ok(ports
            .keys()
            .chain(blocks.keys())
            .filter(|class| class.starts_with(&prefix))
            .map(LibraryPath::new)
            .collect())
    }

    fn element(&self, path: &LibraryPath) -> BuildResult<LibraryElement> {
        if let Some(element) = self.cache.borrow().get(path) {
            return Ok(element.clone());
        }
        let elaborated = if let Some(def) = self.block_def(path) {
            elaborate_block(def, ElabMode::Library)?
        } else {
            let def = self.ports.borrow().get(&path.name).cloned();
            match def {
                Some(def) => elaborate_port(def)?,
                None => return Err(BuildError::UnknownClass(path.name.clone())),
            }
        };
        self.absorb(&elaborated);
        self.cache
            .borrow_mut()
            .insert(path.clone(), elaborated.element.clone());
        Ok(elaborated.element)
    }

    fn top(&self, path: &LibraryPath) -> BuildResult<(HierarchyBlock, Refinements)> {
        let def = self
            .block_def(path)
            .ok_or_else(|| BuildError::UnknownClass(path.name.clone()))?;
        let refinements = def.refinements();
        let elaborated = elaborate_block(def, ElabMode::Top)?;
        self.absorb(&elaborated);
        match elaborated.element {
            LibraryElement::Block(block) => Ok((block, refinements)),
            _ => Err(BuildError::structural(
                path.name.clone(),
                "the top of a design must be a hierarchy block",
            )),
        }
    }

    fn generate(
        &self,
        path: &LibraryPath,
        values: &GeneratorValues,
    ) -> BuildResult<HierarchyBlock> {
        let def = self
            .block_def(path)
            .ok_or_else(|| BuildError::UnknownClass(path.name.clone()))?;
        log::debug!("running generator {path} with {} inputs", values.len());
        let elaborated = elaborate_block(def, ElabMode::Generate(values.clone()))?;
        self.absorb(&elaborated);
        match elaborated.element {
            LibraryElement::Block(block) => Ok(block),
            _ => Err(BuildError::structural(
                path.name.clone(),
                "generators must be hierarchy blocks",
            )),
        }
    }
}

/// A compiled library, as read from a library file.
///
/// Generators cannot run: their definitions are not part of the file.
impl LibrarySource for Library {
    fn index_module(&self, module: &str) -> BuildResult<Vec<LibraryPath>> {
        let prefix = format!("{module}.");
        Ok(self
            .elements
            .keys()
            .filter(|class| class.starts_with(&prefix))
            .map(LibraryPath::new)
            .collect())
    }

    fn element(&self, path: &LibraryPath) -> BuildResult<LibraryElement> {
        self.get(path)
            .cloned()
            .ok_or_else(|| BuildError::UnknownClass(path.name.clone()))
    }

    fn top(&self, path: &LibraryPath) -> BuildResult<(HierarchyBlock, Refinements)> {
        match self.element(path)? {
            LibraryElement::Block(block) => Ok((block, Refinements::default())),
            _ => Err(BuildError::structural(
                path.name.clone(),
                "the top of a design must be a hierarchy block",
            )),
        }
    }

    fn generate(
        &self,
        path: &LibraryPath,
        _values: &GeneratorValues,
    ) -> BuildResult<HierarchyBlock> {
        Err(BuildError::generator(
            path.name.clone(),
            "generators cannot run from a compiled library",
        ))
    }
}
