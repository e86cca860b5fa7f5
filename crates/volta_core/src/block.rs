//! The block definition traits and the block lifecycle.

use crate::builder::BlockBuilder;
use crate::error::{BuildError, BuildResult};
use crate::ids::BlockId;
use std::any::Any;
use std::fmt;
use volta_ir::Refinements;

/// What role a block definition plays.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BlockKind {
    /// An ordinary block with ports, parameters, and sub-blocks.
    Hierarchy,
    /// A link mediating one net.
    Link,
    /// A block that carries a boundary port onto a link inside its parent.
    ///
    /// Must declare ports `outer_port` and `inner_link`.
    Bridge,
    /// A block converting one port type into another.
    ///
    /// Must declare ports `src` and `dst`.
    Adapter,
}

/// Lifecycle phase of a block under construction.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum BlockState {
    /// Created, `init` not yet entered.
    PreInit,
    /// Running `init`: ports, parameters, and sub-blocks may be declared.
    Init,
    /// `init` finished.
    PostInit,
    /// Running `contents`: sub-blocks and connections may be declared.
    Contents,
    /// `contents` finished.
    PostContents,
    /// Running `generate` with solved values available.
    Generate,
    /// `generate` finished.
    PostGenerate,
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockState::PreInit => "pre-init",
            BlockState::Init => "init",
            BlockState::PostInit => "post-init",
            BlockState::Contents => "contents",
            BlockState::PostContents => "post-contents",
            BlockState::Generate => "generate",
            BlockState::PostGenerate => "post-generate",
        };
        write!(f, "{name}")
    }
}

/// A block definition.
///
/// `init` declares the interface and returns a struct of handles (`Io`) that the
/// parent and the later phases use to refer to it. `contents` builds the
/// internal structure. Generators additionally declare required inputs with
/// [`BlockBuilder::generator`] and build the parts that depend on them in
/// `generate`.
///
/// Constructor arguments reach the design only through
/// [`BlockBuilder::lift_to_parameter`]; the library element of a class is the
/// same for every instance.
pub trait Block: 'static {
    /// Handles returned by `init`.
    type Io: 'static;

    /// Fully qualified class name, e.g. `parts.Resistor`.
    fn class_name(&self) -> String;

    /// Role of this definition.
    fn kind(&self) -> BlockKind {
        BlockKind::Hierarchy
    }

    /// Classes this one can stand in for.
    fn superclasses(&self) -> Vec<String> {
        Vec::new()
    }

    /// Documentation recorded in the element metadata.
    fn description(&self) -> Option<String> {
        None
    }

    /// Default refinements when this block is the top of a design.
    fn refinements(&self) -> Refinements {
        Refinements::default()
    }

    /// Declares ports, parameters, and interface sub-blocks.
    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<Self::Io>;

    /// Declares internal structure.
    fn contents(&self, _io: &Self::Io, _b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        Ok(())
    }

    /// Builds structure that depends on solved values.
    fn generate(&self, _io: &Self::Io, _b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        Ok(())
    }
}

/// Object-safe view of a [`Block`], used wherever definitions are stored.
pub trait DynBlock {
    /// See [`Block::class_name`].
    fn class_name(&self) -> String;
    /// See [`Block::kind`].
    fn kind(&self) -> BlockKind;
    /// See [`Block::superclasses`].
    fn superclasses(&self) -> Vec<String>;
    /// See [`Block::description`].
    fn description(&self) -> Option<String>;
    /// See [`Block::refinements`].
    fn refinements(&self) -> Refinements;
    /// Runs `init`, boxing the handles.
    fn init_dyn(&self, b: &mut BlockBuilder<'_>) -> BuildResult<Box<dyn Any>>;
    /// Runs `contents` with handles from [`init_dyn`](Self::init_dyn).
    fn contents_dyn(&self, io: &dyn Any, b: &mut BlockBuilder<'_>) -> BuildResult<()>;
    /// Runs `generate` with handles from [`init_dyn`](Self::init_dyn).
    fn generate_dyn(&self, io: &dyn Any, b: &mut BlockBuilder<'_>) -> BuildResult<()>;
}

impl<T: Block> DynBlock for T {
    fn class_name(&self) -> String {
        Block::class_name(self)
    }

    fn kind(&self) -> BlockKind {
        Block::kind(self)
    }

    fn superclasses(&self) -> Vec<String> {
        Block::superclasses(self)
    }

    fn description(&self) -> Option<String> {
        Block::description(self)
    }

    fn refinements(&self) -> Refinements {
        Block::refinements(self)
    }

    fn init_dyn(&self, b: &mut BlockBuilder<'_>) -> BuildResult<Box<dyn Any>> {
        Ok(Box::new(self.init(b)?))
    }

    fn contents_dyn(&self, io: &dyn Any, b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        let io = downcast_io::<T>(self, io)?;
        self.contents(io, b)
    }

    fn generate_dyn(&self, io: &dyn Any, b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        let io = downcast_io::<T>(self, io)?;
        self.generate(io, b)
    }
}

fn downcast_io<'a, T: Block>(def: &T, io: &'a dyn Any) -> BuildResult<&'a T::Io> {
    io.downcast_ref::<T::Io>().ok_or_else(|| {
        BuildError::structural(Block::class_name(def), "handles do not belong to this block")
    })
}

/// A declared sub-block and the handles its `init` returned.
#[derive(Debug, Clone)]
pub struct SubBlock<Io> {
    /// The sub-block instance.
    pub id: BlockId,
    /// Handles to its ports and parameters.
    pub io: Io,
}
