//! Block, port, and link definitions and their elaboration into IR.
//!
//! Designs are written as Rust types implementing [`Block`] and [`Port`].
//! Elaborating a block class runs its lifecycle (`init`, `contents`, and for
//! generators `generate`) against a [`BlockBuilder`], infers the links, bridges,
//! and exports implied by its connections, and emits one
//! [`volta_ir::LibraryElement`] per class.
//!
//! # Usage
//!
//! ```ignore
//! let mut library = BlockLibrary::new();
//! library.register_block(PowerSupply);
//! let element = library.element(&LibraryPath::new("power.PowerSupply"))?;
//! ```

#![warn(missing_docs)]

pub mod arena;
mod binding;
pub mod block;
pub mod builder;
mod connect;
mod context;
pub mod elaborate;
mod emit;
pub mod error;
pub mod expr;
pub mod generator;
pub mod ids;
pub mod library;
pub mod port;

pub use block::{Block, BlockKind, BlockState, DynBlock, SubBlock};
pub use builder::{BlockBuilder, PortBuilder};
pub use elaborate::{elaborate_block, elaborate_port, ElabMode, Elaborated};
pub use error::{BuildError, BuildResult};
pub use expr::{Expr, ExprArg};
pub use generator::GeneratorValues;
pub use ids::{BlockId, NodeId, PortId};
pub use library::{BlockLibrary, LibrarySource};
pub use port::{Port, PortTemplate, Vector};
