//! VoltaIR: the serialized design tree handed from elaboration to the solver
//! and to backends.
//!
//! A [`Design`] is a tree of [`HierarchyBlock`]s, [`Link`]s and ports whose
//! parameters are related by [`ValueExpr`] constraints. Elements refer to each
//! other through [`LocalPath`]s, which may contain reserved steps such as
//! `IS_CONNECTED` or the `ALLOCATE` wildcard, and are located absolutely through
//! [`DesignPath`]s. Every map in the tree preserves insertion order, so encoding
//! the same design twice yields identical bytes.

#![warn(missing_docs)]

pub mod design;
pub mod elem;
pub mod expr;
pub mod follow;
pub mod lit;
pub mod path;

pub use design::{instantiated_links, sub_blocks, Design, Library, LibraryElement, Refinements};
pub use elem::{
    BlockLike, Bundle, GeneratorInfo, HierarchyBlock, Link, LinkArray, LinkLike, Metadata, Port,
    PortArray, PortLike,
};
pub use expr::{BinaryOp, BinarySetOp, ReductionOp, UnaryOp, ValueExpr};
pub use follow::{follow_partial, EltRef, Followed};
pub use lit::{ParamType, ValueLit};
pub use path::{DesignPath, LibraryPath, LocalPath, LocalStep, ReservedParam};

/// Insertion-ordered map used for every named collection in the IR.
pub type OrderedMap<V> = linked_hash_map::LinkedHashMap<String, V>;
