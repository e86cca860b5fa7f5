//! Opaque handles for builder entities.
//!
//! Port and block IDs only ever index the arena that created them. Expression
//! handles additionally carry the generation of their arena, because block
//! constructor arguments can smuggle them from one elaboration into another.

use crate::arena::ArenaId;
use std::sync::atomic::{AtomicU32, Ordering};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        pub struct $name(u32);

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_id!(
    /// Handle to a port, bundle member, or vector element.
    PortId
);

define_id!(
    /// Handle to a block, link, bridge, or adapter instance.
    BlockId
);

define_id!(
    /// Raw slot of an expression node within its arena.
    NodeIndex
);

/// Handle to an expression node: a parameter, literal, or operator result.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId {
    pub(crate) generation: u32,
    pub(crate) index: NodeIndex,
}

static NEXT_GENERATION: AtomicU32 = AtomicU32::new(1);

/// Returns a generation number no other arena in this process has used.
pub(crate) fn fresh_generation() -> u32 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}
