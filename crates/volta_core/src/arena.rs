//! Append-only storage for the nodes, ports, and blocks of one elaboration.
//!
//! Entities are never removed: a disconnected port or a replaced initializer
//! stays in place, so every handle handed to block code stays valid until the
//! [`BuildContext`](crate::context::BuildContext) is dropped.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// A typed handle into an [`Arena`].
pub trait ArenaId: Copy {
    /// The handle for slot `index`.
    fn from_raw(index: u32) -> Self;

    /// The slot this handle names.
    fn as_raw(self) -> u32;
}

/// Entities of one kind, indexed by their handle type.
#[derive(Debug, Clone)]
pub struct Arena<I: ArenaId, T> {
    items: Vec<T>,
    _id: PhantomData<I>,
}

impl<I: ArenaId, T> Arena<I, T> {
    /// An empty arena.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _id: PhantomData,
        }
    }

    /// Stores `item` and returns its handle.
    pub fn alloc(&mut self, item: T) -> I {
        let id = I::from_raw(self.items.len() as u32);
        self.items.push(item);
        id
    }

    /// Whether `id` names a slot of this arena.
    pub fn contains(&self, id: I) -> bool {
        (id.as_raw() as usize) < self.items.len()
    }

    /// Number of stored entities.
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        &self.items[id.as_raw() as usize]
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        &mut self.items[id.as_raw() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{BlockId, PortId};

    #[test]
    fn handles_stay_valid_as_the_arena_grows() {
        let mut blocks: Arena<BlockId, &str> = Arena::new();
        let top = blocks.alloc("top");
        let sub = blocks.alloc("sub");
        blocks[sub] = "renamed";
        assert_eq!(blocks[top], "top");
        assert_eq!(blocks[sub], "renamed");
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn foreign_handles_are_not_contained() {
        let mut big: Arena<PortId, u8> = Arena::new();
        big.alloc(1);
        let second = big.alloc(2);
        let small: Arena<PortId, u8> = Arena::new();
        assert!(big.contains(second));
        assert!(!small.contains(second));
    }
}
