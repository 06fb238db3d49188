//! Block handles and block states for the slab allocator

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle to a block inside the slab allocator
///
/// The handle is stamped into the block when it is handed out, so releasing
/// a block never needs a reverse address lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId {
    /// Index of the owning pool
    pub pool: u32,
    /// Slot index inside the owning pool
    pub slot: u32,
    /// Reuse counter of the slot, bumped on every release
    pub generation: u32,
}

impl BlockId {
    /// Create a new block ID
    pub fn new(pool: u32, slot: u32, generation: u32) -> Self {
        Self {
            pool,
            slot,
            generation,
        }
    }

    /// Get the pool index for this block
    pub fn pool_index(&self) -> usize {
        self.pool as usize
    }

    /// Get the in-pool slot index for this block
    pub fn slot_index(&self) -> usize {
        self.slot as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.pool, self.slot, self.generation)
    }
}

/// One fixed-size unit of a pool
///
/// A free block carries the index of the next free block of the same pool,
/// which makes the pool's free list intrusive.
#[derive(Debug)]
pub enum Block<T> {
    Free {
        /// Next free slot; equal to the pool capacity at the end of the list
        next: usize,
        generation: u32,
    },
    Occupied {
        stamp: BlockId,
        value: T,
    },
}

impl<T> Block<T> {
    /// Create a free block pointing at `next`
    pub fn free(next: usize, generation: u32) -> Self {
        Block::Free { next, generation }
    }

    /// Whether this block currently holds a value
    pub fn is_occupied(&self) -> bool {
        matches!(self, Block::Occupied { .. })
    }

    /// Value stored in the block, if the stamp matches `id`
    pub fn value(&self, id: BlockId) -> Option<&T> {
        match self {
            Block::Occupied { stamp, value } if *stamp == id => Some(value),
            _ => None,
        }
    }

    /// Mutable value stored in the block, if the stamp matches `id`
    pub fn value_mut(&mut self, id: BlockId) -> Option<&mut T> {
        match self {
            Block::Occupied { stamp, value } if *stamp == id => Some(value),
            _ => None,
        }
    }
}
