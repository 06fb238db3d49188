//! Fixed-capacity block pool for the slab allocator

use super::slot::{Block, BlockId};
use crate::error::{Error, Result};

/// A pool manages a contiguous array of blocks of one allocator
///
/// Free blocks form an intrusive singly linked list threaded through the
/// blocks themselves. `free_head == capacity` means the pool is full.
#[derive(Debug)]
pub struct Pool<T> {
    /// Index of this pool inside the allocator
    pub index: u32,
    /// Block storage, allocated once at full capacity
    blocks: Vec<Block<T>>,
    /// First block of the free list
    free_head: usize,
    /// Number of occupied blocks
    live: usize,
}

impl<T> Pool<T> {
    /// Create a new pool and link all of its blocks into the free list
    ///
    /// Fails with `AllocationFailure` if the backing memory cannot be reserved.
    pub fn new(index: u32, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity);
        }

        let mut blocks = Vec::new();
        blocks.try_reserve_exact(capacity).map_err(|e| {
            Error::AllocationFailure(format!(
                "Failed to reserve pool {} with {} blocks: {}",
                index, capacity, e
            ))
        })?;
        blocks.extend((0..capacity).map(|slot| Block::free(slot + 1, 0)));

        Ok(Self {
            index,
            blocks,
            free_head: 0,
            live: 0,
        })
    }

    /// Pop the head of the free list and store `value` there
    ///
    /// Hands the value back if the pool is full.
    pub fn allocate(&mut self, value: T) -> std::result::Result<BlockId, T> {
        if self.is_full() {
            return Err(value);
        }

        let slot = self.free_head;
        let (next, generation) = match self.blocks[slot] {
            Block::Free { next, generation } => (next, generation),
            // The free list only ever links free blocks
            Block::Occupied { .. } => return Err(value),
        };

        let stamp = BlockId::new(self.index, slot as u32, generation);
        self.blocks[slot] = Block::Occupied { stamp, value };
        self.free_head = next;
        self.live += 1;

        Ok(stamp)
    }

    /// Push the block back onto the free list and return its value
    pub fn release(&mut self, id: BlockId) -> Option<T> {
        let slot = id.slot_index();
        let block = self.blocks.get_mut(slot)?;
        if block.value(id).is_none() {
            return None;
        }

        let freed = Block::free(self.free_head, id.generation.wrapping_add(1));
        match std::mem::replace(block, freed) {
            Block::Occupied { value, .. } => {
                self.free_head = slot;
                self.live -= 1;
                Some(value)
            }
            Block::Free { .. } => None,
        }
    }

    /// Get the value of an occupied block
    pub fn get(&self, id: BlockId) -> Option<&T> {
        self.blocks.get(id.slot_index())?.value(id)
    }

    /// Get the mutable value of an occupied block
    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut T> {
        self.blocks.get_mut(id.slot_index())?.value_mut(id)
    }

    /// Check if every block of the pool is occupied
    pub fn is_full(&self) -> bool {
        self.free_head == self.blocks.len()
    }

    /// Number of blocks in this pool
    pub fn capacity(&self) -> usize {
        self.blocks.len()
    }

    /// Get the number of free blocks
    pub fn free_count(&self) -> usize {
        self.blocks.len() - self.live
    }

    /// Get the number of occupied blocks
    pub fn live_count(&self) -> usize {
        self.live
    }
}
