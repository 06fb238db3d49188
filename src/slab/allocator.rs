//! Slab allocator implementation

use super::pool::Pool;
use super::slot::{Block, BlockId};
use crate::error::{Error, Result};
use serde::Serialize;
use std::mem;
use tracing::{debug, info, warn};

/// Slab allocator for fixed-size blocks
///
/// Manages an ordered list of pools of equal capacity. New pools are only
/// added when every existing pool is full, and pools are only released by
/// [`SlabAllocator::deinit`]. Blocks never move once handed out.
#[derive(Debug)]
pub struct SlabAllocator<T> {
    /// Pools in creation order
    pools: Vec<Pool<T>>,
    /// Blocks per pool, fixed between `init` and `deinit`
    pool_capacity: usize,
    /// Upper bound on the number of pools, if any
    max_pools: Option<usize>,
}

impl<T> Default for SlabAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SlabAllocator<T> {
    /// Create an allocator that still has to be initialized
    pub fn new() -> Self {
        Self {
            pools: Vec::new(),
            pool_capacity: 0,
            max_pools: None,
        }
    }

    /// Create and initialize an allocator in one step
    pub fn with_capacity(pool_capacity: usize, max_pools: Option<usize>) -> Result<Self> {
        let mut allocator = Self::new();
        allocator.max_pools = max_pools;
        allocator.init(pool_capacity)?;
        Ok(allocator)
    }

    /// Size in bytes of one block, rounded up to a machine word
    pub fn block_size() -> usize {
        let word = mem::size_of::<usize>();
        mem::size_of::<Block<T>>().div_ceil(word) * word
    }

    /// Initialize the allocator with its first pool
    ///
    /// # Arguments
    /// * `pool_capacity` - Number of blocks per pool (NOT bytes)
    pub fn init(&mut self, pool_capacity: usize) -> Result<()> {
        if !self.pools.is_empty() {
            return Err(Error::AlreadyInitialized);
        }
        if pool_capacity == 0 {
            return Err(Error::InvalidCapacity);
        }

        let pool = Pool::new(0, pool_capacity)?;
        self.pools.try_reserve(1).map_err(|e| {
            Error::AllocationFailure(format!("Failed to reserve pool table: {}", e))
        })?;
        self.pools.push(pool);
        self.pool_capacity = pool_capacity;

        info!(
            pool_capacity,
            block_size = Self::block_size(),
            "Initialized slab allocator"
        );
        Ok(())
    }

    /// Set an upper bound on the number of pools
    pub fn set_max_pools(&mut self, max_pools: Option<usize>) {
        self.max_pools = max_pools;
    }

    /// Allocate a block holding `value`
    ///
    /// Pools are scanned first-fit. If all of them are full a new pool is
    /// appended; when that fails the existing pools stay untouched.
    pub fn allocate(&mut self, value: T) -> Result<BlockId> {
        if self.pools.is_empty() {
            return Err(Error::NotInitialized);
        }

        let pool_idx = match self.pools.iter().position(|pool| !pool.is_full()) {
            Some(idx) => idx,
            None => self.grow()?,
        };

        let id = self.pools[pool_idx].allocate(value).map_err(|_| {
            Error::AllocationFailure(format!("Pool {} has no free block", pool_idx))
        })?;
        debug!(block = %id, "Allocated block");
        Ok(id)
    }

    /// Append a new pool and return its index
    fn grow(&mut self) -> Result<usize> {
        let index = self.pools.len();
        if let Some(max) = self.max_pools {
            if index >= max {
                warn!(pools = index, max, "Slab allocator reached its pool limit");
                return Err(Error::AllocationFailure(format!(
                    "Pool limit of {} reached",
                    max
                )));
            }
        }

        let pool = Pool::new(index as u32, self.pool_capacity)?;
        self.pools.try_reserve(1).map_err(|e| {
            Error::AllocationFailure(format!("Failed to grow pool table: {}", e))
        })?;
        self.pools.push(pool);

        info!(pool = index, capacity = self.pool_capacity, "Grew slab allocator");
        Ok(index)
    }

    /// Release a block and return the value it held
    pub fn release(&mut self, id: BlockId) -> Result<T> {
        if self.pools.is_empty() {
            return Err(Error::NotInitialized);
        }

        let value = self
            .pools
            .get_mut(id.pool_index())
            .and_then(|pool| pool.release(id))
            .ok_or(Error::InvalidBlock(id))?;

        debug!(block = %id, "Released block");
        Ok(value)
    }

    /// Release every pool and reset the allocator
    ///
    /// Values still stored in blocks are dropped together with their pool.
    /// `init` may be called again afterwards.
    pub fn deinit(&mut self) -> Result<()> {
        if self.pools.is_empty() {
            return Err(Error::NotInitialized);
        }

        let pools = self.pools.len();
        self.pools = Vec::new();
        self.pool_capacity = 0;

        info!(pools, "Deinitialized slab allocator");
        Ok(())
    }

    /// Get the value stored in a block
    pub fn get(&self, id: BlockId) -> Option<&T> {
        self.pools.get(id.pool_index())?.get(id)
    }

    /// Get the mutable value stored in a block
    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut T> {
        self.pools.get_mut(id.pool_index())?.get_mut(id)
    }

    /// Check if `id` refers to a live block
    pub fn contains(&self, id: BlockId) -> bool {
        self.get(id).is_some()
    }

    /// Whether `init` has been called since the last `deinit`
    pub fn is_initialized(&self) -> bool {
        !self.pools.is_empty()
    }

    /// Number of pools currently held
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Blocks per pool
    pub fn pool_capacity(&self) -> usize {
        self.pool_capacity
    }

    /// Number of occupied blocks across all pools
    pub fn live_count(&self) -> usize {
        self.pools.iter().map(Pool::live_count).sum()
    }

    /// Get statistics about the allocator
    pub fn stats(&self) -> SlabStats {
        let mut stats = SlabStats {
            block_size: Self::block_size(),
            pool_capacity: self.pool_capacity,
            ..SlabStats::default()
        };

        for pool in &self.pools {
            let pool_stats = PoolStats {
                index: pool.index as usize,
                capacity: pool.capacity(),
                free_blocks: pool.free_count(),
                live_blocks: pool.live_count(),
            };
            stats.pools.push(pool_stats);
            stats.live_blocks += pool_stats.live_blocks;
        }

        stats
    }
}

/// Statistics for the slab allocator
#[derive(Debug, Default, Clone, Serialize)]
pub struct SlabStats {
    pub block_size: usize,
    pub pool_capacity: usize,
    pub live_blocks: usize,
    pub pools: Vec<PoolStats>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PoolStats {
    pub index: usize,
    pub capacity: usize,
    pub free_blocks: usize,
    pub live_blocks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_basic() -> Result<()> {
        let mut allocator = SlabAllocator::with_capacity(4, None)?;

        let id = allocator.allocate(String::from("hello"))?;
        assert_eq!(id.pool, 0);
        assert_eq!(allocator.get(id).map(String::as_str), Some("hello"));

        let value = allocator.release(id)?;
        assert_eq!(value, "hello");
        assert!(!allocator.contains(id));
        Ok(())
    }

    #[test]
    fn test_allocator_lifecycle_errors() -> Result<()> {
        let mut allocator: SlabAllocator<u64> = SlabAllocator::new();

        assert!(matches!(allocator.allocate(1), Err(Error::NotInitialized)));
        assert!(matches!(
            allocator.release(BlockId::new(0, 0, 0)),
            Err(Error::NotInitialized)
        ));
        assert!(matches!(allocator.deinit(), Err(Error::NotInitialized)));
        assert!(matches!(allocator.init(0), Err(Error::InvalidCapacity)));

        allocator.init(8)?;
        assert!(matches!(allocator.init(8), Err(Error::AlreadyInitialized)));
        Ok(())
    }

    #[test]
    fn test_allocator_growth_keeps_handles() -> Result<()> {
        let mut allocator = SlabAllocator::with_capacity(3, None)?;

        let ids = (0..10u32)
            .map(|i| allocator.allocate(i))
            .collect::<Result<Vec<_>>>()?;

        assert_eq!(allocator.pool_count(), 4);
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(allocator.get(*id), Some(&(i as u32)));
        }
        Ok(())
    }

    #[test]
    fn test_allocator_first_fit() -> Result<()> {
        let mut allocator = SlabAllocator::with_capacity(2, None)?;

        let a = allocator.allocate('a')?;
        let _b = allocator.allocate('b')?;
        let _c = allocator.allocate('c')?; // lands in pool 1
        allocator.release(a)?;

        // The hole in pool 0 is filled before pool 1
        let d = allocator.allocate('d')?;
        assert_eq!(d.pool, 0);
        assert_eq!(d.slot, a.slot);
        Ok(())
    }

    #[test]
    fn test_allocator_pool_limit() -> Result<()> {
        let mut allocator = SlabAllocator::with_capacity(2, Some(1))?;

        let a = allocator.allocate(1u8)?;
        allocator.allocate(2u8)?;
        assert!(matches!(
            allocator.allocate(3u8),
            Err(Error::AllocationFailure(_))
        ));

        // Existing blocks stay valid
        assert_eq!(allocator.get(a), Some(&1));
        assert_eq!(allocator.pool_count(), 1);
        Ok(())
    }

    #[test]
    fn test_allocator_full_cycle() -> Result<()> {
        let mut allocator = SlabAllocator::with_capacity(4, None)?;

        let ids = (0..9)
            .map(|i| allocator.allocate(i))
            .collect::<Result<Vec<_>>>()?;
        for id in ids {
            allocator.release(id)?;
        }
        allocator.deinit()?;
        assert!(!allocator.is_initialized());

        allocator.init(4)?;
        let stats = allocator.stats();
        assert_eq!(stats.pools.len(), 1);
        assert_eq!(stats.live_blocks, 0);
        assert_eq!(stats.pools[0].free_blocks, 4);
        Ok(())
    }

    #[test]
    fn test_block_size_is_word_aligned() {
        let size = SlabAllocator::<[u8; 3]>::block_size();
        assert_eq!(size % mem::size_of::<usize>(), 0);
        assert!(size >= mem::size_of::<Block<[u8; 3]>>());
    }
}
