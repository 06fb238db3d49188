//! Slab Allocator
//!
//! Fixed-size block pools with intrusive free lists. Node storage for the
//! tree lives here.
//!
//! # Architecture
//!
//! ```text
//! SlabAllocator<T>
//!   ├─→ Pool 0 (capacity N) → free: 3 → 7 → N
//!   ├─→ Pool 1 (capacity N) → free: 0 → 1 → ... → N
//!   └─→ Pool k               (appended when 0..k are full)
//!
//! Block<T>
//!   ├─→ Free { next, generation }
//!   └─→ Occupied { stamp: BlockId(pool, slot, generation), value }
//! ```
//!
//! Pools are never reallocated, so a `BlockId` stays valid until the block
//! is released or the allocator is deinitialized.

pub mod allocator;
pub mod pool;
pub mod slot;

pub use allocator::{PoolStats, SlabAllocator, SlabStats};
pub use pool::Pool;
pub use slot::{Block, BlockId};
