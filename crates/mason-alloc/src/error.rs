//! Allocator error taxonomy.

use crate::block::BlockId;

/// Failure modes shared by the allocator family.
///
/// Allocation failure is always an explicit value, never a panic: callers
/// are expected to handle `OutOfMemory` by growing the backing arena or
/// propagating a resource-creation failure upward. `InvalidBlock` and
/// `TableExhausted` replace what the original pointer-based designs left as
/// undefined behavior (stale handles, out-of-bounds table writes) with
/// checked errors at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    /// Zero-sized request or an alignment that is not a power of two.
    #[error("invalid request: size {size}, alignment {alignment}")]
    InvalidRequest { size: u64, alignment: u64 },

    /// No free block (or remaining arena space) can satisfy the request.
    #[error("out of memory: no free block of {requested} bytes")]
    OutOfMemory { requested: u64 },

    /// The fixed block table already holds `max_allocs` live allocations.
    #[error("block table exhausted: {max_allocs} allocations live")]
    TableExhausted { max_allocs: u32 },

    /// The handle does not name a live allocation (freed, recycled, or out
    /// of range). Covers double free.
    #[error("invalid block handle {0}")]
    InvalidBlock(BlockId),
}
