//! Block records and the dense table that owns them.
//!
//! Blocks are identified by [`BlockId`] handles — dense indices into a
//! contiguous table — never by pointers. The table owns every record for the
//! allocator's lifetime and recycles slots through a LIFO free-ID stack, so
//! handles stay stable across any internal reshuffling and the metadata is
//! trivially relocatable.

use std::fmt;

/// Opaque handle to a block record in a [`BlockTable`].
///
/// The all-ones value is reserved as [`BlockId::INVALID`] ("no block") and
/// terminates both the physical and the logical linked lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    /// Sentinel for "no block".
    pub const INVALID: BlockId = BlockId(u32::MAX);

    /// Whether this handle is the [`INVALID`](Self::INVALID) sentinel.
    #[inline]
    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            write!(f, "#invalid")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Metadata for one contiguous byte range within an arena.
///
/// A block's size is not stored; it is derived from the physical chain
/// (`next_physical.offset - offset`, or `capacity - offset` for the tail
/// block). The physical links order blocks by offset and exist for
/// coalescing; the logical links thread a block into its free-list bucket
/// and are only meaningful while `is_free` is set.
#[derive(Debug, Clone, Copy)]
pub struct MemoryBlock {
    pub(crate) offset: u64,
    pub(crate) is_free: bool,
    pub(crate) prev_physical: BlockId,
    pub(crate) next_physical: BlockId,
    pub(crate) prev_logical: BlockId,
    pub(crate) next_logical: BlockId,
}

impl MemoryBlock {
    pub(crate) fn vacant() -> Self {
        Self {
            offset: 0,
            is_free: false,
            prev_physical: BlockId::INVALID,
            next_physical: BlockId::INVALID,
            prev_logical: BlockId::INVALID,
            next_logical: BlockId::INVALID,
        }
    }

    /// Start offset within the arena.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether the block is currently on a free list.
    #[inline]
    pub fn is_free(&self) -> bool {
        self.is_free
    }
}

/// Fixed-capacity table of block records with a free-ID stack.
///
/// Capacity is fixed at construction; [`acquire`](Self::acquire) hands out
/// recycled slots in LIFO order and returns `None` only when every slot is
/// in use. Records are never destroyed, only recycled.
#[derive(Debug)]
pub struct BlockTable {
    blocks: Vec<MemoryBlock>,
    free_ids: Vec<BlockId>,
}

impl BlockTable {
    /// Creates a table with `capacity` slots, all initially vacant.
    pub fn new(capacity: u32) -> Self {
        assert!(capacity < u32::MAX, "capacity collides with the INVALID sentinel");
        let blocks = vec![MemoryBlock::vacant(); capacity as usize];
        // LIFO stack: pop order is 0, 1, 2, ... for a fresh table.
        let free_ids = (0..capacity).rev().map(BlockId).collect();
        Self { blocks, free_ids }
    }

    /// Takes a vacant slot out of the free-ID stack.
    pub fn acquire(&mut self) -> Option<BlockId> {
        let id = self.free_ids.pop()?;
        self.blocks[id.index()] = MemoryBlock::vacant();
        Some(id)
    }

    /// Returns a slot to the free-ID stack.
    ///
    /// The caller must have unlinked the record from both chains first.
    pub fn release(&mut self, id: BlockId) {
        debug_assert!(!id.is_invalid());
        debug_assert!(self.free_ids.len() < self.blocks.len());
        self.blocks[id.index()] = MemoryBlock::vacant();
        self.free_ids.push(id);
    }

    /// Whether `id` names a slot in this table (live or vacant).
    #[inline]
    pub fn in_range(&self, id: BlockId) -> bool {
        id.index() < self.blocks.len()
    }

    #[inline]
    pub fn get(&self, id: BlockId) -> &MemoryBlock {
        &self.blocks[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: BlockId) -> &mut MemoryBlock {
        &mut self.blocks[id.index()]
    }

    /// Total slot count.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.blocks.len()
    }

    /// Slots currently available for [`acquire`](Self::acquire).
    #[inline]
    pub fn vacant_slots(&self) -> usize {
        self.free_ids.len()
    }
}
