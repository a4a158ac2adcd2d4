//! Two-level segregated-fit (TLSF) allocator core.
//!
//! Manages a single contiguous arena `[0, capacity)` as pure metadata:
//! allocation returns a [`BlockId`] whose offset the caller translates to a
//! real address (`arena_base + offset`). Allocate and free are O(1).
//!
//! ## Structure
//!
//! Free blocks are segregated into buckets addressed by a two-level
//! coordinate `(first_index, second_index)`: the first index is the
//! power-of-two size class (log2 of the size, above a small linear class),
//! the second subdivides that class into [`SL_COUNT`] linear ranges. Two
//! occupancy bitmaps — one `u32` over first-level rows, one `u32` per row —
//! let `allocate` find the smallest suitable non-empty bucket with two
//! bit-scans instead of a list walk.
//!
//! Every block also sits in a doubly-linked *physical* chain ordered by
//! offset. Block sizes are derived from that chain rather than stored, and
//! freeing coalesces exhaustively with both physical neighbors, so no two
//! adjacent free blocks ever coexist once `free` returns.
//!
//! ## Caller contract
//!
//! Handles are validated: freeing an out-of-range, already-free, or
//! recycled-and-vacant handle reports [`AllocError::InvalidBlock`] instead
//! of corrupting state. A stale handle whose slot has since been recycled
//! into a *new live* allocation is indistinguishable from a valid handle
//! (ids carry no generation counter); callers must not hold ids across
//! `free`.

use serde::{Deserialize, Serialize};

use crate::align_up;
use crate::bits::{find_lsb_set32, find_msb_set64};
use crate::block::{BlockId, BlockTable};
use crate::error::AllocError;

/// log2 of the number of second-level buckets per first-level row.
const SL_INDEX_COUNT_LOG2: u32 = 5;
/// Second-level buckets per first-level row.
const SL_COUNT: u32 = 1 << SL_INDEX_COUNT_LOG2;
/// log2 of the allocation granularity.
const ALIGN_SIZE_LOG2: u32 = 3;
/// Allocation granularity in bytes; every block size is a multiple of this.
const ALIGN_SIZE: u64 = 1 << ALIGN_SIZE_LOG2;
/// First-level index of the smallest power-of-two class.
const FL_INDEX_SHIFT: u32 = SL_INDEX_COUNT_LOG2 + ALIGN_SIZE_LOG2;
/// Sizes below this fall into the linearly-subdivided class at row 0.
const MIN_BLOCK_SIZE: u64 = 1 << FL_INDEX_SHIFT;
/// First-level rows (row 0 is the linear class).
const FL_COUNT: usize = 32;

/// Largest supported arena capacity.
///
/// Row `FL_COUNT - 1` covers sizes up to `2^(FL_INDEX_SHIFT + FL_COUNT - 1)`
/// exclusive; construction rejects anything larger rather than misindexing.
pub const MAX_CAPACITY: u64 = (1 << (FL_INDEX_SHIFT + FL_COUNT as u32 - 1)) - ALIGN_SIZE;

/// Operation counters and occupancy snapshot, for diagnostics and harness
/// reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsfStats {
    pub capacity: u64,
    pub live_allocations: u32,
    pub free_blocks: u32,
    pub free_bytes: u64,
    pub largest_free_block: u64,
    pub allocs: u64,
    pub frees: u64,
    pub splits: u64,
    pub merges: u64,
    pub failed_allocs: u64,
}

/// One entry of the physical chain, as reported by
/// [`TlsfAllocator::physical_blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalBlock {
    pub offset: u64,
    pub size: u64,
    pub is_free: bool,
}

#[derive(Debug, Default, Clone)]
struct OpCounters {
    allocs: u64,
    frees: u64,
    splits: u64,
    merges: u64,
    failed_allocs: u64,
}

/// O(1) segregated-fit allocator over one externally-owned arena.
#[derive(Debug)]
pub struct TlsfAllocator {
    capacity: u64,
    max_allocs: u32,
    live_allocs: u32,
    first_list_mask: u32,
    second_list_masks: [u32; FL_COUNT],
    free_list_heads: [[BlockId; SL_COUNT as usize]; FL_COUNT],
    table: BlockTable,
    /// Record at offset 0. Never recycled: it has no physical predecessor,
    /// so it is always the survivor of any merge it participates in.
    head: BlockId,
    counters: OpCounters,
}

impl TlsfAllocator {
    /// Creates an allocator over `[0, capacity)` supporting at most
    /// `max_allocs` simultaneously live allocations.
    ///
    /// `capacity` must be nonzero, a multiple of 8, and at most
    /// [`MAX_CAPACITY`]; `max_allocs` must be nonzero. The block table is
    /// sized `2 * max_allocs + 1`: with exhaustive coalescing, free blocks
    /// never outnumber live blocks plus one, so block splitting can never
    /// run out of table slots while the live-allocation cap holds.
    pub fn new(capacity: u64, max_allocs: u32) -> Result<Self, AllocError> {
        if capacity == 0 || capacity % ALIGN_SIZE != 0 || capacity > MAX_CAPACITY {
            return Err(AllocError::InvalidRequest { size: capacity, alignment: ALIGN_SIZE });
        }
        if max_allocs == 0 || max_allocs > (u32::MAX - 1) / 2 {
            return Err(AllocError::InvalidRequest { size: capacity, alignment: 0 });
        }

        let mut table = BlockTable::new(max_allocs * 2 + 1);
        let head = table.acquire().ok_or(AllocError::TableExhausted { max_allocs })?;

        let mut tlsf = Self {
            capacity,
            max_allocs,
            live_allocs: 0,
            first_list_mask: 0,
            second_list_masks: [0; FL_COUNT],
            free_list_heads: [[BlockId::INVALID; SL_COUNT as usize]; FL_COUNT],
            table,
            head,
            counters: OpCounters::default(),
        };
        // One free block spanning the whole arena.
        tlsf.insert_free_block(head);
        Ok(tlsf)
    }

    /// Allocates `size` bytes rounded up to `alignment`.
    ///
    /// Returns the id of a block whose physical size is at least the rounded
    /// request. Fails with `OutOfMemory` when no free block fits (the core
    /// never grows its arena) and with `TableExhausted` once `max_allocs`
    /// allocations are live.
    pub fn allocate(&mut self, size: u64, alignment: u64) -> Result<BlockId, AllocError> {
        if size == 0 || alignment == 0 || !alignment.is_power_of_two() {
            self.counters.failed_allocs += 1;
            return Err(AllocError::InvalidRequest { size, alignment });
        }
        // A request larger than the whole arena can never succeed; reject it
        // before the rounding below, which would overflow on it.
        if size > self.capacity {
            self.counters.failed_allocs += 1;
            return Err(AllocError::OutOfMemory { requested: size });
        }
        // Cannot overflow now: size <= capacity <= 1 << 39, alignment <= 1 << 63.
        let aligned_size = align_up(size, alignment.max(ALIGN_SIZE));

        if self.live_allocs == self.max_allocs {
            self.counters.failed_allocs += 1;
            return Err(AllocError::TableExhausted { max_allocs: self.max_allocs });
        }

        let Some(found) = self.find_free_block(aligned_size) else {
            self.counters.failed_allocs += 1;
            return Err(AllocError::OutOfMemory { requested: aligned_size });
        };

        self.remove_free_block(found);

        let found_size = self.block_size(found);
        debug_assert!(found_size >= aligned_size);
        if found_size > aligned_size {
            self.split_block(found, aligned_size);
        }

        self.table.get_mut(found).is_free = false;
        self.live_allocs += 1;
        self.counters.allocs += 1;
        Ok(found)
    }

    /// Frees a live block, coalescing with free physical neighbors.
    ///
    /// After return no two physically adjacent blocks are both free. The
    /// freed id (and any absorbed neighbor ids) return to the table's
    /// free-ID stack for reuse.
    pub fn free(&mut self, id: BlockId) -> Result<(), AllocError> {
        self.check_live(id)?;

        self.live_allocs -= 1;
        self.counters.frees += 1;

        let mut merged = id;
        let next = self.table.get(id).next_physical;
        let prev = self.table.get(id).prev_physical;

        // Absorb a free successor into this block.
        if !next.is_invalid() && self.table.get(next).is_free {
            self.remove_free_block(next);
            let after = self.table.get(next).next_physical;
            self.table.get_mut(merged).next_physical = after;
            if !after.is_invalid() {
                self.table.get_mut(after).prev_physical = merged;
            }
            self.table.release(next);
            self.counters.merges += 1;
        }

        // Absorb this block into a free predecessor.
        if !prev.is_invalid() && self.table.get(prev).is_free {
            self.remove_free_block(prev);
            let after = self.table.get(merged).next_physical;
            self.table.get_mut(prev).next_physical = after;
            if !after.is_invalid() {
                self.table.get_mut(after).prev_physical = prev;
            }
            self.table.release(merged);
            self.counters.merges += 1;
            merged = prev;
        }

        self.insert_free_block(merged);
        Ok(())
    }

    /// Physical size of a live block (may exceed the requested size by the
    /// split-remainder policy: a zero remainder is never split off).
    pub fn physical_size(&self, id: BlockId) -> Result<u64, AllocError> {
        self.check_live(id)?;
        Ok(self.block_size(id))
    }

    /// Arena-relative start offset of a live block.
    pub fn block_offset(&self, id: BlockId) -> Result<u64, AllocError> {
        self.check_live(id)?;
        Ok(self.table.get(id).offset)
    }

    /// Managed arena size in bytes.
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Currently live allocation count.
    #[inline]
    pub fn live_allocations(&self) -> u32 {
        self.live_allocs
    }

    /// Live-allocation cap fixed at construction.
    #[inline]
    pub fn max_allocs(&self) -> u32 {
        self.max_allocs
    }

    /// Occupancy snapshot plus lifetime operation counters.
    ///
    /// Walks the physical chain; diagnostic, not O(1).
    pub fn stats(&self) -> TlsfStats {
        let mut free_blocks = 0;
        let mut free_bytes = 0;
        let mut largest = 0;
        for block in self.physical_blocks() {
            if block.is_free {
                free_blocks += 1;
                free_bytes += block.size;
                largest = largest.max(block.size);
            }
        }
        TlsfStats {
            capacity: self.capacity,
            live_allocations: self.live_allocs,
            free_blocks,
            free_bytes,
            largest_free_block: largest,
            allocs: self.counters.allocs,
            frees: self.counters.frees,
            splits: self.counters.splits,
            merges: self.counters.merges,
            failed_allocs: self.counters.failed_allocs,
        }
    }

    /// The physical chain in address order, for validation and diagnostics.
    pub fn physical_blocks(&self) -> Vec<PhysicalBlock> {
        let mut out = Vec::new();
        let mut cursor = self.head;
        while !cursor.is_invalid() {
            let block = self.table.get(cursor);
            out.push(PhysicalBlock {
                offset: block.offset,
                size: self.block_size(cursor),
                is_free: block.is_free,
            });
            cursor = block.next_physical;
        }
        out
    }

    // ------------------------------------------------------------------
    // Bucket index math
    // ------------------------------------------------------------------

    /// Two-level bucket coordinate for a block of `size` bytes.
    ///
    /// Sizes below [`MIN_BLOCK_SIZE`] map to row 0, subdivided linearly at
    /// granularity 8. Above that, the first index counts power-of-two
    /// classes from `MIN_BLOCK_SIZE`, and the second index is the next
    /// `SL_INDEX_COUNT_LOG2` bits below the leading bit (the XOR clears the
    /// implicit leading bit).
    fn bucket_indexes(size: u64) -> (u32, u32) {
        debug_assert!(size > 0);
        if size < MIN_BLOCK_SIZE {
            (0, (size >> ALIGN_SIZE_LOG2) as u32)
        } else {
            let msb = find_msb_set64(size);
            let fi = msb - (FL_INDEX_SHIFT - 1);
            let si = ((size >> (fi + FL_INDEX_SHIFT - 1 - SL_INDEX_COUNT_LOG2)) as u32) ^ SL_COUNT;
            (fi, si)
        }
    }

    /// Bucket coordinate to start a search for `size` bytes at.
    ///
    /// Above the linear class the request is rounded up to the next
    /// second-level boundary first, so the returned bucket (and every bucket
    /// after it) can only hold blocks of at least `size` bytes. `None` when
    /// the rounded request exceeds the supported range.
    fn search_indexes(size: u64) -> Option<(u32, u32)> {
        if size < MIN_BLOCK_SIZE {
            // Linear buckets are exact at granularity 8; no rounding needed.
            return Some((0, (size >> ALIGN_SIZE_LOG2) as u32));
        }
        let round = (1u64 << (find_msb_set64(size) - SL_INDEX_COUNT_LOG2)) - 1;
        let rounded = size.checked_add(round)?;
        let (fi, si) = Self::bucket_indexes(rounded);
        if (fi as usize) < FL_COUNT { Some((fi, si)) } else { None }
    }

    /// `!0 << bit`, widened so shifts past the word return the empty mask.
    #[inline]
    fn mask_from(bit: u32) -> u32 {
        if bit >= 32 { 0 } else { !0u32 << bit }
    }

    /// Head of the first non-empty bucket that can satisfy `size`, or
    /// `None` when no free block anywhere is large enough.
    fn find_free_block(&self, size: u64) -> Option<BlockId> {
        let (fi, si) = Self::search_indexes(size)?;

        let mut row = fi;
        let mut sl_mask = self.second_list_masks[fi as usize] & Self::mask_from(si);
        if sl_mask == 0 {
            // Nothing in this row at or above si; jump to the next
            // non-empty row, where every bucket is large enough.
            let fl_mask = self.first_list_mask & Self::mask_from(fi + 1);
            if fl_mask == 0 {
                return None;
            }
            row = find_lsb_set32(fl_mask);
            sl_mask = self.second_list_masks[row as usize];
        }
        let col = find_lsb_set32(sl_mask);
        let head = self.free_list_heads[row as usize][col as usize];
        debug_assert!(!head.is_invalid());
        Some(head)
    }

    // ------------------------------------------------------------------
    // Free-list maintenance
    // ------------------------------------------------------------------

    /// Marks `id` free and pushes it onto the head of its bucket's list,
    /// setting the occupancy bits.
    fn insert_free_block(&mut self, id: BlockId) {
        let size = self.block_size(id);
        let (fi, si) = Self::bucket_indexes(size);
        let old_head = self.free_list_heads[fi as usize][si as usize];

        {
            let block = self.table.get_mut(id);
            block.is_free = true;
            block.prev_logical = BlockId::INVALID;
            block.next_logical = old_head;
        }
        if !old_head.is_invalid() {
            self.table.get_mut(old_head).prev_logical = id;
        }
        self.free_list_heads[fi as usize][si as usize] = id;
        self.second_list_masks[fi as usize] |= 1 << si;
        self.first_list_mask |= 1 << fi;
    }

    /// Splices `id` out of its bucket's list, clearing the occupancy bits
    /// when the bucket (and then the row) empties.
    fn remove_free_block(&mut self, id: BlockId) {
        let size = self.block_size(id);
        let (fi, si) = Self::bucket_indexes(size);

        let (prev, next) = {
            let block = self.table.get(id);
            debug_assert!(block.is_free);
            (block.prev_logical, block.next_logical)
        };

        if !prev.is_invalid() {
            self.table.get_mut(prev).next_logical = next;
        }
        if !next.is_invalid() {
            self.table.get_mut(next).prev_logical = prev;
        }

        if self.free_list_heads[fi as usize][si as usize] == id {
            self.free_list_heads[fi as usize][si as usize] = next;
            if next.is_invalid() {
                self.second_list_masks[fi as usize] &= !(1 << si);
                if self.second_list_masks[fi as usize] == 0 {
                    self.first_list_mask &= !(1 << fi);
                }
            }
        }

        let block = self.table.get_mut(id);
        block.prev_logical = BlockId::INVALID;
        block.next_logical = BlockId::INVALID;
    }

    /// Splits everything past `kept_size` off the tail of `id` into a new
    /// free block linked immediately after it in the physical chain.
    fn split_block(&mut self, id: BlockId, kept_size: u64) {
        debug_assert!(self.block_size(id) > kept_size);
        let Some(rem_id) = self.table.acquire() else {
            // Unreachable by table sizing; serve the block unsplit.
            debug_assert!(false, "block table exhausted during split");
            return;
        };

        let (offset, next) = {
            let block = self.table.get(id);
            (block.offset, block.next_physical)
        };

        {
            let rem = self.table.get_mut(rem_id);
            rem.offset = offset + kept_size;
            rem.prev_physical = id;
            rem.next_physical = next;
        }
        if !next.is_invalid() {
            self.table.get_mut(next).prev_physical = rem_id;
        }
        self.table.get_mut(id).next_physical = rem_id;

        self.insert_free_block(rem_id);
        self.counters.splits += 1;
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Size derived from the physical chain.
    fn block_size(&self, id: BlockId) -> u64 {
        let block = self.table.get(id);
        let next = block.next_physical;
        if next.is_invalid() {
            self.capacity - block.offset
        } else {
            self.table.get(next).offset - block.offset
        }
    }

    /// Validates that `id` names a live (allocated, not free, not vacant)
    /// block.
    fn check_live(&self, id: BlockId) -> Result<(), AllocError> {
        if !self.table.in_range(id) || !self.is_live(id) {
            return Err(AllocError::InvalidBlock(id));
        }
        Ok(())
    }

    /// A vacant table slot has all-invalid links and offset 0; the one live
    /// block that can look the same is the arena head, which is never
    /// recycled. Everything else with a physical link is live or free.
    fn is_live(&self, id: BlockId) -> bool {
        let block = self.table.get(id);
        if block.is_free {
            return false;
        }
        if id == self.head {
            return true;
        }
        // Non-head live blocks always have a physical predecessor.
        !block.prev_physical.is_invalid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_chain_valid(tlsf: &TlsfAllocator) {
        let blocks = tlsf.physical_blocks();
        assert!(!blocks.is_empty());
        assert_eq!(blocks[0].offset, 0);
        let mut end = 0;
        let mut prev_free = false;
        for block in &blocks {
            assert_eq!(block.offset, end, "gap or overlap in physical chain");
            assert!(block.size > 0);
            assert!(!(prev_free && block.is_free), "adjacent free blocks");
            end = block.offset + block.size;
            prev_free = block.is_free;
        }
        assert_eq!(end, tlsf.capacity(), "chain does not cover the arena");
    }

    #[test]
    fn bucket_indexes_linear_class() {
        assert_eq!(TlsfAllocator::bucket_indexes(8), (0, 1));
        assert_eq!(TlsfAllocator::bucket_indexes(64), (0, 8));
        assert_eq!(TlsfAllocator::bucket_indexes(248), (0, 31));
    }

    #[test]
    fn bucket_indexes_power_classes() {
        // Row 1 covers [256, 512) in 8-byte columns.
        assert_eq!(TlsfAllocator::bucket_indexes(256), (1, 0));
        assert_eq!(TlsfAllocator::bucket_indexes(264), (1, 1));
        assert_eq!(TlsfAllocator::bucket_indexes(504), (1, 31));
        // Row 2 covers [512, 1024) in 16-byte columns.
        assert_eq!(TlsfAllocator::bucket_indexes(512), (2, 0));
        assert_eq!(TlsfAllocator::bucket_indexes(1008), (2, 31));
        assert_eq!(TlsfAllocator::bucket_indexes(4096), (5, 0));
    }

    #[test]
    fn bucket_indexes_deterministic_over_range() {
        // Same size, same bucket, and bucket floors never exceed the size.
        for size in (8..=8192u64).step_by(8) {
            let (fi, si) = TlsfAllocator::bucket_indexes(size);
            assert_eq!(TlsfAllocator::bucket_indexes(size), (fi, si));
            assert!((fi as usize) < FL_COUNT);
            assert!(si < SL_COUNT);
            let floor = if fi == 0 {
                (si as u64) << ALIGN_SIZE_LOG2
            } else {
                (1u64 << (fi + FL_INDEX_SHIFT - 1))
                    + ((si as u64) << (fi + FL_INDEX_SHIFT - 1 - SL_INDEX_COUNT_LOG2))
            };
            assert!(floor <= size, "floor {floor} > size {size} at ({fi},{si})");
        }
    }

    #[test]
    fn new_rejects_bad_parameters() {
        assert!(TlsfAllocator::new(0, 8).is_err());
        assert!(TlsfAllocator::new(4097, 8).is_err());
        assert!(TlsfAllocator::new(4096, 0).is_err());
        assert!(TlsfAllocator::new(MAX_CAPACITY + ALIGN_SIZE, 8).is_err());
        assert!(TlsfAllocator::new(4096, 8).is_ok());
    }

    #[test]
    fn allocate_rejects_bad_requests() {
        let mut tlsf = TlsfAllocator::new(4096, 8).unwrap();
        assert!(matches!(
            tlsf.allocate(0, 8),
            Err(AllocError::InvalidRequest { .. })
        ));
        assert!(matches!(
            tlsf.allocate(64, 3),
            Err(AllocError::InvalidRequest { .. })
        ));
        assert!(matches!(
            tlsf.allocate(64, 0),
            Err(AllocError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn freed_gap_is_reused_and_drain_recoalesces() {
        let mut tlsf = TlsfAllocator::new(4096, 8).unwrap();

        let a = tlsf.allocate(64, 8).unwrap();
        let b = tlsf.allocate(128, 8).unwrap();
        let c = tlsf.allocate(256, 8).unwrap();

        let oa = tlsf.block_offset(a).unwrap();
        let ob = tlsf.block_offset(b).unwrap();
        let oc = tlsf.block_offset(c).unwrap();
        assert!(oa < ob && ob < oc);
        assert_eq!(tlsf.physical_size(a).unwrap(), 64);
        assert_eq!(tlsf.physical_size(b).unwrap(), 128);
        assert_eq!(tlsf.physical_size(c).unwrap(), 256);
        assert_chain_valid(&tlsf);

        // Free the middle block; a request for 100 bytes must reuse it
        // rather than extend into the trailing free space.
        tlsf.free(b).unwrap();
        let d = tlsf.allocate(100, 8).unwrap();
        assert_eq!(tlsf.block_offset(d).unwrap(), ob);
        assert_chain_valid(&tlsf);

        tlsf.free(a).unwrap();
        tlsf.free(c).unwrap();
        tlsf.free(d).unwrap();

        let blocks = tlsf.physical_blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].offset, 0);
        assert_eq!(blocks[0].size, 4096);
        assert!(blocks[0].is_free);
        assert_eq!(tlsf.live_allocations(), 0);
    }

    #[test]
    fn free_in_any_order_returns_to_single_block() {
        let orders: [[usize; 4]; 3] = [[0, 1, 2, 3], [3, 2, 1, 0], [1, 3, 0, 2]];
        for order in orders {
            let mut tlsf = TlsfAllocator::new(8192, 8).unwrap();
            let ids: Vec<_> = (0..4).map(|i| tlsf.allocate(64 << i, 8).unwrap()).collect();
            for &i in &order {
                tlsf.free(ids[i]).unwrap();
                assert_chain_valid(&tlsf);
            }
            let blocks = tlsf.physical_blocks();
            assert_eq!(blocks.len(), 1);
            assert_eq!(blocks[0].size, 8192);
        }
    }

    #[test]
    fn out_of_memory_is_explicit() {
        let mut tlsf = TlsfAllocator::new(1024, 8).unwrap();
        let _a = tlsf.allocate(1024, 8).unwrap();
        assert!(matches!(
            tlsf.allocate(8, 8),
            Err(AllocError::OutOfMemory { .. })
        ));
        assert_eq!(tlsf.stats().failed_allocs, 1);
    }

    #[test]
    fn oversized_requests_fail_without_wrapping() {
        let mut tlsf = TlsfAllocator::new(4096, 8).unwrap();
        // Near-u64::MAX sizes must not wrap during alignment rounding.
        assert!(matches!(
            tlsf.allocate(u64::MAX - 3, 8),
            Err(AllocError::OutOfMemory { .. })
        ));
        assert!(matches!(
            tlsf.allocate(4097, 8),
            Err(AllocError::OutOfMemory { .. })
        ));
        // Alignment rounding past the arena is a clean failure too.
        assert!(matches!(
            tlsf.allocate(8, 1 << 62),
            Err(AllocError::OutOfMemory { .. })
        ));
        // The arena is untouched afterwards.
        let id = tlsf.allocate(4096, 8).unwrap();
        assert_eq!(tlsf.block_offset(id).unwrap(), 0);
    }

    #[test]
    fn table_exhaustion_is_explicit() {
        let mut tlsf = TlsfAllocator::new(4096, 2).unwrap();
        let _a = tlsf.allocate(64, 8).unwrap();
        let _b = tlsf.allocate(64, 8).unwrap();
        assert_eq!(
            tlsf.allocate(64, 8),
            Err(AllocError::TableExhausted { max_allocs: 2 })
        );
    }

    #[test]
    fn double_free_is_an_error() {
        let mut tlsf = TlsfAllocator::new(4096, 8).unwrap();
        let a = tlsf.allocate(64, 8).unwrap();
        let b = tlsf.allocate(64, 8).unwrap();
        tlsf.free(a).unwrap();
        assert_eq!(tlsf.free(a), Err(AllocError::InvalidBlock(a)));
        tlsf.free(b).unwrap();
    }

    #[test]
    fn invalid_handles_are_rejected() {
        let tlsf = TlsfAllocator::new(4096, 8).unwrap();
        assert!(tlsf.physical_size(BlockId::INVALID).is_err());
        assert!(tlsf.block_offset(BlockId(999)).is_err());
    }

    #[test]
    fn alignment_rounds_the_size() {
        let mut tlsf = TlsfAllocator::new(4096, 8).unwrap();
        let a = tlsf.allocate(100, 64).unwrap();
        assert_eq!(tlsf.physical_size(a).unwrap(), 128);
        let b = tlsf.allocate(1, 1).unwrap();
        assert_eq!(tlsf.physical_size(b).unwrap(), 8);
    }

    #[test]
    fn found_block_always_fits() {
        // Exercise the round-up search: a free block slightly smaller than
        // the request in the same first-level row must not be returned.
        let mut tlsf = TlsfAllocator::new(4096, 8).unwrap();
        let a = tlsf.allocate(520, 8).unwrap();
        let hold = tlsf.allocate(8, 8).unwrap();
        tlsf.free(a).unwrap();
        // Only free blocks: one of 520 bytes, one trailing. A request for
        // 528 must skip the 520-byte block.
        let c = tlsf.allocate(528, 8).unwrap();
        assert!(tlsf.physical_size(c).unwrap() >= 528);
        assert_ne!(tlsf.block_offset(c).unwrap(), 0);
        tlsf.free(c).unwrap();
        tlsf.free(hold).unwrap();
    }

    #[test]
    fn stats_snapshot_counts_operations() {
        let mut tlsf = TlsfAllocator::new(4096, 8).unwrap();
        let a = tlsf.allocate(64, 8).unwrap();
        let b = tlsf.allocate(64, 8).unwrap();
        tlsf.free(a).unwrap();
        tlsf.free(b).unwrap();

        let stats = tlsf.stats();
        assert_eq!(stats.allocs, 2);
        assert_eq!(stats.frees, 2);
        assert_eq!(stats.live_allocations, 0);
        assert_eq!(stats.free_bytes, 4096);
        assert_eq!(stats.largest_free_block, 4096);
        assert_eq!(stats.free_blocks, 1);
        assert!(stats.splits >= 2);
        assert!(stats.merges >= 1);

        let json = serde_json::to_string(&stats).unwrap();
        let back: TlsfStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}
