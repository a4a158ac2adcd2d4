//! Monotonic (bump) allocators.
//!
//! A linear allocator hands out strictly increasing offsets from a fixed
//! arena and can only reclaim memory wholesale: [`LinearAllocator::reset`]
//! rewinds the whole arena, there is no per-allocation free. Suited to
//! frame-scratch data, staging uploads, and other same-lifetime batches.
//!
//! [`AtomicLinearAllocator`] is the one thread-safe allocator in this crate.
//! Its bounds check and offset advance are two separate atomic operations,
//! which admits a benign race: concurrent requests near capacity may all
//! fail together even though one of them alone would have fit. Failed
//! requests are never retried internally and the offset is never corrupted.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::AllocError;
use crate::{align_up, checked_align_up};

/// Occupancy snapshot for a linear allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearStats {
    pub capacity: u64,
    pub used: u64,
    pub allocs: u64,
    pub failed_allocs: u64,
    pub resets: u64,
}

/// Single-threaded bump allocator over `[0, capacity)`.
#[derive(Debug)]
pub struct LinearAllocator {
    offset: u64,
    capacity: u64,
    allocs: u64,
    failed_allocs: u64,
    resets: u64,
}

impl LinearAllocator {
    pub fn new(capacity: u64) -> Self {
        Self { offset: 0, capacity, allocs: 0, failed_allocs: 0, resets: 0 }
    }

    /// Reserves `size` bytes at the next offset aligned to `alignment`.
    ///
    /// Fails exactly when the aligned request would overrun the capacity;
    /// the arena is left untouched in that case.
    pub fn allocate(&mut self, size: u64, alignment: u64) -> Result<u64, AllocError> {
        if size == 0 || alignment == 0 || !alignment.is_power_of_two() {
            self.failed_allocs += 1;
            return Err(AllocError::InvalidRequest { size, alignment });
        }
        let Some(start) = checked_align_up(self.offset, alignment) else {
            self.failed_allocs += 1;
            return Err(AllocError::OutOfMemory { requested: size });
        };
        let Some(end) = start.checked_add(size) else {
            self.failed_allocs += 1;
            return Err(AllocError::OutOfMemory { requested: size });
        };
        if end > self.capacity {
            self.failed_allocs += 1;
            return Err(AllocError::OutOfMemory { requested: size });
        }
        self.offset = end;
        self.allocs += 1;
        Ok(start)
    }

    /// Rewinds the arena to empty. Previously returned offsets become
    /// dangling; this is the only reclamation the allocator offers.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.resets += 1;
    }

    /// Extends the arena by `extra` bytes. Existing offsets stay valid.
    pub fn grow(&mut self, extra: u64) {
        self.capacity = self.capacity.saturating_add(extra);
    }

    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    #[inline]
    pub fn used(&self) -> u64 {
        self.offset
    }

    #[inline]
    pub fn remaining(&self) -> u64 {
        self.capacity - self.offset
    }

    pub fn stats(&self) -> LinearStats {
        LinearStats {
            capacity: self.capacity,
            used: self.offset,
            allocs: self.allocs,
            failed_allocs: self.failed_allocs,
            resets: self.resets,
        }
    }
}

/// Thread-safe bump allocator.
///
/// `allocate` performs an acquire load for the bounds pre-check followed by
/// a `fetch_add`; a request that loses the race to the last bytes fails
/// with `OutOfMemory` after backing its reservation out. See the module
/// docs for the (benign) failure race this admits.
#[derive(Debug)]
pub struct AtomicLinearAllocator {
    offset: AtomicU64,
    capacity: u64,
}

impl AtomicLinearAllocator {
    pub fn new(capacity: u64) -> Self {
        Self { offset: AtomicU64::new(0), capacity }
    }

    /// Reserves `size` bytes at the next offset aligned to `alignment`.
    pub fn allocate(&self, size: u64, alignment: u64) -> Result<u64, AllocError> {
        if size == 0 || alignment == 0 || !alignment.is_power_of_two() {
            return Err(AllocError::InvalidRequest { size, alignment });
        }
        // Reserve pessimistically: alignment padding worst case is
        // alignment - 1 bytes regardless of where the offset lands.
        let Some(padded) = size.checked_add(alignment - 1) else {
            return Err(AllocError::OutOfMemory { requested: size });
        };
        // Pre-check so a hopeless request does not bump the offset at all.
        let current = self.offset.load(Ordering::Acquire);
        if !Self::fits(current, size, alignment, self.capacity) {
            return Err(AllocError::OutOfMemory { requested: size });
        }
        let prior = self.offset.fetch_add(padded, Ordering::AcqRel);
        if !Self::fits(prior, size, alignment, self.capacity) {
            // Lost the race; back the reservation out. Other winners keep
            // their (lower) reservations intact.
            self.offset.fetch_sub(padded, Ordering::AcqRel);
            return Err(AllocError::OutOfMemory { requested: size });
        }
        Ok(align_up(prior, alignment))
    }

    /// Overflow-safe `align_up(offset, alignment) + size <= capacity`.
    #[inline]
    fn fits(offset: u64, size: u64, alignment: u64, capacity: u64) -> bool {
        checked_align_up(offset, alignment)
            .and_then(|start| start.checked_add(size))
            .is_some_and(|end| end <= capacity)
    }

    /// Rewinds the arena to empty.
    ///
    /// Callers must quiesce concurrent allocators first; a plain store
    /// racing an in-flight `fetch_add` would resurrect its reservation.
    pub fn reset(&self) {
        self.offset.store(0, Ordering::Release);
    }

    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bytes reserved so far (including alignment padding).
    #[inline]
    pub fn used(&self) -> u64 {
        self.offset.load(Ordering::Acquire).min(self.capacity)
    }
}
