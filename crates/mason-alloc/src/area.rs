//! Multi-region bump allocator.
//!
//! Chains fixed-capacity linear regions: allocation scans existing regions
//! first-fit, and when none has room a fresh region is appended, sized to
//! the configured region size or the request, whichever is larger. Appended
//! regions are never moved, resized in place, or dropped before the
//! allocator itself, so an [`AreaSlot`] stays valid for the allocator's
//! lifetime. [`reset`](AreaAllocator::reset) rewinds every region but
//! retains them for reuse.

use serde::{Deserialize, Serialize};

use crate::align_up;
use crate::error::AllocError;

/// Location of an area allocation: which region, and the offset within it.
///
/// Regions are distinct address spaces, so a flat offset cannot name a
/// location; the caller maps `region` to whatever backing memory it created
/// for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaSlot {
    pub region: u32,
    pub offset: u64,
}

#[derive(Debug)]
struct Region {
    offset: u64,
    capacity: u64,
}

impl Region {
    fn try_reserve(&mut self, size: u64, alignment: u64) -> Option<u64> {
        let start = align_up(self.offset, alignment);
        let end = start.checked_add(size)?;
        if end > self.capacity {
            return None;
        }
        self.offset = end;
        Some(start)
    }
}

/// Bump allocator over a growing chain of stable regions.
#[derive(Debug)]
pub struct AreaAllocator {
    regions: Vec<Region>,
    region_size: u64,
}

impl AreaAllocator {
    /// `region_size` is the default capacity of each appended region; it
    /// must be nonzero.
    pub fn new(region_size: u64) -> Self {
        assert!(region_size > 0, "region size must be nonzero");
        Self { regions: Vec::new(), region_size }
    }

    /// Reserves `size` bytes aligned to `alignment` in the first region
    /// with room, appending a new region when none has any.
    ///
    /// Never fails for want of space — growth is the designed fallback, not
    /// a retry — only for invalid requests.
    pub fn allocate(&mut self, size: u64, alignment: u64) -> Result<AreaSlot, AllocError> {
        if size == 0 || alignment == 0 || !alignment.is_power_of_two() {
            return Err(AllocError::InvalidRequest { size, alignment });
        }

        for (index, region) in self.regions.iter_mut().enumerate() {
            if let Some(offset) = region.try_reserve(size, alignment) {
                return Ok(AreaSlot { region: index as u32, offset });
            }
        }

        // No region fits; append one that must. An aligned request always
        // fits at offset 0 of a region at least `size` bytes big.
        let capacity = self.region_size.max(size);
        let mut region = Region { offset: 0, capacity };
        let offset = region
            .try_reserve(size, alignment)
            .ok_or(AllocError::OutOfMemory { requested: size })?;
        self.regions.push(region);
        Ok(AreaSlot { region: (self.regions.len() - 1) as u32, offset })
    }

    /// Rewinds every region to empty, retaining them for reuse.
    pub fn reset(&mut self) {
        for region in &mut self.regions {
            region.offset = 0;
        }
    }

    /// Number of regions appended so far.
    #[inline]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Default capacity for appended regions.
    #[inline]
    pub fn region_size(&self) -> u64 {
        self.region_size
    }

    /// Capacity of one region, for sizing its backing memory.
    pub fn region_capacity(&self, region: u32) -> Option<u64> {
        self.regions.get(region as usize).map(|r| r.capacity)
    }
}
