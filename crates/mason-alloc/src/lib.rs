//! # mason-alloc
//!
//! Offset-based memory allocators for externally owned arenas.
//!
//! None of the allocators in this crate touch the memory they manage. Each
//! one administers a byte range `[0, capacity)` as pure metadata and hands
//! out *offsets* into that range; the caller owns the backing storage (a CPU
//! heap region, a GPU memory pool, a staging ring) and translates offsets to
//! real addresses itself. This keeps the allocators valid over memory the
//! CPU cannot address at all, and keeps the whole crate free of `unsafe`.
//!
//! Three allocation disciplines are provided:
//!
//! - [`TlsfAllocator`]: two-level segregated fit. O(1) allocate and free,
//!   block splitting, exhaustive coalescing. The general-purpose choice for
//!   long-lived resources with arbitrary free order.
//! - [`LinearAllocator`] / [`AtomicLinearAllocator`]: monotonic bump
//!   allocation with whole-arena reset. For frame-scratch data where
//!   individual deallocation is unnecessary.
//! - [`AreaAllocator`]: a linear allocator that chains additional regions
//!   when the current one is exhausted, with stable region identity.
//!
//! Allocators are single-threaded unless documented otherwise
//! ([`AtomicLinearAllocator`] is the one thread-safe variant); callers that
//! share an allocator across threads must serialize access externally.

#![deny(unsafe_code)]

pub mod area;
pub mod bits;
pub mod block;
pub mod error;
pub mod linear;
pub mod tlsf;

pub use area::{AreaAllocator, AreaSlot};
pub use block::{BlockId, BlockTable, MemoryBlock};
pub use error::AllocError;
pub use linear::{AtomicLinearAllocator, LinearAllocator};
pub use tlsf::{TlsfAllocator, TlsfStats};

/// Rounds `value` up to the next multiple of `alignment`.
///
/// `alignment` must be a power of two; public entry points validate this
/// before calling.
#[inline]
pub(crate) fn align_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// [`align_up`] for inputs the caller cannot bound; `None` on overflow.
#[inline]
pub(crate) fn checked_align_up(value: u64, alignment: u64) -> Option<u64> {
    debug_assert!(alignment.is_power_of_two());
    value.checked_add(alignment - 1).map(|v| v & !(alignment - 1))
}

#[cfg(test)]
mod tests {
    use super::{align_up, checked_align_up};

    #[test]
    fn align_up_basics() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(9, 8), 16);
        assert_eq!(align_up(17, 1), 17);
        assert_eq!(align_up(100, 64), 128);
    }

    #[test]
    fn checked_align_up_catches_overflow() {
        assert_eq!(checked_align_up(100, 64), Some(128));
        assert_eq!(checked_align_up(u64::MAX - 3, 8), None);
        assert_eq!(checked_align_up(u64::MAX - 7, 8), Some(u64::MAX - 7));
    }
}
