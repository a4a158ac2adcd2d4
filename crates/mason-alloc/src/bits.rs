//! Bit-scan primitives for the segregated free-list index math.
//!
//! The TLSF core derives its two-level bucket coordinates from the position
//! of the highest set bit of a size, and walks its occupancy bitmaps via the
//! lowest set bit. Both scans compile down to single instructions (LZCNT /
//! TZCNT or equivalents) through the standard `leading_zeros` /
//! `trailing_zeros` intrinsics; these wrappers only pin down the zero-input
//! sentinel so callers never have to special-case it.

/// Sentinel returned by every scan when the input word is zero.
pub const NO_BIT: u32 = u32::MAX;

/// Position of the most significant set bit of a 32-bit word.
///
/// Returns [`NO_BIT`] for zero.
#[inline]
pub fn find_msb_set32(word: u32) -> u32 {
    if word == 0 {
        NO_BIT
    } else {
        31 - word.leading_zeros()
    }
}

/// Position of the most significant set bit of a 64-bit word.
///
/// Returns [`NO_BIT`] for zero.
#[inline]
pub fn find_msb_set64(word: u64) -> u32 {
    if word == 0 {
        NO_BIT
    } else {
        63 - word.leading_zeros()
    }
}

/// Position of the least significant set bit of a 32-bit word.
///
/// Returns [`NO_BIT`] for zero.
#[inline]
pub fn find_lsb_set32(word: u32) -> u32 {
    if word == 0 { NO_BIT } else { word.trailing_zeros() }
}

/// Position of the least significant set bit of a 64-bit word.
///
/// Returns [`NO_BIT`] for zero.
#[inline]
pub fn find_lsb_set64(word: u64) -> u32 {
    if word == 0 { NO_BIT } else { word.trailing_zeros() }
}
