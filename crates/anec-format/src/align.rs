//! Alignment helpers shared by the locator, buffer walk and serializer.
//!
//! All granularities used by the format are powers of two, so rounding up is
//! a mask operation.

use crate::hwx::TILE_SIZE;

/// Round `x` up to the next multiple of `gran` (a power of two).
#[must_use]
pub const fn round_up(x: u64, gran: u64) -> u64 {
    debug_assert!(gran.is_power_of_two());
    (x + (gran - 1)) & !(gran - 1)
}

/// [`round_up`] that returns `None` instead of overflowing.
#[must_use]
pub const fn checked_round_up(x: u64, gran: u64) -> Option<u64> {
    debug_assert!(gran.is_power_of_two());
    match x.checked_add(gran - 1) {
        Some(v) => Some(v & !(gran - 1)),
        None => None,
    }
}

/// Round `x` down to a multiple of `gran`.
#[must_use]
pub const fn round_down(x: u64, gran: u64) -> u64 {
    x - (x % gran)
}

/// Number of tiles covering `size` bytes once rounded up to the tile size.
#[must_use]
pub const fn tiles(size: u64) -> u64 {
    round_up(size, TILE_SIZE) / TILE_SIZE
}
