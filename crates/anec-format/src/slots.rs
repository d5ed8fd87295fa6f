//! Slot numbering for the fixed 32-entry tile table.
//!
//! ```text
//! slot  0      command region (task + kernel)
//! slots 1–2    reserved, always zero
//! slot  3      intermediate buffer (at most one)
//! slots 4..    destinations in order, then sources in order
//! ```
//!
//! Slots 1 and 2 have never been seen populated. A nonzero value there would
//! mean the format has moved on, not that an input is broken.

/// Entries in the slot table.
pub const SLOT_COUNT: usize = 32;

/// Command region slot.
pub const COMMAND: usize = 0;

/// Reserved slots.
pub const RESERVED: [usize; 2] = [1, 2];

/// Intermediate buffer slot.
pub const INTERMEDIATE: usize = 3;

/// First destination slot; sources follow the destinations.
pub const FIRST_IO: usize = 4;

/// Most source + destination buffers the table can hold.
pub const MAX_IO: usize = SLOT_COUNT - FIRST_IO;

/// Most intermediate buffers a program may declare.
pub const MAX_INTERMEDIATE: usize = 1;

/// Slot of destination `index`.
#[must_use]
pub const fn destination(index: usize) -> usize {
    FIRST_IO + index
}

/// Slot of source `index` given the number of destinations.
#[must_use]
pub const fn source(index: usize, destinations: usize) -> usize {
    FIRST_IO + destinations + index
}
