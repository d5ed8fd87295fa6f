//! ANEC artifact header.
//!
//! A fixed, little-endian, packed record followed by zero padding to
//! [`CAPACITY`] bytes. The body (task + kernel bytes copied from the blob)
//! starts immediately after.
//!
//! ```text
//! Offset  Size        Field
//! ──────  ──────────  ─────────────────────────────────────────────
//!      0  8           total size (round_up(task, 16) + kernel)
//!      8  4           task-descriptor entry size
//!     12  4           task-descriptor count
//!     16  8           task size
//!     24  8           kernel size
//!     32  4           source count
//!     36  4           destination count
//!     40  32 × 4      tile count per slot
//!    168  32 × 6 × 8  N, C, H, W, row stride, plane stride per slot
//!   1704  …           zero padding
//!   4096              body
//! ```

use crate::slots::SLOT_COUNT;

/// Header size on disk, regardless of how many slots are populated.
pub const CAPACITY: usize = 4096;

/// Shape fields per slot: N, C, H, W, row stride, plane stride.
pub const NCHW_FIELDS: usize = 6;

/// Byte offsets of each header field.
pub mod offset {
    use super::{NCHW_FIELDS, SLOT_COUNT};

    /// `u64` total size.
    pub const SIZE: usize = 0;
    /// `u32` descriptor entry size.
    pub const TD_SIZE: usize = 8;
    /// `u32` descriptor count.
    pub const TD_COUNT: usize = 12;
    /// `u64` task size.
    pub const TSK_SIZE: usize = 16;
    /// `u64` kernel size.
    pub const KRN_SIZE: usize = 24;
    /// `u32` source count.
    pub const SRC_COUNT: usize = 32;
    /// `u32` destination count.
    pub const DST_COUNT: usize = 36;
    /// `[u32; 32]` tile counts.
    pub const TILES: usize = 40;
    /// `[[u64; 6]; 32]` shapes.
    pub const NCHW: usize = TILES + SLOT_COUNT * 4;
    /// End of the populated record.
    pub const END: usize = NCHW + SLOT_COUNT * NCHW_FIELDS * 8;
}

/// Bytes actually used by header fields.
pub const USED: usize = offset::END;

const _: () = assert!(USED <= CAPACITY);
