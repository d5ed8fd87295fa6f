//! HWX blob format: the markers the converter scans for.
//!
//! A compiled blob carries no index table. Layout is recovered from a handful
//! of *self-describing records*, each a run of little-endian `u32` words:
//!
//! ```text
//! word  +0     device address (BASE_ADDR for the command region,
//!              BASE_ADDR + offset for kernel and buffers)
//! word  +2     size in bytes
//! words +8..12 ident tuple (buffers only)
//! ```
//!
//! ```text
//! Device address map
//! ──────────────────────────────────────────────────────────────────
//! 0x30000000  task region      round_up(task_size, 16)
//!             kernel region    kernel_size (multiple of 16)
//! round_up(…, 0x4000)
//!             buffers          contiguous, tile aligned, ≤ 32 of them
//! ```
//!
//! Task descriptors are each tagged with [`TD_MAGIC`]; their count is stored
//! one word after a [`TD_COUNT_MARKER`] that sits two words after a
//! [`BASE_ADDR`].

/// Bytes per scanned word.
pub const WORD_SIZE: usize = 4;

/// Device address of the command (task + kernel) region.
pub const BASE_ADDR: u32 = 0x3000_0000;

/// Buffer granularity. Every buffer size is a multiple of this.
pub const TILE_SIZE: u64 = 0x4000;

/// Alignment of the task region within the command region.
pub const DMA0_GRAN: u64 = 16;

/// The descriptor table's file offset is rounded down to this.
pub const PAGE_SIZE: u64 = 0x1000;

/// Size of one task descriptor, `(0x9c + 1) << 2`.
pub const TD_SIZE: u32 = 0x274;

/// Word preceding the task-descriptor count.
pub const TD_COUNT_MARKER: u32 = 0x9c;

/// Magic word repeated once per task descriptor.
pub const TD_MAGIC: u32 = 0xf401_f800;

/// Exclusive upper bound on the descriptor count.
pub const TD_COUNT_LIMIT: u32 = 0xffff;

/// Exclusive upper bound on tiles in a single buffer.
pub const MAX_BUFFER_TILES: u64 = 0x1_0000;

/// Shortest printable run that can hold a shape debug symbol.
pub const MIN_SYMBOL_LEN: usize = 50;

const _: () = assert!((TD_SIZE as u64) * 2 < TILE_SIZE);

/// Word offsets inside a self-describing record.
pub mod record {
    /// Offset of the size word.
    pub const SIZE: usize = 2;
    /// Offset of the first ident word.
    pub const IDENT: usize = 8;
    /// Number of ident words.
    pub const IDENT_LEN: usize = 4;
    /// Words needed to read a buffer record through its ident tuple.
    pub const BUFFER_LEN: usize = IDENT + IDENT_LEN;
}

/// Buffer ident tuples (words +8..+12 of a buffer record).
pub mod ident {
    /// Intermediate (scratch) buffer.
    pub const INTERMEDIATE: [u32; 4] = [0x3, 0x3, 0x1, 0x4];
    /// Source (input tensor) buffer.
    pub const SOURCE: [u32; 4] = [0x1, 0x1, 0x1, 0x6];
    /// Destination (output tensor) buffer.
    pub const DESTINATION: [u32; 4] = [0x2, 0x2, 0x1, 0x6];
}

/// Debug-symbol text markers.
pub mod symbol {
    /// Separates the tensor name from its type descriptor.
    pub const TYPE_MARK: &str = ":t";
    /// Every shape symbol ends with this.
    pub const TERMINATOR: &str = ":5";
    /// Prefix of an encoded stride inside a dimension field.
    pub const STRIDE_MARK: &str = "=s";
    /// Names containing this point at a host-side layer.
    pub const HOST_CONTEXT: &str = "ctx_";
}

/// Extension of the CoreML source model that is sometimes passed by mistake.
pub const MLMODEL_EXTENSION: &str = "mlmodel";
