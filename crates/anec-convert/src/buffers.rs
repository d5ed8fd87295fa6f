//! Buffer table discovery
//!
//! Buffers follow the command region in device address space, tile aligned
//! and packed back to back. Each declares itself with a record at its own
//! address, so the walk is: look for a record at the cursor, classify it,
//! advance the cursor by its size, repeat until no record answers.

use crate::error::{AnecError, Result};
use crate::words::WordView;
use anec_format::align::round_up;
use anec_format::hwx::{ident, record, BASE_ADDR, MAX_BUFFER_TILES, TILE_SIZE};
use anec_format::slots::{MAX_INTERMEDIATE, MAX_IO, SLOT_COUNT};
use tracing::debug;

/// Buffer classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// The task + kernel prefix (slot 0, never discovered by the walk)
    Command,
    /// Scratch memory between layers
    Intermediate,
    /// Input tensor
    Source,
    /// Output tensor
    Destination,
}

impl BufferKind {
    /// Classify an ident tuple.
    #[must_use]
    pub fn from_ident(tuple: [u32; 4]) -> Option<Self> {
        match tuple {
            ident::INTERMEDIATE => Some(Self::Intermediate),
            ident::SOURCE => Some(Self::Source),
            ident::DESTINATION => Some(Self::Destination),
            _ => None,
        }
    }

    /// Short tag used in logs and rendered headers.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Command => "cmd",
            Self::Intermediate => "itm",
            Self::Source => "src",
            Self::Destination => "dst",
        }
    }
}

impl std::fmt::Display for BufferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// One discovered buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDescriptor {
    /// Classification
    pub kind: BufferKind,
    /// Index within its kind (src0, src1, ...)
    pub slot_index: u32,
    /// Device address
    pub address: u64,
    /// Size in bytes, a multiple of the tile size
    pub size: u64,
    /// `size / TILE_SIZE`
    pub tile_count: u32,
}

/// Buffers in discovery (address) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferTable {
    buffers: Vec<BufferDescriptor>,
}

impl BufferTable {
    /// All buffers in address order.
    #[must_use]
    pub fn buffers(&self) -> &[BufferDescriptor] {
        &self.buffers
    }

    /// Buffers of one kind, in slot-index order.
    pub fn of_kind(&self, kind: BufferKind) -> impl Iterator<Item = &BufferDescriptor> {
        self.buffers.iter().filter(move |b| b.kind == kind)
    }

    /// Number of buffers of one kind.
    #[must_use]
    pub fn count(&self, kind: BufferKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Number of intermediate buffers.
    #[must_use]
    pub fn intermediates(&self) -> usize {
        self.count(BufferKind::Intermediate)
    }

    /// Number of source buffers.
    #[must_use]
    pub fn sources(&self) -> usize {
        self.count(BufferKind::Source)
    }

    /// Number of destination buffers.
    #[must_use]
    pub fn destinations(&self) -> usize {
        self.count(BufferKind::Destination)
    }
}

/// Walk the buffer records following a command region of `total_size` bytes.
///
/// # Errors
///
/// - [`AnecError::InvalidSize`] for a zero, unaligned or oversized buffer
/// - [`AnecError::UnknownBufferKind`] for an unrecognised ident tuple
/// - [`AnecError::InconsistentLayout`] if the kind counts are out of bounds
pub fn discover(words: &WordView, total_size: u64) -> Result<BufferTable> {
    let mut cursor = u64::from(BASE_ADDR) + round_up(total_size, TILE_SIZE);
    let mut buffers: Vec<BufferDescriptor> = Vec::with_capacity(SLOT_COUNT);

    for n in 0..SLOT_COUNT {
        let Some(pos) = u32::try_from(cursor).ok().and_then(|addr| words.find(addr)) else {
            break;
        };

        let rec = words.record(pos, record::BUFFER_LEN)?;
        let size = u64::from(rec[record::SIZE]);
        if size == 0 || size % TILE_SIZE != 0 || size >= MAX_BUFFER_TILES * TILE_SIZE {
            return Err(AnecError::invalid_size(
                format!("buffer @ 0x{cursor:x}"),
                size,
                format!(
                    "must be a non-zero multiple of 0x{TILE_SIZE:x} below 0x{:x}",
                    MAX_BUFFER_TILES * TILE_SIZE
                ),
            ));
        }

        let mut tuple = [0u32; record::IDENT_LEN];
        tuple.copy_from_slice(&rec[record::IDENT..record::BUFFER_LEN]);
        let kind = BufferKind::from_ident(tuple).ok_or(AnecError::UnknownBufferKind {
            address: cursor,
            ident: tuple,
        })?;

        let slot_index = buffers.iter().filter(|b| b.kind == kind).count() as u32;
        debug!(
            "BUF[{}]: {}{}: addr: 0x{:x} size: 0x{:x}",
            n, kind, slot_index, cursor, size
        );

        buffers.push(BufferDescriptor {
            kind,
            slot_index,
            address: cursor,
            size,
            tile_count: (size / TILE_SIZE) as u32,
        });
        cursor += size;
    }

    let table = BufferTable { buffers };
    check_counts(&table)?;
    Ok(table)
}

fn check_counts(table: &BufferTable) -> Result<()> {
    let (itm, src, dst) = (table.intermediates(), table.sources(), table.destinations());

    if src == 0 || dst == 0 || itm > MAX_INTERMEDIATE {
        return Err(AnecError::inconsistent(format!(
            "buffer counts out of bounds: {src} source(s), {dst} destination(s), \
             {itm} intermediate(s); need >= 1 source, >= 1 destination, <= {MAX_INTERMEDIATE} intermediate"
        )));
    }
    if src + dst > MAX_IO {
        return Err(AnecError::inconsistent(format!(
            "{src} source(s) + {dst} destination(s) exceed {MAX_IO} I/O slots"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: u32 = TILE_SIZE as u32;
    const FIRST: u32 = BASE_ADDR + TILE;

    /// Lay out buffer records 16 words apart starting at the first tile.
    fn words(records: &[([u32; 4], u32)]) -> WordView {
        let mut w = vec![0u32; 16 * (records.len() + 1)];
        let mut addr = FIRST;
        for (i, (tuple, size)) in records.iter().enumerate() {
            let at = 16 * i;
            w[at] = addr;
            w[at + 2] = *size;
            w[at + 8..at + 12].copy_from_slice(tuple);
            addr += size;
        }
        let bytes: Vec<u8> = w.iter().flat_map(|x| x.to_le_bytes()).collect();
        WordView::new(&bytes).unwrap()
    }

    #[test]
    fn test_discover_in_address_order() {
        let w = words(&[
            (ident::INTERMEDIATE, 2 * TILE),
            (ident::SOURCE, TILE),
            (ident::DESTINATION, 3 * TILE),
            (ident::SOURCE, TILE),
        ]);
        let table = discover(&w, 0x2b0).unwrap();

        assert_eq!(table.buffers().len(), 4);
        assert_eq!(table.intermediates(), 1);
        assert_eq!(table.sources(), 2);
        assert_eq!(table.destinations(), 1);

        let b = table.buffers();
        assert_eq!(b[0].address, u64::from(FIRST));
        assert_eq!(b[0].tile_count, 2);
        for pair in b.windows(2) {
            assert_eq!(pair[1].address, pair[0].address + pair[0].size);
        }

        let src: Vec<u32> = table.of_kind(BufferKind::Source).map(|b| b.slot_index).collect();
        assert_eq!(src, vec![0, 1]);
    }

    #[test]
    fn test_unknown_ident() {
        let w = words(&[(ident::SOURCE, TILE), ([9, 9, 9, 9], TILE)]);
        match discover(&w, 0x2b0) {
            Err(AnecError::UnknownBufferKind { address, ident }) => {
                assert_eq!(address, u64::from(FIRST + TILE));
                assert_eq!(ident, [9, 9, 9, 9]);
            }
            other => panic!("expected UnknownBufferKind, got {other:?}"),
        }
    }

    #[test]
    fn test_unaligned_size() {
        let w = words(&[(ident::SOURCE, TILE + 4)]);
        assert!(matches!(
            discover(&w, 0x2b0),
            Err(AnecError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_missing_destination() {
        let w = words(&[(ident::SOURCE, TILE)]);
        assert!(matches!(
            discover(&w, 0x2b0),
            Err(AnecError::InconsistentLayout { .. })
        ));
    }

    #[test]
    fn test_two_intermediates_rejected() {
        let w = words(&[
            (ident::INTERMEDIATE, TILE),
            (ident::INTERMEDIATE, TILE),
            (ident::SOURCE, TILE),
            (ident::DESTINATION, TILE),
        ]);
        assert!(matches!(
            discover(&w, 0x2b0),
            Err(AnecError::InconsistentLayout { .. })
        ));
    }

    #[test]
    fn test_kind_from_ident() {
        assert_eq!(BufferKind::from_ident([3, 3, 1, 4]), Some(BufferKind::Intermediate));
        assert_eq!(BufferKind::from_ident([1, 1, 1, 6]), Some(BufferKind::Source));
        assert_eq!(BufferKind::from_ident([2, 2, 1, 6]), Some(BufferKind::Destination));
        assert_eq!(BufferKind::from_ident([1, 1, 1, 4]), None);
    }
}
