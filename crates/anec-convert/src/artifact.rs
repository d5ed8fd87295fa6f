//! ANEC artifact encoding
//!
//! An artifact is the fixed 4096-byte header described in
//! [`anec_format::header`] followed by the command region bytes copied
//! verbatim out of the source blob. Loaders find the body by the header
//! size, never by scanning.

use crate::error::{AnecError, Result};
use crate::layout::ProgramLayout;
use anec_format::header::{offset, CAPACITY, NCHW_FIELDS, USED};
use anec_format::slots::SLOT_COUNT;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Write;

/// Decoded header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHeader {
    /// Body size
    pub total_size: u64,
    /// Task-descriptor entry size
    pub td_size: u32,
    /// Task-descriptor count
    pub td_count: u32,
    /// Task size
    pub tsk_size: u64,
    /// Kernel size
    pub krn_size: u64,
    /// Source count
    pub src_count: u32,
    /// Destination count
    pub dst_count: u32,
    /// Tile count per slot
    pub tiles: [u32; SLOT_COUNT],
    /// N, C, H, W, row stride, plane stride per slot
    pub nchw: [[u64; NCHW_FIELDS]; SLOT_COUNT],
}

impl From<&ProgramLayout> for ArtifactHeader {
    fn from(layout: &ProgramLayout) -> Self {
        Self {
            total_size: layout.total_size,
            td_size: layout.descriptors.entry_size,
            td_count: layout.descriptors.count,
            tsk_size: layout.task.size,
            krn_size: layout.kernel.size,
            src_count: layout.source_count,
            dst_count: layout.destination_count,
            tiles: layout.tiles(),
            nchw: std::array::from_fn(|i| {
                layout.shapes[i]
                    .as_ref()
                    .map_or([0; NCHW_FIELDS], |s| s.fields())
            }),
        }
    }
}

impl ArtifactHeader {
    /// Encode to exactly [`CAPACITY`] bytes.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(CAPACITY);

        buf.put_u64_le(self.total_size);
        buf.put_u32_le(self.td_size);
        buf.put_u32_le(self.td_count);
        buf.put_u64_le(self.tsk_size);
        buf.put_u64_le(self.krn_size);
        buf.put_u32_le(self.src_count);
        buf.put_u32_le(self.dst_count);

        debug_assert_eq!(buf.len(), offset::TILES);
        for &tiles in &self.tiles {
            buf.put_u32_le(tiles);
        }

        debug_assert_eq!(buf.len(), offset::NCHW);
        for field in self.nchw.iter().flatten() {
            buf.put_u64_le(*field);
        }

        debug_assert_eq!(buf.len(), USED);
        buf.put_bytes(0, CAPACITY - USED);
        buf.freeze()
    }

    /// Decode the header at the start of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`AnecError::MalformedInput`] if `data` is shorter than the
    /// header capacity.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < CAPACITY {
            return Err(AnecError::malformed(format!(
                "artifact is {} bytes, header alone is {CAPACITY}",
                data.len()
            )));
        }

        let mut buf = &data[..USED];
        let total_size = buf.get_u64_le();
        let td_size = buf.get_u32_le();
        let td_count = buf.get_u32_le();
        let tsk_size = buf.get_u64_le();
        let krn_size = buf.get_u64_le();
        let src_count = buf.get_u32_le();
        let dst_count = buf.get_u32_le();
        let tiles = std::array::from_fn(|_| buf.get_u32_le());
        let nchw = std::array::from_fn(|_| std::array::from_fn(|_| buf.get_u64_le()));

        Ok(Self {
            total_size,
            td_size,
            td_count,
            tsk_size,
            krn_size,
            src_count,
            dst_count,
            tiles,
            nchw,
        })
    }
}

/// Header + body pair ready to write or embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    /// Fixed-size header
    pub header: Bytes,
    /// Command region bytes from the source blob
    pub body: Bytes,
}

impl OutputArtifact {
    /// Total length of header + body.
    #[must_use]
    pub fn len(&self) -> usize {
        self.header.len() + self.body.len()
    }

    /// True if both parts are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.body.is_empty()
    }

    /// Header followed by body as one buffer.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.body);
        out
    }

    /// Stream header then body into `w`.
    ///
    /// # Errors
    ///
    /// Returns the first write error.
    pub fn write_to<W: Write>(&self, mut w: W) -> Result<()> {
        w.write_all(&self.header)?;
        w.write_all(&self.body)?;
        w.flush()?;
        Ok(())
    }

    /// Split a written artifact back into its header and body.
    ///
    /// # Errors
    ///
    /// Returns [`AnecError::MalformedInput`] if the data is shorter than the
    /// header plus its declared body size.
    pub fn parse(data: &[u8]) -> Result<(ArtifactHeader, &[u8])> {
        let header = ArtifactHeader::parse(data)?;
        let body = usize::try_from(header.total_size)
            .ok()
            .and_then(|size| data.get(CAPACITY..CAPACITY.checked_add(size)?))
            .ok_or_else(|| {
                AnecError::malformed(format!(
                    "body truncated: header declares 0x{:x} bytes, 0x{:x} present",
                    header.total_size,
                    data.len() - CAPACITY
                ))
            })?;
        Ok((header, body))
    }
}

/// Encode `layout` and copy its body out of `blob`.
///
/// # Errors
///
/// Returns [`AnecError::InconsistentLayout`] if the body range does not fit
/// inside `blob`.
pub fn serialize(layout: &ProgramLayout, blob: &[u8]) -> Result<OutputArtifact> {
    let range = layout.body_range();
    let body = usize::try_from(range.start)
        .ok()
        .zip(usize::try_from(range.end).ok())
        .and_then(|(start, end)| blob.get(start..end))
        .ok_or_else(|| {
            AnecError::inconsistent(format!(
                "body 0x{:x}..0x{:x} outside blob of 0x{:x} bytes",
                range.start,
                range.end,
                blob.len()
            ))
        })?;

    tracing::debug!(
        "artifact: header 0x{:x} + body 0x{:x} from 0x{:x}",
        CAPACITY,
        body.len(),
        range.start
    );

    Ok(OutputArtifact {
        header: ArtifactHeader::from(layout).encode(),
        body: Bytes::copy_from_slice(body),
    })
}
