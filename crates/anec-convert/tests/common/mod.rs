//! Synthetic HWX blob builder
//!
//! Word layout:
//!
//! ```text
//! word  4     BASE_ADDR, TD_COUNT_MARKER at 6, descriptor count at 7
//! word 16     BASE_ADDR, task size at 18
//! word 32     kernel address, kernel size at 34
//! word 48+    buffer records, 16 words apart
//! 0x1000      descriptor table page (body starts here)
//! 0x2000      shape symbols, NUL separated
//! ```

#![allow(dead_code)]

use anec_format::align::round_up;
use anec_format::hwx::{
    ident, BASE_ADDR, DMA0_GRAN, TD_COUNT_MARKER, TD_MAGIC, TD_SIZE, TILE_SIZE,
};

pub const TILE: u32 = TILE_SIZE as u32;
pub const BODY_START: usize = 0x1000;
const SYMBOL_START: usize = 0x2000;

/// 1x3x224x224, 19 tiles.
pub fn image_symbol(name: &str) -> String {
    symbol(name, 1, 3, 224, 224)
}

/// 1x1000x1x1, 4 tiles.
pub fn logits_symbol(name: &str) -> String {
    symbol(name, 1, 1000, 1, 1)
}

/// 1x1x16x32, exactly one tile.
pub fn small_symbol(name: &str) -> String {
    symbol(name, 1, 1, 16, 32)
}

/// Debug symbol for an NCHW tensor with consistent strides.
pub fn symbol(name: &str, n: u32, c: u32, h: u32, w: u32) -> String {
    let row = round_up(u64::from(w) * 2, 64);
    let plane = round_up(row * u64::from(h), 64);
    format!(
        "{name}:t1=ar1;0;{n};n:ar1;0;{c};=s{plane}c:ar1;0;{h};=s{row}h:ar1;0;{w};w:5"
    )
}

#[derive(Debug, Clone)]
pub struct BlobBuilder {
    pub task_size: u32,
    pub kernel_size: u32,
    pub td_count: u32,
    pub declared_td_count: Option<u32>,
    pub buffers: Vec<([u32; 4], u32)>,
    pub symbols: Vec<String>,
}

impl Default for BlobBuilder {
    fn default() -> Self {
        Self {
            task_size: 0x280,
            kernel_size: 0x30,
            td_count: 2,
            declared_td_count: None,
            buffers: Vec::new(),
            symbols: Vec::new(),
        }
    }
}

impl BlobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, tiles: u32) -> Self {
        self.buffers.push((ident::SOURCE, tiles * TILE));
        self
    }

    pub fn destination(mut self, tiles: u32) -> Self {
        self.buffers.push((ident::DESTINATION, tiles * TILE));
        self
    }

    pub fn intermediate(mut self, tiles: u32) -> Self {
        self.buffers.push((ident::INTERMEDIATE, tiles * TILE));
        self
    }

    pub fn symbol(mut self, stab: impl Into<String>) -> Self {
        self.symbols.push(stab.into());
        self
    }

    /// Declare a descriptor count different from the markers laid down.
    pub fn declare_td_count(mut self, count: u32) -> Self {
        self.declared_td_count = Some(count);
        self
    }

    pub fn total_size(&self) -> u64 {
        round_up(u64::from(self.task_size), DMA0_GRAN) + u64::from(self.kernel_size)
    }

    pub fn build(&self) -> Vec<u8> {
        let task_span = round_up(u64::from(self.task_size), DMA0_GRAN) as u32;
        let mut w = vec![0u32; SYMBOL_START / 4];

        w[4] = BASE_ADDR;
        w[6] = TD_COUNT_MARKER;
        w[7] = self.declared_td_count.unwrap_or(self.td_count);
        w[16] = BASE_ADDR;
        w[18] = self.task_size;
        w[32] = BASE_ADDR + task_span;
        w[34] = self.kernel_size;

        let mut addr = BASE_ADDR + round_up(self.total_size(), TILE_SIZE) as u32;
        for (i, (tuple, size)) in self.buffers.iter().enumerate() {
            let at = 48 + 16 * i;
            w[at] = addr;
            w[at + 2] = *size;
            w[at + 8..at + 12].copy_from_slice(tuple);
            addr += size;
        }

        // body filler that never matches a marker or an address
        let low = BODY_START / 4;
        let body_words = self.total_size() as usize / 4;
        for (i, word) in w[low..low + body_words].iter_mut().enumerate() {
            *word = 0xa5a5_0000 | i as u32;
        }

        let span = (self.task_size - TD_SIZE) as usize / 4;
        w[low] = TD_MAGIC;
        if self.td_count > 1 {
            for k in 1..self.td_count as usize - 1 {
                w[low + k] = TD_MAGIC;
            }
            w[low + span] = TD_MAGIC;
        }

        let mut bytes: Vec<u8> = w.iter().flat_map(|x| x.to_le_bytes()).collect();
        for stab in &self.symbols {
            bytes.extend_from_slice(stab.as_bytes());
            bytes.extend_from_slice(&[0, 0]);
        }
        while bytes.len() % 4 != 0 {
            bytes.push(0);
        }
        bytes
    }
}

/// One image input, one logits output.
pub fn classifier() -> BlobBuilder {
    BlobBuilder::new()
        .source(19)
        .destination(4)
        .symbol(image_symbol("input_image_ar1"))
        .symbol(logits_symbol("output_logits_ar1"))
}
