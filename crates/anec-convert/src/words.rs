//! Little-endian word view over a blob
//!
//! Every structural scan in the converter is a search for a sentinel word.
//! Region boundaries depend on which occurrence comes first, so all queries
//! keep first-match-in-order semantics.

use crate::error::{AnecError, Result};
use anec_format::hwx::WORD_SIZE;

/// Immutable view of a byte buffer as `u32` words.
#[derive(Debug, Clone)]
pub struct WordView {
    words: Vec<u32>,
}

impl WordView {
    /// Decode `data` into words.
    ///
    /// # Errors
    ///
    /// Returns [`AnecError::MalformedInput`] if the length is not a multiple
    /// of the word size.
    pub fn new(data: &[u8]) -> Result<Self> {
        if data.len() % WORD_SIZE != 0 {
            return Err(AnecError::malformed(format!(
                "blob length {} is not a multiple of {WORD_SIZE}",
                data.len()
            )));
        }

        let words = data
            .chunks_exact(WORD_SIZE)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect();

        Ok(Self { words })
    }

    /// Number of words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True if the blob is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Word at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u32> {
        self.words.get(index).copied()
    }

    /// Index of the first word equal to `value`.
    #[must_use]
    pub fn find(&self, value: u32) -> Option<usize> {
        self.words.iter().position(|&w| w == value)
    }

    /// Index of the first word equal to `value` strictly after `index`.
    #[must_use]
    pub fn find_after(&self, value: u32, index: usize) -> Option<usize> {
        let start = index.checked_add(1)?;
        self.words
            .get(start..)?
            .iter()
            .position(|&w| w == value)
            .map(|i| start + i)
    }

    /// Indices of every word equal to `value`, ascending.
    #[must_use]
    pub fn find_all(&self, value: u32) -> Vec<usize> {
        self.words
            .iter()
            .enumerate()
            .filter(|&(_, &w)| w == value)
            .map(|(i, _)| i)
            .collect()
    }

    /// `len` words starting at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`AnecError::MalformedInput`] if the record runs past the end
    /// of the blob.
    pub fn record(&self, index: usize, len: usize) -> Result<&[u32]> {
        index
            .checked_add(len)
            .and_then(|end| self.words.get(index..end))
            .ok_or_else(|| {
                AnecError::malformed(format!(
                    "record at word {index} truncated ({len} words needed, {} available)",
                    self.words.len().saturating_sub(index)
                ))
            })
    }
}
