//! Command region location
//!
//! Finds the task and kernel regions, the task-descriptor count, and the file
//! offset the descriptor table starts at. Nothing here is declared in an
//! index; every value is read out of a self-describing record found by
//! scanning for its address.

use crate::error::{AnecError, Result};
use crate::words::WordView;
use anec_format::align::{round_down, round_up};
use anec_format::hwx::{
    record, BASE_ADDR, DMA0_GRAN, PAGE_SIZE, TD_COUNT_LIMIT, TD_COUNT_MARKER, TD_MAGIC, TD_SIZE,
    WORD_SIZE,
};
use tracing::debug;

/// A contiguous device-address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Device address of the first byte
    pub start: u64,
    /// Size in bytes
    pub size: u64,
}

/// Where the task descriptors live and how many there are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskDescriptorInfo {
    /// Number of descriptors
    pub count: u32,
    /// Size of one descriptor
    pub entry_size: u32,
    /// File offset of the page holding the first descriptor
    pub table_start: u64,
}

impl TaskDescriptorInfo {
    /// File range of a body of `total_size` bytes starting at the table.
    #[must_use]
    pub fn body_range(&self, total_size: u64) -> std::ops::Range<u64> {
        self.table_start..self.table_start + total_size
    }
}

/// Task + kernel prefix of the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRegion {
    /// Task region
    pub task: Region,
    /// Kernel region, immediately after the 16-byte aligned task region
    pub kernel: Region,
    /// `round_up(task.size, 16) + kernel.size`
    pub total_size: u64,
    /// Descriptor table
    pub descriptors: TaskDescriptorInfo,
}

impl CommandRegion {
    /// File range of the body copied into the artifact.
    #[must_use]
    pub fn body_range(&self) -> std::ops::Range<u64> {
        self.descriptors.body_range(self.total_size)
    }
}

/// Locate the command region in `words`.
///
/// # Errors
///
/// - [`AnecError::RegionNotFound`] if a record or marker is missing
/// - [`AnecError::InvalidSize`] if a size or count is out of bounds
/// - [`AnecError::InconsistentLayout`] if the descriptor markers disagree
///   with the declared count or task size
pub fn locate(words: &WordView) -> Result<CommandRegion> {
    let task_size = task_size(words)?;
    let task_span = round_up(u64::from(task_size), DMA0_GRAN);

    let kernel_addr = u64::from(BASE_ADDR) + task_span;
    let kernel_size = kernel_size(words, kernel_addr)?;
    let total_size = task_span + u64::from(kernel_size);

    debug!(
        "task: 0x{:x} bytes, kernel: 0x{:x} bytes @ 0x{:x}, total: 0x{:x}",
        task_size, kernel_size, kernel_addr, total_size
    );

    let count = descriptor_count(words)?;
    let table_start = descriptor_table_start(words, count, task_size)?;
    debug!("{} task descriptor(s), table @ 0x{:x}", count, table_start);

    let region = CommandRegion {
        task: Region {
            start: u64::from(BASE_ADDR),
            size: u64::from(task_size),
        },
        kernel: Region {
            start: kernel_addr,
            size: u64::from(kernel_size),
        },
        total_size,
        descriptors: TaskDescriptorInfo {
            count,
            entry_size: TD_SIZE,
            table_start,
        },
    };

    let blob_len = (words.len() * WORD_SIZE) as u64;
    if region.body_range().end > blob_len {
        return Err(AnecError::inconsistent(format!(
            "body 0x{:x}..0x{:x} extends past end of blob (0x{:x} bytes)",
            region.body_range().start,
            region.body_range().end,
            blob_len
        )));
    }

    Ok(region)
}

/// Size word of the record at `index`.
fn size_at(words: &WordView, index: usize) -> Result<u32> {
    Ok(words.record(index, record::SIZE + 1)?[record::SIZE])
}

/// The second record at `BASE_ADDR` declares the task size.
fn task_size(words: &WordView) -> Result<u32> {
    let first = words
        .find(BASE_ADDR)
        .ok_or_else(|| AnecError::region_not_found(format!("base address 0x{BASE_ADDR:x}")))?;
    let pos = words.find_after(BASE_ADDR, first).ok_or_else(|| {
        AnecError::region_not_found(format!("task record (second 0x{BASE_ADDR:x})"))
    })?;

    let size = size_at(words, pos)?;
    if size == 0 || size < TD_SIZE {
        return Err(AnecError::invalid_size(
            "task",
            u64::from(size),
            format!("must be non-zero and at least 0x{TD_SIZE:x}"),
        ));
    }

    Ok(size)
}

fn kernel_size(words: &WordView, kernel_addr: u64) -> Result<u32> {
    let pos = u32::try_from(kernel_addr)
        .ok()
        .and_then(|addr| words.find(addr))
        .ok_or_else(|| AnecError::region_not_found(format!("kernel record @ 0x{kernel_addr:x}")))?;

    let size = size_at(words, pos)?;
    if size == 0 || u64::from(size) % DMA0_GRAN != 0 {
        return Err(AnecError::invalid_size(
            "kernel",
            u64::from(size),
            format!("must be a non-zero multiple of {DMA0_GRAN}"),
        ));
    }

    Ok(size)
}

/// Count word follows a `TD_COUNT_MARKER` two words after `BASE_ADDR`.
fn descriptor_count(words: &WordView) -> Result<u32> {
    let pos = words
        .find_all(TD_COUNT_MARKER)
        .into_iter()
        .find(|&i| i >= 2 && words.get(i - 2) == Some(BASE_ADDR))
        .ok_or_else(|| {
            AnecError::region_not_found(format!(
                "descriptor count marker 0x{TD_COUNT_MARKER:x} after 0x{BASE_ADDR:x}"
            ))
        })?;

    let count = words
        .get(pos + 1)
        .ok_or_else(|| AnecError::malformed("descriptor count truncated"))?;
    if count == 0 || count >= TD_COUNT_LIMIT {
        return Err(AnecError::invalid_size(
            "descriptor count",
            u64::from(count),
            format!("must be in [1, 0x{TD_COUNT_LIMIT:x})"),
        ));
    }

    Ok(count)
}

/// Cross-check the descriptor markers and return the table's page offset.
fn descriptor_table_start(words: &WordView, count: u32, task_size: u32) -> Result<u64> {
    let markers = words.find_all(TD_MAGIC);
    if markers.len() != count as usize {
        return Err(AnecError::inconsistent(format!(
            "expected {count} descriptor marker(s), found {}",
            markers.len()
        )));
    }

    // find_all is ascending and count >= 1
    let (low, high) = match (markers.first(), markers.last()) {
        (Some(&low), Some(&high)) => (low, high),
        _ => return Err(AnecError::inconsistent("no descriptor markers")),
    };

    let span = ((high - low) * WORD_SIZE) as u64;
    if span + u64::from(TD_SIZE) != u64::from(task_size) {
        return Err(AnecError::inconsistent(format!(
            "descriptor span 0x{span:x} + entry 0x{TD_SIZE:x} != task size 0x{task_size:x}"
        )));
    }

    Ok(round_down((low * WORD_SIZE) as u64, PAGE_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TASK: u32 = 0x280;
    const KERNEL: u32 = 0x30;

    /// Minimal command region: two descriptors three words apart at 0x1000.
    fn words() -> Vec<u32> {
        let mut w = vec![0u32; 0x500];
        w[4] = BASE_ADDR;
        w[6] = TD_COUNT_MARKER;
        w[7] = 2;
        w[16] = BASE_ADDR;
        w[18] = TASK;
        w[32] = BASE_ADDR + TASK;
        w[34] = KERNEL;
        w[0x400] = TD_MAGIC;
        w[0x403] = TD_MAGIC;
        w
    }

    fn view(words: &[u32]) -> WordView {
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        WordView::new(&bytes).unwrap()
    }

    #[test]
    fn test_locate() {
        let region = locate(&view(&words())).unwrap();
        assert_eq!(region.task.size, 0x280);
        assert_eq!(region.kernel.start, 0x3000_0280);
        assert_eq!(region.kernel.size, 0x30);
        assert_eq!(region.total_size, 0x2b0);
        assert_eq!(region.descriptors.count, 2);
        assert_eq!(region.descriptors.entry_size, TD_SIZE);
        assert_eq!(region.descriptors.table_start, 0x1000);
        assert_eq!(region.body_range(), 0x1000..0x12b0);
    }

    #[test]
    fn test_single_base_addr() {
        let mut w = words();
        w[16] = 0;
        assert!(matches!(
            locate(&view(&w)),
            Err(AnecError::RegionNotFound { .. })
        ));
    }

    #[test]
    fn test_task_smaller_than_descriptor() {
        let mut w = words();
        w[18] = TD_SIZE - 4;
        assert!(matches!(
            locate(&view(&w)),
            Err(AnecError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_kernel_unaligned() {
        let mut w = words();
        w[34] = 0x31;
        assert!(matches!(
            locate(&view(&w)),
            Err(AnecError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_count_marker_needs_base_addr() {
        let mut w = words();
        w[4] = 0;
        w[3] = BASE_ADDR;
        // base addresses are now at 3 and 16; the marker at 6 is orphaned
        assert!(matches!(
            locate(&view(&w)),
            Err(AnecError::RegionNotFound { .. })
        ));
    }

    #[test]
    fn test_zero_descriptor_count() {
        let mut w = words();
        w[7] = 0;
        assert!(matches!(
            locate(&view(&w)),
            Err(AnecError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_marker_count_mismatch() {
        let mut w = words();
        w[0x401] = TD_MAGIC;
        assert!(matches!(
            locate(&view(&w)),
            Err(AnecError::InconsistentLayout { .. })
        ));
    }

    #[test]
    fn test_marker_span_mismatch() {
        let mut w = words();
        w[0x403] = 0;
        w[0x404] = TD_MAGIC;
        assert!(matches!(
            locate(&view(&w)),
            Err(AnecError::InconsistentLayout { .. })
        ));
    }

    #[test]
    fn test_body_past_end() {
        let mut w = words();
        w.truncate(0x410);
        assert!(matches!(
            locate(&view(&w)),
            Err(AnecError::InconsistentLayout { .. })
        ));
    }
}
