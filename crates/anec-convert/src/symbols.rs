//! Tensor shapes from compiler debug symbols
//!
//! The compiler leaves stabs-style type strings in the blob, one per input
//! and output tensor. Each encodes the NCHW extents and, for C and H, the
//! plane and row strides the hardware will use:
//!
//! ```text
//! <name>:t<..>;<..>;<N>;n:<..>;<..>;<C>;=s<plane>c:<..>;<..>;<H>;=s<row>h:<..>;<..>;<W>;w:5
//! ```
//!
//! The strings are found the way `strings -n 50 | grep ':t.*:5$'` would find
//! them, on the raw bytes rather than on word boundaries.

use crate::error::{AnecError, Result};
use anec_format::align::{checked_round_up, round_up};
use anec_format::hwx::{symbol, MIN_SYMBOL_LEN};
use tracing::debug;

/// Row and plane strides are aligned to this many bytes.
const STRIDE_ALIGN: u64 = 64;

/// Bytes per element (fp16).
const ELEMENT_SIZE: u64 = 2;

/// NCHW tensor shape with hardware strides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorShape {
    /// Batch
    pub n: u32,
    /// Channels
    pub c: u32,
    /// Height
    pub h: u32,
    /// Width
    pub w: u32,
    /// `round_up(w * 2, 64)`
    pub row_stride: u32,
    /// `round_up(row_stride * h, 64)`
    pub plane_stride: u32,
    /// Text before the first `:t`
    pub name: String,
}

impl TensorShape {
    /// Build a shape from its extents, deriving both strides.
    ///
    /// # Errors
    ///
    /// Returns [`AnecError::MalformedInput`] if a stride overflows `u32`.
    pub fn new(name: impl Into<String>, n: u32, c: u32, h: u32, w: u32) -> Result<Self> {
        let row = round_up(u64::from(w) * ELEMENT_SIZE, STRIDE_ALIGN);
        let plane = row
            .checked_mul(u64::from(h))
            .and_then(|p| checked_round_up(p, STRIDE_ALIGN));

        let name = name.into();
        let (Ok(row_stride), Some(Ok(plane_stride))) =
            (u32::try_from(row), plane.map(u32::try_from))
        else {
            return Err(AnecError::malformed(format!(
                "{name}: strides for {h}x{w} overflow"
            )));
        };

        Ok(Self {
            n,
            c,
            h,
            w,
            row_stride,
            plane_stride,
            name,
        })
    }

    /// Bytes the tensor occupies, before tile rounding.
    #[must_use]
    pub fn footprint(&self) -> Option<u64> {
        u64::from(self.n)
            .checked_mul(u64::from(self.c))?
            .checked_mul(u64::from(self.plane_stride))
    }

    /// The six header fields: N, C, H, W, row stride, plane stride.
    #[must_use]
    pub fn fields(&self) -> [u64; 6] {
        [
            u64::from(self.n),
            u64::from(self.c),
            u64::from(self.h),
            u64::from(self.w),
            u64::from(self.row_stride),
            u64::from(self.plane_stride),
        ]
    }
}

impl std::fmt::Display for TensorShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {}, {})", self.n, self.c, self.h, self.w)
    }
}

/// Extract every shape symbol from `data`, in blob order.
///
/// # Errors
///
/// Returns [`AnecError::MalformedInput`] if fewer than two symbols are found
/// or any of them fails to parse.
pub fn extract_shapes(data: &[u8]) -> Result<Vec<TensorShape>> {
    let stabs: Vec<&str> = printable_runs(data, MIN_SYMBOL_LEN)
        .filter(|run| is_shape_symbol(run))
        .collect();

    if stabs.len() < 2 {
        return Err(AnecError::malformed(format!(
            "found {} shape symbol(s), need at least 2",
            stabs.len()
        )));
    }

    stabs
        .iter()
        .enumerate()
        .map(|(i, stab)| {
            let shape = parse_symbol(stab)?;
            debug!(
                "STAB{}: {}: NCHW: {} rS: 0x{:x} pS: 0x{:x}",
                i, shape.name, shape, shape.row_stride, shape.plane_stride
            );
            Ok(shape)
        })
        .collect()
}

/// Maximal runs of printable ASCII of at least `min_len` bytes.
pub fn printable_runs(data: &[u8], min_len: usize) -> impl Iterator<Item = &str> {
    data.split(|&b| !is_printable(b))
        .filter(move |run| run.len() >= min_len)
        .filter_map(|run| std::str::from_utf8(run).ok())
}

fn is_printable(b: u8) -> bool {
    b.is_ascii_graphic() || b == b' ' || b == b'\t'
}

/// `:t` somewhere before a terminating `:5`.
fn is_shape_symbol(run: &str) -> bool {
    run.strip_suffix(symbol::TERMINATOR)
        .is_some_and(|head| head.contains(symbol::TYPE_MARK))
}

/// Parse one shape symbol.
///
/// # Errors
///
/// Returns [`AnecError::MalformedInput`] if the dimension fields are missing,
/// mislabelled, non-numeric, or carry strides that disagree with the
/// extents.
pub fn parse_symbol(stab: &str) -> Result<TensorShape> {
    let fields: Vec<&str> = stab.split(':').collect();
    if fields.len() < 6 {
        return Err(AnecError::malformed(format!(
            "symbol has {} fields, need at least 6: {stab}",
            fields.len()
        )));
    }

    let dims = &fields[fields.len() - 5..fields.len() - 1];
    for (field, label) in dims.iter().zip(['n', 'c', 'h', 'w']) {
        if !field.ends_with(label) {
            return Err(AnecError::malformed(format!(
                "dimension field {field:?} should end with '{label}'"
            )));
        }
    }

    let n = extent(dims[0])?;
    let c = extent(dims[1])?;
    let h = extent(dims[2])?;
    let w = extent(dims[3])?;

    let name = stab
        .split_once(symbol::TYPE_MARK)
        .map_or(stab, |(name, _)| name);
    let shape = TensorShape::new(name, n, c, h, w)?;

    let plane = stride(dims[1], 'c')?;
    let row = stride(dims[2], 'h')?;
    if plane != u64::from(shape.plane_stride) || row != u64::from(shape.row_stride) {
        return Err(AnecError::malformed(format!(
            "{}: encoded strides (row 0x{row:x}, plane 0x{plane:x}) != derived \
             (row 0x{:x}, plane 0x{:x})",
            shape.name, shape.row_stride, shape.plane_stride
        )));
    }

    Ok(shape)
}

/// Third `;`-separated value of a dimension field.
fn extent(field: &str) -> Result<u32> {
    field
        .split(';')
        .nth(2)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| AnecError::malformed(format!("no extent in field {field:?}")))
}

/// Value between `=s` and the trailing dimension label.
fn stride(field: &str, label: char) -> Result<u64> {
    field
        .split_once(symbol::STRIDE_MARK)
        .and_then(|(_, rest)| rest.strip_suffix(label))
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| AnecError::malformed(format!("no stride in field {field:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = "image_ar1:t1=ar1;0;1;n:ar1;0;3;=s100352c:ar1;0;224;=s448h:ar1;0;224;w:5";
    const OUTPUT: &str = "logits_ar1:t2=ar1;0;1;n:ar1;0;1000;=s64c:ar1;0;1;=s64h:ar1;0;1;w:5";

    #[test]
    fn test_parse_symbol() {
        let shape = parse_symbol(INPUT).unwrap();
        assert_eq!(shape.name, "image_ar1");
        assert_eq!((shape.n, shape.c, shape.h, shape.w), (1, 3, 224, 224));
        assert_eq!(shape.row_stride, 448);
        assert_eq!(shape.plane_stride, 100_352);
        assert_eq!(shape.footprint(), Some(301_056));
    }

    #[test]
    fn test_stride_mismatch() {
        let bad = INPUT.replace("=s448h", "=s512h");
        assert!(matches!(
            parse_symbol(&bad),
            Err(AnecError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_mislabelled_field() {
        let bad = INPUT.replace(";w:5", ";x:5");
        assert!(matches!(
            parse_symbol(&bad),
            Err(AnecError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_non_numeric_extent() {
        let bad = INPUT.replace(";0;3;", ";0;three;");
        assert!(matches!(
            parse_symbol(&bad),
            Err(AnecError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_extract_shapes_in_blob_order() {
        let mut data = vec![0u8; 16];
        data.extend_from_slice(INPUT.as_bytes());
        data.extend_from_slice(&[0, 0xff, 0]);
        data.extend_from_slice(b"short:t:5");
        data.push(0);
        data.extend_from_slice(OUTPUT.as_bytes());
        data.push(0);

        let shapes = extract_shapes(&data).unwrap();
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].name, "image_ar1");
        assert_eq!(shapes[1].name, "logits_ar1");
        assert_eq!(shapes[1].c, 1000);
    }

    #[test]
    fn test_symbol_needs_terminator() {
        let mut data = INPUT.as_bytes().to_vec();
        data.extend_from_slice(b"9");
        data.push(0);
        data.extend_from_slice(OUTPUT.as_bytes());
        assert!(matches!(
            extract_shapes(&data),
            Err(AnecError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_printable_runs() {
        let data = b"abc\x00defgh\x01ij\tkl";
        let runs: Vec<&str> = printable_runs(data, 4).collect();
        assert_eq!(runs, vec!["defgh", "ij\tkl"]);
    }
}
