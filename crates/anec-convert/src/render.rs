//! C source rendering of a layout
//!
//! The runtime side links the artifact in with `ld -r -b binary` and describes
//! it with a `struct ane_model`. These helpers print that description; they
//! do not compile or link anything.

use crate::buffers::BufferKind;
use crate::layout::ProgramLayout;
use anec_format::align::round_up;
use anec_format::hwx::TILE_SIZE;
use anec_format::slots;
use std::fmt;

fn tile_type(kind: BufferKind) -> &'static str {
    match kind {
        BufferKind::Command => "ANE_TILE_CMD",
        BufferKind::Intermediate => "ANE_TILE_ITM",
        BufferKind::Source => "ANE_TILE_SRC",
        BufferKind::Destination => "ANE_TILE_DST",
    }
}

/// Per-kind label for a slot, e.g. `dst0`.
fn slot_label(layout: &ProgramLayout, slot: usize, kind: BufferKind) -> String {
    let index = match kind {
        BufferKind::Command => return "cmd".to_string(),
        BufferKind::Intermediate => slot - slots::INTERMEDIATE,
        BufferKind::Destination => slot - slots::FIRST_IO,
        BufferKind::Source => slot - slots::FIRST_IO - layout.destination_count as usize,
    };
    format!("{kind}{index}")
}

/// `static const struct ane_model anec_<name> = { ... };`
#[must_use]
pub fn render_struct(layout: &ProgramLayout, name: &str) -> String {
    ModelStruct { layout, name }.to_string()
}

/// Include-guarded header declaring the embedded body and its init call.
#[must_use]
pub fn render_header(layout: &ProgramLayout, name: &str) -> String {
    ModelHeader { layout, name }.to_string()
}

struct ModelStruct<'a> {
    layout: &'a ProgramLayout,
    name: &'a str,
}

impl fmt::Display for ModelStruct<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { layout, name } = *self;

        writeln!(f)?;
        writeln!(f, "static const struct ane_model anec_{name} = {{")?;
        writeln!(f, "\t.name = \"{name}\",")?;
        writeln!(f, "\t.input_count = {},", layout.source_count)?;
        writeln!(f, "\t.output_count = {},", layout.destination_count)?;

        writeln!(f, "\t.anec = {{")?;
        writeln!(f, "\t\t.size = 0x{:x},", layout.total_size)?;
        writeln!(f, "\t\t.td_size = 0x{:x},", layout.descriptors.entry_size)?;
        writeln!(f, "\t\t.td_count = 0x{:x},", layout.descriptors.count)?;
        writeln!(f, "\t\t.tsk_size = 0x{:x},", layout.task.size)?;
        writeln!(f, "\t\t.krn_size = 0x{:x},", layout.kernel.size)?;

        for (i, slot) in layout.populated() {
            let comment = if slot.kind == BufferKind::Command {
                format!("0x{:x}", round_up(layout.total_size, TILE_SIZE))
            } else {
                let bytes = u64::from(slot.tiles) * TILE_SIZE;
                format!("{} 0x{bytes:x}", slot_label(layout, i, slot.kind))
            };
            writeln!(f, "\t\t.tiles[{i}] = {}, /* {comment} */", slot.tiles)?;
        }
        for (i, slot) in layout.populated() {
            writeln!(f, "\t\t.types[{i}] = {},", tile_type(slot.kind))?;
        }
        writeln!(f, "\t}},")?;

        writeln!(f, "\t.data = &_binary_{name}_anec_start,")?;
        // runtime field order: plane stride before row stride
        for (i, slot) in layout.populated() {
            if let Some(shape) = &layout.shapes[i] {
                writeln!(
                    f,
                    "\t.nchw[{i}] = {{{}, {}, {}, {}, 0x{:x}, 0x{:x}}}, /* {} */",
                    shape.n,
                    shape.c,
                    shape.h,
                    shape.w,
                    shape.plane_stride,
                    shape.row_stride,
                    slot_label(layout, i, slot.kind)
                )?;
            }
        }
        writeln!(f, "}};")
    }
}

struct ModelHeader<'a> {
    layout: &'a ProgramLayout,
    name: &'a str,
}

impl fmt::Display for ModelHeader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { layout, name } = *self;
        let guard = format!("__ANEC_{}_H__", name.to_ascii_uppercase());

        writeln!(f, "#ifndef {guard}")?;
        writeln!(f, "#define {guard}")?;
        writeln!(f)?;
        writeln!(f, "#include \"ane.h\"")?;
        writeln!(f)?;
        writeln!(f, "extern char _binary_{name}_anec_start[];")?;
        writeln!(f, "extern char _binary_{name}_anec_end[];")?;
        write!(f, "{}", ModelStruct { layout, name })?;
        writeln!(f)?;
        writeln!(
            f,
            "struct ane_nn *ane_init_{name}(void) {{ return ane_init(&anec_{name}); }}"
        )?;
        writeln!(f)?;
        writeln!(f, "#endif /* {guard} */")
    }
}
