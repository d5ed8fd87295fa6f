#![deny(unsafe_code)]

//! HWX → ANEC layout converter
//!
//! A compiled ANE program (`.hwx`) does not say where anything is. This crate
//! recovers its memory layout by scanning for self-describing records and
//! compiler debug symbols, cross-checks the two views, and re-encodes the
//! result as an ANEC artifact: a fixed 4096-byte header followed by the task
//! and kernel bytes.
//!
//! # Pipeline
//!
//! ```text
//! bytes ─┬─ WordView ─┬─ regions::locate ──┐
//!        │            └─ buffers::discover ┼─ reconcile ─ ProgramLayout ─ serialize ─ OutputArtifact
//!        └─ symbols::extract_shapes ───────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use anec_convert::{serialize, ProgramLayout};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let blob = std::fs::read("model.hwx")?;
//! let layout = ProgramLayout::from_bytes(&blob, false)?;
//!
//! println!("inputs: {}", layout.source_count);
//! println!("outputs: {}", layout.destination_count);
//!
//! let artifact = serialize(&layout, &blob)?;
//! artifact.write_to(std::fs::File::create("model.anec")?)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]

mod artifact;
mod buffers;
mod error;
mod layout;
mod name;
mod reconcile;
mod regions;
pub mod render;
mod symbols;
mod words;

pub use artifact::{serialize, ArtifactHeader, OutputArtifact};
pub use buffers::{BufferDescriptor, BufferKind, BufferTable};
pub use error::{AnecError, Result};
pub use layout::{convert, read_blob, Diagnostic, ProgramLayout, Slot};
pub use name::{name_from_path, sanitize_name, DEFAULT_NAME};
pub use regions::{CommandRegion, Region, TaskDescriptorInfo};
pub use symbols::{extract_shapes, parse_symbol, TensorShape};
pub use words::WordView;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{convert, serialize, OutputArtifact, ProgramLayout, Result, TensorShape};
}
