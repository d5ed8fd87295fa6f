//! Reconciled program layout

use crate::buffers::{self, BufferDescriptor, BufferKind};
use crate::error::{AnecError, Result};
use crate::reconcile::reconcile;
use crate::regions::{self, Region, TaskDescriptorInfo};
use crate::symbols::{self, TensorShape};
use crate::words::WordView;
use anec_format::hwx::MLMODEL_EXTENSION;
use anec_format::slots::SLOT_COUNT;
use std::fs;
use std::path::{Path, PathBuf};

/// One populated entry of the slot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Tiles occupied
    pub tiles: u32,
    /// What lives there
    pub kind: BufferKind,
}

impl From<&BufferDescriptor> for Slot {
    fn from(buf: &BufferDescriptor) -> Self {
        Self {
            tiles: buf.tile_count,
            kind: buf.kind,
        }
    }
}

/// Non-fatal findings, returned to the caller instead of only logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A `ctx_` tensor was accepted because the caller forced conversion
    SuspectedUnresolvedLayerBypassed {
        /// Source buffer count
        inputs: u32,
        /// Offending tensor name
        name: String,
    },

    /// The input looks like the CoreML model rather than the compiled blob
    UnexpectedInputExtension {
        /// Input path
        path: PathBuf,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SuspectedUnresolvedLayerBypassed { inputs, name } => write!(
                f,
                "bypassed suspected CPU layer {name} ({inputs} inputs declared)"
            ),
            Self::UnexpectedInputExtension { path } => write!(
                f,
                "{} looks like a CoreML model; pass the compiled hwx instead",
                path.display()
            ),
        }
    }
}

/// Memory layout recovered from a compiled program.
///
/// Immutable once built. Slot numbering follows [`anec_format::slots`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramLayout {
    /// `round_up(task, 16) + kernel`
    pub total_size: u64,
    /// Task region
    pub task: Region,
    /// Kernel region
    pub kernel: Region,
    /// Task descriptor table
    pub descriptors: TaskDescriptorInfo,
    /// Intermediate buffer count (0 or 1)
    pub intermediate_count: u32,
    /// Source buffer count
    pub source_count: u32,
    /// Destination buffer count
    pub destination_count: u32,
    /// Slot table
    pub slots: [Option<Slot>; SLOT_COUNT],
    /// Shapes, populated for source and destination slots only
    pub shapes: [Option<TensorShape>; SLOT_COUNT],
    /// Warnings raised during conversion
    pub diagnostics: Vec<Diagnostic>,
}

impl ProgramLayout {
    /// Reconstruct the layout of a compiled blob.
    ///
    /// # Errors
    ///
    /// Returns the first structural check that fails; see [`AnecError`].
    pub fn from_bytes(data: &[u8], force: bool) -> Result<Self> {
        tracing::debug!("Converting blob ({} bytes)", data.len());

        let words = WordView::new(data)?;
        let region = regions::locate(&words)?;
        let buffers = buffers::discover(&words, region.total_size)?;
        let shapes = symbols::extract_shapes(data)?;

        reconcile(&region, &buffers, shapes, force)
    }

    /// Read and convert a blob from disk.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or converted.
    pub fn from_file<P: AsRef<Path>>(path: P, force: bool) -> Result<Self> {
        let path = path.as_ref();
        let data = read_blob(path)?;
        Self::from_input(path, &data, force)
    }

    /// Convert bytes already read from `path`.
    ///
    /// The path is only consulted for its extension: a `.mlmodel` input is
    /// still converted, but carries an [`Diagnostic::UnexpectedInputExtension`].
    ///
    /// # Errors
    ///
    /// See [`ProgramLayout::from_bytes`].
    pub fn from_input(path: &Path, data: &[u8], force: bool) -> Result<Self> {
        let mlmodel = path
            .extension()
            .is_some_and(|ext| ext == MLMODEL_EXTENSION);
        if mlmodel {
            tracing::warn!("pass the hwx output of coreml2hwx, not the .mlmodel");
        }

        let mut layout = Self::from_bytes(data, force)?;
        if mlmodel {
            layout.diagnostics.push(Diagnostic::UnexpectedInputExtension {
                path: path.to_path_buf(),
            });
        }

        Ok(layout)
    }

    /// Populated slots with their index.
    pub fn populated(&self) -> impl Iterator<Item = (usize, &Slot)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
    }

    /// Tile count per slot, zero where unpopulated.
    #[must_use]
    pub fn tiles(&self) -> [u32; SLOT_COUNT] {
        std::array::from_fn(|i| self.slots[i].map_or(0, |s| s.tiles))
    }

    /// File range of the body within the source blob.
    #[must_use]
    pub fn body_range(&self) -> std::ops::Range<u64> {
        self.descriptors.body_range(self.total_size)
    }
}

/// Read a compiled blob from disk.
///
/// # Errors
///
/// Returns [`AnecError::FileNotFound`] if `path` does not exist, or
/// [`AnecError::Io`] if it cannot be read.
pub fn read_blob<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();

    tracing::info!("Loading blob from: {}", path.display());

    if !path.exists() {
        return Err(AnecError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    Ok(fs::read(path)?)
}

/// Reconstruct the layout of a compiled blob.
///
/// # Errors
///
/// See [`ProgramLayout::from_bytes`].
pub fn convert(blob: &[u8], force: bool) -> Result<ProgramLayout> {
    ProgramLayout::from_bytes(blob, force)
}
