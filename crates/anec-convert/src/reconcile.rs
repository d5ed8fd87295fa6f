//! Buffer / shape reconciliation
//!
//! The buffer walk and the debug symbols are two independent views of the
//! same tensors. They are paired by order: sources first, then destinations.
//! Some targets list the destination symbols first, so a failed pairing is
//! retried exactly once with that block moved back behind the sources.

use crate::buffers::{BufferDescriptor, BufferKind, BufferTable};
use crate::error::{AnecError, Result};
use crate::layout::{Diagnostic, ProgramLayout, Slot};
use crate::regions::CommandRegion;
use crate::symbols::TensorShape;
use anec_format::align::{checked_round_up, tiles};
use anec_format::hwx::{symbol, TILE_SIZE};
use anec_format::slots::{self, SLOT_COUNT};
use tracing::{debug, info, warn};

/// Merge the command region, buffer table and shape list into one layout.
///
/// # Errors
///
/// - [`AnecError::InconsistentLayout`] if the shape count differs from the
///   source + destination count, or footprints disagree in both orders
/// - [`AnecError::SuspectedUnresolvedLayer`] if a `ctx_` tensor feeds a
///   multi-input program and `force` is not set
pub fn reconcile(
    region: &CommandRegion,
    buffers: &BufferTable,
    shapes: Vec<TensorShape>,
    force: bool,
) -> Result<ProgramLayout> {
    let sources: Vec<&BufferDescriptor> = buffers.of_kind(BufferKind::Source).collect();
    let destinations: Vec<&BufferDescriptor> = buffers.of_kind(BufferKind::Destination).collect();
    let intermediates: Vec<&BufferDescriptor> =
        buffers.of_kind(BufferKind::Intermediate).collect();

    if shapes.len() != sources.len() + destinations.len() {
        return Err(AnecError::inconsistent(format!(
            "found {} shape symbol(s) for {} source(s) + {} destination(s)",
            shapes.len(),
            sources.len(),
            destinations.len()
        )));
    }

    let shapes = order_shapes(&sources, &destinations, shapes)?;

    let mut diagnostics = Vec::new();
    for shape in &shapes {
        if shape.name.contains(symbol::HOST_CONTEXT) && sources.len() > 1 {
            let inputs = sources.len() as u32;
            if !force {
                return Err(AnecError::SuspectedUnresolvedLayer { inputs });
            }
            warn!("bypassing suspected CPU layer warning ({})", shape.name);
            diagnostics.push(Diagnostic::SuspectedUnresolvedLayerBypassed {
                inputs,
                name: shape.name.clone(),
            });
        }
    }

    let (src_shapes, dst_shapes) = shapes.split_at(sources.len());
    for (n, shape) in src_shapes.iter().enumerate() {
        info!("found input {}/{}: {}", n + 1, sources.len(), shape);
    }
    for (n, shape) in dst_shapes.iter().enumerate() {
        info!("found output {}/{}: {}", n + 1, destinations.len(), shape);
    }

    let mut slot_table: [Option<Slot>; SLOT_COUNT] = [None; SLOT_COUNT];
    let mut shape_table: [Option<TensorShape>; SLOT_COUNT] = std::array::from_fn(|_| None);

    slot_table[slots::COMMAND] = Some(Slot {
        tiles: tiles(region.total_size) as u32,
        kind: BufferKind::Command,
    });
    for (n, buf) in intermediates.iter().enumerate() {
        slot_table[slots::INTERMEDIATE + n] = Some(Slot::from(*buf));
    }
    for (n, (buf, shape)) in destinations.iter().zip(dst_shapes).enumerate() {
        let slot = slots::destination(n);
        slot_table[slot] = Some(Slot::from(*buf));
        shape_table[slot] = Some(shape.clone());
    }
    for (n, (buf, shape)) in sources.iter().zip(src_shapes).enumerate() {
        let slot = slots::source(n, destinations.len());
        slot_table[slot] = Some(Slot::from(*buf));
        shape_table[slot] = Some(shape.clone());
    }

    Ok(ProgramLayout {
        total_size: region.total_size,
        task: region.task,
        kernel: region.kernel,
        descriptors: region.descriptors,
        intermediate_count: intermediates.len() as u32,
        source_count: sources.len() as u32,
        destination_count: destinations.len() as u32,
        slots: slot_table,
        shapes: shape_table,
        diagnostics,
    })
}

/// Canonical order first, then destinations-first. Never a third guess.
fn order_shapes(
    sources: &[&BufferDescriptor],
    destinations: &[&BufferDescriptor],
    mut shapes: Vec<TensorShape>,
) -> Result<Vec<TensorShape>> {
    let canonical = match check_footprints(sources, destinations, &shapes) {
        Ok(()) => return Ok(shapes),
        Err(reason) => reason,
    };
    debug!("canonical shape order rejected: {}", canonical);

    shapes.rotate_left(destinations.len());
    match check_footprints(sources, destinations, &shapes) {
        Ok(()) => {
            info!("shape symbols list outputs first, reordered");
            Ok(shapes)
        }
        Err(swapped) => Err(AnecError::inconsistent(format!(
            "{canonical}; with outputs listed first: {swapped}"
        ))),
    }
}

fn check_footprints(
    sources: &[&BufferDescriptor],
    destinations: &[&BufferDescriptor],
    shapes: &[TensorShape],
) -> std::result::Result<(), String> {
    let buffers = sources.iter().chain(destinations);
    for (buf, shape) in buffers.zip(shapes) {
        let footprint = shape
            .footprint()
            .and_then(|f| checked_round_up(f, TILE_SIZE));
        if footprint != Some(buf.size) {
            return Err(format!(
                "{}{} is 0x{:x} bytes but {} {} needs {}",
                buf.kind,
                buf.slot_index,
                buf.size,
                shape.name,
                shape,
                footprint.map_or_else(|| "more than 2^64".to_string(), |f| format!("0x{f:x}"))
            ));
        }
    }
    Ok(())
}
