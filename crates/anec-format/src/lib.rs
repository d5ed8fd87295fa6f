//! Format model for compiled ANE program blobs and ANEC artifacts.
//!
//! This crate has **no dependencies** and does no parsing. It is a pure model
//! of the two formats the converter sits between: the vendor-compiled HWX
//! blob (markers, record layout, buffer idents) and the ANEC artifact header
//! (slot numbering, field offsets, capacity).
//!
//! Every constant here was established by inspecting compiled blobs; nothing
//! in an HWX file declares these values directly.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`align`] | `round_up` / `round_down` / tile counting |
//! | [`hwx`] | Blob markers, base address, record word offsets, ident tuples |
//! | [`slots`] | Fixed 32-slot table numbering convention |
//! | [`header`] | ANEC header field offsets and 4096-byte capacity |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod align;
pub mod header;
pub mod hwx;
pub mod slots;
