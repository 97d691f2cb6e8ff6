// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # Sorrel abstract value domains
//!
//! Value-domain building blocks for the Sorrel C value analyzer:
//! - Integer interval lattice (`Ival`) with arbitrary-precision bounds
//! - Abstract values (`Value`): numeric part, pointer part, and the
//!   uninitialized/escaping sentinels
//! - Bit-granular offset-maps (`OffsetMap`) mapping ranges to values
//! - The abstract memory state (`Model`), keyed by `BaseId` handles
//! - A minimal C type subset (`CType`) for size reasoning
//!
//! Allocation bases themselves (names, validity records, strong/weak
//! status) live in the `sorrel-heap` crate; this crate only knows their
//! `BaseId` handles.

pub mod ctypes;
pub mod ival;
pub mod model;
pub mod offsetmap;
pub mod types;
pub mod value;

// Re-export commonly used types at crate root
pub use ctypes::CType;
pub use ival::Ival;
pub use model::{BaseLookup, Model};
pub use offsetmap::OffsetMap;
pub use types::BaseId;
pub use value::Value;
