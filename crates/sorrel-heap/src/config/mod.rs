// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Heap-model configuration.
//!
//! Mirrors the analyzer's command-line options; flag parsing itself lives
//! in the analyzer frontend, this crate only consumes the resolved values.

#[cfg(test)]
mod config_test;

use std::collections::BTreeSet;

/// Default size in bytes for the legacy weak allocation builtin.
pub const DEFAULT_WEAK_ALLOC_BYTES: u64 = 10_000;

/// Resolved heap-model options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapOptions {
    /// Function names stripped from the top of the callstack while coining
    /// a base (`-malloc-functions`).
    pub malloc_functions: BTreeSet<String>,
    /// Model allocation failure with a nondeterministic NULL return
    /// (`-malloc-returns-null`).
    pub malloc_returns_null: bool,
    /// Precision level for `Frama_C_alloc_by_stack` (`-mlevel`).
    pub mlevel: usize,
    /// Precision level for `Frama_C_alloc_tms` and `tis_alloc`
    /// (`-malloc-plevel`).
    pub malloc_plevel: usize,
    /// Allocation size in bytes used by `tis_alloc_weak`
    /// (`-tis-alloc-weak-size`).
    pub tis_alloc_weak_size: u64,
}

impl Default for HeapOptions {
    fn default() -> Self {
        Self {
            malloc_functions: ["malloc".to_owned()].into_iter().collect(),
            malloc_returns_null: false,
            mlevel: 0,
            malloc_plevel: 3,
            tis_alloc_weak_size: DEFAULT_WEAK_ALLOC_BYTES,
        }
    }
}

impl HeapOptions {
    /// Checks whether `function` is a configured malloc wrapper.
    #[must_use]
    pub fn is_wrapper(&self, function: &str) -> bool {
        self.malloc_functions.contains(function)
    }
}
