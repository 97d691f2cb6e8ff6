// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Analyzer-wide context for the heap model.
//!
//! All global bookkeeping is owned here and passed explicitly: the base
//! arena, the per-callstack registry, the resolved options and the
//! diagnostics sink. The context lives from analysis start to analysis
//! end; nothing in the engine is an ambient singleton.


use sorrel_domain::{BaseId, CType, Ival, Model, OffsetMap, Value};

use crate::base::{BaseArena, BaseKind, Validity};
use crate::callstack::CallstackRegistry;
use crate::config::HeapOptions;
use crate::diag::Diagnostics;

/// `errno` value for a failed allocation.
pub const ENOMEM: i64 = 12;

/// Analyzer-wide state of the heap model.
#[derive(Clone, Debug)]
pub struct HeapContext {
    /// Arena owning every base of the analysis.
    pub arena: BaseArena,
    /// Reuse pools per truncated callstack.
    pub registry: CallstackRegistry,
    /// Resolved configuration.
    pub options: HeapOptions,
    /// Collected findings.
    pub diagnostics: Diagnostics,
    /// The `__errno` variable base written by failing allocations.
    errno_base: BaseId,
}

impl HeapContext {
    /// Creates a context with the given options.
    #[must_use]
    pub fn new(options: HeapOptions) -> Self {
        let mut arena = BaseArena::new();
        let errno_base = arena.mint_other(
            "__errno",
            BaseKind::Var,
            Validity::Known { min: 0, max: 31 },
            CType::int(),
        );
        Self {
            arena,
            registry: CallstackRegistry::new(),
            options,
            diagnostics: Diagnostics::new(),
            errno_base,
        }
    }

    /// The `__errno` base handle.
    #[must_use]
    pub const fn errno_base(&self) -> BaseId {
        self.errno_base
    }

    /// Writes `value` into `errno` in `state` (strong update).
    pub fn set_errno(&self, state: &mut Model, value: i64) {
        let mut om = OffsetMap::new(32);
        om.write(0, 31, &Value::from_ival(Ival::singleton(value)), true);
        state.add_base(self.errno_base, om);
    }
}

impl Default for HeapContext {
    fn default() -> Self {
        Self::new(HeapOptions::default())
    }
}
