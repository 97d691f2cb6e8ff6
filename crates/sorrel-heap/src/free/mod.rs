// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The free engine.
//!
//! Resolves a pointer-set argument to the set of freeable bases, then
//! removes them from the state - strongly (the binding disappears) when
//! the argument denotes exactly one concrete allocation, weakly otherwise.
//! Either way, every location of the state still referencing a freed base
//! is rewritten to the ESCAPINGADDR marker.


use std::collections::BTreeSet;

use num_traits::Zero;
use sorrel_domain::{BaseId, Model, Value};

use crate::base::BaseKind;
use crate::callstack::CallSite;
use crate::context::HeapContext;
use crate::diag::DiagnosticKind;

/// Result of resolving a pointer argument of `free`/`realloc`.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct FreeResolution {
    /// Allocated bases the argument points to at offset zero.
    pub bases: Vec<BaseId>,
    /// Whether NULL is among the pointed-to targets.
    pub null: bool,
    /// Cardinality of the target set; weak bases count twice.
    pub card: usize,
}

impl FreeResolution {
    /// Whether the deallocation may be a strong update.
    #[must_use]
    pub const fn is_strong(&self) -> bool {
        self.card <= 1
    }
}

/// Folds a pointer value into the set of bases it can legally free.
///
/// Targets that are neither an allocated base nor NULL, and targets whose
/// offset set does not contain zero, draw a diagnostic of `kind` (once per
/// call site); the valid targets are still collected. A base whose offset
/// set contains zero is freeable even if other offsets are possible.
pub fn resolve_freeable(
    ctx: &mut HeapContext,
    site: &CallSite,
    ptr: &Value,
    kind: DiagnosticKind,
) -> FreeResolution {
    let Some((num, pointers)) = ptr.try_pointer_parts() else {
        ctx.diagnostics.report(site, kind, format!("{ptr}"));
        return FreeResolution::default();
    };

    let mut res = FreeResolution {
        null: num.contains_zero(),
        ..FreeResolution::default()
    };
    // A numeric component other than the NULL singleton is an absolute
    // address the model cannot free.
    if !num.is_bottom() && num.as_singleton().is_none_or(|n| !n.is_zero()) {
        ctx.diagnostics.report(site, kind, format!("{num}"));
    }

    for (&base_id, offsets) in pointers {
        let base = ctx.arena.base(base_id);
        let at_zero = offsets.contains_zero();
        match base.kind {
            BaseKind::Allocated if at_zero => {
                res.card += if base.is_weak() { 2 } else { 1 };
                res.bases.push(base_id);
            }
            BaseKind::Null if at_zero => res.null = true,
            _ => {
                let name = base.name.clone();
                ctx.diagnostics.report(site, kind, format!("&{name} + {offsets}"));
            }
        }
    }
    res
}

/// Removes `bases` from `state`.
///
/// With `exact` (strong update) the bindings are removed; in both cases
/// the whole state is walked and every reference to a freed base becomes
/// the ESCAPINGADDR marker.
pub fn free_bases(state: &mut Model, bases: &[BaseId], exact: bool) {
    if exact {
        for &base in bases {
            state.remove_base(base);
        }
    }
    let freed: BTreeSet<BaseId> = bases.iter().copied().collect();
    if freed.is_empty() {
        return;
    }
    if let Some(map) = state.as_map_mut() {
        for om in map.values_mut() {
            *om = om.map_values(|v| v.escape_from(&freed));
        }
    }
}
