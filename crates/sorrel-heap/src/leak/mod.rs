// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Leak detection.
//!
//! A malloced base still bound in the state but reachable from no
//! offset-map of any *other* base is reported as leaked. The scan is
//! O(bases x state size) and does not see through cycles: two malloced
//! bases pointing only at each other are considered reachable. Documented
//! limitation.


use sorrel_domain::{BaseId, Model};

use crate::callstack::CallSite;
use crate::context::HeapContext;
use crate::diag::DiagnosticKind;

/// Reports every unreachable malloced base still bound in `state`.
///
/// Returns the leaked bases in mint order; each is also recorded in the
/// diagnostics sink. Bases already freed on this path are not reported.
pub fn check_leak(ctx: &mut HeapContext, site: &CallSite, state: &Model) -> Vec<BaseId> {
    let Some(map) = state.as_map() else {
        return Vec::new();
    };

    let mut leaked = Vec::new();
    for base in ctx.arena.malloced_ids() {
        if !map.contains_key(&base) {
            continue;
        }
        let reachable = map.iter().any(|(&other, om)| {
            other != base && om.iter_values().any(|v| v.has_pointer_to(base))
        });
        if !reachable {
            leaked.push(base);
        }
    }

    for &base in &leaked {
        let name = ctx.arena.base(base).name.clone();
        ctx.diagnostics.report(site, DiagnosticKind::Leak, name);
    }
    leaked
}
