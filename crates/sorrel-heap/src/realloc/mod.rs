// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The realloc engine.
//!
//! Reallocation orchestrates the other engines: allocate the destination,
//! copy a prefix of every source base into it, free the sources.
//!
//! Two modes exist. *Single* allocates one destination through the
//! precision ladder, so repeated reallocs at a site eventually share one
//! weak base; all sources are copied into it. *Multiple* coins a fresh
//! strong destination per source (plus one for a possible NULL argument,
//! which reallocs like malloc) and joins the resulting states; this is
//! more precise and proportionally more expensive.
//!
//! The copy into a destination works in three steps so that weak pastes
//! settle to exactly the source contents wherever all sources are defined:
//! paint the destination UNINITIALIZED, reset the certainly-valid prefix
//! to bottom, then weak-paste each source prefix (contributions of several
//! sources join).


use num_traits::Signed;
use sorrel_domain::{BaseId, Ival, Model, OffsetMap, Value};

use crate::HeapError;
use crate::alloc::{AllocRequest, Weakness, add_uninitialized, alloc_by_stack, alloc_fresh};
use crate::base::Validity;
use crate::callstack::{CallSite, Callstack};
use crate::context::HeapContext;
use crate::diag::DiagnosticKind;
use crate::free::{free_bases, resolve_freeable};
use crate::sizing::extract_size;

/// Destination strategy of a realloc.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReallocMode {
    /// One destination through the precision ladder; sources join in it.
    Single,
    /// A fresh strong destination per source, states joined.
    Multiple,
}

/// Result of one realloc interpretation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReallocOutcome {
    /// Possible return values (pointers to the destinations, possibly
    /// joined with NULL).
    pub ret: Value,
    /// State after allocation, copies and frees.
    pub state: Model,
    /// The destination bases.
    pub dests: Vec<BaseId>,
}

/// One planned destination and the sources it copies from.
struct DestPlan {
    dest: BaseId,
    max_valid: i64,
    copy_from: Vec<BaseId>,
}

/// Interprets `realloc(ptr, size)`.
///
/// # Errors
///
/// Propagates `InvariantViolation` from the validity updater.
pub fn realloc(
    ctx: &mut HeapContext,
    state: &Model,
    stack: &Callstack,
    ptr: &Value,
    req: &AllocRequest<'_>,
    mode: ReallocMode,
) -> Result<ReallocOutcome, HeapError> {
    let site = current_site(stack);
    let res = resolve_freeable(ctx, &site, ptr, DiagnosticKind::WrongRealloc);
    let sources = res.bases.clone();

    let mut plans: Vec<DestPlan> = Vec::new();
    match mode {
        ReallocMode::Single => {
            let (dest, max_valid) =
                alloc_by_stack(ctx, state, stack, req, ctx.options.mlevel, Weakness::Strong)?;
            plans.push(DestPlan {
                dest,
                max_valid,
                copy_from: sources.clone(),
            });
        }
        ReallocMode::Multiple => {
            for &source in &sources {
                let (dest, max_valid) = alloc_fresh(ctx, stack, req, Weakness::Strong);
                plans.push(DestPlan {
                    dest,
                    max_valid,
                    copy_from: vec![source],
                });
            }
            if res.null || sources.is_empty() {
                // realloc(NULL, n) acts as malloc: a destination with
                // nothing to copy.
                let (dest, max_valid) = alloc_fresh(ctx, stack, req, Weakness::Strong);
                plans.push(DestPlan {
                    dest,
                    max_valid,
                    copy_from: Vec::new(),
                });
            }
        }
    }

    let strong_free = sources.len() == 1 && !ctx.arena.base(sources[0]).is_weak();
    let mut ret = Value::bottom();
    let mut joined = Model::bottom();
    for plan in &plans {
        let st = apply_dest(ctx, state, plan, &sources, strong_free);
        ret = ret.join(&Value::pointer(plan.dest, Ival::zero()));
        joined = joined.join(&st);
    }

    Ok(ReallocOutcome {
        ret,
        state: joined,
        dests: plans.into_iter().map(|p| p.dest).collect(),
    })
}

/// Interprets `tis_realloc(ptr, size)`, the stricter contract.
///
/// # Errors
///
/// - `InvalidRealloc` unless the size is a concrete non-negative interval;
/// - `WeakReallocUnsupported` when a source base is weak;
/// - `InvariantViolation` from the validity updater.
pub fn tis_realloc(
    ctx: &mut HeapContext,
    state: &Model,
    stack: &Callstack,
    ptr: &Value,
    req: &AllocRequest<'_>,
) -> Result<ReallocOutcome, HeapError> {
    let Some((lo, hi)) = req.sizev.bounds() else {
        return Err(HeapError::InvalidRealloc("size is not an integer".to_owned()));
    };
    let (Some(lo), Some(_)) = (lo, hi) else {
        return Err(HeapError::InvalidRealloc("size is unbounded".to_owned()));
    };
    if lo.is_negative() {
        return Err(HeapError::InvalidRealloc(format!("negative size {lo}")));
    }
    let (smin, smax) = extract_size(req.sizev);

    let site = current_site(stack);
    let res = resolve_freeable(ctx, &site, ptr, DiagnosticKind::WrongRealloc);
    let sources = res.bases.clone();

    // realloc(p, 0) with p != NULL is a pure free returning NULL.
    if !res.null && smax == 0 {
        let mut st = state.clone();
        free_bases(&mut st, &sources, res.is_strong());
        return Ok(ReallocOutcome {
            ret: Value::singleton_zero(),
            state: st,
            dests: Vec::new(),
        });
    }

    // Copying from a weak source is not supported by this contract.
    for &source in &sources {
        let base = ctx.arena.base(source);
        match base.validity {
            Validity::Variable { weak: false, .. } => {}
            Validity::Variable { weak: true, .. } => {
                return Err(HeapError::WeakReallocUnsupported {
                    base: base.name.clone(),
                });
            }
            _ => {
                return Err(HeapError::InvalidRealloc(format!(
                    "source {} has no variable validity",
                    base.name
                )));
            }
        }
    }

    let (dest, max_valid) =
        alloc_by_stack(ctx, state, stack, req, ctx.options.mlevel, Weakness::Strong)?;
    let plan = DestPlan {
        dest,
        max_valid,
        copy_from: sources.clone(),
    };
    let strong_free = sources.len() == 1;
    let st = apply_dest(ctx, state, &plan, &sources, strong_free);

    let mut ret = Value::pointer(dest, Ival::zero());
    if res.null && smin == 0 {
        // Observed contract: NULL stays in the return set alongside the
        // new base when the argument may be NULL and the size may be zero.
        ret = ret.join(&Value::singleton_zero());
    }

    Ok(ReallocOutcome {
        ret,
        state: st,
        dests: vec![dest],
    })
}

/// Builds the post-state of one destination: paint, copy, free sources.
fn apply_dest(
    ctx: &HeapContext,
    state: &Model,
    plan: &DestPlan,
    sources: &[BaseId],
    strong_free: bool,
) -> Model {
    let dest_size_bits = plan.max_valid + 1;

    // Gather everything read from the original state before mutating.
    let size_sure_valid = plan
        .copy_from
        .iter()
        .map(|&s| ctx.arena.base(s).validity.sure_valid_bits())
        .min()
        .unwrap_or(0)
        .min(dest_size_bits);
    let mut slabs: Vec<OffsetMap> = Vec::with_capacity(plan.copy_from.len());
    for &source in &plan.copy_from {
        let copy_bits = (ctx.arena.base(source).validity.max_valid_bits() + 1).min(dest_size_bits);
        if copy_bits > 0 {
            if let Some(src_om) = state.find_base(source) {
                slabs.push(src_om.copy_slice(0, copy_bits - 1));
            }
        }
    }

    let mut st = state.clone();
    add_uninitialized(&mut st, plan.dest, plan.max_valid);
    if let Some(map) = st.as_map_mut() {
        if let Some(om) = map.get_mut(&plan.dest) {
            if size_sure_valid > 0 {
                // Reset the certainly-valid prefix so the weak pastes
                // below settle to exactly the source contents there.
                om.write(0, size_sure_valid - 1, &Value::bottom(), true);
            }
            for slab in &slabs {
                om.paste_slice(0, slab, false);
            }
        }
    }

    free_bases(&mut st, sources, strong_free);
    st
}

fn current_site(stack: &Callstack) -> CallSite {
    stack
        .top()
        .cloned()
        .unwrap_or_else(|| CallSite::new("<toplevel>", 0))
}
