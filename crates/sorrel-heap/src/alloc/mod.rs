// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Allocation of symbolic bases.
//!
//! The factory mints a fresh base per request. On top of it, the
//! dispatcher implements the precision ladder: per truncated callstack, at
//! most `max_level + 1` distinct bases are ever coined; entries freed on
//! the current path are reused, and the entry visited at the level cap is
//! promoted to weak and returned from then on. Promotion is the
//! termination knob of the whole heap abstraction: without it, a
//! fixpoint iteration over an allocating loop would coin bases forever.
//!
//! Freshly allocated (or re-allocated) ranges are painted UNINITIALIZED
//! by joining with the previous contents, so values already present at
//! shared indices of a weak base survive re-entry.


use sorrel_domain::{BaseId, CType, Ival, Model, OffsetMap, Value};

use crate::HeapError;
use crate::base::{BaseArena, Validity};
use crate::callstack::Callstack;
use crate::context::{ENOMEM, HeapContext};
use crate::sizing::{TypedSize, bits_of_bytes, extract_size};

/// Initial strength of a minted base.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Weakness {
    /// The base denotes a single concrete allocation.
    Strong,
    /// The base denotes possibly many concrete allocations.
    Weak,
}

/// One allocation request, as seen at a builtin call site.
#[derive(Clone, Copy, Debug)]
pub struct AllocRequest<'a> {
    /// Abstract value of the size argument, in bytes.
    pub sizev: &'a Ival,
    /// Static type of the destination lvalue, if the call is an
    /// assignment.
    pub dst_type: Option<&'a CType>,
    /// Whether the size argument is a compile-time constant.
    pub constant_size: bool,
    /// Name prefix of the coined base (e.g. `malloc`).
    pub prefix: &'a str,
}

/// Mints a fresh base for `req` at the (already truncated) `stack`.
///
/// Returns the new handle and the last valid bit offset (`8 * smax - 1`,
/// `-1` for a zero-byte request). The base is registered as malloced;
/// callers going through the dispatcher also append it to the registry.
pub fn alloc_abstract(
    ctx: &mut HeapContext,
    stack: &Callstack,
    req: &AllocRequest<'_>,
    weakness: Weakness,
) -> (BaseId, i64) {
    let weak = weakness == Weakness::Weak;
    let ts = TypedSize::infer(req.sizev, req.dst_type, req.constant_size, weak);
    let (min_alloc, max_alloc) = ts.bit_bounds();
    let typ = ts.allocation_type(weak);

    let stem = match stack.top() {
        Some(site) => format!("__{}_{}_l{}", req.prefix, site.function, site.line),
        None => format!("__{}", req.prefix),
    };
    let validity = Validity::Variable {
        weak,
        min_alloc,
        max_alloc,
    };
    let id = ctx.arena.mint_allocated(&stem, weak, validity, typ);
    ctx.arena.register_malloced(id);
    (id, max_alloc)
}

/// Rewrites the validity of an existing allocated base for a re-entry.
///
/// The new bounds are the join of the old bounds and the bounds computed
/// from `sizev`, so observed validity only ever widens. When `make_weak`
/// promotes a strong base, the base is renamed (a `_w` segment appears
/// before the ordinal) and its type weakens to an unsized array.
///
/// # Errors
///
/// `InvariantViolation` if the base is not `Allocated` with `Variable`
/// validity; only such bases are produced by this engine.
pub fn update_variable_validity(
    ctx: &mut HeapContext,
    id: BaseId,
    sizev: &Ival,
    make_weak: bool,
) -> Result<i64, HeapError> {
    let (smin, smax) = extract_size(sizev);
    let (new_min, new_max) = (bits_of_bytes(smin), bits_of_bytes(smax));

    let base = ctx.arena.base_mut(id);
    let Validity::Variable {
        weak: old_weak,
        min_alloc: old_min,
        max_alloc: old_max,
    } = base.validity
    else {
        return Err(HeapError::InvariantViolation {
            base: base.name.clone(),
        });
    };
    if !base.is_allocated() {
        return Err(HeapError::InvariantViolation {
            base: base.name.clone(),
        });
    }

    if make_weak && !old_weak {
        base.name = BaseArena::weak_name(&base.name);
        base.typ = weaken_type(&base.typ);
    }
    let max_alloc = old_max.max(new_max);
    base.validity = Validity::Variable {
        weak: old_weak || make_weak,
        min_alloc: old_min.min(new_min),
        max_alloc,
    };
    Ok(max_alloc)
}

/// The unsized-array version of a base type.
fn weaken_type(typ: &CType) -> CType {
    match typ {
        CType::Array(elem, _) => CType::array_of((**elem).clone(), None),
        other => CType::array_of(other.clone(), None),
    }
}

/// Paints the allocable range of `base` as uninitialized in `state`.
///
/// An isotropic bottom map over the full allocable range is built,
/// `[0, max_valid_bits]` is overwritten with the UNINITIALIZED marker when
/// the range is non-empty, and the result is *joined* with any existing
/// binding. Joining is what keeps prior values of a weak base alive at
/// shared indices across re-entries.
pub fn add_uninitialized(state: &mut Model, base: BaseId, max_valid_bits: i64) {
    let mut om = OffsetMap::create_isotropic(max_valid_bits + 1, &Value::bottom());
    if max_valid_bits >= 0 {
        om.write(0, max_valid_bits, &Value::uninitialized(), true);
    }
    let om = match state.find_base(base) {
        Some(existing) => existing.join(&om),
        None => om,
    };
    state.add_base(base, om);
}

/// Allocation with per-callstack memoization: the precision ladder.
///
/// Walks the pool coined at the truncated stack, counting visited entries:
///
/// - an entry not bound in `state` (freed on this path) is *reused*,
///   weakened only if the request itself is weak;
/// - the entry visited at `nb == max_level` is *promoted* to weak and
///   returned, whatever the requested weakness;
/// - if the pool is exhausted, a fresh base is minted with the requested
///   weakness and appended.
///
/// # Errors
///
/// Propagates `InvariantViolation` from the validity updater.
pub fn alloc_by_stack(
    ctx: &mut HeapContext,
    state: &Model,
    stack: &Callstack,
    req: &AllocRequest<'_>,
    max_level: usize,
    initial: Weakness,
) -> Result<(BaseId, i64), HeapError> {
    let stack = stack.truncate_wrappers(&ctx.options);
    let pool = ctx.registry.pool(&stack).to_vec();
    for (nb, base) in pool.into_iter().enumerate() {
        if !state.is_bound(base) {
            let max_valid = update_variable_validity(ctx, base, req.sizev, initial == Weakness::Weak)?;
            return Ok((base, max_valid));
        }
        if nb == max_level {
            let max_valid = update_variable_validity(ctx, base, req.sizev, true)?;
            return Ok((base, max_valid));
        }
    }
    let (id, max_valid) = alloc_abstract(ctx, &stack, req, initial);
    ctx.registry.append(stack, id);
    Ok((id, max_valid))
}

/// Allocation without memoization: a fresh base per visit.
pub fn alloc_fresh(
    ctx: &mut HeapContext,
    stack: &Callstack,
    req: &AllocRequest<'_>,
    weakness: Weakness,
) -> (BaseId, i64) {
    let stack = stack.truncate_wrappers(&ctx.options);
    alloc_abstract(ctx, &stack, req, weakness)
}

/// Splits an allocation result into its success/failure alternatives.
///
/// The success alternative always returns `ret` in `state_after`. When
/// `malloc-returns-null` is set, a failure alternative returns NULL in the
/// original state with `errno` set to `ENOMEM`.
#[must_use]
pub fn wrap_fallible(
    ctx: &HeapContext,
    ret: Value,
    orig_state: &Model,
    state_after: Model,
) -> Vec<(Option<Value>, Model)> {
    let mut out = vec![(Some(ret), state_after)];
    if ctx.options.malloc_returns_null {
        let mut null_state = orig_state.clone();
        ctx.set_errno(&mut null_state, ENOMEM);
        out.push((Some(Value::singleton_zero()), null_state));
    }
    out
}
