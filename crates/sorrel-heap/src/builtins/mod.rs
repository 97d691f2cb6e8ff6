// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Builtin dispatch.
//!
//! The analyzer registers the heap builtins by name; this module maps each
//! registered name to its handler and packages engine results into the
//! shape the interpreter consumes: a list of `(return value, state)`
//! alternatives, the set of clobbered bases, and a cacheability verdict.
//! Allocation and realloc results depend on the callstack and must not be
//! cached across callers; free and the leak check are cacheable.

#[cfg(test)]
mod builtins_test;

use std::collections::BTreeSet;

use sorrel_domain::{BaseId, CType, Ival, Model, Value};

use crate::HeapError;
use crate::alloc::{
    AllocRequest, Weakness, add_uninitialized, alloc_by_stack, alloc_fresh, wrap_fallible,
};
use crate::callstack::{CallSite, Callstack};
use crate::context::HeapContext;
use crate::diag::DiagnosticKind;
use crate::free::{free_bases, resolve_freeable};
use crate::leak::check_leak;
use crate::realloc::{ReallocMode, realloc, tis_realloc};

/// Whether a builtin's result may be reused across calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cacheable {
    /// The result only depends on the arguments and the entry state.
    Cacheable,
    /// The result also depends on the caller (the callstack).
    NoCacheCallers,
}

/// One actual argument of a builtin call.
#[derive(Clone, Debug)]
pub struct Arg {
    /// Abstract value of the argument.
    pub value: Value,
    /// Whether the argument expression is a compile-time constant.
    pub constant: bool,
}

impl Arg {
    /// Creates an argument from a value; `constant` marks literals.
    #[must_use]
    pub const fn new(value: Value, constant: bool) -> Self {
        Self { value, constant }
    }
}

/// Static context of a builtin call site.
#[derive(Clone, Debug)]
pub struct CallInfo {
    /// Callstack at the call, outermost first.
    pub stack: Callstack,
    /// Static type of the destination lvalue, if the call is an
    /// assignment `lv = f(...)`.
    pub dst_type: Option<CType>,
}

impl CallInfo {
    /// Creates call-site information.
    #[must_use]
    pub const fn new(stack: Callstack, dst_type: Option<CType>) -> Self {
        Self { stack, dst_type }
    }

    fn site(&self) -> CallSite {
        self.stack
            .top()
            .cloned()
            .unwrap_or_else(|| CallSite::new("<toplevel>", 0))
    }
}

/// Result of interpreting one builtin call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuiltinResult {
    /// Alternatives of `(return value, post state)`; empty means the call
    /// has no successor (bottom continuation).
    pub c_values: Vec<(Option<Value>, Model)>,
    /// Bases whose contents the builtin may have written.
    pub c_clobbered: BTreeSet<BaseId>,
    /// Cacheability of this result.
    pub c_cacheable: Cacheable,
}

/// Handler signature shared by every heap builtin.
pub type BuiltinHandler =
    fn(&mut HeapContext, &CallInfo, &Model, &[Arg]) -> Result<BuiltinResult, HeapError>;

/// The registered builtin names, in dispatch-table order.
pub const BUILTIN_NAMES: [&str; 11] = [
    "Frama_C_alloc_size",
    "Frama_C_alloc_size_weak",
    "Frama_C_alloc_by_stack",
    "Frama_C_alloc_tms",
    "tis_alloc",
    "tis_alloc_weak",
    "Frama_C_free",
    "Frama_C_realloc",
    "Frama_C_realloc_multiple",
    "tis_realloc",
    "Frama_C_check_leak",
];

const BUILTIN_HANDLERS: [BuiltinHandler; 11] = [
    builtin_alloc_size,
    builtin_alloc_size_weak,
    builtin_alloc_by_stack,
    builtin_alloc_tms,
    builtin_alloc_tms,
    builtin_alloc_weak_legacy,
    builtin_free,
    builtin_realloc,
    builtin_realloc_multiple,
    builtin_tis_realloc,
    builtin_check_leak,
];

/// Looks up the handler registered under `name`.
#[must_use]
pub fn lookup_builtin(name: &str) -> Option<BuiltinHandler> {
    BUILTIN_NAMES
        .iter()
        .position(|&n| n == name)
        .map(|i| BUILTIN_HANDLERS[i])
}

/// Dispatches a builtin call by registered name.
///
/// Returns `None` for an unknown name; registration of names is the
/// analyzer's concern.
pub fn dispatch(
    ctx: &mut HeapContext,
    name: &str,
    call: &CallInfo,
    state: &Model,
    args: &[Arg],
) -> Option<Result<BuiltinResult, HeapError>> {
    lookup_builtin(name).map(|handler| handler(ctx, call, state, args))
}

fn expect_args(builtin: &'static str, args: &[Arg], expected: usize) -> Result<(), HeapError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(HeapError::InvalidArgCount {
            builtin,
            expected,
            got: args.len(),
        })
    }
}

/// The size argument as an interval; values that are not a plain integer
/// (pointers, garbage) degrade to the full unknown size.
fn size_ival(arg: &Arg) -> Ival {
    arg.value.project_ival().cloned().unwrap_or_else(Ival::top)
}

fn alloc_result(
    ctx: &HeapContext,
    state: &Model,
    state_after: Model,
    base: BaseId,
) -> BuiltinResult {
    let ret = Value::pointer(base, Ival::zero());
    BuiltinResult {
        c_values: wrap_fallible(ctx, ret, state, state_after),
        c_clobbered: BTreeSet::new(),
        c_cacheable: Cacheable::NoCacheCallers,
    }
}

fn fresh_alloc(
    ctx: &mut HeapContext,
    call: &CallInfo,
    state: &Model,
    args: &[Arg],
    builtin: &'static str,
    weakness: Weakness,
) -> Result<BuiltinResult, HeapError> {
    expect_args(builtin, args, 1)?;
    let sizev = size_ival(&args[0]);
    let req = AllocRequest {
        sizev: &sizev,
        dst_type: call.dst_type.as_ref(),
        constant_size: args[0].constant,
        prefix: "malloc",
    };
    let (base, max_valid) = alloc_fresh(ctx, &call.stack, &req, weakness);
    let mut after = state.clone();
    add_uninitialized(&mut after, base, max_valid);
    Ok(alloc_result(ctx, state, after, base))
}

fn laddered_alloc(
    ctx: &mut HeapContext,
    call: &CallInfo,
    state: &Model,
    args: &[Arg],
    max_level: usize,
    initial: Weakness,
    sizev: &Ival,
) -> Result<BuiltinResult, HeapError> {
    let req = AllocRequest {
        sizev,
        dst_type: call.dst_type.as_ref(),
        constant_size: args[0].constant,
        prefix: "malloc",
    };
    let (base, max_valid) = alloc_by_stack(ctx, state, &call.stack, &req, max_level, initial)?;
    let mut after = state.clone();
    add_uninitialized(&mut after, base, max_valid);
    Ok(alloc_result(ctx, state, after, base))
}

fn builtin_alloc_size(
    ctx: &mut HeapContext,
    call: &CallInfo,
    state: &Model,
    args: &[Arg],
) -> Result<BuiltinResult, HeapError> {
    fresh_alloc(ctx, call, state, args, "Frama_C_alloc_size", Weakness::Strong)
}

fn builtin_alloc_size_weak(
    ctx: &mut HeapContext,
    call: &CallInfo,
    state: &Model,
    args: &[Arg],
) -> Result<BuiltinResult, HeapError> {
    fresh_alloc(ctx, call, state, args, "Frama_C_alloc_size_weak", Weakness::Weak)
}

fn builtin_alloc_by_stack(
    ctx: &mut HeapContext,
    call: &CallInfo,
    state: &Model,
    args: &[Arg],
) -> Result<BuiltinResult, HeapError> {
    expect_args("Frama_C_alloc_by_stack", args, 1)?;
    let level = ctx.options.mlevel;
    let sizev = size_ival(&args[0]);
    laddered_alloc(ctx, call, state, args, level, Weakness::Strong, &sizev)
}

fn builtin_alloc_tms(
    ctx: &mut HeapContext,
    call: &CallInfo,
    state: &Model,
    args: &[Arg],
) -> Result<BuiltinResult, HeapError> {
    expect_args("Frama_C_alloc_tms", args, 1)?;
    let level = ctx.options.malloc_plevel;
    let sizev = size_ival(&args[0]);
    laddered_alloc(ctx, call, state, args, level, Weakness::Strong, &sizev)
}

/// Legacy weak allocation: ignores its size argument and allocates the
/// configured `tis-alloc-weak-size` bytes through a level-zero ladder.
fn builtin_alloc_weak_legacy(
    ctx: &mut HeapContext,
    call: &CallInfo,
    state: &Model,
    args: &[Arg],
) -> Result<BuiltinResult, HeapError> {
    expect_args("tis_alloc_weak", args, 1)?;
    let sizev = Ival::singleton(i64::try_from(ctx.options.tis_alloc_weak_size).unwrap_or(i64::MAX));
    laddered_alloc(ctx, call, state, args, 0, Weakness::Weak, &sizev)
}

fn builtin_free(
    ctx: &mut HeapContext,
    call: &CallInfo,
    state: &Model,
    args: &[Arg],
) -> Result<BuiltinResult, HeapError> {
    expect_args("Frama_C_free", args, 1)?;
    let res = resolve_freeable(ctx, &call.site(), &args[0].value, DiagnosticKind::WrongFree);

    let mut c_values = Vec::new();
    if !res.bases.is_empty() {
        let mut after = state.clone();
        free_bases(&mut after, &res.bases, res.is_strong());
        c_values.push((None, after));
    }
    Ok(BuiltinResult {
        c_values,
        c_clobbered: BTreeSet::new(),
        c_cacheable: Cacheable::Cacheable,
    })
}

fn realloc_request<'a>(call: &'a CallInfo, sizev: &'a Ival, arg: &Arg) -> AllocRequest<'a> {
    AllocRequest {
        sizev,
        dst_type: call.dst_type.as_ref(),
        constant_size: arg.constant,
        prefix: "realloc",
    }
}

fn realloc_result(
    ctx: &HeapContext,
    state: &Model,
    out: crate::realloc::ReallocOutcome,
) -> BuiltinResult {
    let c_clobbered: BTreeSet<BaseId> = out.dests.iter().copied().collect();
    let c_values = if out.dests.is_empty() {
        // Pure-free behavior: no allocation to fail.
        vec![(Some(out.ret), out.state)]
    } else {
        wrap_fallible(ctx, out.ret, state, out.state)
    };
    BuiltinResult {
        c_values,
        c_clobbered,
        c_cacheable: Cacheable::NoCacheCallers,
    }
}

fn builtin_realloc(
    ctx: &mut HeapContext,
    call: &CallInfo,
    state: &Model,
    args: &[Arg],
) -> Result<BuiltinResult, HeapError> {
    expect_args("Frama_C_realloc", args, 2)?;
    let sizev = size_ival(&args[1]);
    let req = realloc_request(call, &sizev, &args[1]);
    let out = realloc(ctx, state, &call.stack, &args[0].value, &req, ReallocMode::Single)?;
    Ok(realloc_result(ctx, state, out))
}

fn builtin_realloc_multiple(
    ctx: &mut HeapContext,
    call: &CallInfo,
    state: &Model,
    args: &[Arg],
) -> Result<BuiltinResult, HeapError> {
    expect_args("Frama_C_realloc_multiple", args, 2)?;
    let sizev = size_ival(&args[1]);
    let req = realloc_request(call, &sizev, &args[1]);
    let out = realloc(ctx, state, &call.stack, &args[0].value, &req, ReallocMode::Multiple)?;
    Ok(realloc_result(ctx, state, out))
}

fn builtin_tis_realloc(
    ctx: &mut HeapContext,
    call: &CallInfo,
    state: &Model,
    args: &[Arg],
) -> Result<BuiltinResult, HeapError> {
    expect_args("tis_realloc", args, 2)?;
    let sizev = size_ival(&args[1]);
    let req = realloc_request(call, &sizev, &args[1]);
    let out = tis_realloc(ctx, state, &call.stack, &args[0].value, &req)?;
    Ok(realloc_result(ctx, state, out))
}

fn builtin_check_leak(
    ctx: &mut HeapContext,
    call: &CallInfo,
    state: &Model,
    args: &[Arg],
) -> Result<BuiltinResult, HeapError> {
    expect_args("Frama_C_check_leak", args, 0)?;
    check_leak(ctx, &call.site(), state);
    Ok(BuiltinResult {
        c_values: vec![(None, state.clone())],
        c_clobbered: BTreeSet::new(),
        c_cacheable: Cacheable::Cacheable,
    })
}
