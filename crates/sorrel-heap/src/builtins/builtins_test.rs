// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for builtin dispatch, covering the end-to-end behavior of the
//! heap model as the analyzer sees it.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sorrel_domain::{BaseId, CType, Ival, Model, Value};

use crate::HeapError;
use crate::base::Validity;
use crate::callstack::{CallSite, Callstack};
use crate::config::HeapOptions;
use crate::context::HeapContext;
use crate::diag::DiagnosticKind;

use super::{Arg, BUILTIN_NAMES, Cacheable, CallInfo, dispatch, lookup_builtin};

fn call_at(line: u32) -> CallInfo {
    CallInfo::new(
        Callstack::from_frames(vec![CallSite::new("main", line)]),
        None,
    )
}

fn size_arg(bytes: i64) -> Arg {
    Arg::new(Value::from_ival(Ival::singleton(bytes)), true)
}

fn run(
    ctx: &mut HeapContext,
    name: &str,
    call: &CallInfo,
    state: &Model,
    args: &[Arg],
) -> super::BuiltinResult {
    dispatch(ctx, name, call, state, args).unwrap().unwrap()
}

/// The pointer returned by a single-alternative allocation result.
fn returned_base(result: &super::BuiltinResult) -> BaseId {
    let (ret, _) = &result.c_values[0];
    let pointers = ret.as_ref().unwrap().pointers();
    assert_eq!(pointers.len(), 1);
    *pointers.keys().next().unwrap()
}

#[test]
fn every_registered_name_resolves() {
    for name in BUILTIN_NAMES {
        assert!(lookup_builtin(name).is_some(), "unresolved builtin {name}");
    }
    assert!(lookup_builtin("Frama_C_unknown").is_none());
}

#[test]
fn arity_is_checked() {
    let mut ctx = HeapContext::default();
    let state = Model::empty();
    let err = dispatch(&mut ctx, "Frama_C_free", &call_at(1), &state, &[])
        .unwrap()
        .unwrap_err();
    assert_eq!(
        err,
        HeapError::InvalidArgCount {
            builtin: "Frama_C_free",
            expected: 1,
            got: 0,
        }
    );
}

#[test]
fn alloc_size_returns_fresh_strong_bases() {
    let mut ctx = HeapContext::default();
    let state = Model::empty();
    let call = call_at(4);

    let r1 = run(&mut ctx, "Frama_C_alloc_size", &call, &state, &[size_arg(4)]);
    let r2 = run(&mut ctx, "Frama_C_alloc_size", &call, &state, &[size_arg(4)]);
    assert_eq!(r1.c_cacheable, Cacheable::NoCacheCallers);

    let (b1, b2) = (returned_base(&r1), returned_base(&r2));
    assert_ne!(b1, b2);
    assert!(!ctx.arena.base(b1).is_weak());

    let (_, after) = &r1.c_values[0];
    assert_eq!(after.find_base(b1).unwrap().read(0, 31), Value::uninitialized());
}

#[test]
fn alloc_size_weak_mints_weak_bases() {
    let mut ctx = HeapContext::default();
    let state = Model::empty();
    let r = run(&mut ctx, "Frama_C_alloc_size_weak", &call_at(4), &state, &[size_arg(4)]);
    assert!(ctx.arena.base(returned_base(&r)).is_weak());
}

#[test]
fn malloc_zero_coins_an_empty_base() {
    let mut ctx = HeapContext::default();
    let state = Model::empty();
    let r = run(&mut ctx, "Frama_C_alloc_size", &call_at(4), &state, &[size_arg(0)]);

    let base = returned_base(&r);
    assert_eq!(
        ctx.arena.base(base).validity,
        Validity::Variable {
            weak: false,
            min_alloc: -1,
            max_alloc: -1,
        }
    );
    let (_, after) = &r.c_values[0];
    assert!(after.find_base(base).unwrap().is_unmapped());
}

#[test]
fn alloc_by_stack_collapses_at_level_zero() {
    // Two sequential malloc(4) with mlevel=0 at the same site: the same
    // weak base comes back, validity (31, 31) bits.
    let mut ctx = HeapContext::default();
    let call = call_at(12);

    let r1 = run(&mut ctx, "Frama_C_alloc_by_stack", &call, &Model::empty(), &[size_arg(4)]);
    let (_, state1) = &r1.c_values[0];
    let b1 = returned_base(&r1);

    let r2 = run(&mut ctx, "Frama_C_alloc_by_stack", &call, state1, &[size_arg(4)]);
    let b2 = returned_base(&r2);

    assert_eq!(b1, b2);
    assert!(ctx.arena.base(b2).is_weak());
    assert_eq!(
        ctx.arena.base(b2).validity,
        Validity::Variable {
            weak: true,
            min_alloc: 31,
            max_alloc: 31,
        }
    );
}

#[test]
fn alloc_by_stack_guesses_the_destination_type() {
    let mut ctx = HeapContext::default();
    let call = CallInfo::new(
        Callstack::from_frames(vec![CallSite::new("main", 7)]),
        Some(CType::ptr(CType::int())),
    );
    let r = run(&mut ctx, "Frama_C_alloc_by_stack", &call, &Model::empty(), &[size_arg(8)]);
    let base = returned_base(&r);
    assert_eq!(ctx.arena.base(base).typ, CType::array_of(CType::int(), Some(2)));
}

#[test]
fn alloc_tms_uses_the_plevel_ladder() {
    let mut ctx = HeapContext::new(HeapOptions {
        malloc_plevel: 1,
        ..HeapOptions::default()
    });
    let call = call_at(3);
    let mut state = Model::empty();

    // plevel=1: two strong bases, then the entry visited at the cap is
    // promoted.
    let mut bases = Vec::new();
    for _ in 0..3 {
        let r = run(&mut ctx, "tis_alloc", &call, &state, &[size_arg(4)]);
        let (_, after) = &r.c_values[0];
        state = after.clone();
        bases.push(returned_base(&r));
    }
    assert_ne!(bases[0], bases[1]);
    let r = run(&mut ctx, "tis_alloc", &call, &state, &[size_arg(4)]);
    assert_eq!(returned_base(&r), bases[1]);
    assert!(ctx.arena.base(bases[1]).is_weak());
}

#[test]
fn tis_alloc_weak_uses_the_configured_size() {
    let mut ctx = HeapContext::default();
    let r = run(&mut ctx, "tis_alloc_weak", &call_at(2), &Model::empty(), &[size_arg(4)]);
    let base = returned_base(&r);
    assert!(ctx.arena.base(base).is_weak());
    // 10000 bytes -> bits [-1 + 1 .. 8 * 10000 - 1].
    assert_eq!(ctx.arena.base(base).validity.max_valid_bits(), 79_999);
}

#[test]
fn malloc_returns_null_adds_the_failure_alternative() {
    let mut ctx = HeapContext::new(HeapOptions {
        malloc_returns_null: true,
        ..HeapOptions::default()
    });
    let state = Model::empty();
    let r = run(&mut ctx, "Frama_C_alloc_size", &call_at(4), &state, &[size_arg(4)]);

    assert_eq!(r.c_values.len(), 2);
    let (null_ret, null_state) = &r.c_values[1];
    assert_eq!(null_ret.as_ref().unwrap(), &Value::singleton_zero());
    assert!(null_state.find_base(ctx.errno_base()).is_some());
}

#[test]
fn free_removes_the_binding() {
    let mut ctx = HeapContext::default();
    let call = call_at(4);
    let r = run(&mut ctx, "Frama_C_alloc_size", &call, &Model::empty(), &[size_arg(4)]);
    let base = returned_base(&r);
    let (ret, state) = &r.c_values[0];

    let free_call = call_at(5);
    let fr = run(
        &mut ctx,
        "Frama_C_free",
        &free_call,
        state,
        &[Arg::new(ret.clone().unwrap(), false)],
    );
    assert_eq!(fr.c_cacheable, Cacheable::Cacheable);
    assert_eq!(fr.c_values.len(), 1);
    let (ret, after) = &fr.c_values[0];
    assert!(ret.is_none());
    assert!(!after.is_bound(base));
}

#[test]
fn free_null_yields_no_successor() {
    let mut ctx = HeapContext::default();
    let state = Model::empty();
    let r = run(
        &mut ctx,
        "Frama_C_free",
        &call_at(9),
        &state,
        &[Arg::new(Value::singleton_zero(), false)],
    );
    assert!(r.c_values.is_empty());
    assert!(ctx.diagnostics.is_empty());
}

#[test]
fn free_of_garbage_draws_a_diagnostic() {
    let mut ctx = HeapContext::default();
    let state = Model::empty();
    let r = run(
        &mut ctx,
        "Frama_C_free",
        &call_at(9),
        &state,
        &[Arg::new(Value::from_ival(Ival::singleton(0x40)), false)],
    );
    assert!(r.c_values.is_empty());
    assert!(ctx.diagnostics.has(DiagnosticKind::WrongFree));
}

#[test]
fn realloc_reports_clobbered_destinations() {
    let mut ctx = HeapContext::default();
    let call = call_at(4);
    let r = run(&mut ctx, "Frama_C_alloc_size", &call, &Model::empty(), &[size_arg(4)]);
    let (ret, state) = &r.c_values[0];

    let rr = run(
        &mut ctx,
        "Frama_C_realloc",
        &call_at(5),
        state,
        &[Arg::new(ret.clone().unwrap(), false), size_arg(8)],
    );
    assert_eq!(rr.c_cacheable, Cacheable::NoCacheCallers);
    assert_eq!(rr.c_clobbered.len(), 1);
    let dest = *rr.c_clobbered.iter().next().unwrap();
    let (new_ret, after) = &rr.c_values[0];
    assert!(new_ret.as_ref().unwrap().has_pointer_to(dest));
    assert_eq!(after.find_base(dest).unwrap().size_bits(), 64);
}

#[test]
fn realloc_multiple_clobbers_one_destination_per_source() {
    let mut ctx = HeapContext::default();
    let call = call_at(4);
    let r1 = run(&mut ctx, "Frama_C_alloc_size", &call, &Model::empty(), &[size_arg(4)]);
    let (ret1, state1) = &r1.c_values[0];
    let r2 = run(&mut ctx, "Frama_C_alloc_size", &call_at(5), state1, &[size_arg(4)]);
    let (ret2, state2) = &r2.c_values[0];

    let joined = ret1.clone().unwrap().join(ret2.as_ref().unwrap());
    let rr = run(
        &mut ctx,
        "Frama_C_realloc_multiple",
        &call_at(6),
        state2,
        &[Arg::new(joined, false), size_arg(4)],
    );
    assert_eq!(rr.c_clobbered.len(), 2);
}

#[test]
fn tis_realloc_propagates_contract_errors() {
    let mut ctx = HeapContext::default();
    let state = Model::empty();
    let err = dispatch(
        &mut ctx,
        "tis_realloc",
        &call_at(4),
        &state,
        &[
            Arg::new(Value::singleton_zero(), false),
            Arg::new(Value::from_ival(Ival::top()), false),
        ],
    )
    .unwrap()
    .unwrap_err();
    assert!(matches!(err, HeapError::InvalidRealloc(_)));
}

#[test]
fn check_leak_reports_and_keeps_the_state() {
    let mut ctx = HeapContext::default();
    let call = call_at(4);
    let r = run(&mut ctx, "Frama_C_alloc_size", &call, &Model::empty(), &[size_arg(4)]);
    let (_, state) = &r.c_values[0];

    let lr = run(&mut ctx, "Frama_C_check_leak", &call_at(20), state, &[]);
    assert_eq!(lr.c_cacheable, Cacheable::Cacheable);
    assert_eq!(lr.c_values, vec![(None, state.clone())]);
    assert!(ctx.diagnostics.has(DiagnosticKind::Leak));
}
