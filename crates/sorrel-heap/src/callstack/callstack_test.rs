// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for callstack truncation and the base registry.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sorrel_domain::BaseId;

use crate::config::HeapOptions;

use super::{CallSite, Callstack, CallstackRegistry};

fn wrappers(names: &[&str]) -> HeapOptions {
    HeapOptions {
        malloc_functions: names.iter().map(|n| (*n).to_owned()).collect(),
        ..HeapOptions::default()
    }
}

fn stack(frames: &[(&str, u32)]) -> Callstack {
    Callstack::from_frames(
        frames
            .iter()
            .map(|(f, l)| CallSite::new(*f, *l))
            .collect(),
    )
}

#[test]
fn truncation_strips_wrapper_chain() {
    // main -> my_malloc -> malloc, both wrappers configured
    let s = stack(&[("main", 10), ("my_malloc", 3), ("malloc", 1)]);
    let w = wrappers(&["malloc", "my_malloc"]);
    let t = s.truncate_wrappers(&w);
    // malloc is dropped (caller my_malloc is a wrapper too); my_malloc
    // stays because its caller main is not a wrapper.
    assert_eq!(t.frames(), stack(&[("main", 10), ("my_malloc", 3)]).frames());
}

#[test]
fn truncation_stops_at_non_wrapper_caller() {
    let s = stack(&[("main", 10), ("malloc", 1)]);
    let w = wrappers(&["malloc"]);
    // Caller main is not a wrapper: nothing is dropped.
    assert_eq!(s.truncate_wrappers(&w), s);
}

#[test]
fn truncation_never_empties_the_stack() {
    let s = stack(&[("malloc", 1), ("malloc", 2)]);
    let w = wrappers(&["malloc"]);
    let t = s.truncate_wrappers(&w);
    assert_eq!(t.len(), 1);
    assert_eq!(t.top().unwrap(), &CallSite::new("malloc", 1));
}

#[test]
fn truncation_without_wrappers_is_identity() {
    let s = stack(&[("main", 4), ("helper", 7)]);
    assert_eq!(s.truncate_wrappers(&wrappers(&[])), s);
}

#[test]
fn top_is_innermost_frame() {
    let s = stack(&[("main", 4), ("helper", 7)]);
    assert_eq!(s.top().unwrap(), &CallSite::new("helper", 7));
    assert!(Callstack::new().top().is_none());
}

#[test]
fn registry_pools_are_per_stack_and_ordered() {
    let s1 = stack(&[("main", 4)]);
    let s2 = stack(&[("main", 9)]);

    let mut reg = CallstackRegistry::new();
    assert!(reg.is_empty());
    assert_eq!(reg.pool(&s1), &[]);

    reg.append(s1.clone(), BaseId::new(0));
    reg.append(s1.clone(), BaseId::new(1));
    reg.append(s2.clone(), BaseId::new(2));

    assert_eq!(reg.pool(&s1), &[BaseId::new(0), BaseId::new(1)]);
    assert_eq!(reg.pool(&s2), &[BaseId::new(2)]);
    assert_eq!(reg.len(), 2);
}

#[test]
fn display_forms() {
    let s = stack(&[("main", 4), ("helper", 7)]);
    assert_eq!(format!("{s}"), "main:4 -> helper:7");
}
