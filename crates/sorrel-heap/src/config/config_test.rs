// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for heap-model configuration.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::HeapOptions;

#[test]
fn defaults_match_documentation() {
    let opts = HeapOptions::default();
    assert!(opts.is_wrapper("malloc"));
    assert!(!opts.is_wrapper("my_malloc"));
    assert!(!opts.malloc_returns_null);
    assert_eq!(opts.mlevel, 0);
    assert_eq!(opts.malloc_plevel, 3);
    assert_eq!(opts.tis_alloc_weak_size, 10_000);
}

#[test]
fn wrappers_are_configurable() {
    let mut opts = HeapOptions::default();
    opts.malloc_functions.insert("xmalloc".to_owned());
    assert!(opts.is_wrapper("xmalloc"));
    assert!(opts.is_wrapper("malloc"));
}
