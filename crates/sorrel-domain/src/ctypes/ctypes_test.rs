// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the C type subset.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{CType, IntKind};

#[test]
fn scalar_sizes_lp64() {
    assert_eq!(CType::char().byte_size(), Some(1));
    assert_eq!(CType::Int(IntKind::Short).byte_size(), Some(2));
    assert_eq!(CType::int().byte_size(), Some(4));
    assert_eq!(CType::Int(IntKind::Long).byte_size(), Some(8));
    assert_eq!(CType::Float.byte_size(), Some(4));
    assert_eq!(CType::Double.byte_size(), Some(8));
    assert_eq!(CType::ptr(CType::Void).byte_size(), Some(8));
}

#[test]
fn void_has_no_size() {
    assert!(CType::Void.is_void());
    assert_eq!(CType::Void.byte_size(), None);
}

#[test]
fn array_sizes() {
    let arr = CType::array_of(CType::int(), Some(4));
    assert_eq!(arr.byte_size(), Some(16));
    assert_eq!(arr.bit_size(), Some(128));

    let unsized_arr = CType::array_of(CType::int(), None);
    assert_eq!(unsized_arr.byte_size(), None);
}

#[test]
fn pointee_access() {
    let p = CType::ptr(CType::int());
    assert_eq!(p.pointee(), Some(&CType::int()));
    assert_eq!(CType::int().pointee(), None);
}

#[test]
fn display_forms() {
    assert_eq!(format!("{}", CType::int()), "int");
    assert_eq!(format!("{}", CType::ptr(CType::char())), "char *");
    assert_eq!(format!("{}", CType::array_of(CType::int(), Some(3))), "int[3]");
    assert_eq!(format!("{}", CType::array_of(CType::char(), None)), "char[]");
}
