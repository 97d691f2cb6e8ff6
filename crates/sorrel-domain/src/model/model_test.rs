// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for abstract memory states.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{BaseLookup, Model};
use crate::ival::Ival;
use crate::offsetmap::OffsetMap;
use crate::types::BaseId;
use crate::value::Value;

fn om(n: i64) -> OffsetMap {
    OffsetMap::create_isotropic(32, &Value::from_ival(Ival::singleton(n)))
}

#[test]
fn empty_binds_nothing() {
    let state = Model::empty();
    assert!(!state.is_bottom());
    assert!(!state.is_bound(BaseId::new(0)));
    assert!(state.find_base(BaseId::new(0)).is_none());
}

#[test]
fn add_find_remove() {
    let b = BaseId::new(1);
    let mut state = Model::empty();
    state.add_base(b, om(5));
    assert!(state.is_bound(b));
    assert_eq!(state.find_base(b), Some(&om(5)));

    state.remove_base(b);
    assert!(!state.is_bound(b));
}

#[test]
fn degenerate_states_absorb_updates() {
    let b = BaseId::new(1);

    let mut bot = Model::bottom();
    bot.add_base(b, om(1));
    assert_eq!(bot, Model::bottom());
    assert!(!bot.is_bound(b));

    let mut top = Model::top();
    top.add_base(b, om(1));
    assert_eq!(top, Model::top());
    assert!(top.is_bound(b));
}

#[test]
fn lookup_reports_degenerate_states() {
    let b = BaseId::new(2);
    assert_eq!(Model::top().find_base_or_default(b), BaseLookup::Top);
    assert_eq!(Model::bottom().find_base_or_default(b), BaseLookup::Bottom);
    assert_eq!(Model::empty().find_base_or_default(b), BaseLookup::Bottom);

    let mut state = Model::empty();
    state.add_base(b, om(3));
    assert_eq!(state.find_base_or_default(b), BaseLookup::Map(&om(3)));
}

#[test]
fn join_identities() {
    let b = BaseId::new(1);
    let mut state = Model::empty();
    state.add_base(b, om(7));

    assert_eq!(state.join(&Model::bottom()), state);
    assert_eq!(Model::bottom().join(&state), state);
    assert_eq!(state.join(&Model::top()), Model::top());
}

#[test]
fn join_is_pointwise_on_bindings() {
    let shared = BaseId::new(1);
    let only_a = BaseId::new(2);
    let only_b = BaseId::new(3);

    let mut a = Model::empty();
    a.add_base(shared, om(1));
    a.add_base(only_a, om(2));

    let mut b = Model::empty();
    b.add_base(shared, om(9));
    b.add_base(only_b, om(3));

    let j = a.join(&b);
    assert_eq!(j.find_base(shared), Some(&om(1).join(&om(9))));
    assert_eq!(j.find_base(only_a), Some(&om(2)));
    assert_eq!(j.find_base(only_b), Some(&om(3)));
}
