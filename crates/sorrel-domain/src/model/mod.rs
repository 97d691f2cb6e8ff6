// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Abstract memory states.
//!
//! A `Model` binds allocation bases to their offset-maps. `Bottom` is the
//! unreachable state, `Top` the state about which nothing is known. The
//! heap engine mutates `Map` states only; `Bottom` and `Top` absorb
//! updates.

#[cfg(test)]
mod model_test;

use std::collections::BTreeMap;

use crate::offsetmap::OffsetMap;
use crate::types::BaseId;

/// Result of looking a base up in a state that may be degenerate.
#[derive(Debug, PartialEq, Eq)]
pub enum BaseLookup<'a> {
    /// The state is `Top`: the base holds anything.
    Top,
    /// The state is `Bottom` or the base is unbound.
    Bottom,
    /// The base is bound to this offset-map.
    Map(&'a OffsetMap),
}

/// Abstract memory state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Model {
    /// Unreachable state.
    Bottom,
    /// Reachable state with per-base contents.
    Map(BTreeMap<BaseId, OffsetMap>),
    /// Completely unknown state.
    Top,
}

impl Model {
    /// The unreachable state.
    #[must_use]
    pub const fn bottom() -> Self {
        Self::Bottom
    }

    /// The completely unknown state.
    #[must_use]
    pub const fn top() -> Self {
        Self::Top
    }

    /// A reachable state with no bindings.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Map(BTreeMap::new())
    }

    /// Checks whether this is the unreachable state.
    #[must_use]
    pub const fn is_bottom(&self) -> bool {
        matches!(self, Self::Bottom)
    }

    /// The offset-map bound to `base`, if the state binds it.
    #[must_use]
    pub fn find_base(&self, base: BaseId) -> Option<&OffsetMap> {
        match self {
            Self::Map(map) => map.get(&base),
            Self::Bottom | Self::Top => None,
        }
    }

    /// Looks `base` up, reporting degenerate states explicitly.
    #[must_use]
    pub fn find_base_or_default(&self, base: BaseId) -> BaseLookup<'_> {
        match self {
            Self::Top => BaseLookup::Top,
            Self::Bottom => BaseLookup::Bottom,
            Self::Map(map) => map.get(&base).map_or(BaseLookup::Bottom, BaseLookup::Map),
        }
    }

    /// Checks whether the state binds `base`.
    ///
    /// Everything is bound in `Top`, nothing in `Bottom`.
    #[must_use]
    pub fn is_bound(&self, base: BaseId) -> bool {
        match self {
            Self::Top => true,
            Self::Bottom => false,
            Self::Map(map) => map.contains_key(&base),
        }
    }

    /// Binds `base` to `offsetmap`, replacing any previous binding.
    ///
    /// `Bottom` and `Top` absorb the update.
    pub fn add_base(&mut self, base: BaseId, offsetmap: OffsetMap) {
        if let Self::Map(map) = self {
            map.insert(base, offsetmap);
        }
    }

    /// Removes the binding of `base`, if any.
    pub fn remove_base(&mut self, base: BaseId) {
        if let Self::Map(map) = self {
            map.remove(&base);
        }
    }

    /// The bindings of a reachable, non-degenerate state.
    #[must_use]
    pub const fn as_map(&self) -> Option<&BTreeMap<BaseId, OffsetMap>> {
        match self {
            Self::Map(map) => Some(map),
            Self::Bottom | Self::Top => None,
        }
    }

    /// Mutable access to the bindings of a `Map` state.
    pub fn as_map_mut(&mut self) -> Option<&mut BTreeMap<BaseId, OffsetMap>> {
        match self {
            Self::Map(map) => Some(map),
            Self::Bottom | Self::Top => None,
        }
    }

    /// Least upper bound of two states.
    ///
    /// `Bottom` is the identity, `Top` absorbs; `Map` states join their
    /// bindings pointwise, keeping one-sided bindings as they are.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Top, _) | (_, Self::Top) => Self::Top,
            (Self::Bottom, s) | (s, Self::Bottom) => s.clone(),
            (Self::Map(a), Self::Map(b)) => {
                let mut out = a.clone();
                for (base, om) in b {
                    match out.get_mut(base) {
                        Some(existing) => *existing = existing.join(om),
                        None => {
                            out.insert(*base, om.clone());
                        }
                    }
                }
                Self::Map(out)
            }
        }
    }
}
