// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Abstract values.
//!
//! A `Value` abstracts the possible contents of a memory location: a
//! numeric component (an interval, which doubles as the set of offsets from
//! the NULL base, so NULL itself is the numeric zero), a pointer component
//! (per-base byte-offset intervals), and two sentinel flags:
//!
//! - `uninit` - the location may hold memory that was allocated but never
//!   written (the UNINITIALIZED marker);
//! - `escaping` - the location may hold a pointer to a deallocated base
//!   (the ESCAPINGADDR marker).
//!
//! Bottom is the value with no component at all; join is pointwise.


use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

use crate::ival::Ival;
use crate::types::BaseId;

/// Abstract value: numeric part, pointer part, and sentinel flags.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Value {
    /// Numeric component; contains zero iff the value may be NULL.
    num: Ival,
    /// Pointer component: possible byte offsets per base.
    pointers: BTreeMap<BaseId, Ival>,
    /// May be uninitialized memory.
    uninit: bool,
    /// May be a dangling pointer to a freed base.
    escaping: bool,
}

impl Value {
    /// The bottom value (no possible content).
    #[must_use]
    pub fn bottom() -> Self {
        Self::default()
    }

    /// The top value: any integer or address.
    #[must_use]
    pub fn top() -> Self {
        Self {
            num: Ival::top(),
            pointers: BTreeMap::new(),
            uninit: true,
            escaping: true,
        }
    }

    /// The singleton zero (NULL).
    #[must_use]
    pub fn singleton_zero() -> Self {
        Self::from_ival(Ival::zero())
    }

    /// A purely numeric value.
    #[must_use]
    pub fn from_ival(num: Ival) -> Self {
        Self {
            num,
            ..Self::default()
        }
    }

    /// A pointer into `base` at the given byte offsets.
    #[must_use]
    pub fn pointer(base: BaseId, offsets: Ival) -> Self {
        let mut pointers = BTreeMap::new();
        if !offsets.is_bottom() {
            pointers.insert(base, offsets);
        }
        Self {
            pointers,
            ..Self::default()
        }
    }

    /// The UNINITIALIZED marker.
    #[must_use]
    pub fn uninitialized() -> Self {
        Self {
            uninit: true,
            ..Self::default()
        }
    }

    /// The ESCAPINGADDR marker.
    #[must_use]
    pub fn escaping_addr() -> Self {
        Self {
            escaping: true,
            ..Self::default()
        }
    }

    /// Checks whether this is the bottom value.
    #[must_use]
    pub fn is_bottom(&self) -> bool {
        self.num.is_bottom() && self.pointers.is_empty() && !self.uninit && !self.escaping
    }

    /// The numeric component.
    #[must_use]
    pub const fn num(&self) -> &Ival {
        &self.num
    }

    /// The pointer component.
    #[must_use]
    pub const fn pointers(&self) -> &BTreeMap<BaseId, Ival> {
        &self.pointers
    }

    /// May this value be uninitialized memory?
    #[must_use]
    pub const fn is_uninit(&self) -> bool {
        self.uninit
    }

    /// May this value be a dangling pointer?
    #[must_use]
    pub const fn is_escaping(&self) -> bool {
        self.escaping
    }

    /// May this value be NULL?
    #[must_use]
    pub fn contains_null(&self) -> bool {
        self.num.contains_zero()
    }

    /// The offsets into `base`, if the value may point there.
    #[must_use]
    pub fn offsets_of(&self, base: BaseId) -> Option<&Ival> {
        self.pointers.get(&base)
    }

    /// Checks whether the value may point into `base`.
    #[must_use]
    pub fn has_pointer_to(&self, base: BaseId) -> bool {
        self.pointers.contains_key(&base)
    }

    /// Projects to the numeric component.
    ///
    /// Returns `None` when the value carries pointers, so that a caller
    /// asking for an integer cannot silently drop addresses.
    #[must_use]
    pub fn project_ival(&self) -> Option<&Ival> {
        if self.pointers.is_empty() {
            Some(&self.num)
        } else {
            None
        }
    }

    /// Enumerates `(numeric part, pointer parts)` for base-wise folds.
    ///
    /// Returns `None` when the numeric component is top: such a value
    /// stands for every possible address and its bases cannot be
    /// enumerated.
    #[must_use]
    pub fn try_pointer_parts(&self) -> Option<(&Ival, &BTreeMap<BaseId, Ival>)> {
        if self.num.is_top() {
            None
        } else {
            Some((&self.num, &self.pointers))
        }
    }

    /// Least upper bound: pointwise join of all components.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut pointers = self.pointers.clone();
        for (base, offsets) in &other.pointers {
            pointers
                .entry(*base)
                .and_modify(|o| *o = o.join(offsets))
                .or_insert_with(|| offsets.clone());
        }
        Self {
            num: self.num.join(&other.num),
            pointers,
            uninit: self.uninit || other.uninit,
            escaping: self.escaping || other.escaping,
        }
    }

    /// Rewrites references to freed bases into the ESCAPINGADDR marker.
    ///
    /// Pointer components targeting a base in `freed` are dropped and the
    /// escaping flag is set instead; all other components are untouched.
    #[must_use]
    pub fn escape_from(&self, freed: &BTreeSet<BaseId>) -> Self {
        let mut out = self.clone();
        let before = out.pointers.len();
        out.pointers.retain(|base, _| !freed.contains(base));
        if out.pointers.len() != before {
            out.escaping = true;
        }
        out
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            return write!(f, "BOT");
        }
        let mut parts: Vec<String> = Vec::new();
        if !self.num.is_bottom() {
            parts.push(format!("{}", self.num));
        }
        for (base, offsets) in &self.pointers {
            parts.push(format!("&{base}+{offsets}"));
        }
        if self.uninit {
            parts.push("UNINITIALIZED".to_owned());
        }
        if self.escaping {
            parts.push("ESCAPINGADDR".to_owned());
        }
        write!(f, "{}", parts.join(" | "))
    }
}
