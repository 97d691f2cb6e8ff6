// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Integer interval lattice.
//!
//! An `Ival` abstracts a set of integers by its convex hull. Bounds are
//! arbitrary-precision (`BigInt`) and may be missing on either side, which
//! means the interval is unbounded in that direction. The lattice order is
//! interval inclusion with `Bottom` (empty set) at the bottom and the
//! doubly-unbounded interval at the top.


use core::fmt;
use num_bigint::BigInt;
use num_traits::Zero;

/// Integer interval with optional (= infinite) bounds.
///
/// Invariant: in `Range { lo: Some(l), hi: Some(h) }`, `l <= h`. The
/// constructors normalize an inverted range to `Bottom`.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Ival {
    /// The empty set of integers.
    #[default]
    Bottom,
    /// All integers `n` with `lo <= n <= hi`; a `None` bound is infinite.
    Range {
        /// Lower bound, `None` meaning unbounded below.
        lo: Option<BigInt>,
        /// Upper bound, `None` meaning unbounded above.
        hi: Option<BigInt>,
    },
}

impl Ival {
    /// The empty interval.
    #[must_use]
    pub const fn bottom() -> Self {
        Self::Bottom
    }

    /// The interval covering every integer.
    #[must_use]
    pub const fn top() -> Self {
        Self::Range { lo: None, hi: None }
    }

    /// The interval containing exactly `n`.
    #[must_use]
    pub fn singleton(n: impl Into<BigInt>) -> Self {
        let n = n.into();
        Self::Range {
            lo: Some(n.clone()),
            hi: Some(n),
        }
    }

    /// The interval containing exactly zero.
    #[must_use]
    pub fn zero() -> Self {
        Self::singleton(0)
    }

    /// An interval from optional bounds; an inverted range becomes `Bottom`.
    #[must_use]
    pub fn range(lo: Option<BigInt>, hi: Option<BigInt>) -> Self {
        if let (Some(l), Some(h)) = (&lo, &hi) {
            if l > h {
                return Self::Bottom;
            }
        }
        Self::Range { lo, hi }
    }

    /// A finite interval `[lo, hi]`; inverted ranges become `Bottom`.
    #[must_use]
    pub fn between(lo: impl Into<BigInt>, hi: impl Into<BigInt>) -> Self {
        Self::range(Some(lo.into()), Some(hi.into()))
    }

    /// Checks whether this is the empty interval.
    #[must_use]
    pub const fn is_bottom(&self) -> bool {
        matches!(self, Self::Bottom)
    }

    /// Checks whether this is the doubly-unbounded interval.
    #[must_use]
    pub const fn is_top(&self) -> bool {
        matches!(self, Self::Range { lo: None, hi: None })
    }

    /// Returns the contained integer if the interval is a singleton.
    #[must_use]
    pub fn as_singleton(&self) -> Option<&BigInt> {
        match self {
            Self::Range {
                lo: Some(l),
                hi: Some(h),
            } if l == h => Some(l),
            _ => None,
        }
    }

    /// Returns `(lo, hi)` bounds, or `None` for the empty interval.
    #[must_use]
    pub fn bounds(&self) -> Option<(Option<&BigInt>, Option<&BigInt>)> {
        match self {
            Self::Bottom => None,
            Self::Range { lo, hi } => Some((lo.as_ref(), hi.as_ref())),
        }
    }

    /// Checks whether `n` lies in the interval.
    #[must_use]
    pub fn contains(&self, n: &BigInt) -> bool {
        match self {
            Self::Bottom => false,
            Self::Range { lo, hi } => {
                lo.as_ref().is_none_or(|l| l <= n) && hi.as_ref().is_none_or(|h| n <= h)
            }
        }
    }

    /// Checks whether zero lies in the interval.
    #[must_use]
    pub fn contains_zero(&self) -> bool {
        self.contains(&BigInt::zero())
    }

    /// Least upper bound: the convex hull of both intervals.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, v) | (v, Self::Bottom) => v.clone(),
            (Self::Range { lo: l1, hi: h1 }, Self::Range { lo: l2, hi: h2 }) => {
                let lo = match (l1, l2) {
                    (Some(a), Some(b)) => Some(a.min(b).clone()),
                    _ => None,
                };
                let hi = match (h1, h2) {
                    (Some(a), Some(b)) => Some(a.max(b).clone()),
                    _ => None,
                };
                Self::Range { lo, hi }
            }
        }
    }

    /// Checks interval inclusion (`self` included in `other`).
    #[must_use]
    pub fn is_included_in(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bottom, _) => true,
            (_, Self::Bottom) => false,
            (Self::Range { lo: l1, hi: h1 }, Self::Range { lo: l2, hi: h2 }) => {
                let lo_ok = match (l1, l2) {
                    (_, None) => true,
                    (None, Some(_)) => false,
                    (Some(a), Some(b)) => b <= a,
                };
                let hi_ok = match (h1, h2) {
                    (_, None) => true,
                    (None, Some(_)) => false,
                    (Some(a), Some(b)) => a <= b,
                };
                lo_ok && hi_ok
            }
        }
    }
}

impl fmt::Display for Ival {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bottom => write!(f, "{{}}"),
            Self::Range { lo, hi } => {
                if let Some(n) = self.as_singleton() {
                    return write!(f, "{{{n}}}");
                }
                match lo {
                    Some(l) => write!(f, "[{l}..")?,
                    None => write!(f, "[--..")?,
                }
                match hi {
                    Some(h) => write!(f, "{h}]"),
                    None => write!(f, "++]"),
                }
            }
        }
    }
}
