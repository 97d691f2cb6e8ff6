// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Bit-granular offset-maps.
//!
//! An `OffsetMap` maps disjoint inclusive bit ranges of one allocation base
//! to abstract values. Unmapped bits read as bottom. Writes are either
//! *exact* (strong update: overwrite) or *inexact* (weak update: join with
//! the previous contents); reads join every value intersecting the queried
//! range.
//!
//! Values are not sliced at the bit level: a copy or write that cuts a
//! mapped range mid-value keeps the whole value on the overlapped part.
//! This loses precision but never soundness, since reads join.


use crate::value::Value;

/// One mapped range. Invariant: `0 <= start <= end < size_bits` and the
/// value is not bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Segment {
    start: i64,
    end: i64,
    value: Value,
}

/// Map from disjoint bit ranges to values over `[0, size_bits)`.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct OffsetMap {
    size_bits: i64,
    /// Sorted by `start`, pairwise disjoint, adjacent equal values merged.
    segments: Vec<Segment>,
}

impl OffsetMap {
    /// An empty map of the given size; every bit reads as bottom.
    #[must_use]
    pub fn new(size_bits: i64) -> Self {
        Self {
            size_bits: size_bits.max(0),
            segments: Vec::new(),
        }
    }

    /// A map of `size_bits` bits all holding `value`.
    ///
    /// A non-positive size or a bottom value yields an unmapped map.
    #[must_use]
    pub fn create_isotropic(size_bits: i64, value: &Value) -> Self {
        let mut map = Self::new(size_bits);
        if map.size_bits > 0 && !value.is_bottom() {
            map.segments.push(Segment {
                start: 0,
                end: map.size_bits - 1,
                value: value.clone(),
            });
        }
        map
    }

    /// The mapped size in bits.
    #[must_use]
    pub const fn size_bits(&self) -> i64 {
        self.size_bits
    }

    /// Checks whether no bit is mapped.
    #[must_use]
    pub fn is_unmapped(&self) -> bool {
        self.segments.is_empty()
    }

    /// Writes `value` over the inclusive bit range `[start, end]`.
    ///
    /// `exact` overwrites (strong update); inexact joins with the previous
    /// contents (weak update). The range is clipped to the map size; an
    /// empty range is a no-op. An exact write of bottom unmaps the range.
    pub fn write(&mut self, start: i64, end: i64, value: &Value, exact: bool) {
        let start = start.max(0);
        let end = end.min(self.size_bits - 1);
        if start > end {
            return;
        }

        let mut out: Vec<Segment> = Vec::with_capacity(self.segments.len() + 2);
        // Overlapped pieces, re-inserted joined (inexact) or dropped (exact).
        let mut pieces: Vec<Segment> = Vec::new();
        for seg in &self.segments {
            if seg.end < start || seg.start > end {
                out.push(seg.clone());
                continue;
            }
            if seg.start < start {
                out.push(Segment {
                    start: seg.start,
                    end: start - 1,
                    value: seg.value.clone(),
                });
            }
            if seg.end > end {
                out.push(Segment {
                    start: end + 1,
                    end: seg.end,
                    value: seg.value.clone(),
                });
            }
            if !exact {
                pieces.push(Segment {
                    start: seg.start.max(start),
                    end: seg.end.min(end),
                    value: seg.value.join(value),
                });
            }
        }

        if exact {
            if !value.is_bottom() {
                out.push(Segment {
                    start,
                    end,
                    value: value.clone(),
                });
            }
        } else {
            // Fill the gaps between overlapped pieces with the bare value.
            pieces.sort_by_key(|s| s.start);
            let mut cursor = start;
            for piece in pieces {
                if cursor < piece.start && !value.is_bottom() {
                    out.push(Segment {
                        start: cursor,
                        end: piece.start - 1,
                        value: value.clone(),
                    });
                }
                cursor = piece.end + 1;
                out.push(piece);
            }
            if cursor <= end && !value.is_bottom() {
                out.push(Segment {
                    start: cursor,
                    end,
                    value: value.clone(),
                });
            }
        }

        self.segments = out;
        self.normalize();
    }

    /// Reads the join of every value intersecting `[start, end]`.
    #[must_use]
    pub fn read(&self, start: i64, end: i64) -> Value {
        let mut acc = Value::bottom();
        for seg in &self.segments {
            if seg.end >= start && seg.start <= end {
                acc = acc.join(&seg.value);
            }
        }
        acc
    }

    /// Least upper bound; the result covers the larger of both sizes.
    ///
    /// Bits mapped on one side only keep their value (join with bottom).
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut cuts: Vec<i64> = Vec::new();
        for seg in self.segments.iter().chain(&other.segments) {
            cuts.push(seg.start);
            cuts.push(seg.end + 1);
        }
        cuts.sort_unstable();
        cuts.dedup();

        let mut map = Self::new(self.size_bits.max(other.size_bits));
        for pair in cuts.windows(2) {
            let (lo, hi) = (pair[0], pair[1] - 1);
            let v = self.read(lo, hi).join(&other.read(lo, hi));
            if !v.is_bottom() {
                map.segments.push(Segment {
                    start: lo,
                    end: hi,
                    value: v,
                });
            }
        }
        map.normalize();
        map
    }

    /// Copies `[start, end]` into a fresh map rebased at zero.
    #[must_use]
    pub fn copy_slice(&self, start: i64, end: i64) -> Self {
        let mut map = Self::new(end - start + 1);
        if map.size_bits == 0 {
            return map;
        }
        for seg in &self.segments {
            if seg.end < start || seg.start > end {
                continue;
            }
            map.segments.push(Segment {
                start: seg.start.max(start) - start,
                end: seg.end.min(end) - start,
                value: seg.value.clone(),
            });
        }
        map.normalize();
        map
    }

    /// Pastes `slab` at bit offset `at`, segment by segment.
    ///
    /// `exact` selects strong versus weak (joining) writes.
    pub fn paste_slice(&mut self, at: i64, slab: &Self, exact: bool) {
        for seg in &slab.segments {
            self.write(at + seg.start, at + seg.end, &seg.value, exact);
        }
    }

    /// Iterates over the mapped values.
    pub fn iter_values(&self) -> impl Iterator<Item = &Value> {
        self.segments.iter().map(|s| &s.value)
    }

    /// Iterates over `(start, end, value)` for the mapped ranges.
    pub fn iter(&self) -> impl Iterator<Item = (i64, i64, &Value)> {
        self.segments.iter().map(|s| (s.start, s.end, &s.value))
    }

    /// Rebuilds the map with `f` applied to every mapped value.
    ///
    /// Values mapped to bottom are unmapped.
    #[must_use]
    pub fn map_values(&self, f: impl Fn(&Value) -> Value) -> Self {
        let mut map = Self::new(self.size_bits);
        for seg in &self.segments {
            let value = f(&seg.value);
            if !value.is_bottom() {
                map.segments.push(Segment {
                    start: seg.start,
                    end: seg.end,
                    value,
                });
            }
        }
        map.normalize();
        map
    }

    /// Restores the segment invariant: sorted, disjoint by construction,
    /// adjacent ranges with equal values merged.
    fn normalize(&mut self) {
        self.segments.sort_by_key(|s| s.start);
        let mut merged: Vec<Segment> = Vec::with_capacity(self.segments.len());
        for seg in self.segments.drain(..) {
            if let Some(last) = merged.last_mut() {
                if last.end + 1 == seg.start && last.value == seg.value {
                    last.end = seg.end;
                    continue;
                }
            }
            merged.push(seg);
        }
        self.segments = merged;
    }
}
