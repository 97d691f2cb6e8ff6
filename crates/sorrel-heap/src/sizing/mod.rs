// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Size inference for allocation requests.
//!
//! Projects the abstract size argument to a byte interval, guesses the
//! intended element type from the call site's destination lvalue, and
//! derives an element count for fixed-size strong allocations.


use num_integer::Integer;
use num_traits::{Signed, ToPrimitive};
use sorrel_domain::{CType, Ival};

/// Upper bound on allocation sizes the model tracks, in bytes.
///
/// Sized so that bit bounds (`8 * size - 1`) always fit an `i64`.
pub const MAX_ALLOC_BYTES: u64 = 1 << 40;

/// Projects an abstract size to a `[smin, smax]` byte interval.
///
/// `smin >= 0` and `smax <= MAX_ALLOC_BYTES`; a size that cannot be
/// projected (bottom, unbounded, or out of machine range) defaults to the
/// full `[0, MAX_ALLOC_BYTES]`.
#[must_use]
pub fn extract_size(sizev: &Ival) -> (u64, u64) {
    let Some((lo, hi)) = sizev.bounds() else {
        return (0, MAX_ALLOC_BYTES);
    };
    let smax = hi.map_or(MAX_ALLOC_BYTES, |h| {
        if h.is_negative() {
            0
        } else {
            h.to_u64().map_or(MAX_ALLOC_BYTES, |v| v.min(MAX_ALLOC_BYTES))
        }
    });
    let smin = lo.map_or(0, |l| l.to_u64().map_or(0, |v| v.min(MAX_ALLOC_BYTES)));
    (smin.min(smax), smax)
}

/// Byte interval of a request plus the guessed element type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedSize {
    /// Smallest requested size in bytes.
    pub min_bytes: u64,
    /// Largest requested size in bytes.
    pub max_bytes: u64,
    /// Guessed element type of the allocation.
    pub elem_typ: CType,
    /// Element count; defined only for fixed-size strong requests.
    pub nb_elems: Option<u64>,
}

impl TypedSize {
    /// Derives the typed size of one allocation request.
    ///
    /// The element type is the pointee `T` of the destination lvalue when
    /// that is a non-void pointer and both size bounds are multiples of
    /// `sizeof(T)`; otherwise `char`. The element count is defined iff the
    /// size argument is a compile-time constant, the interval is a
    /// singleton, and the request is strong.
    #[must_use]
    pub fn infer(sizev: &Ival, dst_type: Option<&CType>, constant_size: bool, weak: bool) -> Self {
        let (min_bytes, max_bytes) = extract_size(sizev);
        let elem_typ = guess_elem_type(dst_type, min_bytes, max_bytes);
        let elem_size = elem_typ.byte_size().unwrap_or(1);
        let nb_elems = (constant_size && !weak && min_bytes == max_bytes)
            .then(|| min_bytes / elem_size);
        Self {
            min_bytes,
            max_bytes,
            elem_typ,
            nb_elems,
        }
    }

    /// The C type given to the allocation base.
    ///
    /// Scalar `T` for exactly one element, `T[n]` for a known count above
    /// one, unsized `T[]` when the count is unknown, zero, or the base is
    /// weak.
    #[must_use]
    pub fn allocation_type(&self, weak: bool) -> CType {
        if !weak {
            match self.nb_elems {
                Some(1) => return self.elem_typ.clone(),
                Some(n) if n > 1 => return CType::array_of(self.elem_typ.clone(), Some(n)),
                _ => {}
            }
        }
        CType::array_of(self.elem_typ.clone(), None)
    }

    /// Validity bounds in bits: `(8 * smin - 1, 8 * smax - 1)`.
    ///
    /// Both are `-1` for a zero-byte size.
    #[must_use]
    pub fn bit_bounds(&self) -> (i64, i64) {
        (bits_of_bytes(self.min_bytes), bits_of_bytes(self.max_bytes))
    }
}

/// Last bit offset of a byte count: `8 * bytes - 1`, `-1` for zero.
#[must_use]
pub fn bits_of_bytes(bytes: u64) -> i64 {
    i64::try_from(bytes.min(MAX_ALLOC_BYTES) * 8).map_or(i64::MAX, |b| b - 1)
}

fn guess_elem_type(dst_type: Option<&CType>, smin: u64, smax: u64) -> CType {
    if let Some(pointee) = dst_type.and_then(CType::pointee) {
        if !pointee.is_void() {
            if let Some(elem_size) = pointee.byte_size() {
                if elem_size > 0
                    && Integer::is_multiple_of(&smin, &elem_size)
                    && Integer::is_multiple_of(&smax, &elem_size)
                {
                    return pointee.clone();
                }
            }
        }
    }
    CType::char()
}
