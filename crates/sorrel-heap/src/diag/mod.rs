// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Diagnostics sink.
//!
//! Recoverable findings (invalid frees, invalid reallocs, leaks) are not
//! errors: the analysis continues on the valid part of the operation. They
//! are collected here, deduplicated per call site and detail, and rendered
//! by the analyzer frontend.


use core::fmt;
use std::collections::BTreeSet;

use crate::callstack::CallSite;

/// Kind of a recoverable finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticKind {
    /// `free` on something that is not a zero-offset allocated pointer.
    WrongFree,
    /// `realloc` on something that is not a zero-offset allocated pointer.
    WrongRealloc,
    /// A malloced base unreachable from the rest of the state.
    Leak,
}

impl DiagnosticKind {
    /// Short label used when rendering the finding.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::WrongFree => "Wrong free",
            Self::WrongRealloc => "Wrong realloc",
            Self::Leak => "Memory leak",
        }
    }
}

/// One emitted finding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// What was found.
    pub kind: DiagnosticKind,
    /// Where it was found.
    pub site: CallSite,
    /// Free-form detail, e.g. the offending value or base name.
    pub detail: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.site, self.kind.label(), self.detail)
    }
}

/// Collecting sink with per-site deduplication.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    emitted: Vec<Diagnostic>,
    seen: BTreeSet<(CallSite, DiagnosticKind, String)>,
}

impl Diagnostics {
    /// Creates an empty sink.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            emitted: Vec::new(),
            seen: BTreeSet::new(),
        }
    }

    /// Records a finding unless the same one was already emitted at this
    /// call site. Returns whether it was newly recorded.
    pub fn report(&mut self, site: &CallSite, kind: DiagnosticKind, detail: impl Into<String>) -> bool {
        let detail = detail.into();
        let key = (site.clone(), kind, detail.clone());
        if !self.seen.insert(key) {
            return false;
        }
        self.emitted.push(Diagnostic {
            kind,
            site: site.clone(),
            detail,
        });
        true
    }

    /// The findings in emission order.
    #[must_use]
    pub fn emitted(&self) -> &[Diagnostic] {
        &self.emitted
    }

    /// Number of findings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.emitted.len()
    }

    /// Checks whether nothing was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }

    /// Checks whether a finding of `kind` was emitted.
    #[must_use]
    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.emitted.iter().any(|d| d.kind == kind)
    }
}
