// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Callstacks and the per-callstack base registry.
//!
//! The analyzer hands the engine the chain of call sites it is currently
//! interpreting. For allocation the stack is *truncated*: configured
//! malloc-wrapper frames are stripped from the top so that the memoization
//! key is the outermost non-wrapper call site. The registry maps each
//! truncated stack to the ordered list of bases already coined there; that
//! list is the reuse pool of the precision ladder.

#[cfg(test)]
mod callstack_test;

use core::fmt;
use std::collections::BTreeMap;

use sorrel_domain::BaseId;

use crate::config::HeapOptions;

/// One call site: the called function and the line of the call.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct CallSite {
    /// Name of the function containing the call.
    pub function: String,
    /// Source line of the call.
    pub line: u32,
}

impl CallSite {
    /// Creates a call site.
    #[must_use]
    pub fn new(function: impl Into<String>, line: u32) -> Self {
        Self {
            function: function.into(),
            line,
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.function, self.line)
    }
}

/// Ordered list of call sites, outermost first.
///
/// The innermost frame (the current one) is the last element. A stack used
/// by the engine is never empty.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Callstack {
    frames: Vec<CallSite>,
}

impl Callstack {
    /// Creates an empty stack; push frames outermost first.
    #[must_use]
    pub const fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Creates a stack from frames given outermost first.
    #[must_use]
    pub fn from_frames(frames: Vec<CallSite>) -> Self {
        Self { frames }
    }

    /// Pushes a new innermost frame.
    pub fn push(&mut self, frame: CallSite) {
        self.frames.push(frame);
    }

    /// Number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Checks whether the stack has no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The innermost frame, if any.
    #[must_use]
    pub fn top(&self) -> Option<&CallSite> {
        self.frames.last()
    }

    /// The frames, outermost first.
    #[must_use]
    pub fn frames(&self) -> &[CallSite] {
        &self.frames
    }

    /// Strips configured wrapper frames from the top of the stack.
    ///
    /// While the stack has at least two frames and both the top function
    /// and its caller are configured malloc wrappers, the top frame is
    /// dropped. The stack is never emptied.
    #[must_use]
    pub fn truncate_wrappers(&self, options: &HeapOptions) -> Self {
        let mut frames = self.frames.clone();
        while frames.len() >= 2 {
            let top = &frames[frames.len() - 1];
            let caller = &frames[frames.len() - 2];
            if options.is_wrapper(&top.function) && options.is_wrapper(&caller.function) {
                frames.pop();
            } else {
                break;
            }
        }
        Self { frames }
    }
}

impl fmt::Display for Callstack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for frame in &self.frames {
            write!(f, "{sep}{frame}")?;
            sep = " -> ";
        }
        Ok(())
    }
}

/// Map from truncated callstacks to the bases coined there, in coin order.
///
/// Pools grow by append only; the precision ladder never removes entries.
#[derive(Clone, Debug, Default)]
pub struct CallstackRegistry {
    pools: BTreeMap<Callstack, Vec<BaseId>>,
}

impl CallstackRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pools: BTreeMap::new(),
        }
    }

    /// The reuse pool for `stack`; empty if nothing was coined there yet.
    #[must_use]
    pub fn pool(&self, stack: &Callstack) -> &[BaseId] {
        self.pools.get(stack).map_or(&[], Vec::as_slice)
    }

    /// Appends a freshly coined base to the pool of `stack`.
    pub fn append(&mut self, stack: Callstack, base: BaseId) {
        self.pools.entry(stack).or_default().push(base);
    }

    /// Number of distinct truncated stacks seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Checks whether no base was registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
