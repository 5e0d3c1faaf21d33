//! Source metadata for interpreted callables
//!
//! The engine needs two facts about a callable the first time it is entered:
//! the text of its body lines and the absolute line number of its header.
//! Both come from a [`SourceProvider`], which the host runtime implements.

use crate::error::{ProfilerError, Result};
use crate::event::CallableId;
use fnv::FnvHashMap;

/// Source text of one callable, taken once at first call-entry
///
/// `lines[i]` holds absolute line `starting_line + 1 + i`. The header line
/// at `starting_line` itself is not tracked, so an executing line `n` maps
/// to index `n - starting_line - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSnapshot {
    pub name: String,
    pub starting_line: u32,
    pub lines: Vec<String>,
}

impl SourceSnapshot {
    pub fn new(name: impl Into<String>, starting_line: u32, lines: Vec<String>) -> Self {
        Self {
            name: name.into(),
            starting_line,
            lines,
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// Looks up source metadata for a callable identity
///
/// Consulted at most once per identity. A failure aborts the call-entry
/// event that triggered the lookup.
pub trait SourceProvider {
    fn snapshot(&self, callable: CallableId) -> Result<SourceSnapshot>;
}

impl<F> SourceProvider for F
where
    F: Fn(CallableId) -> Result<SourceSnapshot>,
{
    fn snapshot(&self, callable: CallableId) -> Result<SourceSnapshot> {
        self(callable)
    }
}

/// In-memory source provider
///
/// Used by trace replay, where callable definitions travel alongside the
/// events, and by tests.
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    entries: FnvHashMap<CallableId, SourceSnapshot>,
}

impl SourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the source of a callable
    pub fn insert(&mut self, callable: CallableId, snapshot: SourceSnapshot) {
        self.entries.insert(callable, snapshot);
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, callable: CallableId, snapshot: SourceSnapshot) -> Self {
        self.insert(callable, snapshot);
        self
    }

    pub fn contains(&self, callable: CallableId) -> bool {
        self.entries.contains_key(&callable)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SourceProvider for SourceTable {
    fn snapshot(&self, callable: CallableId) -> Result<SourceSnapshot> {
        self.entries
            .get(&callable)
            .cloned()
            .ok_or_else(|| ProfilerError::MissingSource {
                callable,
                reason: "callable was never registered".to_string(),
            })
    }
}
