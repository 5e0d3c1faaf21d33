//! Persistent per-callable timing records
//!
//! A record is created the first time a callable identity is entered and
//! lives as long as the store. Every completed invocation folds into it
//! additively, so recursive and repeated calls sum rather than overwrite.
//!
//! Total cost of a line-resolved callable is
//! `overhead + Σ(line_internal[i] + line_external[i])`.

use crate::call_stack::ActiveInvocation;
use crate::source::SourceSnapshot;
use std::time::Duration;

/// Internal and external time of one source line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineState {
    internal: Duration,
    external: Duration,
}

impl LineState {
    #[inline]
    pub fn add_internal(&mut self, d: Duration) {
        self.internal += d;
    }

    #[inline]
    pub fn add_external(&mut self, d: Duration) {
        self.external += d;
    }

    pub fn internal(&self) -> Duration {
        self.internal
    }

    pub fn external(&self) -> Duration {
        self.external
    }

    pub fn total(&self) -> Duration {
        self.internal + self.external
    }
}

/// Aggregate-only record: a name and the time charged to call machinery
///
/// Foreign routines only ever have this form, since nothing inside them is
/// visible line by line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableRecord {
    name: String,
    overhead: Duration,
}

impl CallableRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overhead: Duration::ZERO,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn overhead(&self) -> Duration {
        self.overhead
    }

    #[inline]
    pub fn add_overhead(&mut self, d: Duration) {
        self.overhead += d;
    }
}

/// Record of an interpreted callable with per-line accumulators
///
/// The three per-line vectors are index-aligned and sized from the source
/// snapshot taken at first call-entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineResolvedRecord {
    base: CallableRecord,
    starting_line: u32,
    source_lines: Vec<String>,
    line_internal: Vec<Duration>,
    line_external: Vec<Duration>,
}

impl LineResolvedRecord {
    pub fn from_snapshot(snapshot: SourceSnapshot) -> Self {
        let n = snapshot.line_count();
        Self {
            base: CallableRecord::new(snapshot.name),
            starting_line: snapshot.starting_line,
            source_lines: snapshot.lines,
            line_internal: vec![Duration::ZERO; n],
            line_external: vec![Duration::ZERO; n],
        }
    }

    pub fn base(&self) -> &CallableRecord {
        &self.base
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn overhead(&self) -> Duration {
        self.base.overhead()
    }

    pub fn starting_line(&self) -> u32 {
        self.starting_line
    }

    pub fn line_count(&self) -> usize {
        self.source_lines.len()
    }

    pub fn source_lines(&self) -> &[String] {
        &self.source_lines
    }

    pub fn line_internal(&self) -> &[Duration] {
        &self.line_internal
    }

    pub fn line_external(&self) -> &[Duration] {
        &self.line_external
    }

    /// Absolute source line number of array index `idx`
    pub fn line_number(&self, idx: usize) -> u32 {
        let offset = u32::try_from(idx).unwrap_or(u32::MAX);
        self.starting_line.saturating_add(1).saturating_add(offset)
    }

    /// Overhead plus every line's internal and external time
    pub fn total(&self) -> Duration {
        self.line_internal
            .iter()
            .chain(self.line_external.iter())
            .fold(self.base.overhead(), |acc, d| acc + *d)
    }

    /// Fold one completed invocation into the record
    ///
    /// Returns the invocation's total cost. The invocation was sized from
    /// this record's snapshot, so the line arrays always align.
    pub fn absorb(&mut self, invocation: &ActiveInvocation) -> Duration {
        debug_assert_eq!(invocation.lines().len(), self.line_count());

        for ((internal, external), line) in self
            .line_internal
            .iter_mut()
            .zip(self.line_external.iter_mut())
            .zip(invocation.lines())
        {
            *internal += line.internal();
            *external += line.external();
        }
        self.base.add_overhead(invocation.overhead());

        invocation.total()
    }
}
