//! Live invocations and the call stack that holds them
//!
//! One [`ActiveInvocation`] exists per interpreted callable currently
//! executing. Entries are pushed on call-entry and popped on return, in
//! exact lockstep with the event stream.

use crate::error::{ProfilerError, Result};
use crate::event::CallableId;
use crate::record::LineState;
use std::time::Duration;

/// Transient timing state of one in-progress call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveInvocation {
    callable: CallableId,
    starting_line: u32,
    /// Absolute line last reported executing; 0 until the first line event
    current_line: u32,
    lines: Vec<LineState>,
    overhead: Duration,
}

impl ActiveInvocation {
    pub fn new(callable: CallableId, starting_line: u32, line_count: usize) -> Self {
        Self {
            callable,
            starting_line,
            current_line: 0,
            lines: vec![LineState::default(); line_count],
            overhead: Duration::ZERO,
        }
    }

    pub fn callable(&self) -> CallableId {
        self.callable
    }

    pub fn starting_line(&self) -> u32 {
        self.starting_line
    }

    /// Line currently executing, if one has been reported
    pub fn current_line(&self) -> Option<u32> {
        (self.current_line != 0).then_some(self.current_line)
    }

    pub fn has_line(&self) -> bool {
        self.current_line != 0
    }

    pub fn set_current_line(&mut self, line: u32) {
        self.current_line = line;
    }

    /// Accumulator for the line currently executing
    ///
    /// Fails when no line has been reported yet or when the line falls
    /// outside the callable's source snapshot.
    pub fn current_line_state(&mut self) -> Result<&mut LineState> {
        let len = self.lines.len();
        let idx = self
            .current_line
            .checked_sub(self.starting_line)
            .and_then(|rel| rel.checked_sub(1))
            .and_then(|rel| usize::try_from(rel).ok())
            .filter(|&idx| idx < len);

        match idx {
            Some(idx) => Ok(&mut self.lines[idx]),
            None => Err(ProfilerError::LineOutOfRange {
                callable: self.callable,
                line: self.current_line,
                starting_line: self.starting_line,
                len,
            }),
        }
    }

    pub fn lines(&self) -> &[LineState] {
        &self.lines
    }

    pub fn overhead(&self) -> Duration {
        self.overhead
    }

    #[inline]
    pub fn add_overhead(&mut self, d: Duration) {
        self.overhead += d;
    }

    /// Charge external time to the current line, or to overhead when the
    /// invocation has not reported a line yet
    pub fn add_external_or_overhead(&mut self, d: Duration) -> Result<()> {
        if self.has_line() {
            self.current_line_state()?.add_external(d);
        } else {
            self.add_overhead(d);
        }
        Ok(())
    }

    /// Σ(internal + external) over lines, plus overhead
    pub fn total(&self) -> Duration {
        self.lines
            .iter()
            .fold(self.overhead, |acc, line| acc + line.total())
    }
}

/// Strict LIFO stack of live invocations
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    frames: Vec<ActiveInvocation>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, invocation: ActiveInvocation) {
        self.frames.push(invocation);
    }

    /// Pop the innermost invocation
    ///
    /// An empty stack means the event source delivered a return it never
    /// announced a call for.
    pub fn pop(&mut self) -> Result<ActiveInvocation> {
        self.frames.pop().ok_or(ProfilerError::StackUnderflow)
    }

    pub fn top(&self) -> Option<&ActiveInvocation> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut ActiveInvocation> {
        self.frames.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Drop every live invocation without folding, returning how many
    pub fn clear(&mut self) -> usize {
        let n = self.frames.len();
        self.frames.clear();
        n
    }

    /// Outermost first
    pub fn iter(&self) -> impl Iterator<Item = &ActiveInvocation> {
        self.frames.iter()
    }
}
