//! Identity-keyed aggregation store
//!
//! Holds one [`LineResolvedRecord`] per interpreted callable identity and
//! one [`CallableRecord`] per foreign printable name. Records are never
//! removed. Iteration follows first-seen order so reports are stable
//! across runs.
//!
//! Foreign routines are keyed by name only: two distinct routines whose
//! printable names match share a single record.

use crate::call_stack::ActiveInvocation;
use crate::error::{ProfilerError, Result};
use crate::event::CallableId;
use crate::record::{CallableRecord, LineResolvedRecord};
use crate::source::SourceProvider;
use fnv::FnvHashMap;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct ReportStore {
    functions: FnvHashMap<CallableId, LineResolvedRecord>,
    function_order: Vec<CallableId>,
    foreign: FnvHashMap<String, CallableRecord>,
    foreign_order: Vec<String>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the record for `callable`, creating it on first sight
    ///
    /// The source provider is consulted only when the record is created. If
    /// the lookup fails nothing is inserted.
    pub fn ensure_function<P: SourceProvider + ?Sized>(
        &mut self,
        callable: CallableId,
        sources: &P,
    ) -> Result<&LineResolvedRecord> {
        if !self.functions.contains_key(&callable) {
            let snapshot = sources.snapshot(callable)?;
            tracing::debug!(
                "new callable record {} '{}' ({} lines from line {})",
                callable,
                snapshot.name,
                snapshot.line_count(),
                snapshot.starting_line
            );
            self.functions
                .insert(callable, LineResolvedRecord::from_snapshot(snapshot));
            self.function_order.push(callable);
        }
        self.functions
            .get(&callable)
            .ok_or(ProfilerError::UnknownCallable(callable))
    }

    /// Return the foreign record for `name`, creating it on first sight
    pub fn ensure_foreign(&mut self, name: &str) -> &mut CallableRecord {
        if !self.foreign.contains_key(name) {
            tracing::debug!("new foreign record '{}'", name);
            self.foreign_order.push(name.to_string());
        }
        self.foreign
            .entry(name.to_string())
            .or_insert_with(|| CallableRecord::new(name))
    }

    /// Fold a completed invocation into its callable's record
    ///
    /// Returns the invocation's total cost, which the caller propagates as
    /// external time.
    pub fn fold(&mut self, invocation: &ActiveInvocation) -> Result<Duration> {
        let callable = invocation.callable();
        let record = self
            .functions
            .get_mut(&callable)
            .ok_or(ProfilerError::UnknownCallable(callable))?;
        Ok(record.absorb(invocation))
    }

    pub fn function(&self, callable: CallableId) -> Option<&LineResolvedRecord> {
        self.functions.get(&callable)
    }

    pub fn foreign(&self, name: &str) -> Option<&CallableRecord> {
        self.foreign.get(name)
    }

    /// Line-resolved records in first-seen order
    pub fn functions(&self) -> impl Iterator<Item = (CallableId, &LineResolvedRecord)> {
        self.function_order
            .iter()
            .filter_map(|id| self.functions.get(id).map(|rec| (*id, rec)))
    }

    /// Foreign records in first-seen order
    pub fn foreign_records(&self) -> impl Iterator<Item = &CallableRecord> {
        self.foreign_order
            .iter()
            .filter_map(|name| self.foreign.get(name))
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn foreign_count(&self) -> usize {
        self.foreign.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.foreign.is_empty()
    }
}
