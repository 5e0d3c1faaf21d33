// Per-stream attribution state machine
//
// A session owns everything that must follow one ordered event stream: the
// call stack, the previous event kind, the timestamp that closed the last
// dispatch and the pending foreign target. The aggregation store is passed
// in, which lets several sessions (one per thread) share a single store.

use super::rules::{begin_rule, finish_rule, BeginRule, FinishRule};
use crate::call_stack::{ActiveInvocation, CallStack};
use crate::clock::Clock;
use crate::error::{ProfilerError, Result};
use crate::event::{Event, EventKind};
use crate::source::SourceProvider;
use crate::store::ReportStore;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Session {
    stack: CallStack,
    previous: EventKind,
    last_event_at: Duration,
    pending_foreign: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            stack: CallStack::new(),
            previous: EventKind::None,
            last_event_at: Duration::ZERO,
            pending_foreign: None,
        }
    }

    pub fn previous(&self) -> EventKind {
        self.previous
    }

    pub fn stack(&self) -> &CallStack {
        &self.stack
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn pending_foreign(&self) -> Option<&str> {
        self.pending_foreign.as_deref()
    }

    /// Arm the session: the next interval opens now and is never attributed
    ///
    /// Frames left over from an earlier stream are dropped unfolded.
    pub fn begin_stream(&mut self, now: Duration) {
        self.abandon();
        self.previous = EventKind::Origin;
        self.last_event_at = now;
    }

    /// Drop in-flight invocations without folding them
    ///
    /// Returns the number of abandoned invocations.
    pub fn abandon(&mut self) -> usize {
        self.previous = EventKind::None;
        self.pending_foreign = None;
        self.stack.clear()
    }

    /// Attribute the interval since the previous event, then apply `event`
    ///
    /// The clock is read twice: once on entry to close the pending interval
    /// and once on exit to open the next one, so bookkeeping done here is
    /// not charged to the profiled code. Returns the attributed interval.
    pub fn dispatch<C, P>(
        &mut self,
        event: &Event,
        clock: &C,
        store: &mut ReportStore,
        sources: &P,
    ) -> Result<Duration>
    where
        C: Clock + ?Sized,
        P: SourceProvider + ?Sized,
    {
        let elapsed = clock.now().saturating_sub(self.last_event_at);

        self.finish(finish_rule(self.previous), elapsed, store)?;
        self.begin(begin_rule(event.kind), event, store, sources)?;

        tracing::trace!(
            "{} -> {} elapsed={:?} depth={}",
            self.previous,
            event.kind,
            elapsed,
            self.stack.depth()
        );

        self.previous = event.kind;
        self.last_event_at = clock.now();
        Ok(elapsed)
    }

    fn finish(&mut self, rule: FinishRule, elapsed: Duration, store: &mut ReportStore) -> Result<()> {
        match rule {
            FinishRule::Ignore => {}
            FinishRule::LineInternal => {
                if let Some(top) = self.stack.top_mut() {
                    top.current_line_state()?.add_internal(elapsed);
                }
            }
            FinishRule::CallSetup
            | FinishRule::ResumedOverhead
            | FinishRule::ForeignReturnOverhead => {
                if let Some(top) = self.stack.top_mut() {
                    top.add_overhead(elapsed);
                }
            }
            FinishRule::ForeignCallCost => {
                let target = self
                    .pending_foreign
                    .as_deref()
                    .ok_or(ProfilerError::MissingForeignTarget)?;
                store.ensure_foreign(target).add_overhead(elapsed);
                if let Some(caller) = self.stack.top_mut() {
                    caller.add_external_or_overhead(elapsed)?;
                }
            }
        }
        Ok(())
    }

    fn begin<P>(
        &mut self,
        rule: BeginRule,
        event: &Event,
        store: &mut ReportStore,
        sources: &P,
    ) -> Result<()>
    where
        P: SourceProvider + ?Sized,
    {
        match rule {
            BeginRule::Nothing => {}
            BeginRule::Reject => return Err(ProfilerError::InvalidIncoming(event.kind)),
            BeginRule::SetLine => {
                if let Some(top) = self.stack.top_mut() {
                    top.set_current_line(event.line);
                }
            }
            BeginRule::EnterCallable => {
                let record = store.ensure_function(event.callable, sources)?;
                let invocation = ActiveInvocation::new(
                    event.callable,
                    record.starting_line(),
                    record.line_count(),
                );
                self.stack.push(invocation);
            }
            BeginRule::ReturnAndFold => {
                let finished = self.stack.pop()?;
                let total = store.fold(&finished)?;
                if let Some(caller) = self.stack.top_mut() {
                    caller.add_external_or_overhead(total)?;
                }
            }
            BeginRule::EnterForeign => {
                let target = event
                    .foreign_target
                    .as_deref()
                    .ok_or(ProfilerError::MissingForeignTarget)?;
                store.ensure_foreign(target);
                self.pending_foreign = Some(target.to_string());
            }
        }
        Ok(())
    }
}
