// Event-driven timing attribution engine
//
// Converts a serialized stream of execution events into per-line internal
// and external time plus per-callable overhead.
//
// Deferred attribution: an interval's meaning is only known once the next
// event arrives, so each dispatch first *finishes* the interval opened by
// the previous event kind (using the incoming event's stack context), then
// *begins* the incoming event. See `rules` for the two tables.

mod rules;
mod session;

pub use rules::{begin_rule, finish_rule, BeginRule, FinishRule};
pub use session::Session;

use crate::clock::{Clock, MonotonicClock};
use crate::error::{ProfilerError, Result};
use crate::event::{CallableId, Event, EventKind};
use crate::report::{ReportOptions, ReportSink, ReportSnapshot, ReportStatus};
use crate::source::SourceProvider;
use crate::store::ReportStore;

/// Single-stream profiler: one session, one store
///
/// # Example
/// ```
/// use lineprof::clock::ManualClock;
/// use lineprof::engine::AttributionEngine;
/// use lineprof::event::{CallableId, Event};
/// use lineprof::source::{SourceSnapshot, SourceTable};
/// use std::time::Duration;
///
/// let f = CallableId::new(1);
/// let sources = SourceTable::new().with(
///     f,
///     SourceSnapshot::new("f", 10, vec!["    x = 1\n".into()]),
/// );
/// let clock = ManualClock::new();
/// let mut engine = AttributionEngine::with_clock(sources, clock.clone());
///
/// engine.start()?;
/// engine.dispatch(&Event::call(f, 10))?;
/// engine.dispatch(&Event::line(f, 11))?;
/// clock.advance(Duration::from_millis(2));
/// engine.dispatch(&Event::ret(f, 11))?;
///
/// let record = engine.store().function(f).unwrap();
/// assert_eq!(record.line_internal()[0], Duration::from_millis(2));
/// # Ok::<(), lineprof::error::ProfilerError>(())
/// ```
#[derive(Debug)]
pub struct AttributionEngine<P, C = MonotonicClock> {
    sources: P,
    clock: C,
    session: Session,
    store: ReportStore,
    enabled: bool,
    faulted: bool,
}

impl<P: SourceProvider> AttributionEngine<P, MonotonicClock> {
    /// Engine reading the high-resolution wall clock
    pub fn new(sources: P) -> Self {
        Self::with_clock(sources, MonotonicClock::new())
    }
}

impl<P: SourceProvider, C: Clock> AttributionEngine<P, C> {
    pub fn with_clock(sources: P, clock: C) -> Self {
        Self {
            sources,
            clock,
            session: Session::new(),
            store: ReportStore::new(),
            enabled: false,
            faulted: false,
        }
    }

    /// Begin accepting events; idempotent
    ///
    /// Accumulated records are kept, so start/stop cycles keep adding to
    /// the same store.
    pub fn start(&mut self) -> Result<()> {
        if self.faulted {
            return Err(ProfilerError::Faulted);
        }
        if !self.enabled {
            self.session.begin_stream(self.clock.now());
            self.enabled = true;
            tracing::debug!("profiling started");
        }
        Ok(())
    }

    /// Stop accepting events; idempotent
    ///
    /// In-flight invocations are abandoned without being folded.
    pub fn stop(&mut self) {
        if self.enabled {
            let abandoned = self.session.abandon();
            self.enabled = false;
            tracing::debug!("profiling stopped, {} in-flight invocations abandoned", abandoned);
        }
    }

    /// Event-source name for [`start`](Self::start)
    pub fn enable(&mut self) -> Result<()> {
        self.start()
    }

    /// Event-source name for [`stop`](Self::stop)
    pub fn disable(&mut self) {
        self.stop()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Feed one event through the engine
    ///
    /// Events arriving while stopped are ignored. Any error faults the
    /// engine: the stack can no longer be trusted, so later dispatches fail
    /// with [`ProfilerError::Faulted`].
    pub fn dispatch(&mut self, event: &Event) -> Result<()> {
        if self.faulted {
            return Err(ProfilerError::Faulted);
        }
        if !self.enabled {
            return Ok(());
        }
        match self
            .session
            .dispatch(event, &self.clock, &mut self.store, &self.sources)
        {
            Ok(_) => Ok(()),
            Err(err) => Err(self.fault(err)),
        }
    }

    /// Dispatch from a numeric event code, as a host binding would
    pub fn dispatch_raw(
        &mut self,
        code: i32,
        callable: CallableId,
        line: u32,
        foreign_target: Option<&str>,
    ) -> Result<()> {
        if self.faulted {
            return Err(ProfilerError::Faulted);
        }
        let kind = EventKind::from_code(code).map_err(|err| self.fault(err))?;
        let event = Event {
            kind,
            callable,
            line,
            foreign_target: foreign_target.map(str::to_string),
        };
        self.dispatch(&event)
    }

    fn fault(&mut self, err: ProfilerError) -> ProfilerError {
        tracing::error!(
            "profiler faulted at depth {}: {}",
            self.session.depth(),
            err
        );
        self.enabled = false;
        self.faulted = true;
        err
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    pub fn into_store(self) -> ReportStore {
        self.store
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn depth(&self) -> usize {
        self.session.depth()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Read-only copy of every tracked record
    pub fn snapshot(&self, options: &ReportOptions) -> ReportSnapshot {
        ReportSnapshot::from_store(&self.store, options)
    }

    /// Render the report to `destination` ("-" for standard output)
    pub fn produce_report(&self, options: &ReportOptions, destination: &str) -> Result<ReportStatus> {
        ReportSink::new(options.clone()).produce_report(&self.store, destination)
    }
}
