//! Recorded event streams
//!
//! A trace is JSON lines, one record per line:
//!
//! ```text
//! {"type":"source","id":1,"name":"f","starting_line":10,"lines":["  x = 1\n"]}
//! {"type":"control","action":"start","t_ns":0}
//! {"type":"event","kind":"call","callable":1,"line":10,"t_ns":1000}
//! {"type":"event","kind":"foreign_call","callable":1,"line":11,"t_ns":2000,"target":"len"}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Replay drives the
//! engine from a [`ManualClock`] set to each record's timestamp, so the
//! same trace always yields the same report.

use crate::clock::ManualClock;
use crate::engine::AttributionEngine;
use crate::error::ProfilerError;
use crate::event::{CallableId, Event, EventKind};
use crate::source::{SourceSnapshot, SourceTable};
use crate::store::ReportStore;
use crate::threaded::ThreadedProfiler;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::time::Duration;

/// Thread key used for events that carry no `thread` field when replaying
/// a multi-threaded trace
pub const DEFAULT_THREAD: u64 = 0;

/// Profiler control action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Start,
    Stop,
}

/// One line of a recorded trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceRecord {
    /// Source metadata of an interpreted callable
    Source {
        id: CallableId,
        name: String,
        starting_line: u32,
        #[serde(default)]
        lines: Vec<String>,
    },
    /// One execution event
    Event {
        kind: EventKind,
        callable: CallableId,
        #[serde(default)]
        line: u32,
        t_ns: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thread: Option<u64>,
    },
    /// Start or stop the profiler
    Control {
        action: ControlAction,
        #[serde(default)]
        t_ns: u64,
    },
}

/// A parsed record with its 1-based line number in the trace
#[derive(Debug, Clone, PartialEq)]
pub struct TraceLine {
    pub number: usize,
    pub record: TraceRecord,
}

/// Parse one trace line; `None` for blank lines and comments
pub fn parse_line(line: &str) -> Result<Option<TraceRecord>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let record = serde_json::from_str(trimmed).context("Invalid trace record")?;
    Ok(Some(record))
}

/// Read a whole trace
pub fn read_trace<R: BufRead>(reader: R) -> Result<Vec<TraceLine>> {
    let mut lines = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let number = idx + 1;
        let line = line.with_context(|| format!("Failed to read trace line {}", number))?;
        if let Some(record) =
            parse_line(&line).with_context(|| format!("Malformed trace at line {}", number))?
        {
            lines.push(TraceLine { number, record });
        }
    }
    Ok(lines)
}

/// Result of replaying a trace
#[derive(Debug)]
pub struct ReplayOutcome {
    pub store: ReportStore,
    /// Events fed to the profiler, including those ignored while stopped
    pub events: usize,
    /// Distinct threads seen; 1 for a single-stream trace
    pub threads: usize,
}

enum Driver {
    Single(AttributionEngine<SourceTable, ManualClock>),
    Threaded(ThreadedProfiler<SourceTable, ManualClock>),
}

impl Driver {
    fn start(&mut self) -> std::result::Result<(), ProfilerError> {
        match self {
            Self::Single(engine) => engine.start(),
            Self::Threaded(prof) => prof.start(),
        }
    }

    fn stop(&mut self) {
        match self {
            Self::Single(engine) => engine.stop(),
            Self::Threaded(prof) => prof.stop(),
        }
    }

    fn dispatch(&mut self, thread: Option<u64>, event: &Event) -> std::result::Result<(), ProfilerError> {
        match self {
            Self::Single(engine) => engine.dispatch(event),
            Self::Threaded(prof) => prof.dispatch(thread.unwrap_or(DEFAULT_THREAD), event),
        }
    }

    fn finish(self) -> (ReportStore, usize) {
        match self {
            Self::Single(engine) => (engine.into_store(), 1),
            Self::Threaded(prof) => {
                let threads = prof.session_count();
                (prof.into_store(), threads)
            }
        }
    }
}

/// Replay parsed trace lines
///
/// Every `source` record is registered before the first event, wherever it
/// appears. Without any `control` record the profiler starts at the first
/// event's timestamp. Events with a `thread` field switch replay to one
/// session per thread.
pub fn replay(trace: &[TraceLine]) -> Result<ReplayOutcome> {
    let mut sources = SourceTable::new();
    let mut has_control = false;
    let mut threaded = false;

    for line in trace {
        match &line.record {
            TraceRecord::Source {
                id,
                name,
                starting_line,
                lines,
            } => {
                if sources.contains(*id) {
                    tracing::warn!("line {}: source for {} redefined", line.number, id);
                }
                sources.insert(
                    *id,
                    SourceSnapshot::new(name.clone(), *starting_line, lines.clone()),
                );
            }
            TraceRecord::Event { thread, .. } => threaded |= thread.is_some(),
            TraceRecord::Control { .. } => has_control = true,
        }
    }

    tracing::debug!(
        "replaying {} records, {} sources, threaded={}",
        trace.len(),
        sources.len(),
        threaded
    );

    let clock = ManualClock::new();
    let mut driver = if threaded {
        Driver::Threaded(ThreadedProfiler::with_clock(sources, clock.clone()))
    } else {
        Driver::Single(AttributionEngine::with_clock(sources, clock.clone()))
    };

    let mut events = 0;
    let mut last_t_ns = 0;
    for line in trace {
        match &line.record {
            TraceRecord::Source { .. } => {}
            TraceRecord::Control { action, t_ns } => {
                advance_to(&clock, &mut last_t_ns, *t_ns, line.number);
                match action {
                    ControlAction::Start => driver
                        .start()
                        .with_context(|| format!("Cannot start profiler at line {}", line.number))?,
                    ControlAction::Stop => driver.stop(),
                }
            }
            TraceRecord::Event {
                kind,
                callable,
                line: source_line,
                t_ns,
                target,
                thread,
            } => {
                advance_to(&clock, &mut last_t_ns, *t_ns, line.number);
                if !has_control && events == 0 {
                    driver.start()?;
                }
                if *kind == EventKind::ForeignCall && target.is_none() {
                    bail!(
                        "Event at line {}: {}",
                        line.number,
                        ProfilerError::MissingForeignTarget
                    );
                }
                let event = Event {
                    kind: *kind,
                    callable: *callable,
                    line: *source_line,
                    foreign_target: target.clone(),
                };
                driver
                    .dispatch(*thread, &event)
                    .with_context(|| format!("Event at line {} was rejected", line.number))?;
                events += 1;
            }
        }
    }

    let (store, threads) = driver.finish();
    Ok(ReplayOutcome {
        store,
        events,
        threads,
    })
}

/// Read and replay a trace in one step
pub fn replay_reader<R: BufRead>(reader: R) -> Result<ReplayOutcome> {
    let trace = read_trace(reader)?;
    replay(&trace)
}

fn advance_to(clock: &ManualClock, last_t_ns: &mut u64, t_ns: u64, number: usize) {
    if t_ns < *last_t_ns {
        tracing::warn!(
            "line {}: timestamp {} goes backwards (last {}), clamping",
            number,
            t_ns,
            last_t_ns
        );
        return;
    }
    *last_t_ns = t_ns;
    clock.set(Duration::from_nanos(t_ns));
}
