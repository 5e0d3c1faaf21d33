// Integration Test Utilities
//
// Engine harness driven by a manual clock, so each test states the exact
// interval before every event.

#![allow(dead_code)]

use lineprof::clock::ManualClock;
use lineprof::engine::AttributionEngine;
use lineprof::event::{CallableId, Event};
use lineprof::source::{SourceSnapshot, SourceTable};
use std::time::Duration;

pub const ROOT: CallableId = CallableId::new(100);

/// Callable `id` named `name` whose header sits on `starting_line` with
/// `lines` body lines
pub fn snapshot(name: &str, starting_line: u32, lines: usize) -> SourceSnapshot {
    SourceSnapshot::new(
        name,
        starting_line,
        (0..lines).map(|i| format!("    stmt_{}()\n", i)).collect(),
    )
}

pub struct Harness {
    pub engine: AttributionEngine<SourceTable, ManualClock>,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new(sources: SourceTable) -> Self {
        let clock = ManualClock::new();
        let mut engine = AttributionEngine::with_clock(sources, clock.clone());
        engine.start().expect("fresh engine starts");
        Self { engine, clock }
    }

    /// Wait `ms` milliseconds, then deliver `event`
    pub fn after_ms(&mut self, ms: u64, event: Event) {
        self.after(Duration::from_millis(ms), event);
    }

    pub fn after(&mut self, wait: Duration, event: Event) {
        self.clock.advance(wait);
        self.engine.dispatch(&event).expect("well-formed event");
    }
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}
