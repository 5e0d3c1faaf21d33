//! lineprof - line-level execution profiler
//!
//! Turns an ordered stream of execution events (line, call, return and
//! foreign-routine brackets) into per-line internal and external time plus
//! per-callable overhead. The interval between two events is attributed
//! only once the next event arrives, by rules keyed on the previous and
//! incoming event kinds.
//!
//! The library drives the engine from any event source; the `lineprof`
//! binary replays recorded JSON-lines traces and writes text, JSON or CSV
//! reports.

pub mod call_stack;
pub mod cli;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod filter;
pub mod record;
pub mod report;
pub mod source;
pub mod store;
pub mod threaded;
pub mod trace_file;
