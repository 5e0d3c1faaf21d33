//! Error taxonomy for the attribution engine
//!
//! Every variant except `Io` and `Serialize` is a protocol or invariant
//! violation raised at dispatch time. The engine faults on the first one it
//! sees; accumulated data stays readable but no further events are accepted.

use crate::event::{CallableId, EventKind};
use thiserror::Error;

/// Errors raised by the profiler engine and report sink
#[derive(Error, Debug)]
pub enum ProfilerError {
    #[error("return event received with an empty call stack")]
    StackUnderflow,

    #[error(
        "line {line} is outside {callable} (starting line {starting_line}, {len} tracked lines)"
    )]
    LineOutOfRange {
        callable: CallableId,
        line: u32,
        starting_line: u32,
        len: usize,
    },

    #[error("no source metadata for {callable}: {reason}")]
    MissingSource { callable: CallableId, reason: String },

    #[error("no record exists for {0}")]
    UnknownCallable(CallableId),

    #[error("unknown event kind code {0}")]
    UnknownEventKind(i32),

    #[error("event kind '{}' cannot be dispatched", .0.name())]
    InvalidIncoming(EventKind),

    #[error("foreign call event without a target name")]
    MissingForeignTarget,

    #[error("engine faulted by an earlier protocol violation")]
    Faulted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("report serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ProfilerError {
    /// Whether this error leaves the call stack in an unknown state
    pub fn is_protocol_violation(&self) -> bool {
        !matches!(self, Self::Io(_) | Self::Serialize(_))
    }
}

/// Result type for profiler operations
pub type Result<T> = std::result::Result<T, ProfilerError>;
