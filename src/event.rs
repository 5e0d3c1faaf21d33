//! Execution events delivered by the host runtime
//!
//! The event source is a closed set: line, call, return and exception events
//! for interpreted callables, plus call/return/exception brackets around
//! foreign (native) routines. `Origin` and `None` are state markers the
//! engine holds as its "previous" kind; they never come from a runtime.

use crate::error::{ProfilerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, stable identity of one compiled interpreted callable
///
/// Supplied by the event source. The engine only compares and hashes it,
/// so any stable integer (code object address, interned index) works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallableId(u64);

impl CallableId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "callable#{}", self.0)
    }
}

/// Kind of an execution event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EventKind {
    /// Synthetic state after `start()`, before any real event
    Origin = 0,
    /// A new source line is about to execute
    Line = 1,
    /// An interpreted callable was entered
    Call = 2,
    /// An interpreted callable is returning
    Return = 3,
    /// An exception was raised in interpreted code
    Exception = 4,
    /// A foreign routine is about to be called
    ForeignCall = 5,
    /// A foreign routine returned
    ForeignReturn = 6,
    /// A foreign routine raised
    ForeignException = 7,
    /// No event has ever arrived
    None = 8,
}

impl EventKind {
    /// Number of event kinds (size of the rule tables)
    pub const COUNT: usize = 9;

    /// All kinds in code order
    pub const ALL: [EventKind; Self::COUNT] = [
        Self::Origin,
        Self::Line,
        Self::Call,
        Self::Return,
        Self::Exception,
        Self::ForeignCall,
        Self::ForeignReturn,
        Self::ForeignException,
        Self::None,
    ];

    /// Numeric wire code
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Position in the rule tables
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decode a numeric wire code
    ///
    /// The event source is a closed set, so an unknown code is an invariant
    /// violation rather than something to skip.
    pub fn from_code(code: i32) -> Result<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
            .ok_or(ProfilerError::UnknownEventKind(code))
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Origin => "origin",
            Self::Line => "line",
            Self::Call => "call",
            Self::Return => "return",
            Self::Exception => "exception",
            Self::ForeignCall => "foreign_call",
            Self::ForeignReturn => "foreign_return",
            Self::ForeignException => "foreign_exception",
            Self::None => "none",
        }
    }

    /// Exception-path kinds carry no timing attribution
    pub fn is_exception(self) -> bool {
        matches!(self, Self::Exception | Self::ForeignException)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One event together with its execution context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    /// Callable whose frame is executing when the event fires
    pub callable: CallableId,
    /// Absolute source line currently executing (0 when not applicable)
    pub line: u32,
    /// Printable name of the foreign routine, for `ForeignCall`
    pub foreign_target: Option<String>,
}

impl Event {
    pub fn new(kind: EventKind, callable: CallableId, line: u32) -> Self {
        Self {
            kind,
            callable,
            line,
            foreign_target: None,
        }
    }

    pub fn line(callable: CallableId, line: u32) -> Self {
        Self::new(EventKind::Line, callable, line)
    }

    pub fn call(callable: CallableId, line: u32) -> Self {
        Self::new(EventKind::Call, callable, line)
    }

    pub fn ret(callable: CallableId, line: u32) -> Self {
        Self::new(EventKind::Return, callable, line)
    }

    pub fn exception(callable: CallableId, line: u32) -> Self {
        Self::new(EventKind::Exception, callable, line)
    }

    pub fn foreign_call(callable: CallableId, line: u32, target: impl Into<String>) -> Self {
        Self {
            foreign_target: Some(target.into()),
            ..Self::new(EventKind::ForeignCall, callable, line)
        }
    }

    pub fn foreign_return(callable: CallableId, line: u32) -> Self {
        Self::new(EventKind::ForeignReturn, callable, line)
    }

    pub fn foreign_exception(callable: CallableId, line: u32) -> Self {
        Self::new(EventKind::ForeignException, callable, line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_table_positions() {
        for (idx, kind) in EventKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), idx);
            assert_eq!(kind.code(), idx as i32);
        }
    }

    #[test]
    fn test_from_code_round_trips_known_codes() {
        assert_eq!(EventKind::from_code(1).unwrap(), EventKind::Line);
        assert_eq!(EventKind::from_code(5).unwrap(), EventKind::ForeignCall);
        assert_eq!(EventKind::from_code(8).unwrap(), EventKind::None);
    }

    #[test]
    fn test_from_code_rejects_unknown() {
        assert!(matches!(
            EventKind::from_code(9),
            Err(ProfilerError::UnknownEventKind(9))
        ));
        assert!(matches!(
            EventKind::from_code(-1),
            Err(ProfilerError::UnknownEventKind(-1))
        ));
    }

    #[test]
    fn test_kind_serde_names() {
        let json = serde_json::to_string(&EventKind::ForeignReturn).unwrap();
        assert_eq!(json, "\"foreign_return\"");
        let kind: EventKind = serde_json::from_str("\"call\"").unwrap();
        assert_eq!(kind, EventKind::Call);
        assert_eq!(EventKind::ForeignReturn.name(), "foreign_return");
    }

    #[test]
    fn test_exception_kinds() {
        assert!(EventKind::Exception.is_exception());
        assert!(EventKind::ForeignException.is_exception());
        assert!(!EventKind::Return.is_exception());
    }

    #[test]
    fn test_foreign_call_constructor_carries_target() {
        let ev = Event::foreign_call(CallableId::new(3), 12, "<built-in function len>");
        assert_eq!(ev.kind, EventKind::ForeignCall);
        assert_eq!(ev.foreign_target.as_deref(), Some("<built-in function len>"));
        assert_eq!(ev.line, 12);
    }

    #[test]
    fn test_callable_id_display() {
        assert_eq!(CallableId::new(42).to_string(), "callable#42");
        assert_eq!(CallableId::new(42).raw(), 42);
    }
}
