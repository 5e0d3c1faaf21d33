// Transition tables for deferred attribution
//
// The meaning of an elapsed interval is decided by the event kind that
// *opened* it, so every dispatch runs the finish rule of the previous kind
// before the begin rule of the incoming kind. Both tables are plain data
// indexed by `EventKind::index()`.

use crate::event::EventKind;

/// What to do with the interval that ended at the incoming event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishRule {
    /// Interval is not attributed (sentinels and exception paths)
    Ignore,
    /// Internal time of the top invocation's current line
    LineInternal,
    /// Call-setup cost, charged to the overhead of the invocation just entered
    CallSetup,
    /// Post-return bookkeeping, charged to the overhead of the resumed caller
    ResumedOverhead,
    /// Foreign routine cost: its record's overhead, plus external time on
    /// the calling line
    ForeignCallCost,
    /// Post-foreign-call bookkeeping, charged to the top invocation's overhead
    ForeignReturnOverhead,
}

/// State change for the incoming event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginRule {
    Nothing,
    /// Move the top invocation to the reported line
    SetLine,
    /// Create the record on first sight and push a fresh invocation
    EnterCallable,
    /// Pop the top invocation, fold it, propagate its total to the caller
    ReturnAndFold,
    /// Remember the foreign target and create its record on first sight
    EnterForeign,
    /// The kind is a state marker and cannot arrive as an event
    Reject,
}

static FINISH_RULES: [FinishRule; EventKind::COUNT] = [
    FinishRule::Ignore,                // Origin
    FinishRule::LineInternal,          // Line
    FinishRule::CallSetup,             // Call
    FinishRule::ResumedOverhead,       // Return
    FinishRule::Ignore,                // Exception
    FinishRule::ForeignCallCost,       // ForeignCall
    FinishRule::ForeignReturnOverhead, // ForeignReturn
    FinishRule::Ignore,                // ForeignException
    FinishRule::Ignore,                // None
];

static BEGIN_RULES: [BeginRule; EventKind::COUNT] = [
    BeginRule::Nothing,       // Origin
    BeginRule::SetLine,       // Line
    BeginRule::EnterCallable, // Call
    BeginRule::ReturnAndFold, // Return
    BeginRule::Nothing,       // Exception
    BeginRule::EnterForeign,  // ForeignCall
    BeginRule::Nothing,       // ForeignReturn
    BeginRule::Nothing,       // ForeignException
    BeginRule::Reject,        // None
];

/// Finish rule keyed by the previously recorded kind
pub fn finish_rule(previous: EventKind) -> FinishRule {
    FINISH_RULES[previous.index()]
}

/// Begin rule keyed by the incoming kind
pub fn begin_rule(incoming: EventKind) -> BeginRule {
    BEGIN_RULES[incoming.index()]
}
