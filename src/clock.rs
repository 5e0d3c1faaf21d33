//! Time sources for the attribution engine
//!
//! The engine never reads wall time directly. It asks a [`Clock`] for the
//! elapsed time since the clock's own origin, which keeps the attribution
//! rules testable with a hand-driven clock and lets recorded traces replay
//! with their original timestamps.
//!
//! # Example
//!
//! ```
//! use lineprof::clock::{Clock, ManualClock};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let handle = clock.clone();
//!
//! handle.advance(Duration::from_millis(10));
//! assert_eq!(clock.now(), Duration::from_millis(10));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source measured from an arbitrary fixed origin
pub trait Clock {
    /// Time elapsed since the clock's origin
    fn now(&self) -> Duration;
}

/// High-resolution wall clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock for replay and tests
///
/// Clones share the same counter, so a test can keep a handle while the
/// engine owns another. The counter is atomic, which makes the clock usable
/// from a [`ThreadedProfiler`](crate::threaded::ThreadedProfiler) as well.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to an absolute reading
    ///
    /// Readings must not go backwards; an earlier value is ignored so the
    /// clock stays monotonic.
    pub fn set(&self, at: Duration) {
        self.nanos.fetch_max(saturating_nanos(at), Ordering::SeqCst);
    }

    /// Move the clock forward by `by` and return the new reading
    pub fn advance(&self, by: Duration) -> Duration {
        let by = saturating_nanos(by);
        match self
            .nanos
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                Some(cur.saturating_add(by))
            }) {
            Ok(prev) | Err(prev) => Duration::from_nanos(prev.saturating_add(by)),
        }
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

fn saturating_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
