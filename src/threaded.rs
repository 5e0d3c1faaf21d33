//! Multi-threaded profiling
//!
//! Events from one thread must stay in execution order, but threads run
//! independently. [`ThreadedProfiler`] keeps one [`Session`] (call stack,
//! previous kind, last timestamp) per originating thread and shares a single
//! mutex-guarded [`ReportStore`] for record creation and fold-in.
//!
//! Locks are always taken in the order sessions map, session, store.

use crate::clock::{Clock, MonotonicClock};
use crate::engine::Session;
use crate::error::{ProfilerError, Result};
use crate::event::Event;
use crate::report::{ReportOptions, ReportSnapshot};
use crate::source::SourceProvider;
use crate::store::ReportStore;
use fnv::FnvHashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_THREAD_KEY: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_KEY: u64 = NEXT_THREAD_KEY.fetch_add(1, Ordering::Relaxed);
}

/// Stable key for the calling thread, unique for the life of the process
pub fn current_thread_key() -> u64 {
    THREAD_KEY.with(|key| *key)
}

/// Profiler shared by several threads, one session per thread
#[derive(Debug)]
pub struct ThreadedProfiler<P, C = MonotonicClock> {
    sources: P,
    clock: C,
    sessions: Mutex<FnvHashMap<u64, Arc<Mutex<Session>>>>,
    store: Mutex<ReportStore>,
    enabled: AtomicBool,
    faulted: AtomicBool,
}

impl<P: SourceProvider> ThreadedProfiler<P, MonotonicClock> {
    pub fn new(sources: P) -> Self {
        Self::with_clock(sources, MonotonicClock::new())
    }
}

impl<P: SourceProvider, C: Clock> ThreadedProfiler<P, C> {
    pub fn with_clock(sources: P, clock: C) -> Self {
        Self {
            sources,
            clock,
            sessions: Mutex::new(FnvHashMap::default()),
            store: Mutex::new(ReportStore::new()),
            enabled: AtomicBool::new(false),
            faulted: AtomicBool::new(false),
        }
    }

    /// Begin accepting events on every thread; idempotent
    pub fn start(&self) -> Result<()> {
        if self.is_faulted() {
            return Err(ProfilerError::Faulted);
        }
        let sessions = self.sessions.lock();
        if !self.enabled.swap(true, Ordering::SeqCst) {
            let now = self.clock.now();
            for session in sessions.values() {
                session.lock().begin_stream(now);
            }
            tracing::debug!("profiling started on {} known threads", sessions.len());
        }
        Ok(())
    }

    /// Stop accepting events; idempotent
    ///
    /// Every thread's in-flight invocations are abandoned without folding.
    pub fn stop(&self) {
        let sessions = self.sessions.lock();
        if self.enabled.swap(false, Ordering::SeqCst) {
            let abandoned: usize = sessions.values().map(|s| s.lock().abandon()).sum();
            tracing::debug!("profiling stopped, {} in-flight invocations abandoned", abandoned);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::SeqCst)
    }

    /// Feed one event that originated on `thread`
    ///
    /// A thread seen for the first time gets a fresh session whose first
    /// interval opens now. The enabled flag is checked again under the
    /// session lock, so nothing is pushed once `stop` has abandoned it.
    /// A protocol violation on any thread faults the whole profiler, since
    /// the shared store may hold partial results.
    pub fn dispatch(&self, thread: u64, event: &Event) -> Result<()> {
        if self.is_faulted() {
            return Err(ProfilerError::Faulted);
        }
        if !self.is_enabled() {
            return Ok(());
        }

        let session = {
            let mut sessions = self.sessions.lock();
            let clock = &self.clock;
            Arc::clone(sessions.entry(thread).or_insert_with(|| {
                let mut session = Session::new();
                session.begin_stream(clock.now());
                tracing::debug!("new session for thread {}", thread);
                Arc::new(Mutex::new(session))
            }))
        };

        let mut session = session.lock();
        // stop() may have abandoned this session since the check above
        if !self.is_enabled() {
            return Ok(());
        }
        let result = {
            let mut store = self.store.lock();
            session.dispatch(event, &self.clock, &mut store, &self.sources)
        };

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                tracing::error!(
                    "profiler faulted on thread {} at depth {}: {}",
                    thread,
                    session.depth(),
                    err
                );
                self.faulted.store(true, Ordering::SeqCst);
                self.enabled.store(false, Ordering::SeqCst);
                Err(err)
            }
        }
    }

    /// Feed one event from the calling thread
    pub fn dispatch_current(&self, event: &Event) -> Result<()> {
        self.dispatch(current_thread_key(), event)
    }

    /// Number of threads that have delivered at least one event
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Call stack depth of one thread, `None` if it was never seen
    pub fn depth(&self, thread: u64) -> Option<usize> {
        let sessions = self.sessions.lock();
        sessions.get(&thread).map(|s| s.lock().depth())
    }

    pub fn snapshot(&self, options: &ReportOptions) -> ReportSnapshot {
        ReportSnapshot::from_store(&self.store.lock(), options)
    }

    pub fn into_store(self) -> ReportStore {
        self.store.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::event::CallableId;
    use crate::source::{SourceSnapshot, SourceTable};
    use std::thread;
    use std::time::Duration;

    const WORK: CallableId = CallableId::new(1);

    fn profiler() -> (ThreadedProfiler<SourceTable, ManualClock>, ManualClock) {
        let sources = SourceTable::new().with(
            WORK,
            SourceSnapshot::new("work", 1, vec!["    step()\n".into(), "    done()\n".into()]),
        );
        let clock = ManualClock::new();
        (ThreadedProfiler::with_clock(sources, clock.clone()), clock)
    }

    #[test]
    fn test_threads_keep_separate_stacks() {
        let (prof, clock) = profiler();
        prof.start().unwrap();

        prof.dispatch(1, &Event::call(WORK, 1)).unwrap();
        prof.dispatch(2, &Event::call(WORK, 1)).unwrap();
        prof.dispatch(1, &Event::line(WORK, 2)).unwrap();
        prof.dispatch(2, &Event::line(WORK, 3)).unwrap();

        assert_eq!(prof.session_count(), 2);
        assert_eq!(prof.depth(1), Some(1));
        assert_eq!(prof.depth(2), Some(1));

        clock.advance(Duration::from_millis(4));
        prof.dispatch(1, &Event::ret(WORK, 2)).unwrap();
        assert_eq!(prof.depth(1), Some(0));
        assert_eq!(prof.depth(2), Some(1));

        prof.dispatch(2, &Event::ret(WORK, 3)).unwrap();

        let store = prof.into_store();
        let rec = store.function(WORK).unwrap();
        assert_eq!(rec.line_internal()[0], Duration::from_millis(4));
        assert_eq!(rec.line_internal()[1], Duration::from_millis(4));
        assert_eq!(store.function_count(), 1);
    }

    #[test]
    fn test_stop_abandons_every_thread() {
        let (prof, _clock) = profiler();
        prof.start().unwrap();
        prof.dispatch(7, &Event::call(WORK, 1)).unwrap();
        prof.dispatch(8, &Event::call(WORK, 1)).unwrap();

        prof.stop();
        prof.stop();
        assert_eq!(prof.depth(7), Some(0));
        assert_eq!(prof.depth(8), Some(0));
        assert!(!prof.is_enabled());

        // ignored while stopped
        prof.dispatch(9, &Event::call(WORK, 1)).unwrap();
        assert_eq!(prof.depth(9), None);
    }

    #[test]
    fn test_fault_on_one_thread_faults_all() {
        let (prof, _clock) = profiler();
        prof.start().unwrap();
        prof.dispatch(1, &Event::call(WORK, 1)).unwrap();

        let err = prof.dispatch(2, &Event::ret(WORK, 1)).unwrap_err();
        assert!(matches!(err, ProfilerError::StackUnderflow));
        assert!(prof.is_faulted());
        assert!(matches!(
            prof.dispatch(1, &Event::line(WORK, 2)),
            Err(ProfilerError::Faulted)
        ));
        assert!(matches!(prof.start(), Err(ProfilerError::Faulted)));
    }

    #[test]
    fn test_concurrent_dispatch_from_real_threads() {
        let (prof, _clock) = profiler();
        prof.start().unwrap();
        let prof = Arc::new(prof);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let prof = Arc::clone(&prof);
                thread::spawn(move || {
                    for _ in 0..50 {
                        prof.dispatch_current(&Event::call(WORK, 1)).unwrap();
                        prof.dispatch_current(&Event::line(WORK, 2)).unwrap();
                        prof.dispatch_current(&Event::ret(WORK, 2)).unwrap();
                    }
                    current_thread_key()
                })
            })
            .collect();

        let keys: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(prof.session_count(), 4);
        for key in keys {
            assert_eq!(prof.depth(key), Some(0));
        }
    }

    #[test]
    fn test_stop_during_concurrent_calls_leaves_no_frames() {
        let prof = Arc::new(profiler().0);

        for _ in 0..100 {
            prof.start().unwrap();
            let worker = {
                let prof = Arc::clone(&prof);
                thread::spawn(move || {
                    for _ in 0..200 {
                        prof.dispatch(5, &Event::call(WORK, 1)).unwrap();
                    }
                })
            };
            thread::yield_now();
            prof.stop();
            worker.join().unwrap();

            assert_eq!(prof.depth(5).unwrap_or(0), 0);
        }
        assert!(!prof.is_faulted());
    }

    #[test]
    fn test_restart_opens_with_empty_stacks() {
        let (prof, clock) = profiler();
        prof.start().unwrap();
        prof.dispatch(3, &Event::call(WORK, 1)).unwrap();
        prof.stop();
        prof.start().unwrap();
        assert_eq!(prof.depth(3), Some(0));

        clock.advance(Duration::from_millis(2));
        prof.dispatch(3, &Event::call(WORK, 1)).unwrap();
        prof.dispatch(3, &Event::line(WORK, 2)).unwrap();
        clock.advance(Duration::from_millis(3));
        prof.dispatch(3, &Event::ret(WORK, 2)).unwrap();
        assert_eq!(prof.depth(3), Some(0));

        let store = prof.into_store();
        assert_eq!(store.function(WORK).unwrap().total(), Duration::from_millis(3));
    }

    #[test]
    fn test_thread_keys_are_distinct() {
        let here = current_thread_key();
        let there = thread::spawn(current_thread_key).join().unwrap();
        assert_ne!(here, there);
        assert_eq!(here, current_thread_key());
    }
}
