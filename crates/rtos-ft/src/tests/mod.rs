//! In-crate tests for the fault-tolerance core.
//!
//! Integration tests under `tests/` use `rtos-ft-test-helpers`; these use
//! the small collaborators below so they see the crate's own types.

mod unit_tests;

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::*;

/// Handler returning a fixed verdict and counting calls.
pub(crate) struct Counting {
    pub(crate) verdict: RecoveryResult,
    pub(crate) calls: AtomicU32,
}

impl Counting {
    pub(crate) const fn new(verdict: RecoveryResult) -> Self {
        Self {
            verdict,
            calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FaultHandler for Counting {
    fn handle(&self, _event: &FaultEvent<'_>) -> RecoveryResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict
    }
}

pub(crate) struct NullSink;

impl FaultSink for NullSink {
    fn record(&self, _record: &LogRecord<'_>) {}
}

pub(crate) struct FixedClock(pub(crate) Duration);

impl MonotonicClock for FixedClock {
    fn now(&self) -> Duration {
        self.0
    }
}

pub(crate) struct ResetCount(pub(crate) AtomicU32);

impl ResetCount {
    pub(crate) const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    pub(crate) fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}

impl ResetController for ResetCount {
    fn reset(&self, _cause: RebootCause) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) static CLOCK: FixedClock = FixedClock(Duration::from_millis(1));
pub(crate) static SINK: NullSink = NullSink;

/// Platform with a fixed clock, a silent sink and the given reset counter.
pub(crate) fn platform(reset: &ResetCount) -> Platform<'_> {
    Platform::new(&CLOCK, &SINK, reset)
}
