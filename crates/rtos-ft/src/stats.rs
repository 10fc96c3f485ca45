//! Per-kind fault counters.
//!
//! # RT Safety
//!
//! Every increment is one relaxed atomic add. Counters are diagnostics only
//! and never drive dispatch, so eventual consistency between them is enough.

use portable_atomic::{AtomicU32, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Disposition, FaultKind};

/// Counter values for one kind, or summed over all kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KindSnapshot {
    /// Calls to `report_fault`.
    pub reported: u32,
    /// Dropped because detection was disabled.
    pub gated: u32,
    /// Logged only because a reset was already pending.
    pub suppressed: u32,
    /// Enabled but no handler registered.
    pub unhandled: u32,
    /// Handler invocations.
    pub dispatched: u32,
    /// `Recovered` outcomes.
    pub recovered: u32,
    /// `Failed` outcomes.
    pub failed: u32,
    /// `Retry` outcomes.
    pub retried: u32,
    /// Reports that ended in `RebootPending`.
    pub reboots: u32,
    /// Reports rejected by the nesting bound.
    pub nesting_breaches: u32,
}

impl KindSnapshot {
    fn accumulate(mut self, other: &Self) -> Self {
        self.reported = self.reported.saturating_add(other.reported);
        self.gated = self.gated.saturating_add(other.gated);
        self.suppressed = self.suppressed.saturating_add(other.suppressed);
        self.unhandled = self.unhandled.saturating_add(other.unhandled);
        self.dispatched = self.dispatched.saturating_add(other.dispatched);
        self.recovered = self.recovered.saturating_add(other.recovered);
        self.failed = self.failed.saturating_add(other.failed);
        self.retried = self.retried.saturating_add(other.retried);
        self.reboots = self.reboots.saturating_add(other.reboots);
        self.nesting_breaches = self.nesting_breaches.saturating_add(other.nesting_breaches);
        self
    }
}

#[derive(Debug)]
struct KindCounters {
    reported: AtomicU32,
    gated: AtomicU32,
    suppressed: AtomicU32,
    unhandled: AtomicU32,
    dispatched: AtomicU32,
    recovered: AtomicU32,
    failed: AtomicU32,
    retried: AtomicU32,
    reboots: AtomicU32,
    nesting_breaches: AtomicU32,
}

impl KindCounters {
    const fn new() -> Self {
        Self {
            reported: AtomicU32::new(0),
            gated: AtomicU32::new(0),
            suppressed: AtomicU32::new(0),
            unhandled: AtomicU32::new(0),
            dispatched: AtomicU32::new(0),
            recovered: AtomicU32::new(0),
            failed: AtomicU32::new(0),
            retried: AtomicU32::new(0),
            reboots: AtomicU32::new(0),
            nesting_breaches: AtomicU32::new(0),
        }
    }

    fn snapshot(&self) -> KindSnapshot {
        KindSnapshot {
            reported: self.reported.load(Ordering::Relaxed),
            gated: self.gated.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            unhandled: self.unhandled.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            recovered: self.recovered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            reboots: self.reboots.load(Ordering::Relaxed),
            nesting_breaches: self.nesting_breaches.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        for counter in [
            &self.reported,
            &self.gated,
            &self.suppressed,
            &self.unhandled,
            &self.dispatched,
            &self.recovered,
            &self.failed,
            &self.retried,
            &self.reboots,
            &self.nesting_breaches,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Fault counters for every kind.
#[derive(Debug)]
pub struct FaultStats {
    kinds: [KindCounters; FaultKind::COUNT],
}

impl FaultStats {
    /// All counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            kinds: [const { KindCounters::new() }; FaultKind::COUNT],
        }
    }

    #[inline]
    fn counters(&self, kind: FaultKind) -> Option<&KindCounters> {
        self.kinds.get(kind.index())
    }

    /// Count one call to `report_fault`.
    #[inline]
    pub fn inc_reported(&self, kind: FaultKind) {
        if let Some(c) = self.counters(kind) {
            c.reported.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count one handler invocation.
    #[inline]
    pub fn inc_dispatched(&self, kind: FaultKind) {
        if let Some(c) = self.counters(kind) {
            c.dispatched.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count one report rejected by the nesting bound.
    #[inline]
    pub fn inc_nesting_breaches(&self, kind: FaultKind) {
        if let Some(c) = self.counters(kind) {
            c.nesting_breaches.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count the outcome of one report.
    pub fn record_disposition(&self, kind: FaultKind, disposition: Disposition) {
        let Some(c) = self.counters(kind) else {
            return;
        };
        let counter = match disposition {
            Disposition::Recovered => &c.recovered,
            Disposition::Failed => &c.failed,
            Disposition::Retry => &c.retried,
            Disposition::RebootPending => &c.reboots,
            Disposition::Gated => &c.gated,
            Disposition::Unhandled { .. } => &c.unhandled,
            Disposition::Suppressed => &c.suppressed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Counters for one kind.
    #[must_use]
    pub fn snapshot(&self, kind: FaultKind) -> KindSnapshot {
        self.counters(kind)
            .map(KindCounters::snapshot)
            .unwrap_or_default()
    }

    /// Counters summed over every kind.
    #[must_use]
    pub fn totals(&self) -> KindSnapshot {
        self.kinds
            .iter()
            .map(KindCounters::snapshot)
            .fold(KindSnapshot::default(), |acc, s| acc.accumulate(&s))
    }

    /// Zero every counter.
    pub fn reset(&self) {
        for counters in &self.kinds {
            counters.reset();
        }
    }
}

impl Default for FaultStats {
    fn default() -> Self {
        Self::new()
    }
}
