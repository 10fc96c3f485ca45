//! Bounded record of recently dispatched faults.
//!
//! A ring of the last [`HISTORY_CAPACITY`] reports that reached a verdict,
//! kept for post-mortem inspection before a reset. Context payloads are
//! borrowed and therefore not retained; only the plain event fields are.

use core::cell::RefCell;
use core::time::Duration;

use critical_section::Mutex;
use heapless::HistoryBuffer;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Disposition, Domain, FaultEvent, FaultKind, Reporter, Severity};

/// Records kept before the oldest is overwritten.
pub const HISTORY_CAPACITY: usize = 32;

/// Copy of one handled report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FaultRecord {
    /// Fault class.
    pub kind: FaultKind,
    /// Reported severity.
    pub severity: Severity,
    /// Reported domain.
    pub domain: Domain,
    /// Producer diagnostic code.
    pub code: u32,
    /// Detecting context.
    pub reporter: Reporter,
    /// Detection time.
    pub timestamp: Duration,
    /// Time the verdict was applied.
    pub resolved_at: Duration,
    /// Outcome.
    pub disposition: Disposition,
}

impl FaultRecord {
    /// Record for `event` resolved at `resolved_at`.
    #[must_use]
    pub fn new(event: &FaultEvent<'_>, disposition: Disposition, resolved_at: Duration) -> Self {
        Self {
            kind: event.kind,
            severity: event.severity,
            domain: event.domain,
            code: event.code,
            reporter: event.reporter,
            timestamp: event.timestamp,
            resolved_at,
            disposition,
        }
    }

    /// Time from detection to verdict; zero if the clocks disagree.
    #[must_use]
    pub fn latency(&self) -> Duration {
        self.resolved_at.saturating_sub(self.timestamp)
    }
}

/// Ring buffer of [`FaultRecord`]s.
pub struct FaultHistory {
    ring: Mutex<RefCell<HistoryBuffer<FaultRecord, HISTORY_CAPACITY>>>,
}

impl FaultHistory {
    /// Empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: Mutex::new(RefCell::new(HistoryBuffer::new())),
        }
    }

    /// Append a record, overwriting the oldest when full.
    pub fn record(&self, record: FaultRecord) {
        critical_section::with(|cs| {
            if let Ok(mut ring) = self.ring.borrow(cs).try_borrow_mut() {
                ring.write(record);
            }
        });
    }

    /// Most recent record.
    #[must_use]
    pub fn last(&self) -> Option<FaultRecord> {
        critical_section::with(|cs| {
            self.ring
                .borrow(cs)
                .try_borrow()
                .ok()
                .and_then(|ring| ring.recent().copied())
        })
    }

    /// Records currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        critical_section::with(|cs| {
            self.ring
                .borrow(cs)
                .try_borrow()
                .map_or(0, |ring| ring.len())
        })
    }

    /// True if nothing was recorded since the last clear.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit records from oldest to newest.
    ///
    /// Runs inside a critical section: `f` must be short and must not report
    /// faults.
    pub fn for_each_oldest_first(&self, mut f: impl FnMut(&FaultRecord)) {
        critical_section::with(|cs| {
            if let Ok(ring) = self.ring.borrow(cs).try_borrow() {
                ring.oldest_ordered().for_each(&mut f);
            }
        });
    }

    /// Copy the records, oldest first.
    #[cfg(feature = "std")]
    #[must_use]
    pub fn to_vec(&self) -> std::vec::Vec<FaultRecord> {
        let mut out = std::vec::Vec::with_capacity(HISTORY_CAPACITY);
        self.for_each_oldest_first(|record| out.push(*record));
        out
    }

    /// Drop every record.
    pub fn clear(&self) {
        critical_section::with(|cs| {
            if let Ok(mut ring) = self.ring.borrow(cs).try_borrow_mut() {
                ring.clear();
            }
        });
    }
}

impl Default for FaultHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for FaultHistory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FaultHistory")
            .field("len", &self.len())
            .field("capacity", &HISTORY_CAPACITY)
            .finish()
    }
}
