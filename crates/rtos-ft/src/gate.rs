//! Detection gate: one enable bit per fault kind.
//!
//! # RT Safety
//!
//! Every method is a single atomic instruction. A toggle made in one context
//! is visible to a reporter in another without a lock.

use portable_atomic::{AtomicU32, Ordering};

use crate::{FaultKind, KindSet};

/// Per-kind detection enable bits.
#[derive(Debug)]
pub struct DetectionGate {
    bits: AtomicU32,
}

impl DetectionGate {
    /// Gate with every kind disabled.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_enabled(KindSet::EMPTY)
    }

    /// Gate with exactly `enabled` open.
    #[must_use]
    pub const fn with_enabled(enabled: KindSet) -> Self {
        Self {
            bits: AtomicU32::new(enabled.bits()),
        }
    }

    /// Open the gate for `kind`. Returns true if it was closed.
    pub fn enable(&self, kind: FaultKind) -> bool {
        let bit = KindSet::bit(kind);
        self.bits.fetch_or(bit, Ordering::AcqRel) & bit == 0
    }

    /// Close the gate for `kind`. Returns true if it was open.
    pub fn disable(&self, kind: FaultKind) -> bool {
        let bit = KindSet::bit(kind);
        self.bits.fetch_and(!bit, Ordering::AcqRel) & bit != 0
    }

    /// True if reports of `kind` are dispatched.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self, kind: FaultKind) -> bool {
        self.bits.load(Ordering::Acquire) & KindSet::bit(kind) != 0
    }

    /// Currently open kinds.
    #[must_use]
    pub fn enabled(&self) -> KindSet {
        KindSet::from_bits_truncate(self.bits.load(Ordering::Acquire))
    }

    /// Replace the whole bitmap.
    pub fn set(&self, enabled: KindSet) {
        self.bits.store(enabled.bits(), Ordering::Release);
    }
}

impl Default for DetectionGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_gate_defaults_to_closed() {
        let gate = DetectionGate::new();
        for kind in FaultKind::ALL {
            assert!(!gate.is_enabled(kind));
        }
        assert!(gate.enabled().is_empty());
    }

    #[test]
    fn test_enable_disable_are_idempotent() {
        let gate = DetectionGate::new();

        assert!(gate.enable(FaultKind::CommCrcError));
        assert!(!gate.enable(FaultKind::CommCrcError));
        assert!(gate.is_enabled(FaultKind::CommCrcError));
        assert_eq!(gate.enabled(), KindSet::only(FaultKind::CommCrcError));

        assert!(gate.disable(FaultKind::CommCrcError));
        assert!(!gate.disable(FaultKind::CommCrcError));
        assert!(!gate.is_enabled(FaultKind::CommCrcError));
    }

    #[test]
    fn test_toggling_one_kind_leaves_others() {
        let gate = DetectionGate::with_enabled(KindSet::ALL);
        gate.disable(FaultKind::AppAssert);
        for kind in FaultKind::ALL {
            assert_eq!(gate.is_enabled(kind), kind != FaultKind::AppAssert);
        }
        gate.set(KindSet::EMPTY);
        assert!(gate.enabled().is_empty());
    }
}
