//! Recovery verdicts and report outcomes.
//!
//! A handler answers with a [`RecoveryResult`]; the reporter turns that into
//! a [`Disposition`], which also covers the cases where no handler ran.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Severity;

/// Verdict returned by a recovery handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u32)]
pub enum RecoveryResult {
    /// The condition was mitigated; carry on.
    Recovered = 0,
    /// This recovery attempt did not fix the condition.
    Failed = 1,
    /// The caller should retry the faulting operation.
    Retry = 2,
    /// Only a reset restores a sane state.
    RebootRequired = 3,
}

impl RecoveryResult {
    /// Decode a raw verdict. Unknown values yield `None`.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Recovered),
            1 => Some(Self::Failed),
            2 => Some(Self::Retry),
            3 => Some(Self::RebootRequired),
            _ => None,
        }
    }

    /// Raw verdict value.
    #[must_use]
    pub const fn to_raw(self) -> u32 {
        self as u32
    }

    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recovered => "RECOVERED",
            Self::Failed => "FAILED",
            Self::Retry => "RETRY",
            Self::RebootRequired => "REBOOT_REQUIRED",
        }
    }
}

impl fmt::Display for RecoveryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of one `report_fault` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Disposition {
    /// Handler recovered; system continues.
    Recovered,
    /// Handler failed; system continues, caller owns escalation.
    Failed,
    /// Handler asked the caller to retry.
    Retry,
    /// A reset is now mandatory and has been scheduled.
    RebootPending,
    /// Detection is disabled for this kind; nothing ran.
    Gated,
    /// Detection is enabled but no handler is registered.
    Unhandled {
        /// Severity of the unhandled event.
        severity: Severity,
    },
    /// A reset was already pending; the event was logged only.
    Suppressed,
}

impl Disposition {
    /// Outcome of a handler verdict, with no reboot pending.
    #[must_use]
    pub const fn from_verdict(verdict: RecoveryResult) -> Self {
        match verdict {
            RecoveryResult::Recovered => Self::Recovered,
            RecoveryResult::Failed => Self::Failed,
            RecoveryResult::Retry => Self::Retry,
            RecoveryResult::RebootRequired => Self::RebootPending,
        }
    }

    /// Verdict this outcome corresponds to, if a handler verdict applies.
    #[must_use]
    pub const fn verdict(self) -> Option<RecoveryResult> {
        match self {
            Self::Recovered => Some(RecoveryResult::Recovered),
            Self::Failed => Some(RecoveryResult::Failed),
            Self::Retry => Some(RecoveryResult::Retry),
            Self::RebootPending => Some(RecoveryResult::RebootRequired),
            Self::Gated | Self::Unhandled { .. } | Self::Suppressed => None,
        }
    }

    /// True if the system may keep running.
    #[must_use]
    pub const fn allows_operation(self) -> bool {
        !matches!(self, Self::RebootPending | Self::Suppressed)
    }

    /// True if a reset is pending after this report.
    #[must_use]
    pub const fn requires_reboot(self) -> bool {
        matches!(self, Self::RebootPending | Self::Suppressed)
    }

    /// True for an unhandled `Error` or `Critical` fault, which warrants a
    /// platform-level fallback in the caller.
    #[must_use]
    pub const fn needs_fallback(self) -> bool {
        match self {
            Self::Unhandled { severity } => severity.is_serious(),
            _ => false,
        }
    }

    /// True if no handler ran for this report.
    #[must_use]
    pub const fn is_undispatched(self) -> bool {
        matches!(self, Self::Gated | Self::Unhandled { .. } | Self::Suppressed)
    }

    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recovered => "RECOVERED",
            Self::Failed => "FAILED",
            Self::Retry => "RETRY",
            Self::RebootPending => "REBOOT_PENDING",
            Self::Gated => "GATED",
            Self::Unhandled { .. } => "UNHANDLED",
            Self::Suppressed => "SUPPRESSED",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
