//! Recovery dispatcher state machine.
//!
//! Transitions are atomic and lock-free so they can be driven from any
//! reporting context.
//!
//! ```text
//!            handler starts             handler returns
//! Normal ─────────────────────► Handling ─────────────────► Normal
//!    │                              │
//!    │ REBOOT_REQUIRED / invalid    │ REBOOT_REQUIRED / invalid verdict /
//!    │ verdict / nesting limit      │ nesting limit
//!    ▼                              ▼
//! RebootPending ◄───────────────────┘   (terminal until reset)
//! ```

use core::fmt;

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::FaultKind;

/// Observable dispatcher state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u32)]
pub enum DispatchState {
    /// No handler running, no reset pending.
    #[default]
    Normal = 0,
    /// At least one handler is running.
    Handling = 1,
    /// A reset is mandatory; reports are no longer dispatched.
    RebootPending = 2,
}

impl DispatchState {
    /// Decode a raw state value.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Normal),
            1 => Some(Self::Handling),
            2 => Some(Self::RebootPending),
            _ => None,
        }
    }

    /// Raw state value.
    #[must_use]
    pub const fn to_raw(self) -> u32 {
        self as u32
    }

    /// True for the terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::RebootPending)
    }

    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Handling => "HANDLING",
            Self::RebootPending => "REBOOT_PENDING",
        }
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a reset was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RebootCause {
    /// A handler returned `RebootRequired`.
    HandlerVerdict(FaultKind),
    /// A raw handler returned an undecodable verdict.
    InvalidVerdict(FaultKind),
    /// Nested fault reports exceeded the configured depth.
    NestingLimit(FaultKind),
    /// The dispatcher found its own state inconsistent.
    Inconsistent,
}

impl RebootCause {
    const TAG_HANDLER: u32 = 1;
    const TAG_INVALID: u32 = 2;
    const TAG_NESTING: u32 = 3;
    const TAG_INCONSISTENT: u32 = 4;

    /// Pack into one word: tag in the high half, kind in the low byte.
    #[must_use]
    pub const fn to_raw(self) -> u32 {
        match self {
            Self::HandlerVerdict(kind) => (Self::TAG_HANDLER << 16) | kind.to_raw() as u32,
            Self::InvalidVerdict(kind) => (Self::TAG_INVALID << 16) | kind.to_raw() as u32,
            Self::NestingLimit(kind) => (Self::TAG_NESTING << 16) | kind.to_raw() as u32,
            Self::Inconsistent => Self::TAG_INCONSISTENT << 16,
        }
    }

    /// Unpack a word produced by [`RebootCause::to_raw`].
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        let tag = raw >> 16;
        if tag == Self::TAG_INCONSISTENT {
            return Some(Self::Inconsistent);
        }
        let Some(kind) = FaultKind::from_raw((raw & 0xFF) as u8) else {
            return None;
        };
        match tag {
            Self::TAG_HANDLER => Some(Self::HandlerVerdict(kind)),
            Self::TAG_INVALID => Some(Self::InvalidVerdict(kind)),
            Self::TAG_NESTING => Some(Self::NestingLimit(kind)),
            _ => None,
        }
    }

    /// Fault kind that triggered the reset, if any.
    #[must_use]
    pub const fn kind(self) -> Option<FaultKind> {
        match self {
            Self::HandlerVerdict(kind) | Self::InvalidVerdict(kind) | Self::NestingLimit(kind) => {
                Some(kind)
            }
            Self::Inconsistent => None,
        }
    }
}

impl fmt::Display for RebootCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HandlerVerdict(kind) => write!(f, "handler verdict for {kind}"),
            Self::InvalidVerdict(kind) => write!(f, "invalid verdict for {kind}"),
            Self::NestingLimit(kind) => write!(f, "nesting limit while handling {kind}"),
            Self::Inconsistent => f.write_str("dispatcher inconsistency"),
        }
    }
}

const NO_CAUSE: u32 = 0;

/// Atomic dispatcher state.
#[derive(Debug)]
pub struct DispatcherState {
    /// `Normal` or `RebootPending`; `Handling` is derived from `active`.
    status: AtomicU32,
    /// Handlers currently running across all contexts.
    active: AtomicU32,
    /// Packed first [`RebootCause`].
    cause: AtomicU32,
    /// Reboot requests, including those after the first.
    reboot_requests: AtomicU32,
    /// Set once the reset primitive has been called.
    reset_issued: AtomicBool,
}

impl DispatcherState {
    /// Fresh state machine in `Normal`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: AtomicU32::new(DispatchState::Normal.to_raw()),
            active: AtomicU32::new(0),
            cause: AtomicU32::new(NO_CAUSE),
            reboot_requests: AtomicU32::new(0),
            reset_issued: AtomicBool::new(false),
        }
    }

    /// Current state. An unreadable status word reads as `RebootPending`.
    #[must_use]
    pub fn state(&self) -> DispatchState {
        let raw = self.status.load(Ordering::Acquire);
        match DispatchState::from_raw(raw) {
            Some(DispatchState::RebootPending) | None => DispatchState::RebootPending,
            Some(_) if self.active.load(Ordering::Acquire) > 0 => DispatchState::Handling,
            Some(_) => DispatchState::Normal,
        }
    }

    /// True once a reset is mandatory.
    #[inline]
    #[must_use]
    pub fn is_reboot_pending(&self) -> bool {
        self.state() == DispatchState::RebootPending
    }

    /// Enter `Handling` for one handler invocation.
    pub fn begin_handling(&self) {
        self.active.fetch_add(1, Ordering::AcqRel);
    }

    /// Leave `Handling` for one handler invocation.
    pub fn end_handling(&self) {
        // Saturate so an unbalanced call cannot wrap the counter.
        let mut current = self.active.load(Ordering::Acquire);
        while let Some(next) = current.checked_sub(1) {
            match self.active.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Handlers currently running.
    #[must_use]
    pub fn active_handlers(&self) -> u32 {
        self.active.load(Ordering::Acquire)
    }

    /// Move to `RebootPending`. Returns true for the request whose cause was
    /// latched; later requests only bump the counter.
    ///
    /// The cause is stored before the status word, so any reader that sees
    /// `RebootPending` also sees the cause.
    pub fn request_reboot(&self, cause: RebootCause) -> bool {
        self.reboot_requests.fetch_add(1, Ordering::Relaxed);
        let latched = if DispatchState::from_raw(self.status.load(Ordering::Acquire)).is_some() {
            cause
        } else {
            // Corrupted status word: whatever happened first is unknown.
            RebootCause::Inconsistent
        };
        let won = self
            .cause
            .compare_exchange(
                NO_CAUSE,
                latched.to_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        self.status
            .store(DispatchState::RebootPending.to_raw(), Ordering::Release);
        won && latched == cause
    }

    /// Cause of the pending reset, if one is pending.
    #[must_use]
    pub fn reboot_cause(&self) -> Option<RebootCause> {
        if !self.is_reboot_pending() {
            return None;
        }
        Some(
            RebootCause::from_raw(self.cause.load(Ordering::Acquire))
                .unwrap_or(RebootCause::Inconsistent),
        )
    }

    /// Number of reboot requests seen.
    #[must_use]
    pub fn reboot_requests(&self) -> u32 {
        self.reboot_requests.load(Ordering::Relaxed)
    }

    /// Claim the one-time right to call the reset primitive.
    pub fn claim_reset(&self) -> bool {
        self.is_reboot_pending()
            && self
                .reset_issued
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    /// True once the reset primitive has been called.
    #[must_use]
    pub fn reset_issued(&self) -> bool {
        self.reset_issued.load(Ordering::Acquire)
    }

    /// Back to a fresh `Normal` state. Not for use while reports run.
    pub fn reset(&self) {
        self.status
            .store(DispatchState::Normal.to_raw(), Ordering::Release);
        self.active.store(0, Ordering::Release);
        self.cause.store(NO_CAUSE, Ordering::Release);
        self.reboot_requests.store(0, Ordering::Relaxed);
        self.reset_issued.store(false, Ordering::Release);
    }
}

impl Default for DispatcherState {
    fn default() -> Self {
        Self::new()
    }
}
