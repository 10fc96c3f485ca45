//! Fault kinds, severities, and domains.
//!
//! Everything in this module is plain data: no locking, no allocation, and
//! every conversion has a defined answer for out-of-range input so it can be
//! called from a fault path that must not fault itself.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::FtError;

/// Sentinel returned for raw values outside the taxonomy.
pub const UNKNOWN: &str = "UNKNOWN";

/// Class of a detected fault.
///
/// Routing is by kind only: each kind has at most one recovery handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum FaultKind {
    /// A thread overran its stack guard.
    StackOverflow = 0,
    /// CPU exception (bus, usage or memory-management fault).
    HardFault = 1,
    /// The hardware watchdog is about to bite.
    WatchdogBark = 2,
    /// A memory integrity check failed.
    MemoryCorruption = 3,
    /// A peripheral did not answer within its deadline.
    PeripheralTimeout = 4,
    /// A received frame failed its CRC check.
    CommCrcError = 5,
    /// A supply rail dropped below its brownout threshold.
    PowerBrownout = 6,
    /// Threads are waiting on each other.
    DeadlockDetected = 7,
    /// An application-level assertion failed.
    AppAssert = 8,
}

impl FaultKind {
    /// Number of kinds in the taxonomy. Tables indexed by kind use this size.
    pub const COUNT: usize = 9;

    /// Every kind, in index order.
    pub const ALL: [FaultKind; Self::COUNT] = [
        FaultKind::StackOverflow,
        FaultKind::HardFault,
        FaultKind::WatchdogBark,
        FaultKind::MemoryCorruption,
        FaultKind::PeripheralTimeout,
        FaultKind::CommCrcError,
        FaultKind::PowerBrownout,
        FaultKind::DeadlockDetected,
        FaultKind::AppAssert,
    ];

    /// Dense index in `0..COUNT`.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decode a raw kind value.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::StackOverflow),
            1 => Some(Self::HardFault),
            2 => Some(Self::WatchdogBark),
            3 => Some(Self::MemoryCorruption),
            4 => Some(Self::PeripheralTimeout),
            5 => Some(Self::CommCrcError),
            6 => Some(Self::PowerBrownout),
            7 => Some(Self::DeadlockDetected),
            8 => Some(Self::AppAssert),
            _ => None,
        }
    }

    /// Raw value of this kind.
    #[inline]
    #[must_use]
    pub const fn to_raw(self) -> u8 {
        self as u8
    }

    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StackOverflow => "STACK_OVERFLOW",
            Self::HardFault => "HARD_FAULT",
            Self::WatchdogBark => "WATCHDOG_BARK",
            Self::MemoryCorruption => "MEMORY_CORRUPTION",
            Self::PeripheralTimeout => "PERIPHERAL_TIMEOUT",
            Self::CommCrcError => "COMM_CRC_ERROR",
            Self::PowerBrownout => "POWER_BROWNOUT",
            Self::DeadlockDetected => "DEADLOCK_DETECTED",
            Self::AppAssert => "APP_ASSERT",
        }
    }

    /// Domain a producer would normally tag this kind with.
    #[must_use]
    pub const fn default_domain(self) -> Domain {
        match self {
            Self::StackOverflow | Self::MemoryCorruption => Domain::Memory,
            Self::HardFault | Self::PeripheralTimeout => Domain::Hardware,
            Self::WatchdogBark | Self::DeadlockDetected => Domain::System,
            Self::CommCrcError => Domain::Communication,
            Self::PowerBrownout => Domain::Power,
            Self::AppAssert => Domain::Application,
        }
    }

    /// Severity a producer would normally report this kind with.
    #[must_use]
    pub const fn default_severity(self) -> Severity {
        match self {
            Self::StackOverflow
            | Self::HardFault
            | Self::MemoryCorruption
            | Self::PowerBrownout => Severity::Critical,
            Self::WatchdogBark | Self::DeadlockDetected | Self::AppAssert => Severity::Error,
            Self::PeripheralTimeout | Self::CommCrcError => Severity::Warning,
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for FaultKind {
    type Error = FtError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::from_raw(raw).ok_or(FtError::UnknownKind(raw))
    }
}

/// Reporting priority of a fault.
///
/// Ordered from least to most severe. Dispatch never depends on severity;
/// the only behavioural use is flagging unhandled `Error`/`Critical` faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Severity {
    /// Informational.
    #[default]
    Info = 0,
    /// Degraded but operating.
    Warning = 1,
    /// Operation failed.
    Error = 2,
    /// System integrity at risk.
    Critical = 3,
}

impl Severity {
    /// Every severity, least severe first.
    pub const ALL: [Severity; 4] = [
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    /// Decode a raw severity value.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Info),
            1 => Some(Self::Warning),
            2 => Some(Self::Error),
            3 => Some(Self::Critical),
            _ => None,
        }
    }

    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    /// `Error` or `Critical`.
    #[inline]
    #[must_use]
    pub const fn is_serious(self) -> bool {
        matches!(self, Self::Error | Self::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subsystem a fault originated in. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Domain {
    /// Application code.
    Application,
    /// Buses and links.
    Communication,
    /// Peripherals and the CPU.
    Hardware,
    /// Supply and power management.
    Power,
    /// RAM, stacks, heaps.
    Memory,
    /// Kernel and system services.
    System,
}

impl Domain {
    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Application => "APPLICATION",
            Self::Communication => "COMMUNICATION",
            Self::Hardware => "HARDWARE",
            Self::Power => "POWER",
            Self::Memory => "MEMORY",
            Self::System => "SYSTEM",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of a raw kind value, or [`UNKNOWN`].
#[must_use]
pub const fn kind_to_string(raw: u8) -> &'static str {
    match FaultKind::from_raw(raw) {
        Some(kind) => kind.as_str(),
        None => UNKNOWN,
    }
}

/// Name of a raw severity value, or [`UNKNOWN`].
#[must_use]
pub const fn severity_to_string(raw: u8) -> &'static str {
    match Severity::from_raw(raw) {
        Some(severity) => severity.as_str(),
        None => UNKNOWN,
    }
}

/// Set of fault kinds packed into one word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KindSet(u32);

impl KindSet {
    /// No kinds.
    pub const EMPTY: KindSet = KindSet(0);

    /// Every kind in the taxonomy.
    pub const ALL: KindSet = KindSet((1 << FaultKind::COUNT) - 1);

    /// Build from raw bits, dropping bits outside the taxonomy.
    #[must_use]
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Bit for one kind.
    #[inline]
    #[must_use]
    pub const fn bit(kind: FaultKind) -> u32 {
        1 << kind.to_raw()
    }

    /// Set containing a single kind.
    #[must_use]
    pub const fn only(kind: FaultKind) -> Self {
        Self(Self::bit(kind))
    }

    /// Copy with `kind` added.
    #[must_use]
    pub const fn with(self, kind: FaultKind) -> Self {
        Self(self.0 | Self::bit(kind))
    }

    /// Copy with `kind` removed.
    #[must_use]
    pub const fn without(self, kind: FaultKind) -> Self {
        Self(self.0 & !Self::bit(kind))
    }

    /// Membership test.
    #[must_use]
    pub const fn contains(self, kind: FaultKind) -> bool {
        self.0 & Self::bit(kind) != 0
    }

    /// Number of kinds in the set.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// True if no kinds are in the set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Members in index order.
    pub fn iter(self) -> impl Iterator<Item = FaultKind> {
        FaultKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl FromIterator<FaultKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = FaultKind>>(iter: I) -> Self {
        iter.into_iter().fold(KindSet::EMPTY, KindSet::with)
    }
}
