//! The fault event record handed to the reporter.

use core::fmt;
use core::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Domain, FaultContext, FaultKind, Severity};

/// Execution context that detected a fault, as stated by the producer.
///
/// Carried for diagnostics only. The nesting guard asks the platform which
/// context is running instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Reporter {
    /// A kernel thread, by thread id.
    Thread(u32),
    /// An interrupt handler, by IRQ line.
    Interrupt(u16),
    /// Context not known to the producer.
    #[default]
    Unknown,
}

impl Reporter {
    /// True for interrupt context.
    #[must_use]
    pub const fn is_interrupt(self) -> bool {
        matches!(self, Self::Interrupt(_))
    }
}

impl fmt::Display for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thread(id) => write!(f, "thread:{id}"),
            Self::Interrupt(irq) => write!(f, "irq:{irq}"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// One detected fault.
///
/// Built on the producer's stack and passed by reference; handlers get a
/// shared borrow that ends when they return.
///
/// # Example
///
/// ```rust
/// use core::time::Duration;
/// use rtos_ft::{CrcContext, FaultEvent, FaultKind, Reporter, Severity};
///
/// let ctx = CrcContext {
///     protocol: "uart1",
///     expected: 0x1234_5678,
///     received: 0x1234_0000,
///     packet_id: 17,
///     size: 64,
/// };
/// let event = FaultEvent::new(FaultKind::CommCrcError, Duration::from_millis(5))
///     .with_severity(Severity::Warning)
///     .with_code(0x17)
///     .with_reporter(Reporter::Interrupt(37))
///     .with_context(ctx);
///
/// assert_eq!(event.context.as_crc().map(|c| c.packet_id), Some(17));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultEvent<'a> {
    /// Fault class; the only routing key.
    pub kind: FaultKind,
    /// Reporting priority.
    pub severity: Severity,
    /// Originating subsystem.
    pub domain: Domain,
    /// Producer-defined diagnostic code.
    pub code: u32,
    /// Monotonic time of detection.
    pub timestamp: Duration,
    /// Detecting context.
    pub reporter: Reporter,
    /// Typed diagnostic payload.
    pub context: FaultContext<'a>,
}

impl<'a> FaultEvent<'a> {
    /// Event with the kind's default severity and domain and no payload.
    #[must_use]
    pub const fn new(kind: FaultKind, timestamp: Duration) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            domain: kind.default_domain(),
            code: 0,
            timestamp,
            reporter: Reporter::Unknown,
            context: FaultContext::None,
        }
    }

    /// Set the severity.
    #[must_use]
    pub const fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Set the domain.
    #[must_use]
    pub const fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    /// Set the diagnostic code.
    #[must_use]
    pub const fn with_code(mut self, code: u32) -> Self {
        self.code = code;
        self
    }

    /// Set the detecting context.
    #[must_use]
    pub const fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<FaultContext<'a>>) -> Self {
        self.context = context.into();
        self
    }

    /// Size in bytes of the attached payload.
    #[must_use]
    pub fn context_size(&self) -> usize {
        self.context.size()
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::AssertContext;

    #[test]
    fn test_event_defaults_follow_kind() {
        let event = FaultEvent::new(FaultKind::PowerBrownout, Duration::from_millis(1));
        assert_eq!(event.severity, Severity::Critical);
        assert_eq!(event.domain, Domain::Power);
        assert_eq!(event.code, 0);
        assert_eq!(event.reporter, Reporter::Unknown);
        assert!(event.context.is_none());
        assert_eq!(event.context_size(), 0);
    }

    #[test]
    fn test_event_builder() {
        let assert_ctx = AssertContext {
            file: "app.c",
            line: 10,
            function: "main",
            condition: "x",
            message: "boom",
        };
        let event = FaultEvent::new(FaultKind::AppAssert, Duration::ZERO)
            .with_severity(Severity::Critical)
            .with_domain(Domain::System)
            .with_code(99)
            .with_reporter(Reporter::Thread(4))
            .with_context(assert_ctx);

        assert_eq!(event.severity, Severity::Critical);
        assert_eq!(event.domain, Domain::System);
        assert_eq!(event.code, 99);
        assert_eq!(event.reporter, Reporter::Thread(4));
        assert_eq!(event.context.as_assert(), Some(&assert_ctx));
        assert!(event.context_size() > 0);
    }

    #[test]
    fn test_reporter_display() {
        assert!(Reporter::Interrupt(3).is_interrupt());
        assert!(!Reporter::Unknown.is_interrupt());
        assert_eq!(Reporter::Thread(7).to_string(), "thread:7");
        assert_eq!(Reporter::Interrupt(12).to_string(), "irq:12");
        assert_eq!(Reporter::default().to_string(), "unknown");
    }
}
