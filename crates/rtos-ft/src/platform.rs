//! Kernel collaborators: monotonic clock, log sink, reset primitive and the
//! identity of the running execution context.
//!
//! The fault-tolerance core never talks to the kernel directly. A target
//! provides these capabilities through [`Platform`]; hosts get
//! [`Platform::host`] backed by `std::time::Instant`, `tracing` and thread
//! identity.

use core::fmt;
use core::time::Duration;

use tracing::Level;

use crate::{Disposition, FaultContext, FaultEvent, RebootCause, Severity, Verdict};

/// Source of monotonic timestamps.
pub trait MonotonicClock: Sync {
    /// Time since an arbitrary fixed epoch. Never goes backwards.
    fn now(&self) -> Duration;
}

/// Receiver of per-fault log records.
///
/// Called from the reporting context, which may be an interrupt handler:
/// implementations must not block or allocate.
pub trait FaultSink: Sync {
    /// Consume one record.
    fn record(&self, record: &LogRecord<'_>);
}

/// The platform reset primitive.
pub trait ResetController: Sync {
    /// Reset the system. Called at most once per pending reboot.
    fn reset(&self, cause: RebootCause);
}

/// Identity of an execution context: a thread or an interrupt handler.
///
/// Keys the nesting guard. A handler that reports again runs in the context
/// that invoked it, so it sees its own depth; reports running in parallel in
/// other contexts never add to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// A thread or task, by kernel id.
    #[must_use]
    pub const fn thread(id: u32) -> Self {
        Self((1 << 32) | id as u64)
    }

    /// An interrupt handler, by IRQ line.
    #[must_use]
    pub const fn interrupt(irq: u16) -> Self {
        Self((2 << 32) | irq as u64)
    }

    /// Non-zero key, distinct per identity.
    #[must_use]
    pub const fn key(self) -> u64 {
        self.0
    }
}

/// Tells the core which execution context is running.
///
/// Called on every dispatched report, possibly from an interrupt handler:
/// implementations must not block or allocate. A kernel port typically
/// answers with the IRQ number inside an ISR and the task id otherwise.
pub trait ContextSource: Sync {
    /// The context making the current call.
    fn current_context(&self) -> ContextId;
}

/// Treats every caller as one context.
///
/// Default when no thread identity is available. Preemption of a running
/// handler then counts as nesting, so targets with interrupts or several
/// tasks should install their own [`ContextSource`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleContext;

impl ContextSource for SingleContext {
    fn current_context(&self) -> ContextId {
        ContextId::thread(0)
    }
}

/// One context per OS thread.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadContext;

#[cfg(feature = "std")]
impl ContextSource for ThreadContext {
    fn current_context(&self) -> ContextId {
        use core::cell::Cell;
        use portable_atomic::{AtomicU32, Ordering};

        // Zero is left for `SingleContext` and threads being torn down.
        static NEXT_ID: AtomicU32 = AtomicU32::new(1);
        std::thread_local! {
            static THREAD_ID: Cell<u32> = const { Cell::new(0) };
        }

        let id = THREAD_ID
            .try_with(|slot| {
                if slot.get() == 0 {
                    slot.set(NEXT_ID.fetch_add(1, Ordering::Relaxed));
                }
                slot.get()
            })
            .unwrap_or(0);
        ContextId::thread(id)
    }
}

/// Point in the report path a [`LogRecord`] was emitted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Detection disabled for the kind; the event was dropped.
    Gated,
    /// A reset was already pending; the event was logged only.
    Suppressed,
    /// No handler registered for the kind.
    Unhandled,
    /// About to invoke the handler.
    Dispatch,
    /// A raw handler returned a word outside the verdict encoding.
    InvalidVerdict,
    /// The reporting context exceeded its nesting bound.
    NestingLimit,
    /// The handler returned and its verdict was applied.
    Resolved,
    /// This report moved the dispatcher to `RebootPending`.
    RebootScheduled,
}

impl Stage {
    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gated => "gated",
            Self::Suppressed => "suppressed",
            Self::Unhandled => "unhandled",
            Self::Dispatch => "dispatch",
            Self::InvalidVerdict => "invalid_verdict",
            Self::NestingLimit => "nesting_limit",
            Self::Resolved => "resolved",
            Self::RebootScheduled => "reboot_scheduled",
        }
    }

    /// Human readable summary.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Gated => "Fault detection disabled, event dropped",
            Self::Suppressed => "Reboot pending, fault logged without dispatch",
            Self::Unhandled => "No recovery handler registered",
            Self::Dispatch => "Dispatching fault to recovery handler",
            Self::InvalidVerdict => "Handler returned an invalid verdict",
            Self::NestingLimit => "Fault nesting limit exceeded",
            Self::Resolved => "Fault handled",
            Self::RebootScheduled => "Reboot scheduled",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured log record from the report path.
#[derive(Debug, Clone, Copy)]
pub struct LogRecord<'a> {
    /// Where in the report path this was emitted.
    pub stage: Stage,
    /// The event being reported.
    pub event: &'a FaultEvent<'a>,
    /// Handler verdict, once known.
    pub verdict: Option<Verdict>,
    /// Outcome, once known.
    pub disposition: Option<Disposition>,
    /// Whether sinks should dump the context payload.
    pub include_context: bool,
}

impl<'a> LogRecord<'a> {
    /// Record for `event` at `stage` with nothing resolved yet.
    #[must_use]
    pub const fn new(stage: Stage, event: &'a FaultEvent<'a>, include_context: bool) -> Self {
        Self {
            stage,
            event,
            verdict: None,
            disposition: None,
            include_context,
        }
    }

    /// Attach the handler verdict.
    #[must_use]
    pub const fn with_verdict(mut self, verdict: Verdict) -> Self {
        self.verdict = Some(verdict);
        self
    }

    /// Attach the outcome.
    #[must_use]
    pub const fn with_disposition(mut self, disposition: Disposition) -> Self {
        self.disposition = Some(disposition);
        self
    }

    /// Log level the record should be emitted at.
    #[must_use]
    pub fn level(&self) -> Level {
        match self.stage {
            Stage::Gated | Stage::Dispatch => Level::DEBUG,
            Stage::Suppressed => Level::WARN,
            Stage::Unhandled => severity_level(self.event.severity),
            Stage::InvalidVerdict | Stage::NestingLimit | Stage::RebootScheduled => Level::ERROR,
            Stage::Resolved => match self.disposition {
                Some(Disposition::Recovered | Disposition::Retry) | None => Level::INFO,
                Some(Disposition::RebootPending | Disposition::Suppressed) => Level::ERROR,
                Some(_) => Level::WARN,
            },
        }
    }

    /// Context payload as shown in logs, honouring `include_context`.
    #[must_use]
    pub fn context(&self) -> ContextDump<'_> {
        ContextDump {
            context: self.include_context.then_some(&self.event.context),
        }
    }
}

/// Level matching a fault severity.
#[must_use]
pub const fn severity_level(severity: Severity) -> Level {
    match severity {
        Severity::Info => Level::INFO,
        Severity::Warning => Level::WARN,
        Severity::Error | Severity::Critical => Level::ERROR,
    }
}

/// Display adapter for an optional context dump.
#[derive(Debug, Clone, Copy)]
pub struct ContextDump<'a> {
    context: Option<&'a FaultContext<'a>>,
}

impl fmt::Display for ContextDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.context {
            Some(context) => fmt::Display::fmt(context, f),
            None => f.write_str("<omitted>"),
        }
    }
}

struct OptionalDisplay<T>(Option<T>);

impl<T: fmt::Display> fmt::Display for OptionalDisplay<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(value) => fmt::Display::fmt(value, f),
            None => f.write_str("-"),
        }
    }
}

/// Sink that forwards records as structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// New sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

macro_rules! emit {
    ($level:ident, $record:expr) => {{
        let record = $record;
        let event = record.event;
        tracing::$level!(
            stage = record.stage.as_str(),
            kind = event.kind.as_str(),
            severity = event.severity.as_str(),
            domain = event.domain.as_str(),
            code = event.code,
            timestamp_us = u64::try_from(event.timestamp.as_micros()).unwrap_or(u64::MAX),
            reporter = %event.reporter,
            verdict = %OptionalDisplay(record.verdict),
            disposition = %OptionalDisplay(record.disposition),
            context = %record.context(),
            "{}",
            record.stage.message()
        );
    }};
}

impl FaultSink for TracingSink {
    fn record(&self, record: &LogRecord<'_>) {
        let level = record.level();
        if level == Level::ERROR {
            emit!(error, record);
        } else if level == Level::WARN {
            emit!(warn, record);
        } else if level == Level::INFO {
            emit!(info, record);
        } else {
            emit!(debug, record);
        }
    }
}

/// Reset controller for hosts that cannot reset: logs the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnlyReset;

impl ResetController for LogOnlyReset {
    fn reset(&self, cause: RebootCause) {
        tracing::error!(cause = %cause, "System reset requested");
    }
}

/// Clock based on `std::time::Instant`, with its epoch at first use.
#[cfg(feature = "std")]
#[derive(Debug, Default)]
pub struct StdClock {
    epoch: std::sync::OnceLock<std::time::Instant>,
}

#[cfg(feature = "std")]
impl StdClock {
    /// New clock.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            epoch: std::sync::OnceLock::new(),
        }
    }
}

#[cfg(feature = "std")]
impl MonotonicClock for StdClock {
    fn now(&self) -> Duration {
        self.epoch.get_or_init(std::time::Instant::now).elapsed()
    }
}

#[cfg(feature = "std")]
static DEFAULT_CONTEXT: ThreadContext = ThreadContext;
#[cfg(not(feature = "std"))]
static DEFAULT_CONTEXT: SingleContext = SingleContext;

/// The kernel services the fault-tolerance core depends on.
#[derive(Clone, Copy)]
pub struct Platform<'h> {
    /// Timestamp source.
    pub clock: &'h dyn MonotonicClock,
    /// Per-fault log sink.
    pub sink: &'h dyn FaultSink,
    /// Reset primitive.
    pub reset: &'h dyn ResetController,
    /// Identity of the running context.
    pub context: &'h dyn ContextSource,
}

impl<'h> Platform<'h> {
    /// Platform from its clock, sink and reset primitive.
    ///
    /// Contexts are told apart per thread under `std`. Without `std` every
    /// caller is one context until [`with_context`](Self::with_context)
    /// installs the kernel's own source.
    #[must_use]
    pub const fn new(
        clock: &'h dyn MonotonicClock,
        sink: &'h dyn FaultSink,
        reset: &'h dyn ResetController,
    ) -> Self {
        Self {
            clock,
            sink,
            reset,
            context: &DEFAULT_CONTEXT,
        }
    }

    /// Same platform with another context source.
    #[must_use]
    pub const fn with_context(mut self, context: &'h dyn ContextSource) -> Self {
        self.context = context;
        self
    }

    /// Same platform with another sink.
    #[must_use]
    pub const fn with_sink(mut self, sink: &'h dyn FaultSink) -> Self {
        self.sink = sink;
        self
    }

    /// Same platform with another clock.
    #[must_use]
    pub const fn with_clock(mut self, clock: &'h dyn MonotonicClock) -> Self {
        self.clock = clock;
        self
    }

    /// Same platform with another reset controller.
    #[must_use]
    pub const fn with_reset(mut self, reset: &'h dyn ResetController) -> Self {
        self.reset = reset;
        self
    }
}

#[cfg(feature = "std")]
static HOST_CLOCK: StdClock = StdClock::new();
#[cfg(feature = "std")]
static HOST_SINK: TracingSink = TracingSink::new();
#[cfg(feature = "std")]
static HOST_RESET: LogOnlyReset = LogOnlyReset;

#[cfg(feature = "std")]
impl Platform<'static> {
    /// Host platform: `Instant` clock, `tracing` sink, logging reset.
    #[must_use]
    pub const fn host() -> Self {
        Self::new(&HOST_CLOCK, &HOST_SINK, &HOST_RESET)
    }
}

impl fmt::Debug for Platform<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::{CrcContext, FaultKind, RecoveryResult};

    fn crc_event() -> FaultEvent<'static> {
        FaultEvent::new(FaultKind::CommCrcError, Duration::from_millis(3)).with_context(
            CrcContext {
                protocol: "spi0",
                expected: 1,
                received: 2,
                packet_id: 3,
                size: 4,
            },
        )
    }

    #[test]
    fn test_levels_follow_stage_and_outcome() {
        let event = crc_event();
        let base = LogRecord::new(Stage::Resolved, &event, true);

        assert_eq!(base.level(), Level::INFO);
        assert_eq!(
            base.with_disposition(Disposition::Failed).level(),
            Level::WARN
        );
        assert_eq!(
            base.with_disposition(Disposition::RebootPending).level(),
            Level::ERROR
        );
        assert_eq!(LogRecord::new(Stage::Gated, &event, true).level(), Level::DEBUG);
        assert_eq!(
            LogRecord::new(Stage::NestingLimit, &event, true).level(),
            Level::ERROR
        );
    }

    #[test]
    fn test_unhandled_level_follows_severity() {
        let event = crc_event().with_severity(Severity::Info);
        let record = LogRecord::new(Stage::Unhandled, &event, false);
        assert_eq!(record.level(), Level::INFO);

        let event = event.with_severity(Severity::Critical);
        let record = LogRecord::new(Stage::Unhandled, &event, false);
        assert_eq!(record.level(), Level::ERROR);
    }

    #[test]
    fn test_context_dump_honours_flag() {
        let event = crc_event();
        let shown = LogRecord::new(Stage::Dispatch, &event, true);
        let hidden = LogRecord::new(Stage::Dispatch, &event, false);

        assert!(shown.context().to_string().contains("spi0"));
        assert_eq!(hidden.context().to_string(), "<omitted>");
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(
            Verdict::Valid(RecoveryResult::Retry).to_string(),
            "RETRY"
        );
        assert_eq!(Verdict::Invalid(0x2a).to_string(), "INVALID(0x2a)");
    }

    #[test]
    fn test_std_clock_is_monotonic() {
        let clock = StdClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_tracing_sink_accepts_every_stage() {
        let event = crc_event();
        let sink = TracingSink::new();
        for stage in [
            Stage::Gated,
            Stage::Suppressed,
            Stage::Unhandled,
            Stage::Dispatch,
            Stage::InvalidVerdict,
            Stage::NestingLimit,
            Stage::Resolved,
            Stage::RebootScheduled,
        ] {
            sink.record(&LogRecord::new(stage, &event, true));
        }
    }

    #[test]
    fn test_thread_context_is_stable_per_thread() -> Result<(), Box<dyn std::any::Any + Send>> {
        let here = ThreadContext.current_context();
        assert_eq!(ThreadContext.current_context(), here);
        assert_ne!(here, SingleContext.current_context());

        let there = std::thread::spawn(|| ThreadContext.current_context()).join()?;
        assert_ne!(there, here);
        Ok(())
    }

    #[test]
    fn test_context_ids_are_distinct_and_non_zero() {
        let ids = [
            ContextId::thread(0),
            ContextId::thread(1),
            ContextId::interrupt(0),
            ContextId::interrupt(1),
        ];
        for (i, a) in ids.iter().enumerate() {
            assert_ne!(a.key(), 0);
            for b in ids.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_platform_uses_thread_context_by_default() {
        static FIXED: SingleContext = SingleContext;
        let host = Platform::host();
        let here = host.context.current_context();
        assert_eq!(here, ThreadContext.current_context());
        assert_eq!(
            host.with_context(&FIXED).context.current_context(),
            ContextId::thread(0)
        );
    }
}
