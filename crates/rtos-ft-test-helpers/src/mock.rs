//! Mock collaborators for fault-tolerance tests.
//!
//! Handlers count their invocations and copy what they saw, so a test can
//! assert on an event after the borrow handed to the handler has ended.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, const_mutex};
use rtos_ft::{
    Disposition, Domain, FaultEvent, FaultHandler, FaultKind, FaultSink,
    LogRecord, MonotonicClock, Platform, PreRebootHook, RawFaultHandler, RebootCause,
    RecoveryResult, Reporter, ResetController, Severity, Stage, Verdict,
};

/// Owned copy of assertion context fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenAssert {
    pub file: String,
    pub line: u32,
    pub function: String,
    pub condition: String,
    pub message: String,
}

/// Owned copy of an event as a handler saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenEvent {
    pub kind: FaultKind,
    pub severity: Severity,
    pub domain: Domain,
    pub code: u32,
    pub reporter: Reporter,
    pub timestamp: Duration,
    pub context_shape: &'static str,
    pub context_dump: String,
    pub assert: Option<SeenAssert>,
}

impl SeenEvent {
    pub fn capture(event: &FaultEvent<'_>) -> Self {
        Self {
            kind: event.kind,
            severity: event.severity,
            domain: event.domain,
            code: event.code,
            reporter: event.reporter,
            timestamp: event.timestamp,
            context_shape: event.context.shape(),
            context_dump: event.context.to_string(),
            assert: event.context.as_assert().map(|ctx| SeenAssert {
                file: ctx.file.to_owned(),
                line: ctx.line,
                function: ctx.function.to_owned(),
                condition: ctx.condition.to_owned(),
                message: ctx.message.to_owned(),
            }),
        }
    }
}

/// Handler returning a fixed verdict and recording every event.
#[derive(Debug)]
pub struct RecordingHandler {
    verdict: RecoveryResult,
    calls: AtomicU32,
    seen: Mutex<Vec<SeenEvent>>,
}

impl RecordingHandler {
    pub const fn new(verdict: RecoveryResult) -> Self {
        Self {
            verdict,
            calls: AtomicU32::new(0),
            seen: const_mutex(Vec::new()),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<SeenEvent> {
        self.seen.lock().clone()
    }

    pub fn last(&self) -> Option<SeenEvent> {
        self.seen.lock().last().cloned()
    }
}

impl FaultHandler for RecordingHandler {
    fn handle(&self, event: &FaultEvent<'_>) -> RecoveryResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(SeenEvent::capture(event));
        self.verdict
    }
}

/// Handler that only counts; safe to use where allocation is tracked.
#[derive(Debug)]
pub struct CountingHandler {
    verdict: RecoveryResult,
    calls: AtomicU32,
}

impl CountingHandler {
    pub const fn new(verdict: RecoveryResult) -> Self {
        Self {
            verdict,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FaultHandler for CountingHandler {
    fn handle(&self, _event: &FaultEvent<'_>) -> RecoveryResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict
    }
}

/// Handler that plays back a list of verdicts, then repeats a fallback.
#[derive(Debug)]
pub struct ScriptedHandler {
    script: Mutex<VecDeque<RecoveryResult>>,
    fallback: RecoveryResult,
    calls: AtomicU32,
}

impl ScriptedHandler {
    pub fn new(script: impl IntoIterator<Item = RecoveryResult>, fallback: RecoveryResult) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FaultHandler for ScriptedHandler {
    fn handle(&self, _event: &FaultEvent<'_>) -> RecoveryResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script.lock().pop_front().unwrap_or(self.fallback)
    }
}

/// Raw handler answering with a fixed verdict word.
#[derive(Debug)]
pub struct RawWordHandler {
    word: u32,
    calls: AtomicU32,
}

impl RawWordHandler {
    pub const fn new(word: u32) -> Self {
        Self {
            word,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RawFaultHandler for RawWordHandler {
    fn handle_raw(&self, _event: &FaultEvent<'_>) -> u32 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.word
    }
}

/// Owned copy of one [`LogRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkEntry {
    pub stage: Stage,
    pub level: tracing::Level,
    pub kind: FaultKind,
    pub severity: Severity,
    pub code: u32,
    pub reporter: Reporter,
    pub verdict: Option<Verdict>,
    pub disposition: Option<Disposition>,
    pub context: String,
}

/// Sink keeping every record in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<SinkEntry>>,
}

impl RecordingSink {
    pub const fn new() -> Self {
        Self {
            entries: const_mutex(Vec::new()),
        }
    }

    pub fn entries(&self) -> Vec<SinkEntry> {
        self.entries.lock().clone()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.entries.lock().iter().map(|e| e.stage).collect()
    }

    pub fn count(&self, stage: Stage) -> usize {
        self.entries.lock().iter().filter(|e| e.stage == stage).count()
    }

    pub fn last(&self) -> Option<SinkEntry> {
        self.entries.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl FaultSink for RecordingSink {
    fn record(&self, record: &LogRecord<'_>) {
        let event = record.event;
        self.entries.lock().push(SinkEntry {
            stage: record.stage,
            level: record.level(),
            kind: event.kind,
            severity: event.severity,
            code: event.code,
            reporter: event.reporter,
            verdict: record.verdict,
            disposition: record.disposition,
            context: record.context().to_string(),
        });
    }
}

/// Sink that only counts records.
#[derive(Debug, Default)]
pub struct CountingSink {
    records: AtomicU32,
}

impl CountingSink {
    pub const fn new() -> Self {
        Self {
            records: AtomicU32::new(0),
        }
    }

    pub fn records(&self) -> u32 {
        self.records.load(Ordering::SeqCst)
    }
}

impl FaultSink for CountingSink {
    fn record(&self, _record: &LogRecord<'_>) {
        self.records.fetch_add(1, Ordering::SeqCst);
    }
}

/// Clock advanced by hand.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    pub const fn new() -> Self {
        Self {
            micros: AtomicU64::new(0),
        }
    }

    pub fn set(&self, now: Duration) {
        self.micros
            .store(u64::try_from(now.as_micros()).unwrap_or(u64::MAX), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.micros.fetch_add(
            u64::try_from(by.as_micros()).unwrap_or(u64::MAX),
            Ordering::SeqCst,
        );
    }
}

impl MonotonicClock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }
}

/// Reset controller that records calls instead of resetting.
#[derive(Debug, Default)]
pub struct CountingReset {
    resets: AtomicU32,
    last_cause: Mutex<Option<RebootCause>>,
}

impl CountingReset {
    pub const fn new() -> Self {
        Self {
            resets: AtomicU32::new(0),
            last_cause: const_mutex(None),
        }
    }

    pub fn resets(&self) -> u32 {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn last_cause(&self) -> Option<RebootCause> {
        *self.last_cause.lock()
    }
}

impl ResetController for CountingReset {
    fn reset(&self, cause: RebootCause) {
        self.resets.fetch_add(1, Ordering::SeqCst);
        *self.last_cause.lock() = Some(cause);
    }
}

/// Pre-reboot hook that counts calls and notes the order it ran in.
#[derive(Debug)]
pub struct CountingHook {
    calls: AtomicU32,
    order: &'static AtomicU32,
    ran_at: AtomicU32,
}

impl CountingHook {
    /// Hook sharing `order` with other hooks, so each records its position.
    pub const fn new(order: &'static AtomicU32) -> Self {
        Self {
            calls: AtomicU32::new(0),
            order,
            ran_at: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// 1-based position among hooks sharing the counter; 0 if never run.
    pub fn ran_at(&self) -> u32 {
        self.ran_at.load(Ordering::SeqCst)
    }
}

impl PreRebootHook for CountingHook {
    fn before_reboot(&self, _cause: RebootCause) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let position = self.order.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        self.ran_at.store(position, Ordering::SeqCst);
    }
}

/// Clock, recording sink and counting reset bundled for one test.
#[derive(Debug, Default)]
pub struct TestRig {
    pub clock: ManualClock,
    pub sink: RecordingSink,
    pub reset: CountingReset,
}

impl TestRig {
    pub const fn new() -> Self {
        Self {
            clock: ManualClock::new(),
            sink: RecordingSink::new(),
            reset: CountingReset::new(),
        }
    }

    pub const fn platform(&self) -> Platform<'_> {
        Platform::new(&self.clock, &self.sink, &self.reset)
    }
}
