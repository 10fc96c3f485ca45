//! Calibration scenarios run against a fresh instance each.
//!
//! Every scenario wires a `FaultTolerance` to the host clock, the
//! `tracing` sink and a reset controller that only counts, registers its
//! handlers, reports and then checks what happened.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use clap::ValueEnum;
use rtos_ft::prelude::*;
use rtos_ft::KindSnapshot;
use serde::Serialize;

use crate::error::CliError;

static CLOCK: StdClock = StdClock::new();
static SINK: TracingSink = TracingSink::new();

/// Upper bound on caller-side retries in the timeout scenario.
const MAX_RETRIES: u32 = 3;

const CALIBRATION_ASSERT: AssertContext<'static> = AssertContext {
    file: "calibration/assert.rs",
    line: 42,
    function: "check_frame",
    condition: "len <= 64",
    message: "calibration assertion",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Application assertion handled with `Failed`
    Assert,
    /// CRC error recovered by its handler
    Crc,
    /// Supply brownout that forces a reset
    Brownout,
    /// Peripheral timeout retried by the caller
    Timeout,
    /// Report of a kind whose detection is disabled
    Gated,
    /// Burst of reports across every kind
    Storm,
    /// Every scenario in order
    All,
}

impl Scenario {
    const EACH: [Scenario; 6] = [
        Scenario::Assert,
        Scenario::Crc,
        Scenario::Brownout,
        Scenario::Timeout,
        Scenario::Gated,
        Scenario::Storm,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Assert => "assert",
            Self::Crc => "crc",
            Self::Brownout => "brownout",
            Self::Timeout => "timeout",
            Self::Gated => "gated",
            Self::Storm => "storm",
            Self::All => "all",
        }
    }

    /// Scenarios this selection expands to.
    pub fn expand(self) -> Vec<Scenario> {
        match self {
            Self::All => Self::EACH.to_vec(),
            single => vec![single],
        }
    }
}

/// What one scenario observed.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: &'static str,
    pub kind: FaultKind,
    pub disposition: Disposition,
    pub handler_calls: u32,
    pub state: DispatchState,
    pub reboot_cause: Option<RebootCause>,
    pub resets: u32,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<KindSnapshot>,
}

impl ScenarioReport {
    fn new(name: &'static str, kind: FaultKind, disposition: Disposition) -> Self {
        Self {
            name,
            kind,
            disposition,
            handler_calls: 0,
            state: DispatchState::Normal,
            reboot_cause: None,
            resets: 0,
            completed: false,
            totals: None,
        }
    }

    fn observe(mut self, ft: &FaultTolerance<'_>, calls: &AtomicU32, reset: &CountingReset) -> Self {
        self.handler_calls = calls.load(Ordering::SeqCst);
        self.state = ft.state();
        self.reboot_cause = ft.reboot_cause();
        self.resets = reset.count();
        self
    }
}

/// Reset controller that counts instead of resetting the host.
#[derive(Debug, Default)]
struct CountingReset {
    resets: AtomicU32,
}

impl CountingReset {
    fn count(&self) -> u32 {
        self.resets.load(Ordering::SeqCst)
    }
}

impl ResetController for CountingReset {
    fn reset(&self, cause: RebootCause) {
        tracing::warn!(cause = %cause, "Simulated reset");
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

fn platform(reset: &CountingReset) -> Platform<'_> {
    Platform::new(&CLOCK, &SINK, reset)
}

fn check(name: &'static str, ok: bool, reason: impl Into<String>) -> Result<(), CliError> {
    if ok {
        Ok(())
    } else {
        Err(CliError::ScenarioFailed {
            name,
            reason: reason.into(),
        })
    }
}

/// Run one scenario.
pub fn run(scenario: Scenario, storm_count: u32) -> Result<Vec<ScenarioReport>, CliError> {
    scenario
        .expand()
        .into_iter()
        .map(|s| match s {
            Scenario::Assert => app_assert(),
            Scenario::Crc => comm_crc_error(),
            Scenario::Brownout => power_brownout(),
            Scenario::Timeout => peripheral_timeout(),
            Scenario::Gated => gated(),
            Scenario::Storm | Scenario::All => storm(storm_count),
        })
        .collect()
}

fn app_assert() -> Result<ScenarioReport, CliError> {
    const NAME: &str = "assert";
    let calls = AtomicU32::new(0);
    let completed = AtomicBool::new(false);
    let handler = |event: &FaultEvent<'_>| {
        calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ctx) = event.context.as_assert() {
            tracing::info!(
                file = ctx.file,
                line = ctx.line,
                function = ctx.function,
                condition = ctx.condition,
                message = ctx.message,
                "Assertion context"
            );
            completed.store(*ctx == CALIBRATION_ASSERT, Ordering::SeqCst);
        }
        RecoveryResult::Failed
    };
    let reset = CountingReset::default();
    let ft = FaultTolerance::new(FtConfig::DEFAULT, platform(&reset));
    ft.init()?;
    ft.register_handler(FaultKind::AppAssert, &handler)?;
    ft.enable_detection(FaultKind::AppAssert);

    let event = FaultEvent::new(FaultKind::AppAssert, ft.now())
        .with_severity(Severity::Error)
        .with_reporter(Reporter::Thread(1))
        .with_context(CALIBRATION_ASSERT);
    let disposition = ft.report_fault(&event);

    let mut report = ScenarioReport::new(NAME, FaultKind::AppAssert, disposition)
        .observe(&ft, &calls, &reset);
    report.completed = completed.load(Ordering::SeqCst);
    check(NAME, disposition == Disposition::Failed, format!("got {disposition}"))?;
    check(NAME, report.handler_calls == 1, "handler not invoked exactly once")?;
    check(NAME, report.completed, "handler did not see the assertion context")?;
    Ok(report)
}

fn comm_crc_error() -> Result<ScenarioReport, CliError> {
    const NAME: &str = "crc";
    let calls = AtomicU32::new(0);
    let completed = AtomicBool::new(false);
    let handler = |event: &FaultEvent<'_>| {
        calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ctx) = event.context.as_crc() {
            tracing::info!(
                protocol = ctx.protocol,
                expected = ctx.expected,
                received = ctx.received,
                packet_id = ctx.packet_id,
                "Retransmission requested"
            );
        }
        completed.store(true, Ordering::SeqCst);
        RecoveryResult::Recovered
    };
    let reset = CountingReset::default();
    let ft = FaultTolerance::new(FtConfig::DEFAULT, platform(&reset));
    ft.init()?;
    ft.register_handler(FaultKind::CommCrcError, &handler)?;
    ft.enable_detection(FaultKind::CommCrcError);

    let event = FaultEvent::new(FaultKind::CommCrcError, ft.now())
        .with_reporter(Reporter::Interrupt(37))
        .with_context(CrcContext {
            protocol: "uart1",
            expected: 0xA5A5_1234,
            received: 0xA5A5_0000,
            packet_id: 17,
            size: 64,
        });
    let disposition = ft.report_fault(&event);

    let mut report = ScenarioReport::new(NAME, FaultKind::CommCrcError, disposition)
        .observe(&ft, &calls, &reset);
    report.completed = completed.load(Ordering::SeqCst);
    check(NAME, disposition == Disposition::Recovered, format!("got {disposition}"))?;
    check(NAME, report.state == DispatchState::Normal, format!("state {}", report.state))?;
    check(NAME, report.resets == 0, "unexpected reset")?;
    Ok(report)
}

fn power_brownout() -> Result<ScenarioReport, CliError> {
    const NAME: &str = "brownout";
    let calls = AtomicU32::new(0);
    let completed = AtomicBool::new(false);
    let handler = |event: &FaultEvent<'_>| {
        calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ctx) = event.context.as_brownout() {
            tracing::warn!(
                rail = ctx.rail,
                voltage_mv = ctx.voltage_mv,
                threshold_mv = ctx.threshold_mv,
                "Supply below threshold"
            );
        }
        RecoveryResult::RebootRequired
    };
    let hook = |cause: RebootCause| {
        tracing::info!(cause = %cause, "Flushing state before reset");
        completed.store(true, Ordering::SeqCst);
    };
    let reset = CountingReset::default();
    let ft = FaultTolerance::new(FtConfig::DEFAULT, platform(&reset));
    ft.init()?;
    ft.register_handler(FaultKind::PowerBrownout, &handler)?;
    ft.register_pre_reboot_hook(&hook)?;
    ft.enable_detection(FaultKind::PowerBrownout);

    let event = FaultEvent::new(FaultKind::PowerBrownout, ft.now())
        .with_reporter(Reporter::Interrupt(3))
        .with_context(BrownoutContext {
            rail: "VDD_MAIN",
            voltage_mv: 2_710,
            threshold_mv: 2_900,
        });
    let disposition = ft.report_fault(&event);
    check(NAME, reset.count() == 0, "reset issued from the reporting context")?;

    // Deferred servicing, as a low-priority task would do it.
    let serviced = ft.service_pending_reboot();
    let again = ft.service_pending_reboot();

    let mut report = ScenarioReport::new(NAME, FaultKind::PowerBrownout, disposition)
        .observe(&ft, &calls, &reset);
    report.completed = completed.load(Ordering::SeqCst);
    check(NAME, disposition == Disposition::RebootPending, format!("got {disposition}"))?;
    check(NAME, serviced.is_some() && again.is_none(), "reset not serviced exactly once")?;
    check(NAME, report.resets == 1, format!("{} resets", report.resets))?;
    Ok(report)
}

fn peripheral_timeout() -> Result<ScenarioReport, CliError> {
    const NAME: &str = "timeout";
    let calls = AtomicU32::new(0);
    let handler = |event: &FaultEvent<'_>| {
        let attempt = calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ctx) = event.context.as_timeout() {
            tracing::info!(
                peripheral = ctx.peripheral,
                operation = ctx.operation,
                attempt,
                "Bus timeout"
            );
        }
        if attempt < 2 {
            RecoveryResult::Retry
        } else {
            RecoveryResult::Recovered
        }
    };
    let reset = CountingReset::default();
    let ft = FaultTolerance::new(FtConfig::DEFAULT, platform(&reset));
    ft.init()?;
    ft.register_handler(FaultKind::PeripheralTimeout, &handler)?;
    ft.enable_detection(FaultKind::PeripheralTimeout);

    // The core never retries; the reporter owns the loop.
    let mut disposition = Disposition::Retry;
    let mut attempts = 0;
    while disposition == Disposition::Retry && attempts <= MAX_RETRIES {
        let event = FaultEvent::new(FaultKind::PeripheralTimeout, ft.now())
            .with_reporter(Reporter::Thread(5))
            .with_context(TimeoutContext {
                peripheral: "i2c0",
                operation: "read",
                timeout_ms: 50,
                elapsed_ms: 75,
            });
        disposition = ft.report_fault(&event);
        attempts += 1;
    }

    let mut report = ScenarioReport::new(NAME, FaultKind::PeripheralTimeout, disposition)
        .observe(&ft, &calls, &reset);
    report.completed = disposition == Disposition::Recovered;
    check(NAME, report.completed, format!("got {disposition} after {attempts} attempts"))?;
    check(NAME, report.handler_calls == 3, "expected two retries then recovery")?;
    Ok(report)
}

fn gated() -> Result<ScenarioReport, CliError> {
    const NAME: &str = "gated";
    let calls = AtomicU32::new(0);
    let handler = |_: &FaultEvent<'_>| {
        calls.fetch_add(1, Ordering::SeqCst);
        RecoveryResult::RebootRequired
    };
    let reset = CountingReset::default();
    let ft = FaultTolerance::new(FtConfig::DEFAULT, platform(&reset));
    ft.init()?;
    ft.register_handler(FaultKind::WatchdogBark, &handler)?;

    let disposition = ft.report_fault(&FaultEvent::new(FaultKind::WatchdogBark, ft.now()));

    let mut report = ScenarioReport::new(NAME, FaultKind::WatchdogBark, disposition)
        .observe(&ft, &calls, &reset);
    report.completed = disposition == Disposition::Gated && report.handler_calls == 0;
    check(NAME, report.completed, format!("got {disposition}"))?;
    Ok(report)
}

fn storm(count: u32) -> Result<ScenarioReport, CliError> {
    const NAME: &str = "storm";
    let calls = AtomicU32::new(0);
    let handler = |_: &FaultEvent<'_>| {
        calls.fetch_add(1, Ordering::SeqCst);
        RecoveryResult::Recovered
    };
    let reset = CountingReset::default();
    let config = FtConfig::builder()
        .record_history(true)
        .dump_context(false)
        .initially_enabled(KindSet::ALL.without(FaultKind::PowerBrownout))
        .build()?;
    let ft = FaultTolerance::new(config, platform(&reset));
    ft.init()?;
    for kind in FaultKind::ALL {
        if kind != FaultKind::DeadlockDetected {
            ft.register_handler(kind, &handler)?;
        }
    }

    let mut last = (FaultKind::AppAssert, Disposition::Gated);
    for (n, kind) in (0..count).zip(FaultKind::ALL.into_iter().cycle()) {
        let event = FaultEvent::new(kind, Duration::from_micros(u64::from(n)))
            .with_code(n)
            .with_reporter(Reporter::Thread(n % 4));
        last = (kind, ft.report_fault(&event));
    }

    let (kind, disposition) = last;
    let mut report = ScenarioReport::new(NAME, kind, disposition).observe(&ft, &calls, &reset);
    let totals = ft.stats().totals();
    report.totals = Some(totals);
    report.completed = totals.reported == count
        && totals.dispatched == report.handler_calls
        && totals.reported == totals.gated + totals.unhandled + totals.dispatched;
    check(NAME, report.completed, "counters disagree with handler calls")?;
    check(NAME, report.state == DispatchState::Normal, format!("state {}", report.state))?;
    Ok(report)
}
