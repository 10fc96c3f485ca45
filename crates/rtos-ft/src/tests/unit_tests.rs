//! Unit tests for the reporter facade.

use super::{Counting, ResetCount, platform};
use crate::*;
use core::time::Duration;

fn event(kind: FaultKind) -> FaultEvent<'static> {
    FaultEvent::new(kind, Duration::from_millis(7))
}

#[test]
fn test_gated_report_invokes_nothing() -> FtResult<()> {
    let handler = Counting::new(RecoveryResult::Recovered);
    let reset = ResetCount::new();
    let ft = FaultTolerance::new(FtConfig::DEFAULT, platform(&reset));
    ft.init()?;
    ft.register_handler(FaultKind::HardFault, &handler)?;

    assert_eq!(ft.report_fault(&event(FaultKind::HardFault)), Disposition::Gated);
    assert_eq!(handler.calls(), 0);
    assert_eq!(ft.state(), DispatchState::Normal);
    assert_eq!(ft.stats().snapshot(FaultKind::HardFault).gated, 1);
    Ok(())
}

#[test]
fn test_disabled_detection_takes_precedence_over_missing_handler() -> FtResult<()> {
    let reset = ResetCount::new();
    let ft = FaultTolerance::new(FtConfig::DEFAULT, platform(&reset));
    ft.init()?;

    assert_eq!(
        ft.report_fault(&event(FaultKind::DeadlockDetected)),
        Disposition::Gated
    );
    Ok(())
}

#[test]
fn test_unhandled_is_distinguishable_by_severity() -> FtResult<()> {
    let reset = ResetCount::new();
    let ft = FaultTolerance::new(FtConfig::DEFAULT, platform(&reset));
    ft.init()?;
    ft.enable_detection(FaultKind::PeripheralTimeout);

    let serious = event(FaultKind::PeripheralTimeout).with_severity(Severity::Critical);
    let mild = event(FaultKind::PeripheralTimeout).with_severity(Severity::Warning);

    let outcome = ft.report_fault(&serious);
    assert_eq!(
        outcome,
        Disposition::Unhandled {
            severity: Severity::Critical
        }
    );
    assert!(outcome.needs_fallback());
    assert!(!ft.report_fault(&mild).needs_fallback());
    assert_eq!(ft.stats().snapshot(FaultKind::PeripheralTimeout).unhandled, 2);
    assert_eq!(ft.state(), DispatchState::Normal);
    Ok(())
}

#[test]
fn test_verdicts_map_to_dispositions() -> FtResult<()> {
    let cases = [
        (RecoveryResult::Recovered, Disposition::Recovered),
        (RecoveryResult::Failed, Disposition::Failed),
        (RecoveryResult::Retry, Disposition::Retry),
    ];
    for (verdict, expected) in cases {
        let handler = Counting::new(verdict);
        let reset = ResetCount::new();
        let ft = FaultTolerance::new(FtConfig::permissive(), platform(&reset));
        ft.init()?;
        ft.register_handler(FaultKind::CommCrcError, &handler)?;

        assert_eq!(ft.report_fault(&event(FaultKind::CommCrcError)), expected);
        assert_eq!(handler.calls(), 1);
        assert_eq!(ft.state(), DispatchState::Normal);
        assert_eq!(ft.service_pending_reboot(), None);
        assert_eq!(reset.count(), 0);
    }
    Ok(())
}

#[test]
fn test_retry_is_not_retried_by_core() -> FtResult<()> {
    let handler = Counting::new(RecoveryResult::Retry);
    let reset = ResetCount::new();
    let ft = FaultTolerance::new(FtConfig::permissive(), platform(&reset));
    ft.init()?;
    ft.register_handler(FaultKind::PeripheralTimeout, &handler)?;

    assert_eq!(
        ft.report_fault(&event(FaultKind::PeripheralTimeout)),
        Disposition::Retry
    );
    assert_eq!(handler.calls(), 1);
    Ok(())
}

#[test]
fn test_raw_handler_words() -> FtResult<()> {
    let recovered = |_: &FaultEvent<'_>| 0u32;
    let garbage = |_: &FaultEvent<'_>| 0xFFFF_FFFFu32;
    let reset = ResetCount::new();
    let ft = FaultTolerance::new(FtConfig::permissive(), platform(&reset));
    ft.init()?;
    ft.register_raw_handler(FaultKind::StackOverflow, &recovered)?;
    ft.register_raw_handler(FaultKind::MemoryCorruption, &garbage)?;

    assert_eq!(
        ft.report_fault(&event(FaultKind::StackOverflow)),
        Disposition::Recovered
    );
    assert_eq!(
        ft.report_fault(&event(FaultKind::MemoryCorruption)),
        Disposition::RebootPending
    );
    assert_eq!(
        ft.reboot_cause(),
        Some(RebootCause::InvalidVerdict(FaultKind::MemoryCorruption))
    );
    Ok(())
}

#[test]
fn test_last_registration_wins_by_default() -> FtResult<()> {
    let first = Counting::new(RecoveryResult::Recovered);
    let second = Counting::new(RecoveryResult::Failed);
    let reset = ResetCount::new();
    let ft = FaultTolerance::new(FtConfig::permissive(), platform(&reset));
    ft.init()?;
    ft.register_handler(FaultKind::AppAssert, &first)?;
    ft.register_handler(FaultKind::AppAssert, &second)?;

    assert_eq!(ft.report_fault(&event(FaultKind::AppAssert)), Disposition::Failed);
    assert_eq!(first.calls(), 0);
    assert_eq!(second.calls(), 1);
    Ok(())
}

#[test]
fn test_strict_config_rejects_duplicates() -> FtResult<()> {
    let first = Counting::new(RecoveryResult::Recovered);
    let second = Counting::new(RecoveryResult::Failed);
    let reset = ResetCount::new();
    let ft = FaultTolerance::new(FtConfig::strict(), platform(&reset));
    ft.init()?;
    ft.register_handler(FaultKind::AppAssert, &first)?;

    assert_eq!(
        ft.register_handler(FaultKind::AppAssert, &second),
        Err(FtError::AlreadyRegistered(FaultKind::AppAssert))
    );
    assert!(ft.unregister_handler(FaultKind::AppAssert));
    ft.register_handler(FaultKind::AppAssert, &second)?;
    Ok(())
}

#[test]
fn test_init_rejects_invalid_config() {
    let reset = ResetCount::new();
    let config = FtConfig {
        max_nesting_depth: 0,
        ..FtConfig::DEFAULT
    };
    let ft = FaultTolerance::new(config, platform(&reset));
    assert!(matches!(ft.init(), Err(FtError::InvalidConfiguration(_))));
}

#[test]
fn test_init_restores_boot_state() -> FtResult<()> {
    let handler = Counting::new(RecoveryResult::RebootRequired);
    let reset = ResetCount::new();
    let ft = FaultTolerance::new(FtConfig::DEFAULT, platform(&reset));
    ft.init()?;
    ft.register_handler(FaultKind::WatchdogBark, &handler)?;
    ft.enable_detection(FaultKind::WatchdogBark);
    ft.report_fault(&event(FaultKind::WatchdogBark));
    assert!(ft.is_reboot_pending());

    ft.init()?;
    assert_eq!(ft.state(), DispatchState::Normal);
    assert!(!ft.has_handler(FaultKind::WatchdogBark));
    assert!(ft.enabled_kinds().is_empty());
    assert_eq!(ft.stats().totals(), KindSnapshot::default());
    assert!(ft.history().is_empty());
    Ok(())
}

#[test]
fn test_initially_enabled_kinds() -> FtResult<()> {
    let reset = ResetCount::new();
    let config = FtConfig::builder()
        .initially_enabled(KindSet::only(FaultKind::PowerBrownout).with(FaultKind::HardFault))
        .build()?;
    let ft = FaultTolerance::new(config, platform(&reset));
    ft.init()?;

    assert!(ft.is_detection_enabled(FaultKind::PowerBrownout));
    assert!(ft.is_detection_enabled(FaultKind::HardFault));
    assert!(!ft.is_detection_enabled(FaultKind::AppAssert));
    assert_eq!(ft.enabled_kinds().len(), 2);
    Ok(())
}

#[test]
fn test_history_records_dispatched_reports() -> FtResult<()> {
    let handler = Counting::new(RecoveryResult::Failed);
    let reset = ResetCount::new();
    let ft = FaultTolerance::new(FtConfig::permissive(), platform(&reset));
    ft.init()?;
    ft.register_handler(FaultKind::CommCrcError, &handler)?;

    ft.report_fault(&event(FaultKind::CommCrcError).with_code(9));
    ft.report_fault(&event(FaultKind::HardFault));

    assert_eq!(ft.history().len(), 1);
    let last = ft.history().last();
    assert_eq!(last.map(|r| r.code), Some(9));
    assert_eq!(last.map(|r| r.disposition), Some(Disposition::Failed));
    Ok(())
}

#[test]
fn test_history_can_be_disabled() -> FtResult<()> {
    let handler = Counting::new(RecoveryResult::Recovered);
    let reset = ResetCount::new();
    let config = FtConfig {
        record_history: false,
        ..FtConfig::permissive()
    };
    let ft = FaultTolerance::new(config, platform(&reset));
    ft.init()?;
    ft.register_handler(FaultKind::CommCrcError, &handler)?;
    ft.report_fault(&event(FaultKind::CommCrcError));

    assert!(ft.history().is_empty());
    Ok(())
}

#[test]
fn test_hook_capacity() -> FtResult<()> {
    let hook = |_: RebootCause| {};
    let reset = ResetCount::new();
    let ft = FaultTolerance::new(FtConfig::DEFAULT, platform(&reset));
    ft.init()?;
    for _ in 0..MAX_PRE_REBOOT_HOOKS {
        ft.register_pre_reboot_hook(&hook)?;
    }
    assert_eq!(
        ft.register_pre_reboot_hook(&hook),
        Err(FtError::HookCapacityExceeded {
            capacity: MAX_PRE_REBOOT_HOOKS
        })
    );
    Ok(())
}

#[test]
fn test_string_helpers_are_total() {
    assert_eq!(kind_to_string(FaultKind::AppAssert.to_raw()), "APP_ASSERT");
    assert_eq!(kind_to_string(200), UNKNOWN);
    assert_eq!(severity_to_string(3), "CRITICAL");
    assert_eq!(severity_to_string(4), UNKNOWN);
}
