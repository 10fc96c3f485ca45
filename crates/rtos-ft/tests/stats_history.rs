//! Counters and the recent-fault ring.

use std::time::Duration;

use rtos_ft::prelude::*;
use rtos_ft::{FaultRecord, HISTORY_CAPACITY, KindSnapshot};
use rtos_ft_test_helpers::prelude::*;

#[test]
fn test_history_keeps_newest_records() -> FtResult<()> {
    let rig = TestRig::new();
    let handler = CountingHandler::new(RecoveryResult::Recovered);
    let ft = FaultTolerance::new(FtConfig::permissive(), rig.platform());
    ft.init()?;
    ft.register_handler(FaultKind::CommCrcError, &handler)?;

    let total = u32::try_from(HISTORY_CAPACITY).unwrap_or(u32::MAX) + 8;
    for code in 0..total {
        ft.report_fault(&crc_event(Duration::ZERO).with_code(code));
    }

    let records = ft.history().to_vec();
    assert_eq!(records.len(), HISTORY_CAPACITY);
    let codes: Vec<u32> = records.iter().map(|r| r.code).collect();
    let expected: Vec<u32> = (8..total).collect();
    assert_eq!(codes, expected);
    assert_eq!(ft.history().last().map(|r| r.code), Some(total - 1));
    Ok(())
}

#[test]
fn test_history_latency_uses_platform_clock() -> FtResult<()> {
    let rig = TestRig::new();
    let handler = CountingHandler::new(RecoveryResult::Failed);
    let ft = FaultTolerance::new(FtConfig::permissive(), rig.platform());
    ft.init()?;
    ft.register_handler(FaultKind::PeripheralTimeout, &handler)?;

    rig.clock.set(Duration::from_millis(250));
    ft.report_fault(&timeout_event(Duration::from_millis(200)));

    let record = must_some(ft.history().last(), "no history record");
    assert_eq!(record.resolved_at, Duration::from_millis(250));
    assert_eq!(record.latency(), Duration::from_millis(50));
    assert_eq!(record.reporter, Reporter::Thread(5));
    assert_eq!(record.disposition, Disposition::Failed);
    Ok(())
}

#[test]
fn test_history_iterates_oldest_first() -> FtResult<()> {
    let rig = TestRig::new();
    let handler = CountingHandler::new(RecoveryResult::Retry);
    let ft = FaultTolerance::new(FtConfig::permissive(), rig.platform());
    ft.init()?;
    ft.register_handler(FaultKind::AppAssert, &handler)?;

    for line in [3u32, 1, 2] {
        ft.report_fault(&assert_event(Duration::ZERO).with_code(line));
    }
    let mut codes = Vec::new();
    ft.history().for_each_oldest_first(|r| codes.push(r.code));
    assert_eq!(codes, vec![3, 1, 2]);

    ft.history().clear();
    assert!(ft.history().is_empty());
    assert_eq!(ft.history().last(), None);
    Ok(())
}

#[test]
fn test_totals_sum_every_kind() -> FtResult<()> {
    let rig = TestRig::new();
    let recover = CountingHandler::new(RecoveryResult::Recovered);
    let fail = CountingHandler::new(RecoveryResult::Failed);
    let config = FtConfig::builder()
        .initially_enabled(KindSet::ALL.without(FaultKind::WatchdogBark))
        .build()?;
    let ft = FaultTolerance::new(config, rig.platform());
    ft.init()?;
    ft.register_handler(FaultKind::AppAssert, &recover)?;
    ft.register_handler(FaultKind::CommCrcError, &fail)?;

    ft.report_fault(&assert_event(Duration::ZERO));
    ft.report_fault(&assert_event(Duration::ZERO));
    ft.report_fault(&crc_event(Duration::ZERO));
    ft.report_fault(&event(FaultKind::WatchdogBark));
    ft.report_fault(&event(FaultKind::DeadlockDetected));

    assert_eq!(
        ft.stats().totals(),
        KindSnapshot {
            reported: 5,
            gated: 1,
            unhandled: 1,
            dispatched: 3,
            recovered: 2,
            failed: 1,
            ..KindSnapshot::default()
        }
    );
    assert_eq!(ft.stats().snapshot(FaultKind::AppAssert).recovered, 2);
    assert_eq!(ft.stats().snapshot(FaultKind::HardFault), KindSnapshot::default());

    ft.stats().reset();
    assert_eq!(ft.stats().totals(), KindSnapshot::default());
    Ok(())
}

#[test]
fn test_reboot_and_suppression_are_counted() -> FtResult<()> {
    let rig = TestRig::new();
    let reboot = CountingHandler::new(RecoveryResult::RebootRequired);
    let ft = FaultTolerance::new(FtConfig::permissive(), rig.platform());
    ft.init()?;
    ft.register_handler(FaultKind::PowerBrownout, &reboot)?;

    ft.report_fault(&brownout_event(Duration::ZERO));
    ft.report_fault(&brownout_event(Duration::ZERO));
    ft.report_fault(&event(FaultKind::AppAssert));

    let brownout = ft.stats().snapshot(FaultKind::PowerBrownout);
    assert_eq!(brownout.reboots, 1);
    assert_eq!(brownout.suppressed, 1);
    assert_eq!(ft.stats().snapshot(FaultKind::AppAssert).suppressed, 1);
    // Suppressed reports are not kept in the ring.
    assert_eq!(ft.history().len(), 1);
    Ok(())
}

#[cfg(feature = "serde")]
mod serde_tests {
    use super::*;

    #[test]
    fn test_snapshot_serializes_with_field_names() -> Result<(), serde_json::Error> {
        let snapshot = KindSnapshot {
            reported: 4,
            recovered: 3,
            unhandled: 1,
            ..KindSnapshot::default()
        };
        let json = serde_json::to_value(snapshot)?;
        assert_eq!(json.get("reported"), Some(&serde_json::json!(4)));
        assert_eq!(json.get("recovered"), Some(&serde_json::json!(3)));
        assert_eq!(json.get("nesting_breaches"), Some(&serde_json::json!(0)));
        Ok(())
    }

    #[test]
    fn test_fault_record_survives_json() -> Result<(), Box<dyn std::error::Error>> {
        let record = FaultRecord::new(
            &brownout_event(Duration::from_millis(12)),
            Disposition::RebootPending,
            Duration::from_millis(13),
        );
        let text = serde_json::to_string(&record)?;
        let back: FaultRecord = serde_json::from_str(&text)?;
        assert_eq!(back, record);
        Ok(())
    }

    #[test]
    fn test_config_serializes() -> Result<(), Box<dyn std::error::Error>> {
        let config = FtConfig::strict();
        let text = serde_json::to_string(&config)?;
        let back: FtConfig = serde_json::from_str(&text)?;
        assert_eq!(back, config);
        assert_eq!(back.validate(), Ok(()));
        Ok(())
    }
}
