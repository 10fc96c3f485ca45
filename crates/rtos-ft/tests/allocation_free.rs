//! The report path must not allocate: it runs in interrupt context on
//! targets without a heap.

use std::time::Duration;

use rtos_ft::prelude::*;
use rtos_ft_test_helpers::assert_no_alloc;
use rtos_ft_test_helpers::prelude::*;
use rtos_ft_test_helpers::tracking::TrackingAllocator;

#[global_allocator]
static ALLOC: TrackingAllocator = TrackingAllocator;

static CLOCK: ManualClock = ManualClock::new();
static SINK: CountingSink = CountingSink::new();
static RESET: CountingReset = CountingReset::new();

fn quiet_platform() -> Platform<'static> {
    Platform::new(&CLOCK, &SINK, &RESET)
}

#[test]
fn test_dispatch_path_does_not_allocate() -> FtResult<()> {
    let handler = CountingHandler::new(RecoveryResult::Recovered);
    let ft = FaultTolerance::new(FtConfig::permissive(), quiet_platform());
    ft.init()?;
    ft.register_handler(FaultKind::CommCrcError, &handler)?;
    let event = crc_event(Duration::from_millis(1));
    // Warm up lazily initialised thread state.
    ft.report_fault(&event);

    let guard = track();
    for _ in 0..64 {
        ft.report_fault(&event);
    }
    assert_no_alloc!(guard, "report_fault dispatch");
    drop(guard);

    assert_eq!(handler.calls(), 65);
    Ok(())
}

#[test]
fn test_undispatched_paths_do_not_allocate() -> FtResult<()> {
    let ft = FaultTolerance::new(FtConfig::DEFAULT, quiet_platform());
    ft.init()?;
    ft.enable_detection(FaultKind::PeripheralTimeout);
    let gated = event(FaultKind::HardFault);
    let unhandled = timeout_event(Duration::ZERO);
    ft.report_fault(&gated);

    let guard = track();
    let first = ft.report_fault(&gated);
    let second = ft.report_fault(&unhandled);
    assert_no_alloc!(guard, "report_fault gated/unhandled");
    drop(guard);

    assert_eq!(first, Disposition::Gated);
    assert!(second.is_undispatched());
    Ok(())
}

#[test]
fn test_reboot_path_does_not_allocate() -> FtResult<()> {
    let reboot = CountingHandler::new(RecoveryResult::RebootRequired);
    let raw = RawWordHandler::new(0xFFFF_FFFF);
    let ft = FaultTolerance::new(FtConfig::permissive(), quiet_platform());
    ft.init()?;
    ft.register_handler(FaultKind::PowerBrownout, &reboot)?;
    ft.register_raw_handler(FaultKind::MemoryCorruption, &raw)?;
    let brownout = brownout_event(Duration::ZERO);
    let corrupt = memory_event(Duration::ZERO);

    let guard = track();
    let first = ft.report_fault(&brownout);
    let second = ft.report_fault(&corrupt);
    assert_no_alloc!(guard, "report_fault reboot");
    drop(guard);

    assert_eq!(first, Disposition::RebootPending);
    assert_eq!(second, Disposition::Suppressed);
    Ok(())
}
