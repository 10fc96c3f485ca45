//! Process-wide instance installed once at boot.
//!
//! Installation is process-global, so the whole lifecycle runs as one test.

use std::time::Duration;

use rtos_ft::global;
use rtos_ft::prelude::*;
use rtos_ft_test_helpers::prelude::*;

static RIG: TestRig = TestRig::new();
static FT: FaultTolerance<'static> = FaultTolerance::new(FtConfig::DEFAULT, RIG.platform());
static OTHER: FaultTolerance<'static> = FaultTolerance::new(FtConfig::DEFAULT, RIG.platform());
static ASSERTS: RecordingHandler = RecordingHandler::new(RecoveryResult::Failed);
static GARBAGE: RawWordHandler = RawWordHandler::new(42);

#[test]
fn test_global_instance_lifecycle() -> FtResult<()> {
    // Before install nothing is dispatched.
    assert_eq!(global::try_instance().err(), Some(FtError::NotInstalled));
    assert_eq!(
        global::register_handler(FaultKind::AppAssert, &ASSERTS),
        Err(FtError::NotInstalled)
    );
    assert_eq!(
        global::enable_detection(FaultKind::AppAssert),
        Err(FtError::NotInstalled)
    );
    assert_eq!(
        global::report_fault(&assert_event(Duration::ZERO)),
        Disposition::Unhandled {
            severity: Severity::Error
        }
    );
    assert!(!global::is_armed(FaultKind::AppAssert));

    global::install(&FT)?;
    assert_eq!(global::install(&OTHER), Err(FtError::AlreadyInstalled));
    assert_eq!(global::install(&FT), Err(FtError::AlreadyInstalled));
    assert!(global::instance().is_some_and(|ft| std::ptr::eq(ft, &FT)));

    global::register_handler(FaultKind::AppAssert, &ASSERTS)?;
    assert!(!global::is_armed(FaultKind::AppAssert));
    assert_eq!(global::enable_detection(FaultKind::AppAssert), Ok(true));
    assert!(global::is_armed(FaultKind::AppAssert));

    assert_eq!(
        global::report_fault(&assert_event(Duration::from_millis(8))),
        Disposition::Failed
    );
    assert_eq!(ASSERTS.calls(), 1);

    assert_eq!(global::disable_detection(FaultKind::AppAssert), Ok(true));
    assert_eq!(
        global::report_fault(&assert_event(Duration::ZERO)),
        Disposition::Gated
    );
    assert_eq!(ASSERTS.calls(), 1);

    global::register_raw_handler(FaultKind::HardFault, &GARBAGE)?;
    global::enable_detection(FaultKind::HardFault)?;
    assert_eq!(
        global::report_fault(&event(FaultKind::HardFault)),
        Disposition::RebootPending
    );
    assert_eq!(GARBAGE.calls(), 1);
    assert_eq!(
        global::try_instance()?.service_pending_reboot(),
        Some(RebootCause::InvalidVerdict(FaultKind::HardFault))
    );
    assert_eq!(RIG.reset.resets(), 1);
    Ok(())
}
