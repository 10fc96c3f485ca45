//! Racing installs of the process-wide instance.
//!
//! Installation is process-global, so this binary holds a single test.

use std::thread;

use rtos_ft::global;
use rtos_ft::prelude::*;
use rtos_ft_test_helpers::prelude::*;

static RIG: TestRig = TestRig::new();
static FT: FaultTolerance<'static> = FaultTolerance::new(FtConfig::DEFAULT, RIG.platform());
static CRC: CountingHandler = CountingHandler::new(RecoveryResult::Recovered);

#[test]
fn test_racing_installs_never_reinitialize() -> FtResult<()> {
    let outcomes: Vec<FtResult<()>> = thread::scope(|scope| {
        let racers: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| global::install(&FT)))
            .collect();
        racers.into_iter().map(|racer| must(racer.join())).collect()
    });
    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .filter_map(|o| o.err())
            .all(|e| e == FtError::AlreadyInstalled)
    );

    global::register_handler(FaultKind::CommCrcError, &CRC)?;
    global::enable_detection(FaultKind::CommCrcError)?;

    // Late installs of the live instance leave its handlers and gate alone.
    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| assert_eq!(global::install(&FT), Err(FtError::AlreadyInstalled)));
        }
    });
    assert!(global::is_armed(FaultKind::CommCrcError));
    assert_eq!(
        global::report_fault(&crc_event(std::time::Duration::ZERO)),
        Disposition::Recovered
    );
    assert_eq!(CRC.calls(), 1);
    Ok(())
}
