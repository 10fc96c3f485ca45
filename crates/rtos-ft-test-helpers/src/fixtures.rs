//! Ready-made fault events for the calibration scenarios.
//!
//! Each fixture mirrors what a real producer would report: an assertion
//! from application code, a CRC mismatch from a serial driver, a supply
//! brownout from the power monitor and a peripheral timeout from a bus
//! driver.

use std::time::Duration;

use rtos_ft::{
    AssertContext, BrownoutContext, CrcContext, Domain, FaultEvent, FaultKind, MemoryContext,
    Reporter, Severity, TimeoutContext,
};

pub const ASSERT_CONTEXT: AssertContext<'static> = AssertContext {
    file: "src/main.c",
    line: 42,
    function: "process_frame",
    condition: "frame->len <= FRAME_MAX",
    message: "frame length out of range",
};

pub const CRC_CONTEXT: CrcContext<'static> = CrcContext {
    protocol: "uart1",
    expected: 0xA5A5_1234,
    received: 0xA5A5_0000,
    packet_id: 17,
    size: 64,
};

pub const BROWNOUT_CONTEXT: BrownoutContext<'static> = BrownoutContext {
    rail: "VDD_MAIN",
    voltage_mv: 2_710,
    threshold_mv: 2_900,
};

pub const TIMEOUT_CONTEXT: TimeoutContext<'static> = TimeoutContext {
    peripheral: "i2c0",
    operation: "read",
    timeout_ms: 50,
    elapsed_ms: 75,
};

pub const MEMORY_CONTEXT: MemoryContext<'static> = MemoryContext {
    region: "heap",
    address: 0x2000_1F00,
    expected: 0xDEAD_BEEF,
    actual: 0xDEAD_0000,
};

/// Application assertion failure, severity `Error`.
pub fn assert_event(timestamp: Duration) -> FaultEvent<'static> {
    FaultEvent::new(FaultKind::AppAssert, timestamp)
        .with_severity(Severity::Error)
        .with_domain(Domain::Application)
        .with_code(0x0000_A55E)
        .with_reporter(Reporter::Thread(1))
        .with_context(ASSERT_CONTEXT)
}

/// CRC mismatch on a serial link, reported from its interrupt handler.
pub fn crc_event(timestamp: Duration) -> FaultEvent<'static> {
    FaultEvent::new(FaultKind::CommCrcError, timestamp)
        .with_severity(Severity::Warning)
        .with_domain(Domain::Communication)
        .with_code(0x0000_0C2C)
        .with_reporter(Reporter::Interrupt(37))
        .with_context(CRC_CONTEXT)
}

/// Supply rail below its brownout threshold.
pub fn brownout_event(timestamp: Duration) -> FaultEvent<'static> {
    FaultEvent::new(FaultKind::PowerBrownout, timestamp)
        .with_severity(Severity::Critical)
        .with_domain(Domain::Power)
        .with_code(0x0000_B0D0)
        .with_reporter(Reporter::Interrupt(3))
        .with_context(BROWNOUT_CONTEXT)
}

/// Bus transaction that overran its timeout.
pub fn timeout_event(timestamp: Duration) -> FaultEvent<'static> {
    FaultEvent::new(FaultKind::PeripheralTimeout, timestamp)
        .with_severity(Severity::Error)
        .with_domain(Domain::Hardware)
        .with_code(0x0000_7140)
        .with_reporter(Reporter::Thread(5))
        .with_context(TIMEOUT_CONTEXT)
}

/// Integrity check failure in a RAM region.
pub fn memory_event(timestamp: Duration) -> FaultEvent<'static> {
    FaultEvent::new(FaultKind::MemoryCorruption, timestamp)
        .with_reporter(Reporter::Thread(0))
        .with_context(MEMORY_CONTEXT)
}

/// Bare event of `kind` with its default severity and domain.
pub fn event(kind: FaultKind) -> FaultEvent<'static> {
    FaultEvent::new(kind, Duration::ZERO)
}
