//! Convenience re-exports for common test utilities.
//!
//! ```rust,ignore
//! use rtos_ft_test_helpers::prelude::*;
//! ```

pub use crate::fixtures::{
    ASSERT_CONTEXT, BROWNOUT_CONTEXT, CRC_CONTEXT, MEMORY_CONTEXT, TIMEOUT_CONTEXT,
    assert_event, brownout_event, crc_event, event, memory_event, timeout_event,
};
pub use crate::must::{must, must_err, must_some};

#[cfg(feature = "tracking")]
pub use crate::tracking::{AllocationGuard, AllocationReport, track};

#[cfg(feature = "mock")]
pub use crate::mock::{
    CountingHandler, CountingHook, CountingReset, CountingSink, ManualClock, RawWordHandler,
    RecordingHandler, RecordingSink, ScriptedHandler, SeenAssert, SeenEvent, SinkEntry, TestRig,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
