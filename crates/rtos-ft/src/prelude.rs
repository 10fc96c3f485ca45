//! Prelude for convenient imports.
//!
//! This module re-exports the types needed to register handlers and report
//! faults.
//!
//! # Example
//!
//! ```rust
//! use rtos_ft::prelude::*;
//! ```

#[cfg(feature = "std")]
pub use crate::{StdClock, ThreadContext};
pub use crate::{
    AssertContext, BrownoutContext, ContextId, ContextSource, CrcContext, DispatchState,
    Disposition, Domain,
    DuplicatePolicy, FaultContext, FaultEvent, FaultHandler, FaultKind, FaultSink,
    FaultTolerance, FtConfig, FtError, FtResult, KindSet, MemoryContext, MonotonicClock,
    Platform, PreRebootHook, RawFaultHandler, RebootCause, RecoveryResult, Reporter,
    ResetController, Severity, TimeoutContext, TracingSink,
};
