//! Fault detection, classification and recovery dispatch for an RTOS.
//!
//! Drivers, interrupt handlers and application code report faults through a
//! single synchronous entry point. Each report is classified by kind,
//! gated by a per-kind enable bit, routed to at most one recovery handler,
//! and the handler's verdict decides whether the system continues, retries
//! or must reset.
//!
//! # Architecture
//!
//! - **Taxonomy**: [`FaultKind`], [`Severity`], [`Domain`] and their string
//!   forms
//! - **Events**: [`FaultEvent`] with a typed [`FaultContext`] payload
//! - **Registry**: one [`FaultHandler`] per kind, fixed size
//! - **Detection gate**: lock-free per-kind enable bits
//! - **Reporter**: [`FaultTolerance::report_fault`]
//! - **Dispatcher**: verdict interpretation and the deferred reset
//!
//! # RT-Safety
//!
//! The report path is callable from interrupt context:
//! - No heap allocations
//! - No blocking operations
//! - Critical sections only copy a table slot in or out
//! - Nested reports from inside a handler are bounded per execution context
//!
//! # State Machine
//!
//! ```text
//! ┌─────────────┐  handler starts   ┌─────────────┐
//! │   Normal    │──────────────────►│  Handling   │
//! │             │◄──────────────────│             │
//! └──────┬──────┘  Recovered /      └──────┬──────┘
//!        │         Failed / Retry          │
//!        │ RebootRequired, invalid verdict, nesting limit
//!        ▼                                 ▼
//! ┌─────────────────────────────────────────────┐
//! │               RebootPending                 │
//! │  reports are logged, never dispatched;      │
//! │  service_pending_reboot() resets once       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use rtos_ft::prelude::*;
//!
//! fn on_assert(event: &FaultEvent<'_>) -> RecoveryResult {
//!     match event.context.as_assert() {
//!         Some(ctx) if ctx.condition == "len <= cap" => RecoveryResult::Failed,
//!         _ => RecoveryResult::RebootRequired,
//!     }
//! }
//!
//! let ft = FaultTolerance::new(FtConfig::DEFAULT, Platform::host());
//! ft.init()?;
//! ft.register_handler(FaultKind::AppAssert, &on_assert)?;
//! ft.enable_detection(FaultKind::AppAssert);
//!
//! let event = FaultEvent::new(FaultKind::AppAssert, ft.now()).with_context(AssertContext {
//!     file: "buf.c",
//!     line: 42,
//!     function: "push",
//!     condition: "len <= cap",
//!     message: "overflow",
//! });
//! assert_eq!(ft.report_fault(&event), Disposition::Failed);
//! assert!(!ft.is_reboot_pending());
//! # Ok::<(), FtError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod config;
mod context;
mod dispatcher;
mod error;
mod event;
mod gate;
mod handler;
mod history;
mod nesting;
mod platform;
mod recovery;
mod registry;
mod stats;
mod system;
mod taxonomy;

pub mod global;
pub mod prelude;

pub use config::{FtConfig, FtConfigBuilder, MAX_NESTING_DEPTH, MAX_PRE_REBOOT_HOOKS};
pub use context::{
    AssertContext, BrownoutContext, CrcContext, FaultContext, MemoryContext, TimeoutContext,
};
pub use dispatcher::{DispatchState, DispatcherState, RebootCause};
pub use error::{FtError, FtResult};
pub use event::{FaultEvent, Reporter};
pub use gate::DetectionGate;
pub use handler::{FaultHandler, HandlerRef, PreRebootHook, RawFaultHandler, Verdict};
pub use history::{FaultHistory, FaultRecord, HISTORY_CAPACITY};
pub use nesting::{MAX_TRACKED_CONTEXTS, NestingExceeded, NestingGuard, NestingTracker};
#[cfg(feature = "std")]
pub use platform::{StdClock, ThreadContext};
pub use platform::{
    ContextDump, ContextId, ContextSource, FaultSink, LogOnlyReset, LogRecord, MonotonicClock,
    Platform, ResetController, SingleContext, Stage, TracingSink, severity_level,
};
pub use recovery::{Disposition, RecoveryResult};
pub use registry::{DuplicatePolicy, HandlerRegistry, Registration};
pub use stats::{FaultStats, KindSnapshot};
pub use system::FaultTolerance;
pub use taxonomy::{
    Domain, FaultKind, KindSet, Severity, UNKNOWN, kind_to_string, severity_to_string,
};

#[cfg(all(test, feature = "std"))]
mod tests;
