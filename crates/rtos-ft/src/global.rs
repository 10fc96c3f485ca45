//! Process-wide instance accessor.
//!
//! Producers that cannot be handed a [`FaultTolerance`] reference, such as
//! interrupt handlers and drivers, report through the instance installed
//! here. Installation happens once at boot.
//!
//! ```rust
//! use rtos_ft::prelude::*;
//! use rtos_ft::global;
//!
//! static FT: FaultTolerance<'static> = FaultTolerance::new(FtConfig::DEFAULT, Platform::host());
//!
//! global::install(&FT)?;
//! global::enable_detection(FaultKind::HardFault)?;
//!
//! let event = FaultEvent::new(FaultKind::HardFault, FT.now());
//! let outcome = global::report_fault(&event);
//! assert!(outcome.needs_fallback());
//! # Ok::<(), FtError>(())
//! ```

use core::cell::Cell;

use critical_section::Mutex;

use crate::{
    Disposition, FaultEvent, FaultHandler, FaultKind, FaultTolerance, FtError, FtResult,
    RawFaultHandler,
};

static INSTANCE: Mutex<Cell<Option<&'static FaultTolerance<'static>>>> =
    Mutex::new(Cell::new(None));

/// Make `ft` the process-wide instance, then initialize it.
///
/// The slot is claimed before `init` runs, so a racing second call can never
/// re-initialize an instance that is already live.
///
/// # Errors
///
/// Returns [`FtError::AlreadyInstalled`] if an instance is already
/// installed, or the error from [`FaultTolerance::init`], in which case the
/// slot is released again.
pub fn install(ft: &'static FaultTolerance<'static>) -> FtResult<()> {
    critical_section::with(|cs| {
        let cell = INSTANCE.borrow(cs);
        if cell.get().is_some() {
            return Err(FtError::AlreadyInstalled);
        }
        cell.set(Some(ft));
        Ok(())
    })?;
    if let Err(e) = ft.init() {
        critical_section::with(|cs| INSTANCE.borrow(cs).set(None));
        return Err(e);
    }
    Ok(())
}

/// The installed instance, if any.
#[must_use]
pub fn instance() -> Option<&'static FaultTolerance<'static>> {
    critical_section::with(|cs| INSTANCE.borrow(cs).get())
}

/// The installed instance.
///
/// # Errors
///
/// Returns [`FtError::NotInstalled`] before [`install`].
pub fn try_instance() -> FtResult<&'static FaultTolerance<'static>> {
    instance().ok_or(FtError::NotInstalled)
}

/// Report through the installed instance.
///
/// Before installation nothing can be dispatched, so the event resolves to
/// `Unhandled` at its own severity.
pub fn report_fault(event: &FaultEvent<'_>) -> Disposition {
    match instance() {
        Some(ft) => ft.report_fault(event),
        None => {
            tracing::warn!(
                kind = event.kind.as_str(),
                severity = event.severity.as_str(),
                "Fault reported before fault tolerance was installed"
            );
            Disposition::Unhandled {
                severity: event.severity,
            }
        }
    }
}

/// Register a handler on the installed instance.
///
/// # Errors
///
/// Returns [`FtError::NotInstalled`] before [`install`], otherwise as
/// [`FaultTolerance::register_handler`].
pub fn register_handler(kind: FaultKind, handler: &'static dyn FaultHandler) -> FtResult<()> {
    try_instance()?.register_handler(kind, handler)
}

/// Register a raw-verdict handler on the installed instance.
///
/// # Errors
///
/// Returns [`FtError::NotInstalled`] before [`install`], otherwise as
/// [`FaultTolerance::register_raw_handler`].
pub fn register_raw_handler(
    kind: FaultKind,
    handler: &'static dyn RawFaultHandler,
) -> FtResult<()> {
    try_instance()?.register_raw_handler(kind, handler)
}

/// Enable detection on the installed instance.
///
/// # Errors
///
/// Returns [`FtError::NotInstalled`] before [`install`].
pub fn enable_detection(kind: FaultKind) -> FtResult<bool> {
    Ok(try_instance()?.enable_detection(kind))
}

/// Disable detection on the installed instance.
///
/// # Errors
///
/// Returns [`FtError::NotInstalled`] before [`install`].
pub fn disable_detection(kind: FaultKind) -> FtResult<bool> {
    Ok(try_instance()?.disable_detection(kind))
}

/// True if a report of `kind` would reach a handler right now.
#[must_use]
pub fn is_armed(kind: FaultKind) -> bool {
    instance().is_some_and(|ft| ft.is_detection_enabled(kind) && ft.has_handler(kind))
}
