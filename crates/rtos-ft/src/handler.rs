//! Recovery handler and pre-reboot hook capabilities.

use core::fmt;

use crate::{FaultEvent, RebootCause, RecoveryResult};

/// Domain-specific recovery logic for one fault kind.
///
/// Runs synchronously in the reporting context, which may be an interrupt
/// handler: implementations must not block and must bound their run time.
/// The event borrow ends when `handle` returns.
pub trait FaultHandler: Sync {
    /// Attempt recovery and return a verdict.
    fn handle(&self, event: &FaultEvent<'_>) -> RecoveryResult;
}

impl<F> FaultHandler for F
where
    F: Fn(&FaultEvent<'_>) -> RecoveryResult + Sync,
{
    fn handle(&self, event: &FaultEvent<'_>) -> RecoveryResult {
        self(event)
    }
}

/// Handler that answers with an undecoded verdict word, as handlers bridged
/// from C do. Words that do not decode are treated as `RebootRequired`.
pub trait RawFaultHandler: Sync {
    /// Attempt recovery and return a raw verdict.
    fn handle_raw(&self, event: &FaultEvent<'_>) -> u32;
}

impl<F> RawFaultHandler for F
where
    F: Fn(&FaultEvent<'_>) -> u32 + Sync,
{
    fn handle_raw(&self, event: &FaultEvent<'_>) -> u32 {
        self(event)
    }
}

/// Registry slot contents.
#[derive(Clone, Copy)]
pub enum HandlerRef<'h> {
    /// Handler returning a typed verdict.
    Typed(&'h dyn FaultHandler),
    /// Handler returning a raw verdict word.
    Raw(&'h dyn RawFaultHandler),
}

/// Verdict as produced by a handler, before the dispatcher interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Well-formed verdict.
    Valid(RecoveryResult),
    /// Raw word outside the verdict encoding.
    Invalid(u32),
}

impl Verdict {
    /// Decode a raw verdict word.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        match RecoveryResult::from_raw(raw) {
            Some(result) => Self::Valid(result),
            None => Self::Invalid(raw),
        }
    }

    /// Verdict the dispatcher acts on. Invalid words resolve to
    /// `RebootRequired`, never to `Recovered`.
    #[must_use]
    pub const fn resolve(self) -> RecoveryResult {
        match self {
            Self::Valid(result) => result,
            Self::Invalid(_) => RecoveryResult::RebootRequired,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid(result) => fmt::Display::fmt(result, f),
            Self::Invalid(raw) => write!(f, "INVALID({raw:#x})"),
        }
    }
}

impl HandlerRef<'_> {
    /// Run the handler.
    pub fn invoke(self, event: &FaultEvent<'_>) -> Verdict {
        match self {
            Self::Typed(handler) => Verdict::Valid(handler.handle(event)),
            Self::Raw(handler) => Verdict::from_raw(handler.handle_raw(event)),
        }
    }

    /// True for raw handlers.
    #[must_use]
    pub const fn is_raw(self) -> bool {
        matches!(self, Self::Raw(_))
    }
}

impl fmt::Debug for HandlerRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Typed(_) => f.write_str("HandlerRef::Typed"),
            Self::Raw(_) => f.write_str("HandlerRef::Raw"),
        }
    }
}

/// Work that must finish before the reset primitive runs, such as flushing
/// logs or persisting state. Called from thread level.
pub trait PreRebootHook: Sync {
    /// Prepare for the reset.
    fn before_reboot(&self, cause: RebootCause);
}

impl<F> PreRebootHook for F
where
    F: Fn(RebootCause) + Sync,
{
    fn before_reboot(&self, cause: RebootCause) {
        self(cause);
    }
}
