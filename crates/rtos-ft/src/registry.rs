//! Handler registry: one recovery handler slot per fault kind.
//!
//! The table is a fixed array sized to the taxonomy. Every access takes one
//! short critical section that only copies a slot in or out; no lock is ever
//! held while a handler runs.

use core::cell::Cell;

use critical_section::Mutex;

use crate::{FaultHandler, FaultKind, FtError, FtResult, HandlerRef, RawFaultHandler};

/// What to do when a kind already has a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DuplicatePolicy {
    /// Last registration wins.
    #[default]
    Replace,
    /// Keep the existing handler and return `AlreadyRegistered`.
    Reject,
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The slot was empty.
    Installed,
    /// An existing handler was overwritten.
    Replaced,
}

type Slots<'h> = [Option<HandlerRef<'h>>; FaultKind::COUNT];

/// Fixed-size handler table.
pub struct HandlerRegistry<'h> {
    slots: Mutex<Cell<Slots<'h>>>,
}

impl<'h> HandlerRegistry<'h> {
    /// Empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(Cell::new([None; FaultKind::COUNT])),
        }
    }

    /// Install a typed handler for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`FtError::AlreadyRegistered`] if `policy` is `Reject` and the
    /// slot is taken.
    pub fn register(
        &self,
        kind: FaultKind,
        handler: &'h dyn FaultHandler,
        policy: DuplicatePolicy,
    ) -> FtResult<Registration> {
        self.store(kind, HandlerRef::Typed(handler), policy)
    }

    /// Install a raw-verdict handler for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`FtError::AlreadyRegistered`] if `policy` is `Reject` and the
    /// slot is taken.
    pub fn register_raw(
        &self,
        kind: FaultKind,
        handler: &'h dyn RawFaultHandler,
        policy: DuplicatePolicy,
    ) -> FtResult<Registration> {
        self.store(kind, HandlerRef::Raw(handler), policy)
    }

    fn store(
        &self,
        kind: FaultKind,
        handler: HandlerRef<'h>,
        policy: DuplicatePolicy,
    ) -> FtResult<Registration> {
        critical_section::with(|cs| {
            let cell = self.slots.borrow(cs);
            let mut slots = cell.get();
            let slot = slots
                .get_mut(kind.index())
                .ok_or(FtError::UnknownKind(kind.to_raw()))?;
            let outcome = match (slot.is_some(), policy) {
                (true, DuplicatePolicy::Reject) => return Err(FtError::AlreadyRegistered(kind)),
                (true, DuplicatePolicy::Replace) => Registration::Replaced,
                (false, _) => Registration::Installed,
            };
            *slot = Some(handler);
            cell.set(slots);
            Ok(outcome)
        })
    }

    /// Remove the handler for `kind`. Returns true if one was installed.
    pub fn unregister(&self, kind: FaultKind) -> bool {
        critical_section::with(|cs| {
            let cell = self.slots.borrow(cs);
            let mut slots = cell.get();
            let removed = slots
                .get_mut(kind.index())
                .and_then(Option::take)
                .is_some();
            cell.set(slots);
            removed
        })
    }

    /// Handler for `kind`, if any.
    #[must_use]
    pub fn lookup(&self, kind: FaultKind) -> Option<HandlerRef<'h>> {
        critical_section::with(|cs| {
            let cell: &Cell<[Option<HandlerRef<'h>>]> = self.slots.borrow(cs);
            cell.as_slice_of_cells()
                .get(kind.index())
                .and_then(Cell::get)
        })
    }

    /// True if `kind` has a handler.
    #[must_use]
    pub fn contains(&self, kind: FaultKind) -> bool {
        self.lookup(kind).is_some()
    }

    /// Number of kinds with a handler.
    #[must_use]
    pub fn len(&self) -> usize {
        critical_section::with(|cs| {
            self.slots
                .borrow(cs)
                .get()
                .iter()
                .filter(|slot| slot.is_some())
                .count()
        })
    }

    /// True if no handler is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every handler.
    pub fn clear(&self) {
        critical_section::with(|cs| self.slots.borrow(cs).set([None; FaultKind::COUNT]));
    }
}

impl Default for HandlerRegistry<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for HandlerRegistry<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("installed", &self.len())
            .finish()
    }
}
