//! Per-context nesting guard for reports made from inside a handler.
//!
//! Each execution context claims a slot keyed by its [`ContextId`]. Only the
//! owning context touches a claimed slot, so depth updates never race and
//! reports running in parallel in other contexts never count as nesting.
//! When every slot is held, further contexts run untracked: their reports
//! are dispatched without a depth bound and counted in
//! [`NestingTracker::untracked_entries`].

use portable_atomic::{AtomicU32, AtomicU64, Ordering};

use crate::ContextId;

/// Contexts that can be inside a handler at the same time with their own
/// depth.
pub const MAX_TRACKED_CONTEXTS: usize = 16;

const FREE: u64 = 0;

#[derive(Debug)]
struct DepthSlot {
    owner: AtomicU64,
    depth: AtomicU32,
}

impl DepthSlot {
    const fn new() -> Self {
        Self {
            owner: AtomicU64::new(FREE),
            depth: AtomicU32::new(0),
        }
    }
}

/// Depth table for all reporting contexts.
#[derive(Debug)]
pub struct NestingTracker {
    slots: [DepthSlot; MAX_TRACKED_CONTEXTS],
    untracked: AtomicU32,
}

/// The depth bound was exceeded. Carries the depth the call would have had.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestingExceeded {
    /// Depth including the rejected call.
    pub depth: u32,
}

impl NestingTracker {
    /// Empty tracker.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [const { DepthSlot::new() }; MAX_TRACKED_CONTEXTS],
            untracked: AtomicU32::new(0),
        }
    }

    /// Enter one level for `context`.
    ///
    /// # Errors
    ///
    /// Returns [`NestingExceeded`] if the context already has `limit` levels
    /// active; the depth is left unchanged in that case.
    pub fn enter(
        &self,
        context: ContextId,
        limit: u32,
    ) -> Result<NestingGuard<'_>, NestingExceeded> {
        let Some(slot) = self.slot_for(context.key()) else {
            self.untracked.fetch_add(1, Ordering::Relaxed);
            return Ok(NestingGuard { slot: None });
        };
        let depth = slot.depth.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        let guard = NestingGuard { slot: Some(slot) };
        if depth > limit {
            drop(guard);
            return Err(NestingExceeded { depth });
        }
        Ok(guard)
    }

    /// Current depth for `context`.
    #[must_use]
    pub fn depth(&self, context: ContextId) -> u32 {
        let key = context.key();
        self.slots
            .iter()
            .find(|slot| slot.owner.load(Ordering::Acquire) == key)
            .map_or(0, |slot| slot.depth.load(Ordering::Acquire))
    }

    /// Contexts currently holding a slot.
    #[must_use]
    pub fn tracked_contexts(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.owner.load(Ordering::Acquire) != FREE)
            .count()
    }

    /// Entries that found every slot held and ran without a depth bound.
    #[must_use]
    pub fn untracked_entries(&self) -> u32 {
        self.untracked.load(Ordering::Relaxed)
    }

    fn slot_for(&self, key: u64) -> Option<&DepthSlot> {
        if let Some(slot) = self
            .slots
            .iter()
            .find(|slot| slot.owner.load(Ordering::Acquire) == key)
        {
            return Some(slot);
        }
        self.slots.iter().find(|slot| {
            slot.owner
                .compare_exchange(FREE, key, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        })
    }

    /// Release every slot.
    pub fn reset(&self) {
        for slot in &self.slots {
            slot.depth.store(0, Ordering::Release);
            slot.owner.store(FREE, Ordering::Release);
        }
        self.untracked.store(0, Ordering::Relaxed);
    }
}

impl Default for NestingTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// One active nesting level; leaving is done on drop.
#[derive(Debug)]
pub struct NestingGuard<'a> {
    slot: Option<&'a DepthSlot>,
}

impl NestingGuard<'_> {
    /// Depth of the owning context while this guard is alive. Zero for an
    /// untracked entry.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.slot
            .map_or(0, |slot| slot.depth.load(Ordering::Acquire))
    }

    /// False if the entry found no free slot.
    #[must_use]
    pub fn is_tracked(&self) -> bool {
        self.slot.is_some()
    }
}

impl Drop for NestingGuard<'_> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot
            && slot.depth.fetch_sub(1, Ordering::AcqRel) <= 1
        {
            slot.owner.store(FREE, Ordering::Release);
        }
    }
}
