//! Allocation tracking for the report path.
//!
//! Install [`TrackingAllocator`] as the global allocator of a test binary,
//! then wrap the code under test in [`track`]. Counting is per thread, so
//! other tests running in parallel do not disturb the result.
//!
//! ```rust,ignore
//! #[global_allocator]
//! static ALLOC: rtos_ft_test_helpers::tracking::TrackingAllocator =
//!     rtos_ft_test_helpers::tracking::TrackingAllocator;
//!
//! let guard = track();
//! ft.report_fault(&event);
//! assert_no_alloc!(guard, "report_fault");
//! ```

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

thread_local! {
    static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
    static BYTES: Cell<usize> = const { Cell::new(0) };
    static ARMED: Cell<bool> = const { Cell::new(false) };
}

fn note(bytes: usize) {
    // `try_with` keeps allocations during thread teardown from panicking.
    if ARMED.try_with(Cell::get).unwrap_or(false) {
        let _ = ALLOCATIONS.try_with(|c| c.set(c.get().saturating_add(1)));
        let _ = BYTES.try_with(|b| b.set(b.get().saturating_add(bytes)));
    }
}

/// System allocator that counts allocations on armed threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackingAllocator;

// SAFETY: every call is forwarded unchanged to `System`; the bookkeeping
// touches only thread-local counters.
unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: caller upholds `GlobalAlloc::alloc` requirements.
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            note(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        // SAFETY: caller upholds `GlobalAlloc::alloc_zeroed` requirements.
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            note(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: `ptr` was returned by `System` with this layout.
        unsafe { System.dealloc(ptr, layout) };
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: caller upholds `GlobalAlloc::realloc` requirements.
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            note(new_size.saturating_sub(layout.size()));
        }
        new_ptr
    }
}

/// Armed tracking window on the current thread.
#[derive(Debug)]
pub struct AllocationGuard {
    start_allocations: usize,
    start_bytes: usize,
}

/// Counts observed while a guard was armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocationReport {
    pub allocations: usize,
    pub bytes: usize,
}

impl AllocationGuard {
    pub fn new() -> Self {
        ARMED.with(|a| a.set(true));
        Self {
            start_allocations: ALLOCATIONS.with(Cell::get),
            start_bytes: BYTES.with(Cell::get),
        }
    }

    pub fn allocations(&self) -> usize {
        ALLOCATIONS
            .with(Cell::get)
            .saturating_sub(self.start_allocations)
    }

    pub fn bytes(&self) -> usize {
        BYTES.with(Cell::get).saturating_sub(self.start_bytes)
    }

    pub fn report(&self) -> AllocationReport {
        AllocationReport {
            allocations: self.allocations(),
            bytes: self.bytes(),
        }
    }
}

impl Default for AllocationGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AllocationGuard {
    fn drop(&mut self) {
        ARMED.with(|a| a.set(false));
    }
}

/// Start tracking allocations on this thread.
pub fn track() -> AllocationGuard {
    AllocationGuard::new()
}

/// Panic if the guard saw any allocation.
#[macro_export]
macro_rules! assert_no_alloc {
    ($guard:expr, $context:expr) => {
        let report = $guard.report();
        if report.allocations > 0 {
            panic!(
                "allocation on the fault path in '{}': {} allocations ({} bytes) at {}:{}",
                $context,
                report.allocations,
                report.bytes,
                file!(),
                line!()
            );
        }
    };
}
