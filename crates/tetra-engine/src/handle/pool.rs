use std::collections::HashSet;

use parking_lot::Mutex;

use super::Handle;

/// Bounded pool of reusable buffer handles.
///
/// Handles are drawn from `2..end`; `0` and `1` are never issued. Allocation
/// order is unspecified: the pool hands out whichever free value the set
/// yields first.
#[derive(Debug)]
pub struct HandlePool {
    end: u32,
    available: Mutex<HashSet<u32>>,
}

impl HandlePool {
    /// Exclusive upper bound of the default universe (`2..65535`).
    pub const DEFAULT_END: u32 = u16::MAX as u32;

    pub fn new() -> Self {
        Self::with_end(Self::DEFAULT_END)
    }

    /// Creates a pool issuing handles in `2..end`.
    pub fn with_end(end: u32) -> Self {
        let end = end.max(Handle::FIRST_ALLOCATABLE);
        Self {
            end,
            available: Mutex::new((Handle::FIRST_ALLOCATABLE..end).collect()),
        }
    }

    /// Removes and returns an unused handle, or [`Handle::NONE`] when the
    /// pool is exhausted.
    pub fn allocate(&self) -> Handle {
        let mut available = self.available.lock();

        let Some(raw) = available.iter().next().copied() else {
            log::warn!("handle pool exhausted ({} handles outstanding)", self.capacity());
            return Handle::NONE;
        };

        available.remove(&raw);
        Handle(raw)
    }

    /// Returns `handle` to the pool.
    ///
    /// Releasing a handle twice is a caller bug; the second release is
    /// absorbed by the set. Values outside the universe are ignored.
    pub fn release(&self, handle: Handle) {
        if !self.in_universe(handle) {
            log::warn!("release of foreign handle {handle} ignored");
            return;
        }

        self.available.lock().insert(handle.raw());
    }

    /// Number of handles currently available.
    pub fn available(&self) -> usize {
        self.available.lock().len()
    }

    /// Total number of handles the pool can issue.
    pub fn capacity(&self) -> usize {
        (self.end - Handle::FIRST_ALLOCATABLE) as usize
    }

    /// Returns true if `handle` was issued and has not been released.
    pub fn is_outstanding(&self, handle: Handle) -> bool {
        self.in_universe(handle) && !self.available.lock().contains(&handle.raw())
    }

    fn in_universe(&self, handle: Handle) -> bool {
        (Handle::FIRST_ALLOCATABLE..self.end).contains(&handle.raw())
    }
}

impl Default for HandlePool {
    fn default() -> Self {
        Self::new()
    }
}
