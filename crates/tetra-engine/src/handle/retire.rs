use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::Handle;

/// Monotonic submission serials shared between drivers and caches.
///
/// A driver submits through [`SubmissionTracker::submit`] and calls
/// [`SubmissionTracker::complete`] from the GPU completion callback. Caches
/// tag retirements with the latest serial so nothing is reclaimed before the
/// work that might reference it has drained.
///
/// Serials are issued in queue submission order, even when several drivers
/// share one tracker.
#[derive(Debug, Default)]
pub struct SubmissionTracker {
    submitted: AtomicU64,
    completed: AtomicU64,
    ordering: Mutex<()>,
}

impl SubmissionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the serial for the next submission.
    pub fn begin(&self) -> u64 {
        self.submitted.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Takes the next serial and runs `submit` (the `queue.submit` call)
    /// before any other driver can take one.
    pub fn submit<R>(&self, submit: impl FnOnce(u64) -> R) -> (u64, R) {
        let _order = self.ordering.lock();
        let serial = self.begin();
        (serial, submit(serial))
    }

    /// Marks `serial` (and everything before it) as finished on the GPU.
    pub fn complete(&self, serial: u64) {
        self.completed.fetch_max(serial, Ordering::AcqRel);
    }

    pub fn last_submitted(&self) -> u64 {
        self.submitted.load(Ordering::Acquire)
    }

    pub fn last_completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    /// True when every submitted serial has completed.
    pub fn is_idle(&self) -> bool {
        self.last_completed() >= self.last_submitted()
    }
}

/// Frees waiting for their fence.
#[derive(Debug, Default)]
pub struct RetireQueue {
    pending: Mutex<Vec<(u64, Handle)>>,
}

impl RetireQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `handle` to be freed once `serial` has completed.
    pub fn push(&self, handle: Handle, serial: u64) {
        self.pending.lock().push((serial, handle));
    }

    /// Removes and returns every handle whose fence is at or before
    /// `completed`.
    pub fn drain_completed(&self, completed: u64) -> Vec<Handle> {
        let mut pending = self.pending.lock();
        let mut ready = Vec::new();

        pending.retain(|&(serial, handle)| {
            if serial <= completed {
                ready.push(handle);
                false
            } else {
                true
            }
        });

        ready
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
