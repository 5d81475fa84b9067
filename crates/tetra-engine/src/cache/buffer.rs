use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::gpu::Allocator;
use crate::handle::{Handle, HandlePool, RetireQueue, SubmissionTracker};
use crate::scene::{Family, Mesh};

/// A buffer and the number of meaningful bytes at its start.
#[derive(Debug, Clone)]
pub struct BufferEntry<B> {
    pub buffer: B,
    pub len: u64,
}

/// Maps buffer handles to GPU buffers.
///
/// Entries are replaced rather than mutated when a write outgrows them, so a
/// fetched entry must not be held across frames. The map and the handle pool
/// are guarded together by `entries`.
pub struct BufferCache<A: Allocator> {
    allocator: Arc<A>,
    pool: HandlePool,
    submissions: Arc<SubmissionTracker>,
    retired: RetireQueue,
    /// `None` until the handle receives its first write.
    entries: Mutex<HashMap<Handle, Option<BufferEntry<A::Buffer>>>>,
}

impl<A: Allocator> BufferCache<A> {
    pub fn new(allocator: Arc<A>, submissions: Arc<SubmissionTracker>) -> Self {
        Self::with_pool(allocator, submissions, HandlePool::new())
    }

    pub fn with_pool(
        allocator: Arc<A>,
        submissions: Arc<SubmissionTracker>,
        pool: HandlePool,
    ) -> Self {
        Self {
            allocator,
            pool,
            submissions,
            retired: RetireQueue::new(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Issues a handle with an empty entry, or `Handle::NONE` when the pool is
    /// exhausted.
    pub fn register_handle(&self) -> Handle {
        let mut entries = self.entries.lock();
        let handle = self.pool.allocate();
        if !handle.is_none() {
            entries.insert(handle, None);
        }
        handle
    }

    /// Copies `bytes` into the buffer behind `handle`.
    ///
    /// Reuses the current buffer when it is large enough, otherwise replaces
    /// it with one of capacity `max(1, 2 * len)`. Returns `false` when the
    /// handle is unknown or allocation failed; both are logged.
    pub fn write(&self, handle: Handle, bytes: &[u8]) -> bool {
        let mut entries = self.entries.lock();
        let Some(slot) = entries.get_mut(&handle) else {
            log::warn!("buffer write to unknown handle {handle}");
            return false;
        };

        let len = bytes.len() as u64;

        if let Some(entry) = slot.as_mut() {
            if len == 0 {
                entry.len = 0;
                return true;
            }
            if self.allocator.buffer_capacity(&entry.buffer) >= len {
                self.allocator.write_buffer(&entry.buffer, bytes);
                entry.len = len;
                return true;
            }
        }

        let capacity = len.saturating_mul(2).max(1);
        let Some(buffer) = self.allocator.create_buffer("tetra mesh buffer", capacity) else {
            log::error!("failed to allocate {capacity} bytes for buffer {handle}");
            return false;
        };

        if len > 0 {
            self.allocator.write_buffer(&buffer, bytes);
        }
        log::trace!("buffer {handle}: reallocated to {capacity} bytes");

        *slot = Some(BufferEntry { buffer, len });
        true
    }

    /// Current entry for `handle`, if it has been written.
    pub fn fetch(&self, handle: Handle) -> Option<BufferEntry<A::Buffer>> {
        self.entries.lock().get(&handle).cloned().flatten()
    }

    pub fn capacity(&self, handle: Handle) -> Option<u64> {
        self.fetch(handle)
            .map(|e| self.allocator.buffer_capacity(&e.buffer))
    }

    /// Drops the entry for `handle` and returns the handle to the pool once
    /// every submission issued so far has completed.
    pub fn free(&self, handle: Handle) {
        if self.entries.lock().remove(&handle).is_none() {
            log::warn!("free of unknown buffer handle {handle}");
            return;
        }

        if self.submissions.is_idle() {
            self.pool.release(handle);
        } else {
            self.retired.push(handle, self.submissions.last_submitted());
        }
    }

    /// Releases retired handles whose submissions have completed.
    ///
    /// Drivers call this once per frame.
    pub fn reclaim(&self) -> usize {
        let ready = self
            .retired
            .drain_completed(self.submissions.last_completed());
        for &handle in &ready {
            self.pool.release(handle);
        }
        ready.len()
    }

    /// Frees every family buffer cached on `mesh` and empties its slots.
    pub fn release_mesh(&self, mesh: &Mesh) {
        for family in Family::DRAW_ORDER {
            let handle = mesh.slot(family).take();
            if !handle.is_none() {
                self.free(handle);
            }
        }
    }

    /// Frees every entry; used when a scene closes.
    pub fn release_all(&self) {
        let handles: Vec<Handle> = self.entries.lock().keys().copied().collect();
        for handle in handles {
            self.free(handle);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn pool(&self) -> &HandlePool {
        &self.pool
    }

    pub fn retired_len(&self) -> usize {
        self.retired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::testing::MockAllocator;

    fn cache() -> (Arc<MockAllocator>, Arc<SubmissionTracker>, BufferCache<MockAllocator>) {
        let alloc = Arc::new(MockAllocator::new());
        let subs = Arc::new(SubmissionTracker::new());
        let cache = BufferCache::new(alloc.clone(), subs.clone());
        (alloc, subs, cache)
    }

    // ── write policy ──────────────────────────────────────────────────────

    #[test]
    fn first_write_allocates_double() {
        let (_, _, cache) = cache();
        let h = cache.register_handle();
        assert!(cache.fetch(h).is_none());

        assert!(cache.write(h, &[7; 100]));
        let entry = cache.fetch(h).unwrap();
        assert_eq!(entry.len, 100);
        assert_eq!(cache.capacity(h), Some(200));
        assert_eq!(&entry.buffer.data.lock()[..100], &[7; 100][..]);
    }

    #[test]
    fn smaller_write_reuses_buffer() {
        // register, write 100, write 50: capacity unchanged, length follows.
        let (alloc, _, cache) = cache();
        let h = cache.register_handle();

        cache.write(h, &[1; 100]);
        let cap_after_first = cache.capacity(h);
        let id = cache.fetch(h).unwrap().buffer.id;

        cache.write(h, &[2; 50]);
        assert_eq!(cache.capacity(h), cap_after_first);
        assert_eq!(cache.fetch(h).unwrap().len, 50);
        assert_eq!(cache.fetch(h).unwrap().buffer.id, id);
        assert_eq!(alloc.buffers_created(), 1);
    }

    #[test]
    fn growth_reallocates_to_twice_request() {
        let (alloc, _, cache) = cache();
        let h = cache.register_handle();

        cache.write(h, &[0; 10]);
        cache.write(h, &[0; 21]);
        assert_eq!(cache.capacity(h), Some(42));
        assert_eq!(cache.fetch(h).unwrap().len, 21);
        assert_eq!(alloc.buffers_created(), 2);
    }

    #[test]
    fn exact_capacity_write_does_not_reallocate() {
        let (alloc, _, cache) = cache();
        let h = cache.register_handle();

        cache.write(h, &[0; 8]);
        cache.write(h, &[0; 16]);
        assert_eq!(alloc.buffers_created(), 1);
        assert_eq!(cache.fetch(h).unwrap().len, 16);
    }

    #[test]
    fn replaced_buffer_keeps_old_contents() {
        let (_, _, cache) = cache();
        let h = cache.register_handle();

        cache.write(h, &[3; 4]);
        let old = cache.fetch(h).unwrap();
        cache.write(h, &[9; 40]);

        assert_eq!(&old.buffer.data.lock()[..4], &[3; 4][..]);
        assert_eq!(old.len, 4);
    }

    #[test]
    fn empty_write_on_fresh_handle() {
        let (_, _, cache) = cache();
        let h = cache.register_handle();

        assert!(cache.write(h, &[]));
        assert_eq!(cache.fetch(h).unwrap().len, 0);
        assert_eq!(cache.capacity(h), Some(1));
    }

    #[test]
    fn empty_write_keeps_existing_buffer() {
        let (alloc, _, cache) = cache();
        let h = cache.register_handle();

        cache.write(h, &[0; 32]);
        cache.write(h, &[]);
        assert_eq!(cache.fetch(h).unwrap().len, 0);
        assert_eq!(cache.capacity(h), Some(64));
        assert_eq!(alloc.buffers_created(), 1);
    }

    #[test]
    fn length_tracks_latest_write() {
        let (_, _, cache) = cache();
        let h = cache.register_handle();

        for len in [5usize, 300, 12, 0, 600, 599] {
            cache.write(h, &vec![1; len]);
            assert_eq!(cache.fetch(h).unwrap().len, len as u64);
            assert!(cache.capacity(h).unwrap() >= len as u64);
        }
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[test]
    fn write_to_unknown_handle_is_noop() {
        let (alloc, _, cache) = cache();
        assert!(!cache.write(Handle(42), &[1, 2, 3]));
        assert!(cache.fetch(Handle(42)).is_none());
        assert_eq!(alloc.buffers_created(), 0);
    }

    #[test]
    fn allocation_failure_keeps_previous_entry() {
        let (alloc, _, cache) = cache();
        let h = cache.register_handle();
        cache.write(h, &[1; 4]);

        alloc.fail_allocations(true);
        assert!(!cache.write(h, &[1; 64]));
        assert_eq!(cache.fetch(h).unwrap().len, 4);
    }

    #[test]
    fn exhausted_pool_returns_none() {
        let alloc = Arc::new(MockAllocator::new());
        let cache = BufferCache::with_pool(
            alloc,
            Arc::new(SubmissionTracker::new()),
            HandlePool::with_end(3),
        );

        assert_eq!(cache.register_handle(), Handle(2));
        assert!(cache.register_handle().is_none());
        assert_eq!(cache.len(), 1);
    }

    // ── free / reclaim ────────────────────────────────────────────────────

    #[test]
    fn free_when_idle_releases_immediately() {
        let (_, _, cache) = cache();
        let h = cache.register_handle();
        let before = cache.pool().available();

        cache.free(h);
        assert!(cache.fetch(h).is_none());
        assert_eq!(cache.pool().available(), before + 1);
        assert!(!cache.pool().is_outstanding(h));
    }

    #[test]
    fn free_waits_for_in_flight_submission() {
        let (_, subs, cache) = cache();
        let h = cache.register_handle();
        cache.write(h, &[0; 4]);

        let serial = subs.begin();
        cache.free(h);
        assert!(cache.fetch(h).is_none());
        assert!(cache.pool().is_outstanding(h));
        assert_eq!(cache.reclaim(), 0);

        subs.complete(serial);
        assert_eq!(cache.reclaim(), 1);
        assert!(!cache.pool().is_outstanding(h));
        assert_eq!(cache.retired_len(), 0);
    }

    #[test]
    fn free_unknown_handle_is_noop() {
        let (_, _, cache) = cache();
        let before = cache.pool().available();
        cache.free(Handle(77));
        assert_eq!(cache.pool().available(), before);
    }

    #[test]
    fn release_mesh_clears_slots() {
        let (_, _, cache) = cache();
        let mesh = Mesh::new();
        let h = mesh
            .slot(Family::Lin)
            .get_or_register(|| cache.register_handle(), |_| {});

        cache.release_mesh(&mesh);
        assert!(mesh.slot(Family::Lin).get().is_none());
        assert!(cache.is_empty());
        assert!(!cache.pool().is_outstanding(h));
    }

    #[test]
    fn release_all_empties_cache() {
        let (_, _, cache) = cache();
        for _ in 0..5 {
            let h = cache.register_handle();
            cache.write(h, &[0; 8]);
        }
        cache.release_all();
        assert!(cache.is_empty());
        assert_eq!(cache.pool().available(), cache.pool().capacity());
    }
}
