use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Counting gate on command buffers in flight.
///
/// A driver acquires a permit before it starts building a command buffer and
/// the GPU completion callback releases it, so a new frame never overlaps
/// readback or compositing of the previous one.
#[derive(Debug)]
pub struct InFlight {
    capacity: usize,
    available: Mutex<usize>,
    released: Condvar,
}

impl InFlight {
    /// Interval at which [`acquire_with`](Self::acquire_with) re-runs its drain.
    const DRAIN_INTERVAL: Duration = Duration::from_millis(1);

    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            available: Mutex::new(capacity),
            released: Condvar::new(),
        }
    }

    /// One command buffer at a time.
    pub fn single() -> Self {
        Self::new(1)
    }

    /// Blocks until a permit is free.
    pub fn acquire(&self) {
        let mut available = self.available.lock();
        while *available == 0 {
            self.released.wait(&mut available);
        }
        *available -= 1;
    }

    /// Blocks until a permit is free, calling `drain` between waits.
    ///
    /// wgpu runs completion callbacks only while the device is polled, so
    /// drivers pass a non-blocking poll as `drain`.
    pub fn acquire_with(&self, mut drain: impl FnMut()) {
        loop {
            {
                let mut available = self.available.lock();
                if *available > 0 {
                    *available -= 1;
                    return;
                }
                self.released.wait_for(&mut available, Self::DRAIN_INTERVAL);
                if *available > 0 {
                    *available -= 1;
                    return;
                }
            }
            drain();
        }
    }

    /// Takes a permit if one is free.
    pub fn try_acquire(&self) -> bool {
        let mut available = self.available.lock();
        if *available == 0 {
            return false;
        }
        *available -= 1;
        true
    }

    /// Returns a permit. Releases beyond capacity are dropped.
    pub fn release(&self) {
        let mut available = self.available.lock();
        if *available >= self.capacity {
            log::warn!("in-flight permit released twice");
            return;
        }
        *available += 1;
        self.released.notify_one();
    }

    pub fn available(&self) -> usize {
        *self.available.lock()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InFlight {
    fn default() -> Self {
        Self::single()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    // ── permits ───────────────────────────────────────────────────────────

    #[test]
    fn single_permit_blocks_second_acquire() {
        let gate = InFlight::single();
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());
        gate.release();
        assert!(gate.try_acquire());
    }

    #[test]
    fn over_release_is_ignored() {
        let gate = InFlight::new(2);
        gate.release();
        assert_eq!(gate.available(), 2);
    }

    #[test]
    fn zero_capacity_means_one() {
        assert_eq!(InFlight::new(0).capacity(), 1);
    }

    // ── cross-thread release ──────────────────────────────────────────────

    #[test]
    fn acquire_waits_for_release_from_other_thread() {
        let gate = Arc::new(InFlight::single());
        gate.acquire();

        let releaser = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                gate.release();
            })
        };

        gate.acquire();
        assert_eq!(gate.available(), 0);
        releaser.join().unwrap();
    }

    #[test]
    fn acquire_with_drains_until_released() {
        let gate = InFlight::single();
        gate.acquire();

        let drains = AtomicUsize::new(0);
        gate.acquire_with(|| {
            if drains.fetch_add(1, Ordering::SeqCst) == 3 {
                gate.release();
            }
        });

        assert_eq!(drains.load(Ordering::SeqCst), 4);
        assert_eq!(gate.available(), 0);
    }
}
